use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use time::Date;

use crate::storage::RecordBackend;

/// One row per calendar date in `daily_records`.
#[derive(Clone)]
pub struct PgBackend {
    db: PgPool,
}

impl PgBackend {
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("connect to database")?;

        if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
            tracing::warn!(error = %e, "migration failed; continuing");
        }

        Ok(Self { db })
    }
}

#[async_trait]
impl RecordBackend for PgBackend {
    async fn get(&self, day: Date) -> anyhow::Result<Option<String>> {
        let row = sqlx::query_as::<_, (String,)>(
            r#"
            SELECT payload
            FROM daily_records
            WHERE day = $1
            "#,
        )
        .bind(day)
        .fetch_optional(&self.db)
        .await
        .context("select daily record")?;
        Ok(row.map(|(payload,)| payload))
    }

    async fn range(&self, from: Date, to: Date) -> anyhow::Result<Vec<(Date, String)>> {
        let rows = sqlx::query_as::<_, (Date, String)>(
            r#"
            SELECT day, payload
            FROM daily_records
            WHERE day BETWEEN $1 AND $2
            ORDER BY day ASC
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.db)
        .await
        .context("select daily record range")?;
        Ok(rows)
    }

    async fn all(&self) -> anyhow::Result<Vec<(Date, String)>> {
        let rows = sqlx::query_as::<_, (Date, String)>(
            r#"
            SELECT day, payload
            FROM daily_records
            ORDER BY day ASC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("select all daily records")?;
        Ok(rows)
    }

    async fn put(&self, day: Date, value: String) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO daily_records (day, payload)
            VALUES ($1, $2)
            ON CONFLICT (day) DO UPDATE
            SET payload = EXCLUDED.payload, updated_at = now()
            "#,
        )
        .bind(day)
        .bind(value)
        .execute(&self.db)
        .await
        .context("upsert daily record")?;
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        day: Date,
        current: Option<&str>,
        value: String,
    ) -> anyhow::Result<bool> {
        let result = match current {
            None => sqlx::query(
                r#"
                INSERT INTO daily_records (day, payload)
                VALUES ($1, $2)
                ON CONFLICT (day) DO NOTHING
                "#,
            )
            .bind(day)
            .bind(value)
            .execute(&self.db)
            .await
            .context("insert daily record")?,
            Some(expected) => sqlx::query(
                r#"
                UPDATE daily_records
                SET payload = $2, updated_at = now()
                WHERE day = $1 AND payload = $3
                "#,
            )
            .bind(day)
            .bind(value)
            .bind(expected)
            .execute(&self.db)
            .await
            .context("conditional update daily record")?,
        };
        Ok(result.rows_affected() == 1)
    }

    async fn clear(&self) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM daily_records")
            .execute(&self.db)
            .await
            .context("delete daily records")?;
        Ok(result.rows_affected())
    }
}
