use std::collections::BTreeMap;

use async_trait::async_trait;
use time::Date;
use tokio::sync::RwLock;

/// String key-value primitive the daily record store sits on.
///
/// One entry per calendar date. Values are opaque serialized records; the
/// backend never looks inside them.
#[async_trait]
pub trait RecordBackend: Send + Sync {
    async fn get(&self, day: Date) -> anyhow::Result<Option<String>>;

    /// Entries with `from <= day <= to`, ascending by day.
    async fn range(&self, from: Date, to: Date) -> anyhow::Result<Vec<(Date, String)>>;

    async fn all(&self) -> anyhow::Result<Vec<(Date, String)>>;

    async fn put(&self, day: Date, value: String) -> anyhow::Result<()>;

    /// Writes `value` only if the stored entry still equals `current`
    /// (`None` meaning "no entry yet"). Returns whether the write happened.
    async fn compare_and_swap(
        &self,
        day: Date,
        current: Option<&str>,
        value: String,
    ) -> anyhow::Result<bool>;

    /// Drops every entry, returning how many were removed.
    async fn clear(&self) -> anyhow::Result<u64>;
}

/// In-process backend, used when no database is configured and in tests.
#[derive(Default)]
pub struct MemoryBackend {
    entries: RwLock<BTreeMap<Date, String>>,
}

#[async_trait]
impl RecordBackend for MemoryBackend {
    async fn get(&self, day: Date) -> anyhow::Result<Option<String>> {
        Ok(self.entries.read().await.get(&day).cloned())
    }

    async fn range(&self, from: Date, to: Date) -> anyhow::Result<Vec<(Date, String)>> {
        if from > to {
            return Ok(Vec::new());
        }
        Ok(self
            .entries
            .read()
            .await
            .range(from..=to)
            .map(|(d, v)| (*d, v.clone()))
            .collect())
    }

    async fn all(&self) -> anyhow::Result<Vec<(Date, String)>> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .map(|(d, v)| (*d, v.clone()))
            .collect())
    }

    async fn put(&self, day: Date, value: String) -> anyhow::Result<()> {
        self.entries.write().await.insert(day, value);
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        day: Date,
        current: Option<&str>,
        value: String,
    ) -> anyhow::Result<bool> {
        let mut entries = self.entries.write().await;
        if entries.get(&day).map(String::as_str) != current {
            return Ok(false);
        }
        entries.insert(day, value);
        Ok(true)
    }

    async fn clear(&self) -> anyhow::Result<u64> {
        let mut entries = self.entries.write().await;
        let removed = entries.len() as u64;
        entries.clear();
        Ok(removed)
    }
}

#[cfg(test)]
mod memory_tests {
    use super::*;
    use time::macros::date;

    #[tokio::test]
    async fn compare_and_swap_only_writes_on_match() {
        let backend = MemoryBackend::default();
        let day = date!(2024 - 03 - 10);

        assert!(backend.compare_and_swap(day, None, "a".into()).await.unwrap());
        // entry exists now, so "expect absent" must fail
        assert!(!backend.compare_and_swap(day, None, "b".into()).await.unwrap());
        assert!(!backend
            .compare_and_swap(day, Some("stale"), "c".into())
            .await
            .unwrap());
        assert!(backend
            .compare_and_swap(day, Some("a"), "d".into())
            .await
            .unwrap());
        assert_eq!(backend.get(day).await.unwrap().as_deref(), Some("d"));
    }

    #[tokio::test]
    async fn range_is_inclusive_and_ordered() {
        let backend = MemoryBackend::default();
        for (d, v) in [
            (date!(2024 - 03 - 12), "12"),
            (date!(2024 - 03 - 09), "09"),
            (date!(2024 - 03 - 10), "10"),
            (date!(2024 - 03 - 16), "16"),
            (date!(2024 - 03 - 17), "17"),
        ] {
            backend.put(d, v.into()).await.unwrap();
        }

        let got: Vec<String> = backend
            .range(date!(2024 - 03 - 10), date!(2024 - 03 - 16))
            .await
            .unwrap()
            .into_iter()
            .map(|(_, v)| v)
            .collect();
        assert_eq!(got, vec!["10", "12", "16"]);

        let empty = backend
            .range(date!(2024 - 03 - 16), date!(2024 - 03 - 10))
            .await
            .unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn clear_reports_removed_count() {
        let backend = MemoryBackend::default();
        backend.put(date!(2024 - 01 - 01), "x".into()).await.unwrap();
        backend.put(date!(2024 - 01 - 02), "y".into()).await.unwrap();
        assert_eq!(backend.clear().await.unwrap(), 2);
        assert_eq!(backend.clear().await.unwrap(), 0);
        assert!(backend.all().await.unwrap().is_empty());
    }
}
