use anyhow::Context;
use time::UtcOffset;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// PostgreSQL connection string; without it records live in memory only.
    pub database_url: Option<String>,
    pub max_connections: u32,
    /// Offset of the user's local clock, used to decide what "today" is.
    pub utc_offset: UtcOffset,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());
        let max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);
        let utc_offset = match std::env::var("TZ_OFFSET_MINUTES") {
            Ok(raw) => parse_offset_minutes(&raw)?,
            Err(_) => UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC),
        };
        Ok(Self {
            database_url,
            max_connections,
            utc_offset,
        })
    }
}

pub(crate) fn parse_offset_minutes(raw: &str) -> anyhow::Result<UtcOffset> {
    let minutes: i32 = raw
        .trim()
        .parse()
        .with_context(|| format!("TZ_OFFSET_MINUTES is not an integer: {raw:?}"))?;
    minutes
        .checked_mul(60)
        .and_then(|secs| UtcOffset::from_whole_seconds(secs).ok())
        .with_context(|| format!("TZ_OFFSET_MINUTES out of range: {minutes}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positive_and_negative_offsets() {
        assert_eq!(
            parse_offset_minutes("120").unwrap(),
            UtcOffset::from_hms(2, 0, 0).unwrap()
        );
        assert_eq!(
            parse_offset_minutes(" -330 ").unwrap(),
            UtcOffset::from_hms(-5, -30, 0).unwrap()
        );
        assert_eq!(parse_offset_minutes("0").unwrap(), UtcOffset::UTC);
    }

    #[test]
    fn rejects_garbage_and_out_of_range() {
        assert!(parse_offset_minutes("two hours").is_err());
        assert!(parse_offset_minutes("100000").is_err());
    }
}
