use std::sync::Arc;

use crate::config::AppConfig;
use crate::days::DailyRecordStore;
use crate::db::PgBackend;
use crate::storage::{MemoryBackend, RecordBackend};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<DailyRecordStore>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let backend = match &config.database_url {
            Some(url) => {
                Arc::new(PgBackend::connect(url, config.max_connections).await?)
                    as Arc<dyn RecordBackend>
            }
            None => {
                tracing::warn!("DATABASE_URL not set; records are kept in memory only");
                Arc::new(MemoryBackend::default()) as Arc<dyn RecordBackend>
            }
        };

        Ok(Self::from_parts(config, backend))
    }

    pub fn from_parts(config: Arc<AppConfig>, backend: Arc<dyn RecordBackend>) -> Self {
        let store = Arc::new(DailyRecordStore::new(backend, config.utc_offset));
        Self { config, store }
    }

    /// In-memory state on UTC, for tests.
    #[cfg(test)]
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            database_url: None,
            max_connections: 1,
            utc_offset: time::UtcOffset::UTC,
        });
        Self::from_parts(config, Arc::new(MemoryBackend::default()))
    }
}
