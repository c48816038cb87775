use axum::http::StatusCode;
use thiserror::Error;
use time::Date;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage read failed: {0:#}")]
    Read(anyhow::Error),

    #[error("stored record for {date} could not be decoded: {source}")]
    Decode {
        date: Date,
        #[source]
        source: serde_json::Error,
    },

    #[error("storage write failed: {0:#}")]
    Write(anyhow::Error),

    #[error("invalid record: {0}")]
    Invalid(String),

    #[error("no meal at index {index} on {date}")]
    MealNotFound { date: Date, index: usize },

    #[error("record for {0} kept changing; update abandoned")]
    Contention(Date),
}

impl StoreError {
    pub fn status(&self) -> StatusCode {
        match self {
            StoreError::Invalid(_) => StatusCode::BAD_REQUEST,
            StoreError::MealNotFound { .. } => StatusCode::NOT_FOUND,
            StoreError::Contention(_) => StatusCode::CONFLICT,
            StoreError::Read(_) | StoreError::Decode { .. } | StoreError::Write(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn status_mapping() {
        assert_eq!(
            StoreError::Invalid("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            StoreError::MealNotFound {
                date: date!(2024 - 01 - 01),
                index: 3
            }
            .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            StoreError::Contention(date!(2024 - 01 - 01)).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            StoreError::Write(anyhow::anyhow!("disk full")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn messages_carry_context() {
        let err = StoreError::Read(anyhow::anyhow!("connection reset").context("select daily record"));
        assert_eq!(
            err.to_string(),
            "storage read failed: select daily record: connection reset"
        );
    }
}
