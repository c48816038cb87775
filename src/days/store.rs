use std::collections::BTreeMap;
use std::sync::Arc;

use time::{Date, OffsetDateTime, UtcOffset};
use tracing::{debug, error, info, instrument};

use super::errors::StoreError;
use super::model::{DailyRecord, MealEntry};
use super::week::{format_day, parse_day, week_of};
use crate::storage::RecordBackend;

/// Key under which the mobile app kept every record in one JSON blob.
pub const LEGACY_STORAGE_KEY: &str = "@calorie_tracker_data";

const MAX_CAS_ATTEMPTS: usize = 32;

/// Date-indexed store of [`DailyRecord`]s, one backend entry per day.
pub struct DailyRecordStore {
    backend: Arc<dyn RecordBackend>,
    utc_offset: UtcOffset,
}

impl DailyRecordStore {
    pub fn new(backend: Arc<dyn RecordBackend>, utc_offset: UtcOffset) -> Self {
        Self {
            backend,
            utc_offset,
        }
    }

    /// Current moment on the user's local clock.
    pub fn now_local(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(self.utc_offset)
    }

    pub fn today(&self) -> Date {
        self.today_at(OffsetDateTime::now_utc())
    }

    /// Calendar day `instant` falls on for the user.
    pub fn today_at(&self, instant: OffsetDateTime) -> Date {
        instant.to_offset(self.utc_offset).date()
    }

    /// `Ok(None)` when nothing was ever stored for `date`.
    #[instrument(skip(self))]
    pub async fn get_daily(&self, date: Date) -> Result<Option<DailyRecord>, StoreError> {
        let raw = self.backend.get(date).await.map_err(|e| {
            error!(error = %e, %date, "read daily record failed");
            StoreError::Read(e)
        })?;
        raw.map(|raw| decode(date, &raw)).transpose()
    }

    pub async fn get_daily_or_default(&self, date: Date) -> Result<DailyRecord, StoreError> {
        Ok(self
            .get_daily(date)
            .await?
            .unwrap_or_else(|| DailyRecord::empty(date)))
    }

    /// Stores `record` as given under `date`, replacing whatever was there.
    #[instrument(skip(self, record))]
    pub async fn save_daily(&self, date: Date, record: &DailyRecord) -> Result<(), StoreError> {
        if record.date != date {
            return Err(StoreError::Invalid(format!(
                "record date {} does not match key {}",
                record.date, date
            )));
        }
        if let Some(field) = record.invalid_field() {
            return Err(StoreError::Invalid(format!(
                "{field} must be a non-negative number"
            )));
        }
        let encoded = encode(record)?;
        self.backend.put(date, encoded).await.map_err(|e| {
            error!(error = %e, %date, "write daily record failed");
            StoreError::Write(e)
        })?;
        debug!(%date, meals = record.meals.len(), "daily record saved");
        Ok(())
    }

    /// Appends a meal to the day's log, creating the day if needed.
    #[instrument(skip(self, meal), fields(food = %meal.food))]
    pub async fn append_meal(&self, date: Date, meal: MealEntry) -> Result<DailyRecord, StoreError> {
        if let Some(field) = meal.invalid_field() {
            return Err(StoreError::Invalid(format!(
                "{field} must be a non-negative number"
            )));
        }
        self.update(date, |rec| {
            rec.meals.push(meal.clone());
            Ok(())
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn remove_meal(&self, date: Date, index: usize) -> Result<DailyRecord, StoreError> {
        self.update(date, |rec| {
            if index >= rec.meals.len() {
                return Err(StoreError::MealNotFound { date, index });
            }
            rec.meals.remove(index);
            Ok(())
        })
        .await
    }

    /// The Sunday-to-Saturday week containing today on the local clock.
    pub async fn get_weekly(&self) -> Result<Vec<DailyRecord>, StoreError> {
        self.get_weekly_at(self.today()).await
    }

    /// Always seven records, Sunday first; missing days are zero records.
    #[instrument(skip(self))]
    pub async fn get_weekly_at(&self, today: Date) -> Result<Vec<DailyRecord>, StoreError> {
        let days = week_of(today).ok_or_else(|| {
            StoreError::Invalid(format!("week of {today} is outside the supported calendar"))
        })?;
        let rows = self
            .backend
            .range(days[0], days[6])
            .await
            .map_err(|e| {
                error!(error = %e, from = %days[0], to = %days[6], "read week failed");
                StoreError::Read(e)
            })?;

        let mut stored = BTreeMap::new();
        for (day, raw) in rows {
            stored.insert(day, decode(day, &raw)?);
        }

        Ok(days
            .into_iter()
            .map(|day| {
                stored
                    .remove(&day)
                    .unwrap_or_else(|| DailyRecord::empty(day))
            })
            .collect())
    }

    /// Deletes every record. Irreversible.
    #[instrument(skip(self))]
    pub async fn clear_all(&self) -> Result<u64, StoreError> {
        let removed = self.backend.clear().await.map_err(|e| {
            error!(error = %e, "clear records failed");
            StoreError::Write(e)
        })?;
        info!(removed, "all daily records cleared");
        Ok(removed)
    }

    /// Every stored record in the old single-blob layout, keyed by ISO date.
    #[instrument(skip(self))]
    pub async fn export_legacy(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let rows = self.backend.all().await.map_err(|e| {
            error!(error = %e, "read all records failed");
            StoreError::Read(e)
        })?;

        let mut blob = BTreeMap::new();
        for (day, raw) in rows {
            blob.insert(format_day(day), decode(day, &raw)?);
        }
        let encoded = serde_json::to_string(&blob).map_err(|e| StoreError::Write(e.into()))?;

        let mut dump = BTreeMap::new();
        dump.insert(LEGACY_STORAGE_KEY.to_string(), encoded);
        Ok(dump)
    }

    /// Splits an old single-blob dump into per-day entries. Map keys win over
    /// the `date` inside each record. Nothing is written if any entry is bad.
    #[instrument(skip(self, dump))]
    pub async fn import_legacy(&self, dump: &BTreeMap<String, String>) -> Result<usize, StoreError> {
        let Some(blob) = dump.get(LEGACY_STORAGE_KEY) else {
            return Err(StoreError::Invalid(format!(
                "dump has no {LEGACY_STORAGE_KEY} entry"
            )));
        };
        let parsed: BTreeMap<String, DailyRecord> = serde_json::from_str(blob)
            .map_err(|e| StoreError::Invalid(format!("legacy data is not a record map: {e}")))?;

        let mut records = Vec::with_capacity(parsed.len());
        for (key, mut record) in parsed {
            let day = parse_day(&key)
                .ok_or_else(|| StoreError::Invalid(format!("bad date key {key:?}")))?;
            if let Some(field) = record.invalid_field() {
                return Err(StoreError::Invalid(format!(
                    "{key}: {field} must be a non-negative number"
                )));
            }
            record.date = day;
            records.push(record);
        }

        for record in &records {
            self.save_daily(record.date, record).await?;
        }
        info!(days = records.len(), "legacy data imported");
        Ok(records.len())
    }

    /// Read-modify-write of a single day guarded by compare-and-swap.
    /// Totals are re-derived from the meals after `apply`.
    async fn update<F>(&self, date: Date, mut apply: F) -> Result<DailyRecord, StoreError>
    where
        F: FnMut(&mut DailyRecord) -> Result<(), StoreError>,
    {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let current = self.backend.get(date).await.map_err(|e| {
                error!(error = %e, %date, "read daily record failed");
                StoreError::Read(e)
            })?;
            let mut record = match current.as_deref() {
                Some(raw) => decode(date, raw)?,
                None => DailyRecord::empty(date),
            };

            apply(&mut record)?;
            record.recompute_totals();

            let encoded = encode(&record)?;
            let swapped = self
                .backend
                .compare_and_swap(date, current.as_deref(), encoded)
                .await
                .map_err(|e| {
                    error!(error = %e, %date, "write daily record failed");
                    StoreError::Write(e)
                })?;
            if swapped {
                return Ok(record);
            }
            debug!(%date, attempt, "daily record changed concurrently; retrying");
        }
        error!(%date, "gave up updating daily record");
        Err(StoreError::Contention(date))
    }
}

fn decode(date: Date, raw: &str) -> Result<DailyRecord, StoreError> {
    serde_json::from_str(raw).map_err(|source| {
        error!(error = %source, %date, "stored daily record is corrupt");
        StoreError::Decode { date, source }
    })
}

fn encode(record: &DailyRecord) -> Result<String, StoreError> {
    serde_json::to_string(record).map_err(|e| StoreError::Write(e.into()))
}
