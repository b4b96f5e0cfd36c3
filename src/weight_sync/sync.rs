use crate::convert::convert_record;
use anyhow::Result;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use garmin_libra_sync::common::garmin_client::GarminClient;
use garmin_libra_sync::common::libra_client::LibraClient;
use garmin_libra_sync::common::types::{WeightEntry, WeightRecord};
use std::fmt;
use std::time::Duration;
use tracing::{error, info, warn};

// Libra rate limit; one upload per second
const UPLOAD_DELAY: Duration = Duration::from_secs(1);

pub trait WeightSource {
    async fn fetch_weights(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<WeightRecord>>;
}

pub trait WeightDestination {
    async fn latest_date(&self) -> Result<DateTime<Utc>>;
    async fn put_weight(&self, date: &str, entry: &WeightEntry) -> Result<()>;
}

impl WeightSource for GarminClient {
    async fn fetch_weights(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<WeightRecord>> {
        let composition = self.fetch_body_composition(start, end).await?;
        Ok(composition.date_weight_list)
    }
}

impl WeightDestination for LibraClient {
    async fn latest_date(&self) -> Result<DateTime<Utc>> {
        self.fetch_latest_date().await
    }

    async fn put_weight(&self, date: &str, entry: &WeightEntry) -> Result<()> {
        let status = LibraClient::put_weight(self, date, entry).await?;
        info!("Response status code: {}", status.as_u16());
        Ok(())
    }
}

#[derive(Debug)]
pub enum SyncError {
    Watermark(anyhow::Error),
    Fetch(anyhow::Error),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::Watermark(e) => write!(f, "Error fetching latest date: {e:#}"),
            SyncError::Fetch(e) => write!(f, "Error fetching body composition: {e:#}"),
        }
    }
}

impl std::error::Error for SyncError {}

#[derive(Debug, Default, PartialEq)]
pub struct SyncSummary {
    pub uploaded: usize,
    pub failed: usize,
    pub skipped: usize,
}

pub struct WeightSync<S, D> {
    source: S,
    destination: D,
    upload_delay: Duration,
}

impl<S: WeightSource, D: WeightDestination> WeightSync<S, D> {
    pub fn new(source: S, destination: D) -> Self {
        Self {
            source,
            destination,
            upload_delay: UPLOAD_DELAY,
        }
    }

    #[cfg(test)]
    fn with_upload_delay(mut self, upload_delay: Duration) -> Self {
        self.upload_delay = upload_delay;
        self
    }

    pub async fn sync_weights(&self, now: DateTime<Utc>) -> Result<SyncSummary, SyncError> {
        let start = self.fetch_watermark().await?;
        info!("Last date: {}", start.to_rfc3339());

        let records = self
            .source
            .fetch_weights(start.date_naive(), now.date_naive())
            .await
            .map_err(SyncError::Fetch)?;
        info!(
            "Found {} weight records between {} and {}",
            records.len(),
            start.date_naive(),
            now.date_naive()
        );

        Ok(self.upload_records(&records).await)
    }

    /// Latest date stored at the destination, less one day of overlap.
    async fn fetch_watermark(&self) -> Result<DateTime<Utc>, SyncError> {
        let latest = self
            .destination
            .latest_date()
            .await
            .map_err(SyncError::Watermark)?;
        Ok(latest - ChronoDuration::days(1))
    }

    async fn upload_records(&self, records: &[WeightRecord]) -> SyncSummary {
        let mut summary = SyncSummary::default();

        for record in records {
            let (date, entry) = match convert_record(record) {
                Ok(converted) => converted,
                Err(e) => {
                    warn!(
                        "Skipping weight record {:?}: {}",
                        record.sample_pk.or(record.date),
                        e
                    );
                    summary.skipped += 1;
                    continue;
                }
            };

            info!("Date: {}", date);
            info!("Data: {:?}", entry);

            match self.destination.put_weight(&date, &entry).await {
                Ok(()) => summary.uploaded += 1,
                Err(e) => {
                    error!("Error uploading data for {}: {:#}", date, e);
                    summary.failed += 1;
                }
            }

            tokio::time::sleep(self.upload_delay).await;
        }

        summary
    }
}
