use crate::common::types::{LatestWeight, WeightEntry};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};

pub const DEFAULT_ENDPOINT: &str = "https://api.libra-app.eu";

// `date` as returned by `GET /values/weight/latest`, always UTC
const LATEST_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

pub struct LibraClient {
    client: Client,
    endpoint: String,
    auth_header: String,
}

impl LibraClient {
    pub fn new(endpoint: &str, access_token: &str) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to build Libra HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            auth_header: format!("Bearer {access_token}"),
        })
    }

    /// Date of the most recent weight value stored in Libra.
    pub async fn fetch_latest_date(&self) -> Result<DateTime<Utc>> {
        let path = self.weight_url("latest");

        let latest: LatestWeight = self
            .client
            .get(path)
            .header(AUTHORIZATION, &self.auth_header)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("Failed to parse latest weight response")?;

        parse_latest_date(&latest.date)
    }

    /// Create or replace the weight value stored under `date`.
    pub async fn put_weight(&self, date: &str, entry: &WeightEntry) -> Result<reqwest::StatusCode> {
        let path = self.weight_url(date);

        let response = self
            .client
            .put(path)
            .header(AUTHORIZATION, &self.auth_header)
            .json(entry)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.status())
    }

    fn weight_url(&self, key: &str) -> String {
        format!("{}/values/weight/{key}", self.endpoint)
    }
}

pub fn parse_latest_date(date: &str) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(date, LATEST_DATE_FORMAT)
        .with_context(|| format!("Invalid latest date {date:?}"))?;
    Ok(naive.and_utc())
}
