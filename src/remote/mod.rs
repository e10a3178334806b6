//! Client for a PostgREST-style remote table API.
//!
//! Tables live under `{base_url}/rest/v1/{table}`. Filters are query
//! parameters of the form `column=eq.value`; upserts are POSTs with
//! `Prefer: resolution=merge-duplicates` and an `on_conflict` column list.

pub mod query;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::aggregation::AggregateRecord;
use crate::config::RemoteConfig;
use crate::store::{AggregateStore, StoreError};

pub use query::Query;

/// Columns forming the natural key of a daily aggregate row.
pub const AGGREGATE_CONFLICT_KEY: [&str; 2] = ["user_id", "date"];

const PREFER_MINIMAL: &str = "return=minimal";
const PREFER_UPSERT: &str = "resolution=merge-duplicates,return=minimal";

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("remote http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("remote api error: status={status}, message={message}")]
    Api { status: u16, message: String },
    #[error("invalid remote response: {0}")]
    InvalidResponse(String),
    #[error("invalid remote configuration: {0}")]
    Config(String),
}

#[derive(Debug, Clone)]
pub struct RemoteTableClient {
    client: Client,
    base_url: String,
    api_key: String,
    aggregate_table: String,
}

impl RemoteTableClient {
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        if config.url.trim().is_empty() {
            return Err(RemoteError::Config("remote url is empty".to_string()));
        }
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            aggregate_table: config.aggregate_table.clone(),
        })
    }

    pub fn aggregate_table(&self) -> &str {
        &self.aggregate_table
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn headers(&self, prefer: Option<&'static str>) -> Result<HeaderMap, RemoteError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&self.api_key)
            .map_err(|_| RemoteError::Config("api key is not a valid header value".to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|_| RemoteError::Config("api key is not a valid header value".to_string()))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(prefer) = prefer {
            headers.insert("prefer", HeaderValue::from_static(prefer));
        }
        Ok(headers)
    }

    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &Query,
    ) -> Result<Vec<T>, RemoteError> {
        let response = self
            .client
            .get(self.table_url(table))
            .headers(self.headers(None)?)
            .query(&query.to_params())
            .send()
            .await?;
        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| RemoteError::InvalidResponse(format!("failed to parse rows: {e}")))
    }

    pub async fn insert<T: Serialize>(&self, table: &str, rows: &[T]) -> Result<(), RemoteError> {
        let response = self
            .client
            .post(self.table_url(table))
            .headers(self.headers(Some(PREFER_MINIMAL))?)
            .json(rows)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    /// Rows sharing `on_conflict` with an existing row replace it.
    pub async fn upsert<T: Serialize>(
        &self,
        table: &str,
        rows: &[T],
        on_conflict: &[&str],
    ) -> Result<(), RemoteError> {
        let response = self
            .client
            .post(self.table_url(table))
            .headers(self.headers(Some(PREFER_UPSERT))?)
            .query(&[("on_conflict", on_conflict.join(","))])
            .json(rows)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

async fn check_status(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(RemoteError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl AggregateStore for RemoteTableClient {
    async fn upsert_aggregate(&self, record: &AggregateRecord) -> Result<(), StoreError> {
        self.upsert(
            &self.aggregate_table,
            std::slice::from_ref(record),
            &AGGREGATE_CONFLICT_KEY,
        )
        .await?;
        Ok(())
    }

    async fn select_aggregate(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<AggregateRecord>, StoreError> {
        let query = Query::new()
            .eq("user_id", user_id)
            .eq("date", date.format("%Y-%m-%d"))
            .limit(1);
        let mut rows: Vec<AggregateRecord> = self.select(&self.aggregate_table, &query).await?;
        Ok(rows.pop())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> RemoteConfig {
        RemoteConfig {
            url: url.to_string(),
            api_key: "anon-key".to_string(),
            timeout_secs: 5,
            aggregate_table: "daily_aggregates".to_string(),
        }
    }

    #[test]
    fn empty_url_is_rejected() {
        let err = RemoteTableClient::new(&config("  ")).unwrap_err();
        assert!(matches!(err, RemoteError::Config(_)));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = RemoteTableClient::new(&config("https://project.example.co/")).unwrap();
        assert_eq!(
            client.table_url("daily_aggregates"),
            "https://project.example.co/rest/v1/daily_aggregates"
        );
    }

    #[test]
    fn headers_carry_api_key_twice() {
        let client = RemoteTableClient::new(&config("https://project.example.co")).unwrap();
        let headers = client.headers(Some(PREFER_UPSERT)).unwrap();
        assert_eq!(headers["apikey"], "anon-key");
        assert_eq!(headers[AUTHORIZATION], "Bearer anon-key");
        assert_eq!(headers["prefer"], PREFER_UPSERT);
    }

    #[test]
    fn control_characters_in_key_are_config_errors() {
        let mut cfg = config("https://project.example.co");
        cfg.api_key = "bad\nkey".to_string();
        let client = RemoteTableClient::new(&cfg).unwrap();
        assert!(matches!(client.headers(None), Err(RemoteError::Config(_))));
    }
}
