//! Carris Metropolitana REST client.

use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::FetchError;
use crate::model::{RawArrival, Stop, Vehicle};

/// The three REST collaborators the board polls.
///
/// Implemented by [`CarrisClient`] for the live API and by fakes in tests.
pub trait TransitSource: Send + Sync + 'static {
    fn fetch_stop(&self, stop_id: &str) -> impl Future<Output = Result<Stop, FetchError>> + Send;

    fn fetch_arrivals(
        &self,
        stop_id: &str,
    ) -> impl Future<Output = Result<Vec<RawArrival>, FetchError>> + Send;

    /// Vehicles currently in service on `line_id`.
    fn fetch_vehicles(
        &self,
        line_id: &str,
    ) -> impl Future<Output = Result<Vec<Vehicle>, FetchError>> + Send;
}

#[derive(Debug, Clone)]
pub struct CarrisClient {
    http: reqwest::Client,
    base_url: String,
}

impl CarrisClient {
    pub fn new(config: &ApiConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let url = self.url(path);
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { url, status });
        }

        response
            .json::<T>()
            .await
            .map_err(|source| FetchError::Decode { url, source })
    }
}

impl TransitSource for CarrisClient {
    async fn fetch_stop(&self, stop_id: &str) -> Result<Stop, FetchError> {
        self.get_json(&format!("stops/{}", stop_id)).await
    }

    async fn fetch_arrivals(&self, stop_id: &str) -> Result<Vec<RawArrival>, FetchError> {
        self.get_json(&format!("stops/{}/realtime", stop_id)).await
    }

    async fn fetch_vehicles(&self, line_id: &str) -> Result<Vec<Vehicle>, FetchError> {
        let all: Vec<Vehicle> = self.get_json("vehicles").await?;
        Ok(vehicles_on_line(all, line_id))
    }
}

/// The vehicles endpoint returns the whole fleet; keep one line.
pub fn vehicles_on_line(vehicles: Vec<Vehicle>, line_id: &str) -> Vec<Vehicle> {
    vehicles
        .into_iter()
        .filter(|v| v.line_id == line_id)
        .collect()
}
