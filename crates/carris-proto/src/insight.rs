//! Optional AI briefing for a stop (Gemini `generateContent`).
//!
//! [`InsightClient::briefing`] never fails: any error is logged and replaced by
//! [`Insight::fallback`].

use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::arrivals::summary_rows;
use crate::config::InsightConfig;
use crate::error::{FetchError, InsightError};
use crate::model::{Insight, ProcessedArrival};

#[derive(Debug, Clone)]
pub struct InsightClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl InsightClient {
    pub fn new(config: &InsightConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build insight HTTP client")?;
        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.resolved_api_key(),
        })
    }

    /// Briefing for `stop_name` based on the first few arrivals.
    pub async fn briefing(&self, stop_name: &str, arrivals: &[ProcessedArrival]) -> Insight {
        match self.try_briefing(stop_name, arrivals).await {
            Ok(insight) => insight,
            Err(e) => {
                warn!("[insight] falling back: {}", e);
                Insight::fallback()
            }
        }
    }

    async fn try_briefing(
        &self,
        stop_name: &str,
        arrivals: &[ProcessedArrival],
    ) -> Result<Insight, InsightError> {
        let api_key = self.api_key.as_deref().ok_or(InsightError::MissingApiKey)?;
        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        debug!("[insight] POST {}", url);

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt(stop_name, arrivals) }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "summary": { "type": "STRING" },
                        "recommendation": { "type": "STRING" }
                    },
                    "required": ["summary", "recommendation"]
                }
            }
        });

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { url, status }.into());
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|source| FetchError::Decode { url, source })?;
        parse_generated(parsed)
    }
}

fn parse_generated(response: GenerateResponse) -> Result<Insight, InsightError> {
    let text = response
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .find_map(|p| p.text)
        .filter(|t| !t.trim().is_empty())
        .ok_or(InsightError::Empty)?;
    Ok(serde_json::from_str(&text)?)
}

/// Prompt text sent to the model.
pub fn prompt(stop_name: &str, arrivals: &[ProcessedArrival]) -> String {
    let arrivals_text = summary_rows(arrivals)
        .iter()
        .map(|a| {
            format!(
                "Line {} to {} in {} min",
                a.line_id, a.destination, a.minutes_until_arrival
            )
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Analyze the following real-time transit data for the bus stop \"{}\".\n\
         Arrivals: {}.\n\
         Provide a friendly, very concise (max 2 sentences) summary and one helpful \
         recommendation for travelers.",
        stop_name, arrivals_text
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrivals::line_color;
    use crate::config::Config;

    fn row(line: &str, dest: &str, minutes: i64) -> ProcessedArrival {
        ProcessedArrival {
            line_id: line.to_string(),
            destination: dest.to_string(),
            minutes_until_arrival: minutes,
            is_live: true,
            display_color: line_color(line),
        }
    }

    #[test]
    fn test_prompt_lists_top_five() {
        let rows: Vec<ProcessedArrival> = (0..7).map(|i| row("1523", "Cacém", i)).collect();
        let text = prompt("Amadora (Estação)", &rows);
        assert!(text.contains("\"Amadora (Estação)\""));
        assert!(text.contains("Line 1523 to Cacém in 0 min, Line 1523 to Cacém in 1 min"));
        assert!(text.contains("in 4 min."));
        assert!(!text.contains("in 5 min"));
    }

    #[test]
    fn test_parse_generated_reads_first_text_part() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"{\"summary\":\"Busy.\",\"recommendation\":\"Take the 1523.\"}"}]}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        let insight = parse_generated(parsed).unwrap();
        assert_eq!(insight.summary, "Busy.");
        assert_eq!(insight.recommendation, "Take the 1523.");
    }

    #[test]
    fn test_parse_generated_rejects_empty_and_garbage() {
        let empty: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(matches!(parse_generated(empty), Err(InsightError::Empty)));

        let garbage: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[{"content":{"parts":[{"text":"not json"}]}}]}"#)
                .unwrap();
        assert!(matches!(
            parse_generated(garbage),
            Err(InsightError::InvalidJson(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_key_falls_back_without_network() {
        let mut cfg = Config::default().insight;
        cfg.api_key = String::new();
        let mut client = InsightClient::new(&cfg).unwrap();
        client.api_key = None;
        let insight = client.briefing("Stop", &[row("1523", "Cacém", 3)]).await;
        assert_eq!(insight, Insight::fallback());
    }
}
