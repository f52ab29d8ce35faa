use std::fmt;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::canvas::messages::{ScoreResponse, SubmissionRequest, SubmitAttemptBody};

/// Why a submission never produced a [`ScoreResponse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    Timeout,
    Transport(String),
    Status(u16),
    Decode(String),
    Encode(String),
    WorkerGone,
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::Timeout => write!(f, "the scoring service did not respond in time"),
            SubmitError::Transport(msg) => write!(f, "{msg}"),
            SubmitError::Status(status) => write!(f, "Server responded with status: {status}"),
            SubmitError::Decode(msg) => write!(f, "invalid response from scoring service: {msg}"),
            SubmitError::Encode(msg) => write!(f, "could not encode drawing: {msg}"),
            SubmitError::WorkerGone => {
                write!(f, "submission stopped before a response arrived")
            }
        }
    }
}

impl std::error::Error for SubmitError {}

/// The remote evaluator. Called from a worker thread, one request at a time.
pub trait ScoringClient: Send + Sync {
    fn submit(&self, request: &SubmissionRequest) -> Result<ScoreResponse, SubmitError>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndpointConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".into()
}

fn default_timeout_secs() -> u64 {
    30
}

impl EndpointConfig {
    pub fn parsed_base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.base_url)
            .with_context(|| format!("invalid scoring endpoint '{}'", self.base_url))?;
        if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
            bail!("scoring endpoint '{}' must be an http(s) url", self.base_url);
        }
        Ok(url)
    }

    pub fn validate(&self) -> Result<()> {
        self.parsed_base_url()?;
        if self.timeout_secs == 0 {
            bail!("scoring endpoint timeout must be at least one second");
        }
        Ok(())
    }
}

/// `POST {base_url}/api/submit_attempt/{lesson_id}` over blocking reqwest.
pub struct HttpScoringClient {
    client: Client,
    base_url: Url,
}

impl HttpScoringClient {
    pub fn new(config: &EndpointConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("lesson-canvas")
            .build()?;
        Ok(Self {
            client,
            base_url: config.parsed_base_url()?,
        })
    }

    pub fn submit_url(&self, lesson_id: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("scoring endpoint cannot take a path"))?
            .pop_if_empty()
            .extend(["api", "submit_attempt", lesson_id]);
        Ok(url)
    }
}

impl ScoringClient for HttpScoringClient {
    fn submit(&self, request: &SubmissionRequest) -> Result<ScoreResponse, SubmitError> {
        let url = self
            .submit_url(&request.lesson_id)
            .map_err(|e| SubmitError::Transport(e.to_string()))?;
        let body = serde_json::to_vec(&SubmitAttemptBody {
            image: &request.image,
        })
        .map_err(|e| SubmitError::Encode(e.to_string()))?;

        tracing::debug!("posting attempt to {url} ({} bytes)", body.len());
        let resp = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    SubmitError::Timeout
                } else {
                    SubmitError::Transport(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SubmitError::Status(status.as_u16()));
        }
        let text = resp.text().map_err(|e| {
            if e.is_timeout() {
                SubmitError::Timeout
            } else {
                SubmitError::Transport(e.to_string())
            }
        })?;
        serde_json::from_str(&text).map_err(|e| SubmitError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> HttpScoringClient {
        HttpScoringClient::new(&EndpointConfig {
            base_url: base_url.into(),
            timeout_secs: 5,
        })
        .expect("client")
    }

    #[test]
    fn submit_url_appends_the_lesson_path() {
        assert_eq!(
            client("http://localhost:5000").submit_url("12").unwrap().as_str(),
            "http://localhost:5000/api/submit_attempt/12"
        );
        assert_eq!(
            client("https://example.org/tamil/")
                .submit_url("7")
                .unwrap()
                .as_str(),
            "https://example.org/tamil/api/submit_attempt/7"
        );
    }

    #[test]
    fn lesson_ids_are_percent_encoded_as_one_segment() {
        assert_eq!(
            client("http://localhost:5000")
                .submit_url("a/b")
                .unwrap()
                .as_str(),
            "http://localhost:5000/api/submit_attempt/a%2Fb"
        );
    }

    #[test]
    fn endpoint_validation_rejects_bad_urls_and_zero_timeouts() {
        assert!(EndpointConfig {
            base_url: "not a url".into(),
            timeout_secs: 5
        }
        .validate()
        .is_err());
        assert!(EndpointConfig {
            base_url: "mailto:someone@example.org".into(),
            timeout_secs: 5
        }
        .validate()
        .is_err());
        assert!(EndpointConfig {
            base_url: "http://localhost".into(),
            timeout_secs: 0
        }
        .validate()
        .is_err());
        assert!(EndpointConfig::default().validate().is_ok());
    }

    #[test]
    fn status_failures_read_like_transport_errors() {
        assert_eq!(
            SubmitError::Status(500).to_string(),
            "Server responded with status: 500"
        );
    }
}
