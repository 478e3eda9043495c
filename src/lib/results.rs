//! Persistence of post-game recall quiz results.
//!
//! The game engine only produces [`TestResult`] records; handing them to a
//! [`ResultSink`] happens on spawned tasks via [`persist_results`], so a slow
//! or unreachable store never holds up gameplay.

use std::{path::PathBuf, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizAnswer {
    pub word: String,
    pub answer: String,
}

/// One player's quiz submission for a finished game.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub player_name: String,
    pub session_id: String,
    /// The player's self-reported native language.
    pub language: String,
    pub answers: Vec<QuizAnswer>,
    pub score: u32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write result file: {0}")]
    Io(#[from] std::io::Error),

    #[error("result request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("result endpoint answered {0}")]
    Status(reqwest::StatusCode),
}

#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn save(&self, record: &TestResult) -> Result<(), SinkError>;
}

/// Writes records to the log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl ResultSink for LogSink {
    async fn save(&self, record: &TestResult) -> Result<(), SinkError> {
        tracing::info!(
            session_id = %record.session_id,
            player_name = %record.player_name,
            language = %record.language,
            answers = record.answers.len(),
            score = record.score,
            "Quiz result"
        );
        Ok(())
    }
}

/// Appends one JSON document per line.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl ResultSink for FileSink {
    async fn save(&self, record: &TestResult) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

/// POSTs each record as JSON to a remote collector.
#[derive(Debug, Clone)]
pub struct HttpSink {
    client: reqwest::Client,
    url: String,
}

impl HttpSink {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl ResultSink for HttpSink {
    async fn save(&self, record: &TestResult) -> Result<(), SinkError> {
        let response = self.client.post(&self.url).json(record).send().await?;
        if !response.status().is_success() {
            return Err(SinkError::Status(response.status()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based): base, 2x base, 4x base...
    pub fn delay(&self, retry: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
    }
}

/// Retries `primary` with exponential backoff, then falls back.
pub struct RetryingSink {
    primary: Arc<dyn ResultSink>,
    fallback: Option<Arc<dyn ResultSink>>,
    policy: RetryPolicy,
}

impl RetryingSink {
    pub fn new(
        primary: Arc<dyn ResultSink>,
        fallback: Option<Arc<dyn ResultSink>>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            primary,
            fallback,
            policy,
        }
    }
}

#[async_trait]
impl ResultSink for RetryingSink {
    async fn save(&self, record: &TestResult) -> Result<(), SinkError> {
        let attempts = self.policy.attempts.max(1);
        let mut attempt = 1;
        let err = loop {
            match self.primary.save(record).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt >= attempts => break e,
                Err(e) => {
                    let delay = self.policy.delay(attempt);
                    tracing::warn!(
                        error = %e,
                        attempt,
                        retry_in_ms = delay.as_millis() as u64,
                        "Saving result failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        };

        match &self.fallback {
            Some(fallback) => {
                tracing::warn!(
                    error = %err,
                    attempts,
                    "Primary result sink gave up, using fallback"
                );
                fallback.save(record).await
            }
            None => Err(err),
        }
    }
}

/// Hands each record to `sink` on its own task. Failures are logged only.
pub fn persist_results(sink: &Arc<dyn ResultSink>, records: Vec<TestResult>) {
    for record in records {
        let sink = sink.clone();
        tokio::spawn(async move {
            if let Err(e) = sink.save(&record).await {
                tracing::error!(
                    error = %e,
                    session_id = %record.session_id,
                    player_name = %record.player_name,
                    "Failed to persist quiz result"
                );
            }
        });
    }
}
