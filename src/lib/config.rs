use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;

use crate::results::{FileSink, HttpSink, ResultSink, RetryPolicy, RetryingSink};

/// Two-player word description game server.
#[derive(Parser, Debug, Clone)]
#[command(name = "describo", version, about)]
pub struct ServerConfig {
    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0", env = "DESCRIBO_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = 3000, env = "PORT")]
    pub port: u16,

    /// Directory of static client files served for unmatched paths.
    #[arg(long, default_value = "public")]
    pub public_dir: PathBuf,

    /// Collector that quiz results are POSTed to.
    #[arg(long, env = "DESCRIBO_RESULTS_URL")]
    pub results_url: Option<String>,

    /// JSON-lines file for quiz results; also the fallback when the collector is unreachable.
    #[arg(long, default_value = "test_results.jsonl", env = "DESCRIBO_RESULTS_FILE")]
    pub results_file: PathBuf,

    /// Attempts per result before falling back to the file.
    #[arg(long, default_value_t = 3)]
    pub results_retries: u32,

    /// Delay before the first retry; doubles on every further retry.
    #[arg(long, default_value_t = 500)]
    pub results_backoff_ms: u64,

    /// Sessions without an inbound command for this many seconds are dropped.
    #[arg(long, default_value_t = 3600)]
    pub idle_timeout_secs: u64,
}

impl ServerConfig {
    /// `host:port`, resolved when the listener binds.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn room_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.results_retries,
            base_delay: Duration::from_millis(self.results_backoff_ms),
        }
    }

    pub fn result_sink(&self) -> Arc<dyn ResultSink> {
        let file: Arc<dyn ResultSink> = Arc::new(FileSink::new(&self.results_file));
        match &self.results_url {
            Some(url) => Arc::new(RetryingSink::new(
                Arc::new(HttpSink::new(url.clone())),
                Some(file),
                self.retry_policy(),
            )),
            None => file,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::parse_from(["describo"]);
        assert_eq!(config.public_dir, PathBuf::from("public"));
        assert_eq!(config.results_retries, 3);
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert_eq!(config.room_ttl(), crate::DEFAULT_ROOM_TTL);
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = ServerConfig::parse_from([
            "describo",
            "--host",
            "127.0.0.1",
            "--port",
            "8080",
            "--results-url",
            "http://collector.local/results",
            "--results-retries",
            "5",
            "--results-backoff-ms",
            "20",
        ]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.results_url.as_deref(), Some("http://collector.local/results"));
        assert_eq!(
            config.retry_policy(),
            RetryPolicy {
                attempts: 5,
                base_delay: Duration::from_millis(20)
            }
        );
        assert_eq!(config.listen_addr(), "127.0.0.1:8080");
    }
}
