use std::env;
use std::path::PathBuf;

use crate::error::AppError;

/// Which queue implementation backs the assignment pipeline. Chosen once at
/// startup, never per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueBackend {
    Local,
    Sqs,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub queue_backend: QueueBackend,
    pub sqs_queue_url: Option<String>,
    pub aws_region: Option<String>,
    pub local_queue_path: PathBuf,
    pub local_queue_visibility_secs: u64,
    pub poll_interval_secs: u64,
    pub worker_state_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let queue_backend = match env::var("QUEUE_BACKEND").as_deref() {
            Ok("sqs") => QueueBackend::Sqs,
            Ok("local") | Err(_) => QueueBackend::Local,
            Ok(other) => {
                return Err(AppError::Internal(format!(
                    "invalid QUEUE_BACKEND: {other} (expected \"local\" or \"sqs\")"
                )));
            }
        };

        let sqs_queue_url = env::var("SQS_QUEUE_URL").ok();
        if queue_backend == QueueBackend::Sqs && sqs_queue_url.is_none() {
            return Err(AppError::Internal(
                "SQS_QUEUE_URL must be set when QUEUE_BACKEND=sqs".to_string(),
            ));
        }

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            queue_backend,
            sqs_queue_url,
            aws_region: env::var("AWS_REGION").ok(),
            local_queue_path: env::var("LOCAL_QUEUE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("queue.json")),
            local_queue_visibility_secs: parse_or_default("LOCAL_QUEUE_VISIBILITY_SECS", 30)?,
            poll_interval_secs: parse_or_default("WORKER_POLL_INTERVAL", 2)?,
            worker_state_path: env::var("WORKER_STATE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("worker_state.json")),
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
