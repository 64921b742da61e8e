use std::fs;

use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use crate::config::DiagnosticsConfig;

/// Filter override checked before `RUST_LOG`.
pub const LOG_FILTER_ENV: &str = "SEGLANE_LOG";

pub struct TelemetryGuard {
    pub session_id: Uuid,
    _file_guard: WorkerGuard,
}

fn log_file_name(prefix: &str, started_at: DateTime<Utc>, session_id: Uuid) -> String {
    let session = session_id.simple().to_string();
    format!(
        "{prefix}-{}-{}.jsonl",
        started_at.format("%Y%m%d-%H%M%S"),
        &session[..8]
    )
}

fn capture_filter(config: &DiagnosticsConfig) -> (EnvFilter, &'static str) {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_FILTER_ENV) {
        return (filter, LOG_FILTER_ENV);
    }
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return (filter, EnvFilter::DEFAULT_ENV);
    }
    (EnvFilter::new(&config.rust_log_filter), "config")
}

/// Installs the global subscriber: a compact stdout layer and one JSON lines
/// file per session under `config.log_dir`.
pub fn init_tracing(config: &DiagnosticsConfig) -> anyhow::Result<TelemetryGuard> {
    let log_dir = config.log_dir.as_path();
    fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory: {}", log_dir.display()))?;

    let session_id = Uuid::new_v4();
    let file_name = log_file_name(&config.trace_file_prefix, Utc::now(), session_id);
    let file_appender = tracing_appender::rolling::never(log_dir, &file_name);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
    let (env_filter, filter_source) = capture_filter(config);

    let stdout_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(true);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(file_writer);

    if let Err(error) = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
    {
        warn!(?error, "global tracing subscriber already initialized");
    } else {
        info!(
            %session_id,
            log_file = %log_dir.join(&file_name).display(),
            filter_source,
            "seglane tracing initialized"
        );
    }

    Ok(TelemetryGuard {
        session_id,
        _file_guard: file_guard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_name_carries_start_time_and_session() {
        let started_at = DateTime::parse_from_rfc3339("2026-02-23T10:20:30Z")
            .expect("timestamp should parse")
            .with_timezone(&Utc);
        let session_id =
            Uuid::parse_str("0123456789abcdef0123456789abcdef").expect("uuid should parse");
        assert_eq!(
            log_file_name("seglane", started_at, session_id),
            "seglane-20260223-102030-01234567.jsonl"
        );
    }
}
