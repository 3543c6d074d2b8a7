pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod profiles;
pub mod report;
pub mod state;
pub mod trackers;

pub use config::AnalyzerConfig;
pub use engine::Analysis;
pub use error::ConfigError;
pub use events::{CombatEvent, Combatant, FightInfo};
pub use report::FightReport;
pub use trackers::{Analyzer, Summary};

use anyhow::Result;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;

/// Logging for hosts that do not install their own subscriber.
///
/// Writes to a daily-rolling `analyzers.log` in `log_dir`. The filter comes
/// from `RUST_LOG`, with this crate at debug by default. Panics are routed
/// through tracing so they land in the log file too.
///
/// Keep the returned guard alive for the process lifetime. Dropping it
/// flushes and stops the background writer.
pub fn init_logging(log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::daily(log_dir, "analyzers.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("combat_ledger_analyzers=debug".parse()?),
        )
        .with_writer(non_blocking)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Logging init error: {}", e))?;

    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown location".to_string());
        let message = if let Some(s) = info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        tracing::error!("PANIC at {}: {}", location, message);
    }));

    tracing::info!("Analyzer logging started: logs → {}", log_dir.display());
    Ok(guard)
}
