//! Process-wide tracing setup shared by the server and the CLI.

use std::io::{self, IsTerminal};

use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt};

/// Workspace crates whose logs are raised to `debug` by [`debug_directives`].
pub const WORKSPACE_TARGETS: &[&str] = &["ai_llm_service", "rag_store", "contextor", "api"];

/// RFC3339 UTC timer implemented via `chrono`.
/// Example output: `2025-09-12T10:20:30Z`
#[derive(Clone, Debug, Default)]
struct ChronoRfc3339Utc;

impl FormatTime for ChronoRfc3339Utc {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let s = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        w.write_str(&s)
    }
}

/// Builds `info,<crate>=debug,...` for every workspace crate.
pub fn debug_directives() -> String {
    let mut s = String::from("info");
    for t in WORKSPACE_TARGETS {
        s.push(',');
        s.push_str(t);
        s.push_str("=debug");
    }
    s
}

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over `default_directives` when it is set and valid.
/// Output is compact single-line with RFC3339 UTC timestamps; ANSI colors
/// only when stdout is a terminal.
pub fn init(default_directives: &str) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    let layer = fmt::layer()
        .with_timer(ChronoRfc3339Utc)
        .with_target(true)
        .with_ansi(io::stdout().is_terminal())
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_directives_cover_workspace() {
        let d = debug_directives();
        assert!(d.starts_with("info,"));
        for t in WORKSPACE_TARGETS {
            assert!(d.contains(&format!("{t}=debug")));
        }
        assert!(EnvFilter::try_new(&d).is_ok());
    }
}
