use std::{fs::OpenOptions, sync::Mutex};

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{config::Config, errors::Error, Result};

/// Initialize tracing for the bot.
///
/// `RUST_LOG` wins when set; otherwise the configured `LOG_LEVEL` applies to our
/// crates and `warn` to everything else. Output goes to stdout and, when
/// `LOG_FILE` is set, is appended to that file as well.
pub fn init(service_name: &str, cfg: &Config) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(service_name, &cfg.log_level)));

    let file_layer = match &cfg.log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_ansi(true))
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::External(format!("logging init failed: {e}")))?;

    Ok(())
}

fn default_directives(service_name: &str, level: &str) -> String {
    let level = match level {
        "trace" | "debug" | "info" | "warn" | "error" => level,
        "warning" => "warn",
        "critical" => "error",
        _ => "info",
    };
    format!("warn,ntb={level},ntb_core={level},ntb_telegram={level},{service_name}={level}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_levels_fall_back_to_info() {
        assert!(default_directives("svc", "loud").contains("ntb_core=info"));
        assert!(default_directives("svc", "warning").contains("ntb_core=warn"));
        assert!(default_directives("svc", "debug").ends_with("svc=debug"));
    }
}
