use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs a stderr subscriber. `RUST_LOG` takes precedence over the default
/// level picked by `verbose`.
pub fn init(verbose: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    Ok(())
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "package_scan=debug"
    } else {
        "package_scan=warn"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_raises_default_level() {
        assert_eq!(default_directive(false), "package_scan=warn");
        assert_eq!(default_directive(true), "package_scan=debug");
    }
}
