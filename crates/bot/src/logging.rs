//! `tracing` subscriber setup for the `skein` binary.

use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Crates whose verbosity follows `--debug`.
const SKEIN_TARGETS: &[&str] = &["skein", "skein_bot", "skein_threads", "skein_worker"];

/// Filter directives used when `RUST_LOG` is unset.
pub fn directives(config: &LogConfig, debug: bool, debug_platform: bool) -> String {
	let skein = if debug { "debug" } else { config.level.as_str() };
	let platform = if debug_platform { "debug" } else { "warn" };
	let mut out = config.level.clone();
	for target in SKEIN_TARGETS {
		out.push_str(&format!(",{target}={skein}"));
	}
	out.push_str(&format!(",skein_platform={platform}"));
	out
}

/// Installs the global subscriber, writing to stderr. `RUST_LOG` overrides
/// the configured levels.
pub fn init(config: &LogConfig, debug: bool, debug_platform: bool) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives(config, debug, debug_platform)));
	let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(true);
	if config.json {
		builder.json().init();
	} else {
		builder.init();
	}
}
