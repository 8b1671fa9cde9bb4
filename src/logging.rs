// Logging setup.
// Installs a tracing subscriber on stderr so stdout stays clean for JSON output.

use tracing_subscriber::EnvFilter;

pub fn init_logging(level: &str) {
    // Base level from config, still overridable via RUST_LOG.
    let default = format!("{level},moltboard_github={level},reqwest=warn,hyper=warn");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // A second init (tests, embedding callers) keeps the existing subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .try_init();
}
