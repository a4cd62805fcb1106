use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

/// Initializes console logging on stderr so stdout stays reserved for the
/// report tables. `RUST_LOG` adds to the default `housing_report=info`.
pub fn init_logging() {
    let filter = EnvFilter::from_default_env().add_directive(
        "housing_report=info"
            .parse()
            .unwrap_or_else(|_| LevelFilter::INFO.into()),
    );

    let console_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    // A second init (e.g. from tests) is harmless.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .try_init();
}
