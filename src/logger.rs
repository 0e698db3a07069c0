use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn init_logging() {
    let filter = EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    // A subscriber may already be installed by the host or a previous call.
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_ansi(true))
        .with(filter)
        .try_init();
}
