use tracing::{error, info, info_span, warn};
use log_pipeline::init::init_from_env;
use log_pipeline::sink::Sink;

/// Console logging configured from the environment.
///
/// Try `IS_SANDBOX=1` for colored output, or `LOG_FORMAT=text`, and pass a
/// JSON string as a field to see it flattened by the color formatter.
fn main() {
    let logger = init_from_env().expect("failed to initialize logging");

    info!("console example started");

    let span = info_span!("request");
    let _guard = span.enter();
    warn!(path = "/health", latency_ms = 250_u64, "slow request");
    error!(data = r#"{"user":{"id":7,"name":"alice"},"retry":true}"#, "upstream rejected payload");

    logger.writer().flush().expect("flush");
    logger.close().expect("close");
}
