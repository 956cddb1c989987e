use crate::config::LoggerConfig;
use crate::error::InitError;
use crate::layer::RecordLayer;
use crate::logger::Logger;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Options for the installed [`RecordLayer`].
///
/// **Fields**
/// - `span_groups`: open one group per entered span, see
///   [`RecordLayer::with_span_groups`].
#[derive(Clone, Debug, Default)]
pub struct LayerConfig {
    pub span_groups: bool,
}

/// Install a [`Registry`] combined with [`RecordLayer`] as the global
/// default subscriber, so every `tracing` event in the process reaches
/// `logger`.
///
/// **Errors**
///
/// [`InitError::Subscriber`] if a global subscriber is already set.
pub fn init_tracing_with_config(logger: Arc<Logger>, config: LayerConfig) -> Result<(), InitError> {
    let layer = RecordLayer::new(logger).with_span_groups(config.span_groups);
    let subscriber = Registry::default().with(layer);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Equivalent to [`init_tracing_with_config`] with [`LayerConfig::default`].
pub fn init_tracing(logger: Arc<Logger>) -> Result<(), InitError> {
    init_tracing_with_config(logger, LayerConfig::default())
}

/// Build a logger from [`LoggerConfig::from_env`] and install it.
///
/// The returned handle is the caller's to [`close`](Logger::close) at
/// shutdown.
pub fn init_from_env() -> Result<Arc<Logger>, InitError> {
    let logger = Arc::new(LoggerConfig::from_env().build()?);
    init_tracing(Arc::clone(&logger))?;
    Ok(logger)
}
