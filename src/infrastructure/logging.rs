use crate::infrastructure::error::EngineError;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

/// Installs a global fmt subscriber for hosts embedding the engine.
/// `RUST_LOG` directives are honoured on top of `default_directive`.
pub fn init_tracing(default_directive: &str) -> Result<(), EngineError> {
    let directive: Directive = default_directive.parse().map_err(|error| {
        EngineError::InvalidConfig(format!("invalid log directive '{default_directive}': {error}"))
    })?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .try_init()
        .map_err(|error| {
            EngineError::InvalidConfig(format!("failed to install tracing subscriber: {error}"))
        })
}
