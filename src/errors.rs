use crate::config::ConfigError;
use crate::engine::EngineName;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid storage configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage engine '{0}' is not enabled")]
    EngineNotEnabled(EngineName),

    #[error("No adapter registered for storage engine '{0}'")]
    UnknownEngine(EngineName),

    #[error("Storage key is empty")]
    EmptyKey,

    #[error("Storage adapter failed: {0:#}")]
    Adapter(anyhow::Error),

    #[error("Value could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Engine cache lock poisoned")]
    Poisoned,
}

impl StorageError {
    /// Returns `true` when the underlying adapter refused or failed the operation.
    pub fn is_adapter_failure(&self) -> bool {
        matches!(self, StorageError::Adapter(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::area::AreaError;

    #[test]
    fn adapter_errors_keep_their_context() {
        let inner = anyhow::Error::from(AreaError::Disabled).context("writing app.k");
        let err = StorageError::Adapter(inner);
        assert!(err.is_adapter_failure());

        let msg = err.to_string();
        assert!(msg.contains("writing app.k"), "{msg}");
        assert!(msg.contains("disabled"), "{msg}");
    }

    #[test]
    fn config_errors_convert() {
        let err: StorageError = ConfigError::NoEnginesEnabled.into();
        assert!(matches!(err, StorageError::Config(ConfigError::NoEnginesEnabled)));
        assert!(!err.is_adapter_failure());
    }

    #[test]
    fn engine_names_are_shown() {
        let err = StorageError::EngineNotEnabled(EngineName::Cookie);
        assert_eq!(err.to_string(), "Storage engine 'cookie' is not enabled");
    }
}
