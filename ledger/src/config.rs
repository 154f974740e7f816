//! Ledger configuration.

use zkbank_common::defaults;

/// Ledger configuration.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Signer threshold applied when a request omits one.
    pub default_required_signatures: u32,
    /// Notary gate applied when a request omits one.
    pub default_notary_required: bool,
    /// Identifier draws allowed before giving up on a collision streak.
    pub max_id_attempts: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            default_required_signatures: defaults::REQUIRED_SIGNATURES,
            default_notary_required: defaults::NOTARY_REQUIRED,
            max_id_attempts: 8,
        }
    }
}

impl LedgerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(required) = std::env::var("LEDGER_DEFAULT_REQUIRED_SIGNATURES") {
            if let Ok(required) = required.parse() {
                config.default_required_signatures = required;
            }
        }

        if let Ok(notary) = std::env::var("LEDGER_DEFAULT_NOTARY_REQUIRED") {
            if let Ok(notary) = notary.parse() {
                config.default_notary_required = notary;
            }
        }

        if let Ok(attempts) = std::env::var("LEDGER_MAX_ID_ATTEMPTS") {
            if let Ok(attempts) = attempts.parse() {
                config.max_id_attempts = attempts;
            }
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.default_required_signatures == 0 {
            return Err("Default required signatures must be at least 1".to_string());
        }

        if self.max_id_attempts == 0 {
            return Err("Max identifier attempts must be at least 1".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LedgerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_required_signatures, 2);
        assert!(config.default_notary_required);
    }

    #[test]
    fn test_invalid_config() {
        let mut config = LedgerConfig::default();
        config.default_required_signatures = 0;
        assert!(config.validate().is_err());

        let mut config = LedgerConfig::default();
        config.max_id_attempts = 0;
        assert!(config.validate().is_err());
    }
}
