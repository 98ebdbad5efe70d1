//! Exploration parameters.

use serde::{Deserialize, Serialize};

use crate::chain::{ChainExhaustion, ChainOptions};
use crate::error::{TeleError, TeleResult};
use crate::significance::Tail;

// ── Public structs ────────────────────────────────────────────────────────────

/// User-facing exploration parameters.
/// Missing fields in a JSON config take their default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorationConfig {
    /// Default 0.0. Minimum teleconnectivity for region membership; also the
    /// correlation the chain walk must stay below.
    pub threshold: f32,
    /// Default 0.99. Confidence level of the teleconnectivity significance mask.
    pub significance_level: f64,
    /// Default one-tailed.
    pub tail: Tail,
    /// Default 0.995. Confidence level of the pairwise seed/neighbour test
    /// gating region growth.
    pub correlation_significance_level: f64,
    /// Default 100. Maximum correlation chain length, reference included.
    pub max_chain_len: usize,
    /// Default `Idle`.
    pub chain_exhaustion: ChainExhaustion,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            significance_level: 0.99,
            tail: Tail::OneTailed,
            correlation_significance_level: 0.995,
            max_chain_len: 100,
            chain_exhaustion: ChainExhaustion::Idle,
        }
    }
}

impl ExplorationConfig {
    /// Parse a JSON config and validate it.
    pub fn from_json_str(text: &str) -> TeleResult<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| TeleError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> TeleResult<()> {
        for level in [self.significance_level, self.correlation_significance_level] {
            if !(level > 0.0 && level < 1.0) {
                return Err(TeleError::InvalidSignificanceLevel(level));
            }
        }
        if self.max_chain_len == 0 {
            return Err(TeleError::InvalidChainLength);
        }
        if !self.threshold.is_finite() {
            return Err(TeleError::Config(format!(
                "threshold must be finite, got {}",
                self.threshold
            )));
        }
        Ok(())
    }

    pub fn chain_options(&self) -> ChainOptions {
        ChainOptions {
            threshold: self.threshold,
            max_len: self.max_chain_len,
            exhaustion: self.chain_exhaustion,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let c = ExplorationConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.max_chain_len, 100);
        assert_eq!(c.tail, Tail::OneTailed);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let json = r#"{ "threshold": 0.4, "chain_exhaustion": "Stop" }"#;
        let c = ExplorationConfig::from_json_str(json).unwrap();
        assert_eq!(c.threshold, 0.4);
        assert_eq!(c.chain_exhaustion, ChainExhaustion::Stop);
        assert_eq!(c.significance_level, 0.99);
        assert_eq!(c.correlation_significance_level, 0.995);
    }

    #[test]
    fn empty_object_is_default() {
        assert_eq!(ExplorationConfig::from_json_str("{}").unwrap(), ExplorationConfig::default());
    }

    #[test]
    fn malformed_json_is_config_error() {
        let err = ExplorationConfig::from_json_str("{ threshold: }").unwrap_err();
        assert!(matches!(err, TeleError::Config(_)), "got {err:?}");
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert_eq!(
            ExplorationConfig::from_json_str(r#"{ "significance_level": 1.0 }"#),
            Err(TeleError::InvalidSignificanceLevel(1.0))
        );
        assert_eq!(
            ExplorationConfig::from_json_str(r#"{ "max_chain_len": 0 }"#),
            Err(TeleError::InvalidChainLength)
        );
    }

    #[test]
    fn chain_options_mirror_config() {
        let c = ExplorationConfig { threshold: -0.2, max_chain_len: 7, ..Default::default() };
        let o = c.chain_options();
        assert_eq!((o.threshold, o.max_len, o.exhaustion), (-0.2, 7, ChainExhaustion::Idle));
    }
}
