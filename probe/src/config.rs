use crate::{BandSelection, Spacing};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How clicks feed a session's stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Each click drops a pin.
    #[default]
    PinDrop,

    /// Each click extends the path.
    PathDrawing,

    /// Each click drops a pin and extends the path.
    Combined,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub mode: Mode,

    /// How long to wait on a sample before treating it as failed.
    pub sample_timeout_ms: u64,

    /// Distance measure for derived profiles.
    pub spacing: Spacing,

    /// Bands reported by the sampler.
    pub bands: BandSelection,

    /// Record a pin or vertex without a value when sampling fails.
    ///
    /// Successful samples with no data are always recorded.
    pub record_failures: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            sample_timeout_ms: 3_000,
            spacing: Spacing::default(),
            bands: BandSelection::default(),
            record_failures: false,
        }
    }
}

impl SessionConfig {
    pub fn sample_timeout(&self) -> Duration {
        Duration::from_millis(self.sample_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::{Mode, SessionConfig};
    use crate::{BandSelection, Spacing};
    use std::time::Duration;

    #[test]
    fn test_defaults() {
        let config: SessionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.sample_timeout(), Duration::from_secs(3));
        assert_eq!(config.spacing, Spacing::Uniform { step: 10.0 });
    }

    #[test]
    fn test_parse() {
        let config: SessionConfig = serde_json::from_str(
            r#"{
                "mode": "path-drawing",
                "sample_timeout_ms": 500,
                "spacing": { "kind": "haversine" },
                "bands": "all",
                "record_failures": true
            }"#,
        )
        .unwrap();
        assert_eq!(config.mode, Mode::PathDrawing);
        assert_eq!(config.sample_timeout(), Duration::from_millis(500));
        assert_eq!(config.spacing, Spacing::Haversine);
        assert_eq!(config.bands, BandSelection::All);
        assert!(config.record_failures);
    }

    #[test]
    fn test_unknown_field() {
        assert!(serde_json::from_str::<SessionConfig>(r#"{"timeout": 1}"#).is_err());
    }
}
