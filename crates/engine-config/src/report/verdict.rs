use crate::settings::error::SettingsError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure-rate bounds (fractions of records seen) for labelling a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerdictThresholds {
    pub acceptable: f64,
    pub degraded: f64,
}

impl Default for VerdictThresholds {
    fn default() -> Self {
        VerdictThresholds {
            acceptable: 0.01,
            degraded: 0.05,
        }
    }
}

impl VerdictThresholds {
    pub fn validate(&self) -> Result<(), SettingsError> {
        let ordered = 0.0 <= self.acceptable
            && self.acceptable <= self.degraded
            && self.degraded <= 1.0;
        if ordered {
            Ok(())
        } else {
            Err(SettingsError::ThresholdOrder {
                acceptable: self.acceptable,
                degraded: self.degraded,
            })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Clean,
    Acceptable,
    Degraded,
    NeedsInvestigation,
}

impl Verdict {
    pub fn from_counts(failed: u64, seen: u64, thresholds: &VerdictThresholds) -> Self {
        if failed == 0 {
            return Verdict::Clean;
        }
        let rate = failed as f64 / seen.max(failed) as f64;
        if rate <= thresholds.acceptable {
            Verdict::Acceptable
        } else if rate <= thresholds.degraded {
            Verdict::Degraded
        } else {
            Verdict::NeedsInvestigation
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Verdict::Clean => "clean",
            Verdict::Acceptable => "acceptable",
            Verdict::Degraded => "degraded",
            Verdict::NeedsInvestigation => "needs investigation",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_bands() {
        let t = VerdictThresholds::default();
        assert_eq!(Verdict::from_counts(0, 0, &t), Verdict::Clean);
        assert_eq!(Verdict::from_counts(0, 500, &t), Verdict::Clean);
        assert_eq!(Verdict::from_counts(1, 100, &t), Verdict::Acceptable);
        assert_eq!(Verdict::from_counts(5, 100, &t), Verdict::Degraded);
        assert_eq!(Verdict::from_counts(6, 100, &t), Verdict::NeedsInvestigation);
        assert_eq!(Verdict::from_counts(3, 0, &t), Verdict::NeedsInvestigation);
    }

    #[test]
    fn test_thresholds_must_be_ordered() {
        let t = VerdictThresholds {
            acceptable: 0.1,
            degraded: 0.05,
        };
        assert!(t.validate().is_err());
        assert!(VerdictThresholds::default().validate().is_ok());
    }
}
