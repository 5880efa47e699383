//! Budget multipliers that keep a run below the provider's published quota.

use serde::{Deserialize, Serialize};
use testscribe_error::{ConfigError, ScribeResult};

/// Fractions of each quota dimension a run may spend.
///
/// A multiplier of `0.5` on `rpd` lets a run use half of the daily requests,
/// leaving the rest for other consumers of the same API key. Multipliers live
/// in `(0.0, 1.0]`.
///
/// # Examples
///
/// ```
/// use testscribe_core::BudgetConfig;
///
/// let budget = BudgetConfig::builder().rpd_multiplier(0.5).build();
/// assert_eq!(budget.scale_rpd(Some(250)), Some(125));
/// assert_eq!(budget.scale_rpm(Some(10)), Some(10));
/// assert_eq!(budget.scale_tpm(None), None);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
#[serde(deny_unknown_fields)]
pub struct BudgetConfig {
    /// Share of requests per minute
    #[serde(default = "full_quota")]
    rpm_multiplier: f64,

    /// Share of tokens per minute
    #[serde(default = "full_quota")]
    tpm_multiplier: f64,

    /// Share of requests per day
    #[serde(default = "full_quota")]
    rpd_multiplier: f64,
}

fn full_quota() -> f64 {
    1.0
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            rpm_multiplier: full_quota(),
            tpm_multiplier: full_quota(),
            rpd_multiplier: full_quota(),
        }
    }
}

impl BudgetConfig {
    /// Creates a new budget config builder.
    pub fn builder() -> BudgetConfigBuilder {
        BudgetConfigBuilder::default()
    }

    /// Checks every multiplier is within `(0.0, 1.0]`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first offending multiplier.
    pub fn validate(&self) -> ScribeResult<()> {
        for (name, value) in [
            ("rpm_multiplier", self.rpm_multiplier),
            ("tpm_multiplier", self.tpm_multiplier),
            ("rpd_multiplier", self.rpd_multiplier),
        ] {
            if value <= 0.0 || value > 1.0 {
                return Err(ConfigError::new(format!(
                    "budget {} must be in (0.0, 1.0], got {}",
                    name, value
                ))
                .into());
            }
        }
        Ok(())
    }

    /// Scales a requests-per-minute limit; unlimited stays unlimited.
    pub fn scale_rpm(&self, rpm: Option<u32>) -> Option<u32> {
        rpm.map(|limit| scale(limit as u64, self.rpm_multiplier) as u32)
    }

    /// Scales a tokens-per-minute limit.
    pub fn scale_tpm(&self, tpm: Option<u64>) -> Option<u64> {
        tpm.map(|limit| scale(limit, self.tpm_multiplier))
    }

    /// Scales a requests-per-day limit.
    pub fn scale_rpd(&self, rpd: Option<u32>) -> Option<u32> {
        rpd.map(|limit| scale(limit as u64, self.rpd_multiplier) as u32)
    }

    /// Combines two budgets, keeping the stricter multiplier of each pair.
    pub fn merge(&self, other: &BudgetConfig) -> BudgetConfig {
        BudgetConfig {
            rpm_multiplier: self.rpm_multiplier.min(other.rpm_multiplier),
            tpm_multiplier: self.tpm_multiplier.min(other.tpm_multiplier),
            rpd_multiplier: self.rpd_multiplier.min(other.rpd_multiplier),
        }
    }
}

// A scaled limit never drops to zero, which would read as "unlimited".
fn scale(limit: u64, multiplier: f64) -> u64 {
    ((limit as f64 * multiplier).floor() as u64).max(1)
}

/// Builder for `BudgetConfig`.
#[derive(Debug, Default)]
pub struct BudgetConfigBuilder {
    rpm_multiplier: Option<f64>,
    tpm_multiplier: Option<f64>,
    rpd_multiplier: Option<f64>,
}

impl BudgetConfigBuilder {
    /// Sets the RPM multiplier.
    pub fn rpm_multiplier(mut self, value: f64) -> Self {
        self.rpm_multiplier = Some(value);
        self
    }

    /// Sets the TPM multiplier.
    pub fn tpm_multiplier(mut self, value: f64) -> Self {
        self.tpm_multiplier = Some(value);
        self
    }

    /// Sets the RPD multiplier.
    pub fn rpd_multiplier(mut self, value: f64) -> Self {
        self.rpd_multiplier = Some(value);
        self
    }

    /// Builds the budget; unset multipliers default to the full quota.
    pub fn build(self) -> BudgetConfig {
        BudgetConfig {
            rpm_multiplier: self.rpm_multiplier.unwrap_or_else(full_quota),
            tpm_multiplier: self.tpm_multiplier.unwrap_or_else(full_quota),
            rpd_multiplier: self.rpd_multiplier.unwrap_or_else(full_quota),
        }
    }
}
