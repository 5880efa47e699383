//! Layered TOML configuration.
//!
//! Sources, later ones overriding earlier ones:
//! - bundled defaults (`testscribe.toml` compiled into the binary)
//! - `~/.config/testscribe/testscribe.toml`
//! - `./testscribe.toml`
//! - an explicit file passed by the caller
//! - `TESTSCRIBE__<SECTION>__<KEY>` environment variables

use crate::{ModelLimits, RateLimits, Tier};
use config::{Config, ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use testscribe_core::{BudgetConfig, LlmSettings};
use testscribe_error::{ConfigError, ScribeResult};
use tracing::{debug, instrument};

/// Bundled default configuration
const DEFAULT_CONFIG: &str = include_str!("../../../testscribe.toml");

/// Model-specific overrides of a tier's limits.
///
/// ```toml
/// [providers.gemini.tiers.free.models."gemini-2.5-pro"]
/// rpm = 5
/// rpd = 100
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
pub struct ModelTierConfig {
    /// Requests per minute (overrides tier default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpm: Option<u32>,

    /// Tokens per minute (overrides tier default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tpm: Option<u64>,

    /// Requests per day (overrides tier default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpd: Option<u32>,
}

/// Limits of one API tier, with per-model overrides.
///
/// ```toml
/// [providers.gemini.tiers.free]
/// name = "Free"
/// rpm = 10
/// tpm = 250_000
/// rpd = 250
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TierConfig {
    /// Display name of the tier
    pub name: String,

    /// Requests per minute (tier default)
    #[serde(default)]
    pub rpm: Option<u32>,

    /// Tokens per minute (tier default)
    #[serde(default)]
    pub tpm: Option<u64>,

    /// Requests per day (tier default)
    #[serde(default)]
    pub rpd: Option<u32>,

    /// Model-specific overrides
    #[serde(default)]
    pub models: HashMap<String, ModelTierConfig>,
}

impl Tier for TierConfig {
    fn rpm(&self) -> Option<u32> {
        self.rpm
    }

    fn tpm(&self) -> Option<u64> {
        self.tpm
    }

    fn rpd(&self) -> Option<u32> {
        self.rpd
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TierConfig {
    /// Tier with `model_name`'s overrides applied on top of the tier defaults.
    pub fn for_model(&self, model_name: &str) -> TierConfig {
        match self.models.get(model_name) {
            Some(model) => TierConfig {
                name: self.name.clone(),
                rpm: model.rpm.or(self.rpm),
                tpm: model.tpm.or(self.tpm),
                rpd: model.rpd.or(self.rpd),
                models: HashMap::new(),
            },
            None => self.clone(),
        }
    }

    /// Limits for every model of this tier, scaled by `budget`.
    pub fn model_limits(&self, budget: Option<&BudgetConfig>) -> ModelLimits {
        let scale = |limits: RateLimits| match budget {
            Some(budget) => limits.with_budget(budget),
            None => limits,
        };

        self.models.keys().fold(
            ModelLimits::uniform(scale(self.limits())),
            |acc, model| acc.with_model(model.clone(), scale(self.for_model(model).limits())),
        )
    }
}

/// Tiers of one provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Tier used when none is named
    pub default_tier: String,

    /// Tier name to tier configuration
    #[serde(default)]
    pub tiers: HashMap<String, TierConfig>,
}

/// Top-level testscribe configuration.
///
/// # Example
///
/// ```no_run
/// use testscribe_rate_limit::ScribeConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ScribeConfig::load()?;
/// config.validate()?;
///
/// let tier = config.get_tier("gemini", None).unwrap();
/// println!("Gemini {} tier RPM: {:?}", tier.name, tier.rpm);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct ScribeConfig {
    /// Annotation settings
    #[serde(default)]
    pub llm: LlmSettings,

    /// Provider name to provider configuration
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Budget multipliers applied to every provider's limits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<BudgetConfig>,
}

impl ScribeConfig {
    fn bundled() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> ScribeResult<Self> {
        builder
            .build()
            .map_err(|e| ConfigError::new(format!("Failed to build configuration: {}", e)))?
            .try_deserialize()
            .map_err(|e| ConfigError::new(format!("Failed to parse configuration: {}", e)).into())
    }

    /// Bundled defaults overlaid with exactly one file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> ScribeResult<Self> {
        debug!("Loading configuration from file");
        Self::finish(Self::bundled().add_source(File::from(path.as_ref())))
    }

    /// Bundled defaults, user files and environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a present file is malformed.
    pub fn load() -> ScribeResult<Self> {
        Self::load_layered(None)
    }

    /// Every layer, plus `explicit` (required when given) just below the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `explicit` is missing or any present source is
    /// malformed.
    #[instrument]
    pub fn load_layered(explicit: Option<&Path>) -> ScribeResult<Self> {
        debug!("Loading configuration: env > explicit > current dir > home dir > bundled");

        let mut builder = Self::bundled();

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/testscribe/testscribe.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder.add_source(File::with_name("testscribe").required(false));

        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("TESTSCRIBE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        Self::finish(builder)
    }

    /// Validates annotation settings and budget multipliers.
    ///
    /// # Errors
    ///
    /// Returns the first configuration error found.
    pub fn validate(&self) -> ScribeResult<()> {
        self.llm.validate()?;
        if let Some(budget) = &self.budget {
            budget.validate()?;
        }
        if let Some(tier) = self.llm.tier() {
            let provider = self.llm.provider().as_str();
            if self.providers.contains_key(provider) && self.get_tier(provider, Some(tier.as_str())).is_none()
            {
                return Err(ConfigError::new(format!(
                    "unknown tier '{}' for provider '{}'",
                    tier, provider
                ))
                .into());
            }
        }
        Ok(())
    }

    /// Tier configuration for a provider; the provider's default tier when
    /// `tier_name` is `None`.
    #[instrument(skip(self))]
    pub fn get_tier(&self, provider: &str, tier_name: Option<&str>) -> Option<TierConfig> {
        let provider_config = self.providers.get(provider)?;
        let tier = tier_name.unwrap_or(&provider_config.default_tier);

        debug!(provider, tier, "Looking up tier configuration");

        provider_config.tiers.get(tier).cloned()
    }

    /// Per-model limits for `provider` under the configured tier and budget.
    ///
    /// Unknown providers get unlimited limits.
    pub fn model_limits(&self, provider: &str) -> ModelLimits {
        match self.get_tier(provider, self.llm.tier().as_deref()) {
            Some(tier) => tier.model_limits(self.budget.as_ref()),
            None => ModelLimits::uniform(RateLimits::unlimited()),
        }
    }
}
