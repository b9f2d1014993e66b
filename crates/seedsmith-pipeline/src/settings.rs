use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::PipelineError;
use crate::output::{read_input, write_atomic};
use crate::paths::normalize_path;

/// Seed string used when none is configured.
pub const DEFAULT_SEED: &str = "DROP TABLE";

/// Currency conversion applied by the prices step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrencySettings {
    /// Currency every price is converted into.
    pub target: String,
    /// Units of `target` per one unit of the keyed currency.
    pub rates: BTreeMap<String, f64>,
}

impl Default for CurrencySettings {
    fn default() -> Self {
        let rates = [("USD", 17.83), ("ZAR", 1.0), ("CNY", 2.48), ("INR", 0.21)]
            .into_iter()
            .map(|(code, rate)| (code.to_string(), rate))
            .collect();
        Self {
            target: "ZAR".to_string(),
            rates,
        }
    }
}

/// Price synthesis for product/retailer pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingSettings {
    pub scale_min: f64,
    pub scale_max: f64,
    /// Upper bound of the discount percentage; the mode is always 0.
    pub max_discount_percent: f64,
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            scale_min: 0.85,
            scale_max: 1.15,
            max_discount_percent: 99.0,
        }
    }
}

/// Review synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewSettings {
    pub first_user_id: u64,
    pub last_user_id: u64,
    pub max_per_product: usize,
}

impl Default for ReviewSettings {
    fn default() -> Self {
        Self {
            first_user_id: 2,
            last_user_id: 16,
            max_per_product: 15,
        }
    }
}

/// Settings for a pipeline run, usually read from `seedsmith.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub input_dir: PathBuf,
    pub work_dir: PathBuf,
    pub output_path: PathBuf,
    pub schema_path: PathBuf,
    pub seed: String,
    pub keep_intermediates: bool,
    pub currency: CurrencySettings,
    pub pricing: PricingSettings,
    pub reviews: ReviewSettings,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("original-data"),
            work_dir: PathBuf::from("manipulated-data"),
            output_path: PathBuf::from("seed.sql"),
            schema_path: PathBuf::from("schema.sql"),
            seed: DEFAULT_SEED.to_string(),
            keep_intermediates: false,
            currency: CurrencySettings::default(),
            pricing: PricingSettings::default(),
            reviews: ReviewSettings::default(),
        }
    }
}

impl PipelineSettings {
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let content = read_input(path)?;
        let settings: PipelineSettings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Load `path` when given, otherwise fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, PipelineError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), PipelineError> {
        let encoded = toml::to_string_pretty(self)?;
        write_atomic(path, encoded.as_bytes())
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.seed.is_empty() {
            return Err(PipelineError::InvalidSettings("seed must not be empty".to_string()));
        }
        if normalize_path(&self.work_dir) == normalize_path(&self.input_dir) {
            return Err(PipelineError::InvalidSettings(
                "work_dir must differ from input_dir".to_string(),
            ));
        }
        if !self.currency.rates.contains_key(&self.currency.target) {
            return Err(PipelineError::InvalidSettings(format!(
                "currency.rates has no entry for target '{}'",
                self.currency.target
            )));
        }
        if let Some((code, rate)) = self
            .currency
            .rates
            .iter()
            .find(|(_, rate)| !rate.is_finite() || **rate <= 0.0)
        {
            return Err(PipelineError::InvalidSettings(format!(
                "currency rate for {code} must be > 0 (got {rate})"
            )));
        }
        let pricing = &self.pricing;
        if !(pricing.scale_min > 0.0 && pricing.scale_min < pricing.scale_max) {
            return Err(PipelineError::InvalidSettings(
                "pricing.scale_min must be > 0 and below pricing.scale_max".to_string(),
            ));
        }
        if !(0.0..100.0).contains(&pricing.max_discount_percent) {
            return Err(PipelineError::InvalidSettings(
                "pricing.max_discount_percent must be in [0, 100)".to_string(),
            ));
        }
        if self.reviews.first_user_id > self.reviews.last_user_id {
            return Err(PipelineError::InvalidSettings(
                "reviews.first_user_id must not exceed reviews.last_user_id".to_string(),
            ));
        }
        Ok(())
    }
}
