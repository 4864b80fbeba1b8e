//! Ledger configuration.
//!
//! Every knob defaults to the strict behaviour. Relaxed settings exist for
//! books migrated from systems that allowed edits to posted vouchers or
//! lines carrying both a debit and a credit.

use serde::Deserialize;

/// Top-level ledger configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub posting: PostingConfig,
    #[serde(default)]
    pub fiscal: FiscalConfig,
    #[serde(default)]
    pub reporting: ReportingConfig,
}

/// Voucher posting rules
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PostingConfig {
    /// Every line must carry exactly one of debit/credit
    #[serde(default = "default_true")]
    pub enforce_single_sided_lines: bool,
    /// Allow narration/date edits on posted vouchers
    #[serde(default)]
    pub allow_posted_edits: bool,
    /// Allow deleting posted vouchers (their balance effect is reversed first)
    #[serde(default)]
    pub allow_posted_deletion: bool,
    /// The voucher date must fall inside the target period
    #[serde(default = "default_true")]
    pub require_date_in_period: bool,
}

impl Default for PostingConfig {
    fn default() -> Self {
        Self {
            enforce_single_sided_lines: true,
            allow_posted_edits: false,
            allow_posted_deletion: false,
            require_date_in_period: true,
        }
    }
}

/// Fiscal calendar rules
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FiscalConfig {
    /// Periods must lie within their fiscal year
    #[serde(default = "default_true")]
    pub enforce_period_within_year: bool,
    /// Periods of the same year must not overlap
    #[serde(default = "default_true")]
    pub reject_overlapping_periods: bool,
    /// Activating a fiscal year deactivates every other year
    #[serde(default = "default_true")]
    pub single_active_year: bool,
    /// Refuse to close a period while unposted vouchers target it
    #[serde(default = "default_true")]
    pub block_close_with_drafts: bool,
}

impl Default for FiscalConfig {
    fn default() -> Self {
        Self {
            enforce_period_within_year: true,
            reject_overlapping_periods: true,
            single_active_year: true,
            block_close_with_drafts: true,
        }
    }
}

/// Report output settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReportingConfig {
    #[serde(default = "default_decimal_places")]
    pub decimal_places: i64,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            decimal_places: default_decimal_places(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_decimal_places() -> i64 {
    2
}

impl LedgerConfig {
    /// Loads configuration from an optional TOML file and `LEDGER__*`
    /// environment variables (e.g. `LEDGER__POSTING__ALLOW_POSTED_EDITS=true`).
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or a value has the wrong type.
    pub fn load(path: Option<&str>) -> Result<Self, ::config::ConfigError> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::with_name(path).required(false));
        }

        let config = builder
            .add_source(::config::Environment::with_prefix("LEDGER").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    /// Parses configuration from a TOML string
    pub fn from_toml(source: &str) -> Result<Self, ::config::ConfigError> {
        ::config::Config::builder()
            .add_source(::config::File::from_str(source, ::config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}
