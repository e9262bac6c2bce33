//! Shop configuration: credentials, environment and the settings that steer
//! the collector and completor.
//!
//! Configuration is plain data. It is read from JSON (all sections and fields
//! optional) and can be overridden from the environment:
//!
//! ```
//! use acumulus::config::Config;
//!
//! let config = Config::from_json_str(r#"{
//!     "contract": {"contract_code": "123456", "user_name": "shop", "password": "secret"},
//!     "shop": {"foreign_vat": true}
//! }"#).unwrap();
//! assert!(config.shop.foreign_vat);
//! assert_eq!(config.environment.lang, "nl");
//! ```

mod mappings;
mod settings;

pub use mappings::{FieldMapping, FieldMappings};
pub use settings::*;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::AcumulusError;

/// Complete configuration for one shop.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub environment: Environment,
    pub contract: Contract,
    pub connector: Connector,
    pub invoice: InvoiceSettings,
    pub customer: CustomerSettings,
    pub shop: ShopSettings,
    pub options: OptionsSettings,
    pub email_as_pdf: EmailAsPdfSettings,
    pub mappings: FieldMappings,
}

impl Config {
    /// Parse a configuration from JSON. Missing sections and fields take
    /// their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, AcumulusError> {
        serde_json::from_str(json).map_err(|e| AcumulusError::Config(format!("invalid JSON: {e}")))
    }

    /// Read a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AcumulusError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| AcumulusError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    /// Override credentials and environment from `ACUMULUS_*` variables.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Override from an arbitrary key lookup; `with_env_overrides` passes
    /// the process environment.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup("ACUMULUS_CONTRACT_CODE") {
            self.contract.contract_code = v;
        }
        if let Some(v) = lookup("ACUMULUS_USERNAME") {
            self.contract.user_name = v;
        }
        if let Some(v) = lookup("ACUMULUS_PASSWORD") {
            self.contract.password = v;
        }
        if let Some(v) = lookup("ACUMULUS_EMAIL_ON_ERROR") {
            self.contract.email_on_error = Some(v);
        }
        if let Some(v) = lookup("ACUMULUS_BASE_URI") {
            self.environment.base_uri = v;
        }
        if let Some(v) = lookup("ACUMULUS_TEST_MODE") {
            self.environment.test_mode = matches!(v.trim(), "1" | "true" | "yes");
        }
        self
    }

    /// Check that the configuration can be used to call the web service.
    pub fn validate(&self) -> Result<(), AcumulusError> {
        let missing: Vec<&str> = [
            ("contract_code", &self.contract.contract_code),
            ("user_name", &self.contract.user_name),
            ("password", &self.contract.password),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();
        if !missing.is_empty() {
            return Err(AcumulusError::Config(format!(
                "contract credentials incomplete, missing: {}",
                missing.join(", ")
            )));
        }

        if let Some(email) = &self.contract.email_on_error {
            if !email.contains('@') {
                return Err(AcumulusError::Config(format!(
                    "email_on_error '{email}' is not an email address"
                )));
            }
        }

        if self.environment.timeout_secs == 0 {
            return Err(AcumulusError::Config("timeout_secs must be positive".into()));
        }

        Ok(())
    }
}
