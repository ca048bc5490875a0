//! Tag configuration.
//!
//! Built once at startup (in code or from a JSON file) and read-only after
//! that. Every request shares the same configuration through [`crate::SaleCycle`].

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::{Result, SaleCycleError};
use crate::types::CookieBehavior;

/// Currency used when none is configured explicitly
pub const DEFAULT_CURRENCY: &str = "GBP";

/// Wire keys of every page variable.
///
/// Each key can be renamed before the first request is served.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariableNames {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone_number: String,
    pub client_id: String,
    pub session_id: String,
    pub cart_status: String,
    pub currency: String,
    pub cookie_behavior: String,
    pub total_value: String,
    pub cart_item_ids: String,
    pub cart_item_names: String,
    pub cart_item_values: String,
    pub cart_item_quantities: String,
    pub cart_item_image_urls: String,
    pub custom_field_one: String,
    pub custom_field_two: String,
    pub page_name: String,
}

impl Default for VariableNames {
    fn default() -> Self {
        Self {
            customer_name: "n".to_string(),
            customer_email: "e".to_string(),
            customer_phone_number: "t".to_string(),
            client_id: "c".to_string(),
            session_id: "b".to_string(),
            cart_status: "s".to_string(),
            currency: "y".to_string(),
            cookie_behavior: "uc".to_string(),
            total_value: "v2".to_string(),
            cart_item_ids: "p".to_string(),
            cart_item_names: "i".to_string(),
            cart_item_values: "v1".to_string(),
            cart_item_quantities: "q1".to_string(),
            cart_item_image_urls: "u".to_string(),
            custom_field_one: "cu1".to_string(),
            custom_field_two: "cu2".to_string(),
            page_name: "w".to_string(),
        }
    }
}

impl VariableNames {
    /// Every (field, key) pair, for validation and diagnostics
    pub fn entries(&self) -> [(&'static str, &str); 17] {
        [
            ("customer_name", self.customer_name.as_str()),
            ("customer_email", self.customer_email.as_str()),
            ("customer_phone_number", self.customer_phone_number.as_str()),
            ("client_id", self.client_id.as_str()),
            ("session_id", self.session_id.as_str()),
            ("cart_status", self.cart_status.as_str()),
            ("currency", self.currency.as_str()),
            ("cookie_behavior", self.cookie_behavior.as_str()),
            ("total_value", self.total_value.as_str()),
            ("cart_item_ids", self.cart_item_ids.as_str()),
            ("cart_item_names", self.cart_item_names.as_str()),
            ("cart_item_values", self.cart_item_values.as_str()),
            ("cart_item_quantities", self.cart_item_quantities.as_str()),
            ("cart_item_image_urls", self.cart_item_image_urls.as_str()),
            ("custom_field_one", self.custom_field_one.as_str()),
            ("custom_field_two", self.custom_field_two.as_str()),
            ("page_name", self.page_name.as_str()),
        ]
    }

    /// Keys must be non-blank and distinct
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for (field, key) in self.entries() {
            if key.trim().is_empty() {
                return Err(SaleCycleError::configuration(format!(
                    "variable name for {field} must not be blank"
                )));
            }
            if !seen.insert(key) {
                return Err(SaleCycleError::configuration(format!(
                    "variable name '{key}' for {field} is used by another field"
                )));
            }
        }
        Ok(())
    }
}

/// Process-wide tag configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagConfig {
    /// Client id supplied by SaleCycle; required before the first render
    pub client_id: Option<String>,
    /// ISO 4217 currency code; `None` leaves the currency out of the tag
    pub currency: Option<String>,
    pub cookie_behavior: CookieBehavior,
    pub variable_names: VariableNames,
}

impl Default for TagConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            currency: Some(DEFAULT_CURRENCY.to_string()),
            cookie_behavior: CookieBehavior::default(),
            variable_names: VariableNames::default(),
        }
    }
}

impl TagConfig {
    /// Configuration for `client_id` with every other field at its default
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: Some(client_id.into()),
            ..Self::default()
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    /// Leave the currency variable out of rendered tags
    pub fn without_currency(mut self) -> Self {
        self.currency = None;
        self
    }

    pub fn with_cookie_behavior(mut self, behavior: CookieBehavior) -> Self {
        self.cookie_behavior = behavior;
        self
    }

    pub fn with_variable_names(mut self, names: VariableNames) -> Self {
        self.variable_names = names;
        self
    }

    /// Validate the configuration.
    ///
    /// A missing client id is allowed here: render reports it, so a host can
    /// start up before the id is known. A present one must not be blank.
    pub fn validate(&self) -> Result<()> {
        if let Some(client_id) = &self.client_id {
            if client_id.trim().is_empty() {
                return Err(SaleCycleError::configuration("client id must not be blank"));
            }
        }

        if let Some(currency) = &self.currency {
            if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
                return Err(SaleCycleError::configuration(format!(
                    "currency '{currency}' is not an ISO 4217 code"
                )));
            }
        }

        self.variable_names.validate()
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }
}
