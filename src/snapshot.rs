//! JSON description of a page, used to preview tags outside a web server.
//!
//! ```json
//! {
//!   "customer": { "first_name": "Harry", "last_name": "Potter", "email": "harry@hogwart.com" },
//!   "cart_status": "checkout",
//!   "total_value": 17.0,
//!   "items": [
//!     { "id": "es123", "name": "Kettle", "value": 12.0, "quantity": 1 },
//!     { "id": "es666", "name": "Filter", "value": 5.0, "quantity": 1 }
//!   ]
//! }
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::config::TagConfig;
use crate::error::Result;
use crate::render::RenderedTag;
use crate::state::{RequestStateStorage, StateStorage};
use crate::tag::{CartItem, PageTag, SaleCycle};
use crate::types::CartStatus;

/// Customer details; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Customer {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub title: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

/// Everything a page would set on its tag during a request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSnapshot {
    pub customer: Customer,
    pub cart_status: Option<CartStatus>,
    pub total_value: Option<f64>,
    pub custom_field_one: Vec<String>,
    pub custom_field_two: Vec<String>,
    pub page_name: Option<String>,
    pub items: Vec<CartItem>,
    /// Raw variables added verbatim, in key order
    pub variables: BTreeMap<String, String>,
}

impl PageSnapshot {
    /// Load a page description from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read page description from {:?}", path.as_ref()))?;

        serde_json::from_str(&content).context("Failed to parse page description JSON")
    }

    /// Replay the snapshot onto a tag through its setters
    pub fn apply<S: StateStorage>(&self, page: &mut PageTag<'_, S>) -> Result<()> {
        let customer = &self.customer;
        page.set_customer_name(
            customer.first_name.as_deref(),
            customer.last_name.as_deref(),
            customer.title.as_deref(),
        );
        if let Some(email) = &customer.email {
            page.set_customer_email(email.as_str());
        }
        if let Some(phone_number) = &customer.phone_number {
            page.set_customer_phone_number(phone_number.as_str());
        }

        if let Some(status) = self.cart_status {
            page.set_cart_status(status);
        }
        if let Some(total) = self.total_value {
            page.set_total_value(total)?;
        }
        if !self.custom_field_one.is_empty() {
            page.set_custom_field_one(&self.custom_field_one);
        }
        if !self.custom_field_two.is_empty() {
            page.set_custom_field_two(&self.custom_field_two);
        }
        if let Some(page_name) = &self.page_name {
            page.set_page_name(page_name.as_str());
        }

        page.add_cart_items(&self.items)?;

        for (name, value) in &self.variables {
            page.add_page_variable(name, value.as_str())?;
        }
        Ok(())
    }
}

/// Render `snapshot` under `config` in a throwaway request.
///
/// `session_id`, when given, stands in for the session resolver.
pub fn render_preview(
    config: TagConfig,
    snapshot: &PageSnapshot,
    session_id: Option<String>,
) -> Result<RenderedTag> {
    let mut salecycle = SaleCycle::try_new(config)?;
    if let Some(session_id) = session_id {
        salecycle = salecycle.with_session_resolver(move || session_id.clone());
    }

    let mut page = salecycle.page(RequestStateStorage::new());
    snapshot.apply(&mut page)?;
    page.render()
}
