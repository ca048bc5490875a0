//! The process-wide `SaleCycle` handle and the per-request `PageTag`.
//!
//! ```
//! use salecycle::{CartItem, CartStatus, RequestStateStorage, SaleCycle, TagConfig};
//!
//! // Once, at startup
//! let salecycle = SaleCycle::new(TagConfig::new("1234567"))
//!     .with_session_resolver(|| "123456qwe".to_string());
//!
//! // Per request
//! let mut page = salecycle.page(RequestStateStorage::new());
//! page.set_cart_status(CartStatus::Checkout);
//! page.add_cart_item(&CartItem::new("es123", "Kettle", 12.0, 1)).unwrap();
//! let tag = page.render().unwrap();
//! assert!(tag.as_str().contains(r#"__sc["p"]="es123";"#));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{TagConfig, VariableNames};
use crate::encoding::{format_amount, pipeline};
use crate::error::{Result, SaleCycleError};
use crate::render::{check_mandatory_fields, serialize, RenderContext, RenderStage, RenderedTag};
use crate::state::{StateStorage, StateStorageExt, STATE_KEY};
use crate::types::{CartStatus, CookieBehavior};
use crate::variables::PageVariables;

/// Callback producing the current visitor's session id
pub type SessionResolver = Arc<dyn Fn() -> String + Send + Sync>;

/// Shared, read-only tag settings.
///
/// Build one at startup and clone it into request handlers.
#[derive(Clone)]
pub struct SaleCycle {
    config: Arc<TagConfig>,
    session_resolver: Option<SessionResolver>,
}

impl SaleCycle {
    /// Wrap `config` without checking it.
    ///
    /// Colliding or blank variable names are not caught here; prefer
    /// [`SaleCycle::try_new`] unless the configuration was validated already.
    pub fn new(config: TagConfig) -> Self {
        Self {
            config: Arc::new(config),
            session_resolver: None,
        }
    }

    /// Validate `config` and wrap it.
    ///
    /// # Errors
    ///
    /// `Configuration` if [`TagConfig::validate`] rejects it.
    pub fn try_new(config: TagConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Resolve the session id with `resolver` on every render
    pub fn with_session_resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.session_resolver = Some(Arc::new(resolver));
        self
    }

    pub fn config(&self) -> &TagConfig {
        &self.config
    }

    pub fn has_session_resolver(&self) -> bool {
        self.session_resolver.is_some()
    }

    /// Start collecting variables for one request in `storage`
    pub fn page<S: StateStorage>(&self, storage: S) -> PageTag<'_, S> {
        PageTag {
            salecycle: self,
            storage,
            last_render: None,
        }
    }
}

impl fmt::Debug for SaleCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaleCycle")
            .field("config", &self.config)
            .field("session_resolver", &self.session_resolver.is_some())
            .finish()
    }
}

/// One line of the visitor's cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub value: f64,
    pub quantity: u16,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl CartItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>, value: f64, quantity: u16) -> Self {
        Self {
            id: Some(id.into()),
            name: Some(name.into()),
            value,
            quantity,
            image_url: None,
        }
    }

    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }
}

/// Page variables of a single request, plus the operations that fill them.
pub struct PageTag<'a, S: StateStorage> {
    salecycle: &'a SaleCycle,
    storage: S,
    last_render: Option<RenderContext>,
}

impl<'a, S: StateStorage> PageTag<'a, S> {
    fn names(&self) -> &'a VariableNames {
        &self.salecycle.config.variable_names
    }

    /// Variables of the current request, created on first access
    fn current(&mut self) -> &mut PageVariables {
        if self.storage.get::<PageVariables>(STATE_KEY).is_none() {
            debug!("Creating page variables for this request");
            self.storage.set(STATE_KEY, PageVariables::new());
        }
        // Slot is filled just above when missing
        self.storage
            .get::<PageVariables>(STATE_KEY)
            .expect("INTERNAL ERROR: state backend lost the page variables - this is a bug")
    }

    /// Live view of the request's variables
    pub fn page_variables(&mut self) -> &PageVariables {
        self.current()
    }

    /// Live mutable view; changes are picked up by `render`
    pub fn page_variables_mut(&mut self) -> &mut PageVariables {
        self.current()
    }

    /// Stage reached by the most recent `render`, if any
    pub fn render_stage(&self) -> Option<RenderStage> {
        self.last_render.as_ref().map(RenderContext::current_stage)
    }

    /// Give the state backend back to the host
    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Add a page variable, replacing any previous value.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `name` is empty or whitespace.
    pub fn add_page_variable(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        if name.trim().is_empty() {
            return Err(SaleCycleError::invalid_argument(
                "page variable name must not be blank",
            ));
        }
        self.current().set(name, value);
        Ok(())
    }

    /// Record the customer's name as `first|last|title`.
    ///
    /// Each segment is pipeline-encoded: embedded `|` becomes a space and the
    /// segment is JavaScript-string escaped. Nothing is recorded without a
    /// first name; last name and title alone are not enough.
    pub fn set_customer_name(
        &mut self,
        first: Option<&str>,
        last: Option<&str>,
        title: Option<&str>,
    ) {
        let Some(first) = first else {
            return;
        };
        let key = self.names().customer_name.as_str();
        self.current().set(key, pipeline([Some(first), last, title]));
    }

    pub fn set_customer_email(&mut self, email: impl Into<String>) {
        let key = self.names().customer_email.as_str();
        self.current().set(key, email);
    }

    pub fn set_customer_phone_number(&mut self, phone_number: impl Into<String>) {
        let key = self.names().customer_phone_number.as_str();
        self.current().set(key, phone_number);
    }

    /// Mandatory before render
    pub fn set_cart_status(&mut self, status: CartStatus) {
        let key = self.names().cart_status.as_str();
        self.current().set(key, status.code().to_string());
    }

    /// Total of the cart without delivery, after discounts.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `amount` is NaN or infinite.
    pub fn set_total_value(&mut self, amount: f64) -> Result<()> {
        ensure_finite("total value", amount)?;
        let key = self.names().total_value.as_str();
        self.current().set(key, format_amount(amount));
        Ok(())
    }

    pub fn set_custom_field_one<I, T>(&mut self, values: I)
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let key = self.names().custom_field_one.as_str();
        self.current().set(key, pipeline(values.into_iter().map(Some)));
    }

    pub fn set_custom_field_two<I, T>(&mut self, values: I)
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let key = self.names().custom_field_two.as_str();
        self.current().set(key, pipeline(values.into_iter().map(Some)));
    }

    pub fn set_page_name(&mut self, page_name: impl Into<String>) {
        let key = self.names().page_name.as_str();
        self.current().set(key, page_name);
    }

    /// Append one item to the cart accumulators.
    ///
    /// An item without an image url adds nothing to the image accumulator,
    /// so that accumulator can hold fewer segments than the others.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the item value is NaN or infinite. Nothing is
    /// appended in that case.
    pub fn add_cart_item(&mut self, item: &CartItem) -> Result<()> {
        ensure_finite("cart item value", item.value)?;

        let names = self.names();
        let vars = self.current();
        vars.append(&names.cart_item_ids, item.id.as_deref().unwrap_or_default());
        vars.append(&names.cart_item_names, item.name.as_deref().unwrap_or_default());
        vars.append(&names.cart_item_values, &format_amount(item.value));
        vars.append(&names.cart_item_quantities, &item.quantity.to_string());
        if let Some(url) = &item.image_url {
            vars.append(&names.cart_item_image_urls, url);
        }
        Ok(())
    }

    /// Append several items in order, stopping at the first invalid one
    pub fn add_cart_items<'i, I>(&mut self, items: I) -> Result<()>
    where
        I: IntoIterator<Item = &'i CartItem>,
    {
        for item in items {
            self.add_cart_item(item)?;
        }
        Ok(())
    }

    /// Merge configured values, validate, and produce the script tag.
    ///
    /// Values merged before validation stay in the store when validation
    /// fails. Configured keys are overwritten, so a second call in the same
    /// request yields the same output; repeated rendering is still not a
    /// supported pattern.
    ///
    /// # Errors
    ///
    /// `Configuration` if the client id, cart status or (under the default
    /// cookie behavior) session id is missing.
    pub fn render(&mut self) -> Result<RenderedTag> {
        let salecycle = self.salecycle;
        let config = salecycle.config();
        let names = &config.variable_names;
        let mut ctx = RenderContext::new();

        let session_id = salecycle.session_resolver.as_ref().map(|resolve| resolve());
        let vars = self.current();
        if let Some(session_id) = session_id {
            vars.set(&names.session_id, session_id);
        }
        if let Some(client_id) = &config.client_id {
            vars.set(&names.client_id, client_id.as_str());
        }
        if let Some(currency) = &config.currency {
            vars.set(&names.currency, currency.as_str());
        }
        if config.cookie_behavior != CookieBehavior::default() {
            vars.set(&names.cookie_behavior, config.cookie_behavior.code().to_string());
        }

        ctx.transition_to(RenderStage::Validating)?;
        if let Err(err) = check_mandatory_fields(config, self.current()) {
            warn!("SaleCycle tag not rendered: {}", err);
            ctx.fail()?;
            self.last_render = Some(ctx);
            return Err(err);
        }

        ctx.transition_to(RenderStage::Rendering)?;
        let tag = serialize(self.current());
        ctx.transition_to(RenderStage::Rendered)?;

        info!("SaleCycle tag rendered with {} variables", self.current().len());
        self.last_render = Some(ctx);
        Ok(tag)
    }
}

impl<S: StateStorage> fmt::Debug for PageTag<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageTag")
            .field("salecycle", self.salecycle)
            .field("render_stage", &self.render_stage())
            .finish_non_exhaustive()
    }
}

fn ensure_finite(what: &str, amount: f64) -> Result<()> {
    if amount.is_finite() {
        Ok(())
    } else {
        Err(SaleCycleError::invalid_argument(format!(
            "{what} must be a finite number, got {amount}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::InMemoryStateStorage;

    fn salecycle() -> SaleCycle {
        SaleCycle::new(TagConfig::new("1234567"))
            .with_session_resolver(|| "123456qwe".to_string())
    }

    #[test]
    fn test_variables_are_created_lazily_once() {
        let sc = salecycle();
        let mut storage = InMemoryStateStorage::new();
        {
            let mut page = sc.page(&mut storage);
            page.set_customer_email("john@gmail.com");
            page.set_page_name("Basket");
        }
        assert_eq!(storage.write_count(), 1);
        let vars = storage.peek::<PageVariables>(STATE_KEY).unwrap();
        assert_eq!(vars.get("e"), Some("john@gmail.com"));
        assert_eq!(vars.get("w"), Some("Basket"));
    }

    #[test]
    fn test_second_page_on_same_storage_sees_earlier_variables() {
        let sc = salecycle();
        let mut storage = InMemoryStateStorage::new();
        sc.page(&mut storage).set_cart_status(CartStatus::Browsing);

        let mut page = sc.page(&mut storage);
        assert_eq!(page.page_variables().get("s"), Some("1"));
    }

    #[test]
    fn test_add_cart_item_rejects_non_finite_without_partial_append() {
        let sc = salecycle();
        let mut page = sc.page(InMemoryStateStorage::new());
        let err = page
            .add_cart_item(&CartItem::new("es1", "bad", f64::NAN, 1))
            .unwrap_err();
        assert!(matches!(err, SaleCycleError::InvalidArgument(_)));
        assert!(page.page_variables().is_empty());

        assert!(page.set_total_value(f64::INFINITY).is_err());
    }

    #[test]
    fn test_cart_item_defaults_for_missing_id_and_name() {
        let sc = salecycle();
        let mut page = sc.page(InMemoryStateStorage::new());
        let item = CartItem {
            id: None,
            name: None,
            value: 3.5,
            quantity: 2,
            image_url: None,
        };
        page.add_cart_items([&item, &item]).unwrap();

        let vars = page.page_variables();
        assert_eq!(vars.get("p"), Some("|"));
        assert_eq!(vars.get("i"), Some("|"));
        assert_eq!(vars.get("v1"), Some("3.50|3.50"));
        assert_eq!(vars.get("q1"), Some("2|2"));
        assert!(!vars.contains_key("u"));
    }

    #[test]
    fn test_render_stage_is_recorded() {
        let sc = salecycle();
        let mut page = sc.page(InMemoryStateStorage::new());
        assert!(page.render_stage().is_none());

        assert!(page.render().is_err());
        assert_eq!(page.render_stage(), Some(RenderStage::Failed));

        page.set_cart_status(CartStatus::Checkout);
        page.render().unwrap();
        assert_eq!(page.render_stage(), Some(RenderStage::Rendered));
    }

    #[test]
    fn test_try_new_rejects_colliding_variable_names() {
        let names = VariableNames {
            page_name: "s".to_string(),
            ..VariableNames::default()
        };
        let err = SaleCycle::try_new(TagConfig::new("1").with_variable_names(names)).unwrap_err();
        assert!(err.is_configuration());

        assert!(SaleCycle::try_new(TagConfig::new("1")).is_ok());
        assert!(SaleCycle::try_new(TagConfig::new("1").with_currency("gbp")).is_err());
    }

    #[test]
    fn test_customer_name_segments_are_escaped() {
        let sc = salecycle();
        let mut page = sc.page(InMemoryStateStorage::new());
        page.set_customer_name(Some("O'Neil|Jr"), Some("<b>"), None);
        assert_eq!(
            page.page_variables().get("n"),
            Some("O\\'Neil Jr|\\u003cb\\u003e|")
        );
    }

    #[test]
    fn test_into_storage_returns_backend() {
        let sc = salecycle();
        let mut page = sc.page(InMemoryStateStorage::new());
        page.set_customer_phone_number("02010101010");
        let storage = page.into_storage();
        assert!(storage.contains(STATE_KEY));
    }
}
