//! Tests for Tag Rendering
//!
//! These tests verify:
//! - Mandatory field validation (client id, cart status, session id)
//! - Merging of configured values (session id, client id, currency, cookie behavior)
//! - Byte-exact output and insertion ordering
//! - Behavior when render is called twice in one request

use salecycle::render::{assignment, SCRIPT_CLOSE, SCRIPT_OPEN};
use salecycle::{
    CartStatus, CookieBehavior, InMemoryStateStorage, PageVariables, RenderStage, SaleCycle,
    SaleCycleError, TagConfig, VariableNames, STATE_KEY,
};

const SESSION_ID: &str = "123456qwe";

fn with_session(config: TagConfig) -> SaleCycle {
    SaleCycle::new(config).with_session_resolver(|| SESSION_ID.to_string())
}

/// Every stored variable must appear as an assignment line
fn assert_renders_every_variable(tag: &str, vars: &PageVariables) {
    for (key, value) in vars.iter() {
        assert!(
            tag.contains(&assignment(key, value)),
            "missing {key}={value} in {tag}"
        );
    }
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_render_fails_without_client_id() {
    let sc = with_session(TagConfig::default());
    let mut page = sc.page(InMemoryStateStorage::new());
    page.set_cart_status(CartStatus::Checkout);

    let err = page.render().unwrap_err();
    assert!(matches!(err, SaleCycleError::Configuration(ref m) if m == "ClientId required"));
    assert_eq!(page.render_stage(), Some(RenderStage::Failed));
}

#[test]
fn test_render_fails_without_cart_status() {
    let sc = with_session(TagConfig::new("1234567"));
    let mut page = sc.page(InMemoryStateStorage::new());

    let err = page.render().unwrap_err();
    assert!(matches!(err, SaleCycleError::Configuration(ref m) if m == "cart status required"));
}

#[test]
fn test_render_fails_without_session_id_under_default_cookie_behavior() {
    let sc = SaleCycle::new(TagConfig::new("1234567"));
    let mut page = sc.page(InMemoryStateStorage::new());
    page.set_cart_status(CartStatus::Checkout);

    let err = page.render().unwrap_err();
    assert!(matches!(err, SaleCycleError::Configuration(ref m) if m == "session id required"));
}

#[test]
fn test_manually_added_session_id_satisfies_validation() {
    let sc = SaleCycle::new(TagConfig::new("1234567"));
    let mut page = sc.page(InMemoryStateStorage::new());
    page.set_cart_status(CartStatus::Checkout);
    page.add_page_variable("b", "from-cookie").unwrap();

    let tag = page.render().unwrap();
    assert!(tag.as_str().contains(r#"__sc["b"]="from-cookie";"#));
}

#[test]
fn test_merged_values_remain_after_failed_render() {
    let sc = with_session(TagConfig::new("1234567"));
    let mut storage = InMemoryStateStorage::new();
    {
        let mut page = sc.page(&mut storage);
        assert!(page.render().is_err());
    }

    let vars = storage.peek::<PageVariables>(STATE_KEY).unwrap();
    assert_eq!(vars.get("b"), Some(SESSION_ID));
    assert_eq!(vars.get("c"), Some("1234567"));

    let mut page = sc.page(&mut storage);
    page.set_cart_status(CartStatus::Browsing);
    assert!(page.render().is_ok());
}

// =============================================================================
// Output Tests
// =============================================================================

#[test]
fn test_render_with_default_cookie_behavior() {
    let sc = with_session(TagConfig::new("1234567"));
    let mut page = sc.page(InMemoryStateStorage::new());
    page.set_cart_status(CartStatus::Checkout);

    let tag = page.render().unwrap();
    let text = tag.as_str();

    assert_renders_every_variable(text, page.page_variables());
    assert!(text.contains(&assignment("c", "1234567")));
    assert!(text.contains(&assignment("b", SESSION_ID)));
    assert!(!text.contains("__sc[\"uc\"]"));
    assert_eq!(page.render_stage(), Some(RenderStage::Rendered));
}

#[test]
fn test_render_with_self_managed_session_and_no_resolver() {
    let config = TagConfig::new("1234567").with_cookie_behavior(CookieBehavior::SelfManagedSession);
    let sc = SaleCycle::new(config);
    let mut page = sc.page(InMemoryStateStorage::new());
    page.set_cart_status(CartStatus::Checkout);

    let tag = page.render().unwrap();
    let text = tag.as_str();

    assert!(text.contains(&assignment("uc", "1")));
    assert!(!text.contains("__sc[\"b\"]"));
    assert_renders_every_variable(text, page.page_variables());
}

#[test]
fn test_render_with_no_cookies() {
    let config = TagConfig::new("1234567").with_cookie_behavior(CookieBehavior::NoCookies);
    let sc = with_session(config);
    let mut page = sc.page(InMemoryStateStorage::new());
    page.set_cart_status(CartStatus::Purchased);

    let text = page.render().unwrap().into_string();
    assert!(text.contains(&assignment("uc", "2")));
    assert!(text.contains(&assignment("b", SESSION_ID)));
}

#[test]
fn test_render_includes_configured_currency() {
    let sc = with_session(TagConfig::new("1234567").with_currency("GBP"));
    let mut page = sc.page(InMemoryStateStorage::new());
    page.set_cart_status(CartStatus::Checkout);

    let tag = page.render().unwrap();
    assert!(tag.as_str().contains(&assignment("y", "GBP")));
}

#[test]
fn test_render_omits_currency_when_unset() {
    let sc = with_session(TagConfig::new("1234567").without_currency());
    let mut page = sc.page(InMemoryStateStorage::new());
    page.set_cart_status(CartStatus::Checkout);

    let tag = page.render().unwrap();
    assert!(!tag.as_str().contains("__sc[\"y\"]"));
}

#[test]
fn test_render_exact_output_and_order() {
    let sc = with_session(TagConfig::new("1234567"));
    let mut page = sc.page(InMemoryStateStorage::new());
    page.set_customer_email("harry@hogwart.com");
    page.set_cart_status(CartStatus::Checkout);

    let tag = page.render().unwrap();
    let expected = format!(
        "{SCRIPT_OPEN}\n\
         __sc[\"e\"]=\"harry@hogwart.com\";\n\
         __sc[\"s\"]=\"2\";\n\
         __sc[\"b\"]=\"123456qwe\";\n\
         __sc[\"c\"]=\"1234567\";\n\
         __sc[\"y\"]=\"GBP\";\n\
         {SCRIPT_CLOSE}\n"
    );
    assert_eq!(tag.as_str(), expected);
}

#[test]
fn test_render_twice_gives_identical_output() {
    let sc = with_session(TagConfig::new("1234567").with_cookie_behavior(CookieBehavior::NoCookies));
    let mut page = sc.page(InMemoryStateStorage::new());
    page.set_cart_status(CartStatus::Checkout);

    let first = page.render().unwrap();
    let second = page.render().unwrap();
    assert_eq!(first, second);
    assert_eq!(first.as_str().matches("__sc[\"b\"]").count(), 1);
}

#[test]
fn test_render_uses_renamed_keys() {
    let names = VariableNames {
        client_id: "client".to_string(),
        session_id: "session".to_string(),
        cart_status: "status".to_string(),
        cookie_behavior: "cookies".to_string(),
        ..VariableNames::default()
    };
    let config = TagConfig::new("42")
        .with_variable_names(names)
        .with_cookie_behavior(CookieBehavior::NoCookies);
    let sc = with_session(config);
    let mut page = sc.page(InMemoryStateStorage::new());
    page.set_cart_status(CartStatus::Browsing);

    let tag = page.render().unwrap();
    let text = tag.as_str();
    assert!(text.contains(&assignment("client", "42")));
    assert!(text.contains(&assignment("session", SESSION_ID)));
    assert!(text.contains(&assignment("status", "1")));
    assert!(text.contains(&assignment("cookies", "2")));
    assert!(!text.contains("__sc[\"c\"]"));
}

#[test]
fn test_rendered_values_are_not_escaped_again() {
    let sc = with_session(TagConfig::new("1234567"));
    let mut page = sc.page(InMemoryStateStorage::new());
    page.set_cart_status(CartStatus::Checkout);
    page.set_custom_field_one(["say \"hi\""]);

    let tag = page.render().unwrap();
    assert!(tag.as_str().contains(r#"__sc["cu1"]="say \"hi\"";"#));
}
