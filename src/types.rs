//! Type-safe wire enums for the SaleCycle tag
//!
//! Cookie behavior and cart status travel to the browser as small integers.
//! These enums keep the codes in one place and give the configuration file
//! readable names for them.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// How the SaleCycle script handles cookies and sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum CookieBehavior {
    /// Cookies are enabled and this server must supply a session id
    #[default]
    #[strum(serialize = "cookies_require_session_id")]
    CookiesRequireSessionId = 0,
    /// SaleCycle manages the session itself; no session id needed
    #[strum(serialize = "self_managed_session")]
    SelfManagedSession = 1,
    /// SaleCycle stores no cookies on the visitor's machine
    #[strum(serialize = "no_cookies")]
    NoCookies = 2,
}

impl CookieBehavior {
    /// Numeric code emitted in the tag
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Whether render must find a session id in the page variables
    #[inline]
    pub const fn requires_session_id(self) -> bool {
        matches!(self, Self::CookiesRequireSessionId)
    }
}

/// State of the visitor's cart on the current page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[repr(u8)]
pub enum CartStatus {
    /// No cart exists for this visitor
    #[default]
    NoCart = 0,
    /// Visitor is browsing with items in the cart
    Browsing = 1,
    /// Visitor is in the checkout flow
    Checkout = 2,
    /// Order was placed on this page
    Purchased = 3,
}

impl CartStatus {
    /// Numeric code emitted in the tag
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }
}
