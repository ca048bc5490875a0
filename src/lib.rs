//! SaleCycle Tag Library
//!
//! Collects per-request page variables (customer, cart, currency, session)
//! and renders them as the inline script tag that loads SaleCycle.

pub mod cli;
pub mod config;
pub mod encoding;
pub mod error;
pub mod render;
pub mod snapshot;
pub mod state;
pub mod tag;
pub mod types;
pub mod variables;

// Re-export main types for convenience
pub use config::{TagConfig, VariableNames, DEFAULT_CURRENCY};
pub use error::{Result, SaleCycleError};
pub use render::{RenderContext, RenderStage, RenderTransitionError, RenderedTag};
pub use snapshot::{render_preview, Customer, PageSnapshot};
pub use state::{
    InMemoryStateStorage, RequestStateStorage, StateStorage, StateStorageExt, STATE_KEY,
};
pub use tag::{CartItem, PageTag, SaleCycle, SessionResolver};
pub use types::{CartStatus, CookieBehavior};
pub use variables::PageVariables;
