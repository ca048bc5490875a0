//! Render stages and tag serialization.
//!
//! Rendering a tag is a short, forward-only process. `RenderContext` owns the
//! current stage and refuses transitions that skip a stage or leave a
//! terminal one.
//!
//! # Stage Flow
//!
//! ```text
//! NotRendered
//!     ↓
//! Validating
//!     ↓
//! Rendering
//!     ↓
//! Rendered
//!
//! (Any non-terminal stage can transition to Failed)
//! ```

use std::fmt;
use thiserror::Error;

use crate::config::TagConfig;
use crate::error::SaleCycleError;
use crate::variables::PageVariables;

/// Opening of the emitted script, up to and including the array initializer
pub const SCRIPT_OPEN: &str = "<script type=\"text/javascript\"> var __sc = new Array();";

/// Loader that fetches the SaleCycle script, plus the closing tag
pub const SCRIPT_CLOSE: &str = "try { var __scS = document.createElement(\"script\"); __scS.type = \"text/javascript\"; __scS.src = \"https://app.salecycle.com/salecycle.js\"; document.getElementsByTagName(\"head\")[0].appendChild(__scS); } catch (e) { } </script>";

/// Stages of a single render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum RenderStage {
    /// Variables are still being collected
    #[default]
    NotRendered = 0,

    /// Mandatory fields are being checked
    Validating = 1,

    /// Variables are being serialized
    Rendering = 2,

    /// Output produced (terminal state)
    Rendered = 3,

    /// Validation failed (terminal state)
    Failed = 255,
}

impl RenderStage {
    #[inline]
    pub const fn order(self) -> u8 {
        self as u8
    }

    /// Returns true if this is a terminal state (Rendered or Failed)
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rendered | Self::Failed)
    }

    /// Returns the next stage in the sequence, or None if at a terminal state
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::NotRendered => Some(Self::Validating),
            Self::Validating => Some(Self::Rendering),
            Self::Rendering => Some(Self::Rendered),
            Self::Rendered | Self::Failed => None,
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::NotRendered => "Not rendered",
            Self::Validating => "Validating",
            Self::Rendering => "Rendering",
            Self::Rendered => "Rendered",
            Self::Failed => "Failed",
        }
    }
}

impl fmt::Display for RenderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur during stage transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderTransitionError {
    #[error("Cannot skip from {from} to {to}")]
    SkippedStage { from: RenderStage, to: RenderStage },

    #[error("Cannot go backwards from {from} to {to}")]
    BackwardTransition { from: RenderStage, to: RenderStage },

    #[error("Cannot transition from terminal stage {from}")]
    FromTerminalStage { from: RenderStage },

    #[error("Already at stage {stage}")]
    AlreadyAtStage { stage: RenderStage },
}

/// Tracks the stage of one render.
///
/// # Example
///
/// ```
/// use salecycle::render::{RenderContext, RenderStage};
///
/// let mut ctx = RenderContext::new();
/// ctx.advance().unwrap();
/// assert_eq!(ctx.current_stage(), RenderStage::Validating);
///
/// // Cannot skip stages
/// assert!(ctx.transition_to(RenderStage::Rendered).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    current: RenderStage,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn current_stage(&self) -> RenderStage {
        self.current
    }

    /// Advance to the next stage in sequence.
    ///
    /// # Errors
    ///
    /// `FromTerminalStage` if already Rendered or Failed.
    pub fn advance(&mut self) -> Result<RenderStage, RenderTransitionError> {
        let Some(next_stage) = self.current.next() else {
            return Err(RenderTransitionError::FromTerminalStage { from: self.current });
        };

        tracing::debug!("Render stage {} -> {}", self.current, next_stage);
        self.current = next_stage;
        Ok(next_stage)
    }

    /// Transition to a specific stage, which must be the next one.
    ///
    /// # Errors
    ///
    /// - `FromTerminalStage` if current is a terminal stage
    /// - `AlreadyAtStage` if target is the current stage
    /// - `BackwardTransition` if target is before current
    /// - `SkippedStage` if target is not the immediate next stage
    pub fn transition_to(
        &mut self,
        target: RenderStage,
    ) -> Result<RenderStage, RenderTransitionError> {
        if self.current.is_terminal() {
            return Err(RenderTransitionError::FromTerminalStage { from: self.current });
        }

        if target == self.current {
            return Err(RenderTransitionError::AlreadyAtStage { stage: target });
        }

        // Failed is reached through fail() only
        if target == RenderStage::Failed || self.current.next() != Some(target) {
            if target.order() < self.current.order() {
                return Err(RenderTransitionError::BackwardTransition {
                    from: self.current,
                    to: target,
                });
            }
            return Err(RenderTransitionError::SkippedStage {
                from: self.current,
                to: target,
            });
        }

        self.advance()
    }

    /// Mark the render as failed.
    ///
    /// # Errors
    ///
    /// `FromTerminalStage` if already Rendered or Failed.
    pub fn fail(&mut self) -> Result<(), RenderTransitionError> {
        if self.current.is_terminal() {
            return Err(RenderTransitionError::FromTerminalStage { from: self.current });
        }

        tracing::debug!("Render failed during stage {}", self.current);
        self.current = RenderStage::Failed;
        Ok(())
    }
}

/// Rendered script tag. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderedTag(String);

impl RenderedTag {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RenderedTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RenderedTag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<RenderedTag> for String {
    fn from(tag: RenderedTag) -> Self {
        tag.0
    }
}

/// Check the fields SaleCycle cannot work without.
///
/// Runs after the configured values have been merged into `variables`.
pub fn check_mandatory_fields(
    config: &TagConfig,
    variables: &PageVariables,
) -> crate::error::Result<()> {
    let names = &config.variable_names;

    if config.client_id.is_none() {
        return Err(SaleCycleError::configuration("ClientId required"));
    }

    if !variables.contains_key(&names.cart_status) {
        return Err(SaleCycleError::configuration("cart status required"));
    }

    if config.cookie_behavior.requires_session_id() && !variables.contains_key(&names.session_id) {
        return Err(SaleCycleError::configuration("session id required"));
    }

    Ok(())
}

/// One `__sc["key"]="value";` assignment. Neither part is escaped here.
pub fn assignment(key: &str, value: &str) -> String {
    format!("__sc[\"{key}\"]=\"{value}\";")
}

/// Serialize variables into the script, one assignment per line in
/// insertion order. Every line, the last included, ends with `\n`.
pub fn serialize(variables: &PageVariables) -> RenderedTag {
    let capacity = SCRIPT_OPEN.len() + SCRIPT_CLOSE.len() + 32 * variables.len();
    let mut script = String::with_capacity(capacity);
    script.push_str(SCRIPT_OPEN);
    script.push('\n');
    for (key, value) in variables.iter() {
        script.push_str(&assignment(key, value));
        script.push('\n');
    }
    script.push_str(SCRIPT_CLOSE);
    script.push('\n');
    RenderedTag(script)
}
