use serde::{Deserialize, Serialize};
use thiserror::Error;

mod tree;
pub use tree::*;
mod order;
pub use order::*;
mod commands;
pub use commands::*;
mod snapshot;

/// Reserved key holding a container's button list in the wire mapping.
pub const BUTTONS_KEY: &str = "(buttons)";
/// Reserved key holding a container's explicit child order in the wire mapping.
pub const SORT_ORDER_KEY: &str = "_sort_order";

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("duplicate name: {0}")]
    DuplicateKey(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid move target: {0}")]
    InvalidMoveTarget(String),
    #[error("validation failed: {0}")]
    ValidationFailure(String),
}

pub type Result<T> = std::result::Result<T, TreeError>;

/// A paste template: a label unique within its container, and the text it
/// expands to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonItem {
    pub label: String,
    pub text: String,
}

impl ButtonItem {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }
}

pub(crate) fn display_path(path: &[String]) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.join("/")
    }
}
