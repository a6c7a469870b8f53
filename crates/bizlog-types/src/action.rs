//! Business actions.

use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Codes of the built-in actions.
pub mod codes {
    pub const LOGIN: &str = "LOGIN";
    pub const CREATE: &str = "CREATE";
    pub const UPDATE: &str = "UPDATE";
    pub const DELETE: &str = "DELETE";
    pub const QUERY: &str = "QUERY";
    pub const EXPORT: &str = "EXPORT";
    pub const IMPORT: &str = "IMPORT";
    pub const OTHER: &str = "OTHER";
}

/// A named category of audited business operation.
///
/// Two actions are equal when both code and description match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    code: String,
    description: String,
}

impl Action {
    /// Create a new action.
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
        }
    }

    /// Short unique code, e.g. `DELETE`.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Human-readable description, e.g. `删除`.
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.code, self.description)
    }
}

impl From<StdAction> for Action {
    fn from(action: StdAction) -> Self {
        Action::new(action.code(), action.description())
    }
}

/// Actions seeded into the registry before first use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum StdAction {
    Login,
    Create,
    Update,
    Delete,
    Query,
    Export,
    Import,
    Other,
}

impl StdAction {
    /// Registry code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Login => codes::LOGIN,
            Self::Create => codes::CREATE,
            Self::Update => codes::UPDATE,
            Self::Delete => codes::DELETE,
            Self::Query => codes::QUERY,
            Self::Export => codes::EXPORT,
            Self::Import => codes::IMPORT,
            Self::Other => codes::OTHER,
        }
    }

    /// Default description.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Login => "登录",
            Self::Create => "创建",
            Self::Update => "更新",
            Self::Delete => "删除",
            Self::Query => "查询",
            Self::Export => "导出",
            Self::Import => "导入",
            Self::Other => "其他",
        }
    }

    /// All built-in actions in declaration order.
    pub fn all() -> impl Iterator<Item = StdAction> {
        Self::iter()
    }
}
