use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// HTTP method a function wishes to be invoked with. Kept as a small enum
/// rather than `http::Method` so the checkpoint format stays independent of
/// the HTTP crate version in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InvocationMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Default for InvocationMethod {
    fn default() -> Self {
        InvocationMethod::Get
    }
}

impl InvocationMethod {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

/// One event's contribution to an invocation's argument map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArgumentValue {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub data: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

/// A fully assembled, ready-to-send call to a registered function, produced
/// by [`crate::function::FunctionState::consume_ready`] and handed to the
/// dispatch queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invocation {
    pub function_name: String,
    pub url: String,
    pub method: InvocationMethod,
    pub mock: bool,
    pub arguments: BTreeMap<String, ArgumentValue>,
}
