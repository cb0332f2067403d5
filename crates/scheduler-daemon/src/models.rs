use serde::{Deserialize, Serialize};

use scheduler_core::{FunctionDef, InvocationMethod};

/// Body of `POST /api/event`.
#[derive(Debug, Deserialize)]
pub struct EventBody {
    pub name: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Body of `POST /api/function`.
#[derive(Debug, Deserialize)]
pub struct FunctionBody {
    pub name: String,
    pub subs: Vec<String>,
    pub url: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub mock: bool,
}

impl FunctionBody {
    pub fn into_def(self) -> Result<FunctionDef, String> {
        let method = match self.method {
            Some(raw) => {
                InvocationMethod::parse(&raw).ok_or_else(|| format!("unsupported method {raw:?}"))?
            }
            None => InvocationMethod::default(),
        };
        Ok(FunctionDef {
            name: self.name,
            subs: self.subs,
            url: self.url,
            method,
            mock: self.mock,
        })
    }
}

/// Body of `DELETE /api/function`.
#[derive(Debug, Deserialize)]
pub struct DeleteFunctionBody {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct HealthBody {
    pub status: &'static str,
}
