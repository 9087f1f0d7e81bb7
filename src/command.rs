use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::limits::MAX_LINE_LEN;
use crate::model::*;
use crate::submission::{Submission, TimeInput, ValidationError};

/// One request line, tagged by `"op"`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    CreateAsset {
        id: Ulid,
        #[serde(default)]
        name: Option<String>,
    },
    DeleteAsset {
        id: Ulid,
    },
    /// Run submission validation without saving.
    Validate(Submission),
    /// Validate and save.
    Submit(Submission),
    /// Raw overlap predicate.
    Check {
        asset_id: Ulid,
        start: TimeInput,
        end: TimeInput,
        #[serde(default)]
        exclude: Option<Ulid>,
    },
    Publish {
        id: Ulid,
    },
    Unpublish {
        id: Ulid,
    },
    Delete {
        id: Ulid,
    },
    List {
        asset_id: Ulid,
    },
    ListAssets,
}

pub fn parse(line: &str) -> Result<Command, String> {
    if line.len() > MAX_LINE_LEN {
        return Err(format!("command exceeds {MAX_LINE_LEN} bytes"));
    }
    serde_json::from_str(line).map_err(|e| format!("invalid command: {e}"))
}

/// One response line.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Response {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Ulid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlap: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflicts: Option<Vec<Reservation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reservations: Option<Vec<Reservation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assets: Option<Vec<AssetInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ValidationError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn ok() -> Self {
        Self {
            ok: true,
            ..Default::default()
        }
    }

    pub fn with_id(id: Ulid) -> Self {
        Self {
            id: Some(id),
            ..Self::ok()
        }
    }

    pub fn invalid(errors: Vec<ValidationError>) -> Self {
        Self {
            errors: Some(errors),
            ..Default::default()
        }
    }

    pub fn failed(error: impl std::fmt::Display) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Default::default()
        }
    }
}
