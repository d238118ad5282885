//! Read contract for the hierarchical location directory (State → District →
//! Taluka → Village) served by the backend's REST interface.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use url::Url;

use crate::locale::Language;

const REST_PREFIX: &str = "rest/v1/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    State,
    District,
    Taluka,
    Village,
}

impl Level {
    /// 1-based step number shown to the user.
    pub const fn step(self) -> u8 {
        match self {
            Self::State => 1,
            Self::District => 2,
            Self::Taluka => 3,
            Self::Village => 4,
        }
    }

    pub const fn next(self) -> Option<Self> {
        match self {
            Self::State => Some(Self::District),
            Self::District => Some(Self::Taluka),
            Self::Taluka => Some(Self::Village),
            Self::Village => None,
        }
    }

    pub const fn table(self) -> &'static str {
        match self {
            Self::State => "states",
            Self::District => "districts",
            Self::Taluka => "talukas",
            Self::Village => "villages",
        }
    }

    /// Foreign-key column pointing at the parent level.
    pub const fn parent_column(self) -> Option<&'static str> {
        match self {
            Self::State => None,
            Self::District => Some("state_id"),
            Self::Taluka => Some("district_id"),
            Self::Village => Some("taluka_id"),
        }
    }
}

/// Opaque directory identifier. The backend uses integers but nothing here
/// relies on that.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for NodeId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationNode {
    pub id: NodeId,
    pub name: String,
    #[serde(default)]
    pub localized: BTreeMap<Language, String>,
}

impl LocationNode {
    pub fn new(id: impl Into<NodeId>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), localized: BTreeMap::new() }
    }

    pub fn with_localized(mut self, language: Language, name: impl Into<String>) -> Self {
        self.localized.insert(language, name.into());
        self
    }

    /// Localized name for `language`, else the canonical name.
    pub fn display_name(&self, language: Language) -> &str {
        self.localized.get(&language).map_or(self.name.as_str(), String::as_str)
    }

    /// Case-insensitive substring match on canonical and localized names.
    pub fn matches(&self, needle_lower: &str, language: Language) -> bool {
        needle_lower.is_empty()
            || self.name.to_lowercase().contains(needle_lower)
            || self.display_name(language).to_lowercase().contains(needle_lower)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Identifies one directory request so late responses can be recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchTicket {
    pub level: Level,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryQuery {
    pub level: Level,
    pub parent: Option<NodeId>,
    pub ticket: FetchTicket,
}

impl DirectoryQuery {
    /// PostgREST request for this level, filtered by parent and sorted by
    /// canonical name.
    pub fn url(&self, base: &Url) -> Result<Url, DirectoryError> {
        let mut url = base
            .join(REST_PREFIX)
            .and_then(|u| u.join(self.level.table()))
            .map_err(|e| DirectoryError::InvalidRequest(e.to_string()))?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", "*");
            match (self.level.parent_column(), &self.parent) {
                (None, _) => {}
                (Some(column), Some(parent)) => {
                    pairs.append_pair(column, &format!("eq.{parent}"));
                }
                (Some(column), None) => {
                    return Err(DirectoryError::InvalidRequest(format!(
                        "{} query requires {column}",
                        self.level.table()
                    )));
                }
            }
            pairs.append_pair("order", "name.asc");
        }
        Ok(url)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectoryError {
    #[error("directory not configured")]
    NotConfigured,

    #[error("invalid directory request: {0}")]
    InvalidRequest(String),

    #[error("directory returned status {status}")]
    Status { status: u16 },

    #[error("directory unreachable: {0}")]
    Transport(String),

    #[error("directory response empty")]
    EmptyBody,

    #[error("malformed directory response: {0}")]
    Decode(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Int(i64),
    Text(String),
}

#[derive(Deserialize)]
struct RawNode {
    id: RawId,
    name: String,
    #[serde(flatten)]
    columns: BTreeMap<String, serde_json::Value>,
}

impl From<RawNode> for LocationNode {
    fn from(raw: RawNode) -> Self {
        let id = match raw.id {
            RawId::Int(n) => NodeId::from(n),
            RawId::Text(s) => NodeId(s),
        };
        let localized = raw
            .columns
            .into_iter()
            .filter_map(|(column, value)| {
                let language = Language::from_code(column.strip_prefix("name_")?)?;
                match value {
                    serde_json::Value::String(name) if !name.trim().is_empty() => {
                        Some((language, name))
                    }
                    _ => None,
                }
            })
            .collect();
        Self { id, name: raw.name, localized }
    }
}

/// Decodes a JSON array of directory rows, keeping the service's order.
pub fn parse_nodes(body: &[u8]) -> Result<Vec<LocationNode>, DirectoryError> {
    let rows: Vec<RawNode> =
        serde_json::from_slice(body).map_err(|e| DirectoryError::Decode(e.to_string()))?;
    Ok(rows.into_iter().map(LocationNode::from).collect())
}
