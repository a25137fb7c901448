use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Name-only identity of a merged test callable.
///
/// Equality, ordering, and hashing cover only the `(class_name, name)` pair.
/// The optional `source` snapshot and `file_path` are carried for diagnostics
/// and reporting; two identities with different bodies still deduplicate to a
/// single entry in a merged-callable set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallableIdentity {
    pub class_name: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
}

impl CallableIdentity {
    pub fn function(name: impl Into<String>) -> Self {
        Self {
            class_name: None,
            name: name.into(),
            source: None,
            file_path: None,
        }
    }

    pub fn method(class_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            class_name: Some(class_name.into()),
            name: name.into(),
            source: None,
            file_path: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn qualified_name(&self) -> String {
        match &self.class_name {
            Some(class_name) => format!("{class_name}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

impl PartialEq for CallableIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.class_name == other.class_name && self.name == other.name
    }
}

impl Eq for CallableIdentity {}

impl Hash for CallableIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.class_name.hash(state);
        self.name.hash(state);
    }
}

impl PartialOrd for CallableIdentity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CallableIdentity {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.class_name, &self.name).cmp(&(&other.class_name, &other.name))
    }
}

impl fmt::Display for CallableIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.class_name {
            Some(class_name) => write!(f, "{class_name}.{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}
