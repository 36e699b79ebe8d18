// src/suite.rs

//! Suite topology
//!
//! Suites refer to their parent by name only; the name is looked up in the
//! configured suite list when needed.

use serde::{Deserialize, Serialize};

/// Lookup key of a parent suite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentSuiteInfo {
    pub name: String,
}

/// A distribution suite and what it contains
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteInfo {
    pub name: String,
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default)]
    pub architectures: Vec<String>,
    /// Suite this one is layered on top of
    #[serde(default)]
    pub parent: Option<ParentSuiteInfo>,
}

impl SuiteInfo {
    pub fn new(name: impl Into<String>, components: Vec<String>, architectures: Vec<String>) -> Self {
        Self {
            name: name.into(),
            components,
            architectures,
            parent: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(ParentSuiteInfo { name: parent.into() });
        self
    }

    pub fn has_component(&self, component: &str) -> bool {
        self.components.iter().any(|c| c == component)
    }

    /// Architectures without the pseudo-architecture `all`
    pub fn binary_architectures(&self) -> impl Iterator<Item = &String> {
        self.architectures.iter().filter(|a| a.as_str() != "all")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suite_info() {
        let suite = SuiteInfo::new(
            "landing",
            vec!["main".to_string()],
            vec!["amd64".to_string(), "all".to_string()],
        )
        .with_parent("byzantium");

        assert!(suite.has_component("main"));
        assert!(!suite.has_component("contrib"));
        assert_eq!(suite.parent.as_ref().unwrap().name, "byzantium");
        assert_eq!(suite.binary_architectures().count(), 1);
    }

    #[test]
    fn test_deserialize_defaults() {
        let suite: SuiteInfo = toml::from_str("name = \"sid\"").unwrap();
        assert!(suite.components.is_empty());
        assert!(suite.parent.is_none());
    }
}
