// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Label selectors evaluated against cached objects.
//!
//! Supports the equality-based subset of the Kubernetes selector syntax,
//! terms joined by commas (AND):
//! - `app=web`, `app==web`
//! - `tier!=frontend` (also matches objects without the label)
//! - `canary` (label exists)
//! - `!canary` (label absent)

use std::collections::BTreeMap;

use super::error::CacheError;

/// Label selector operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelOperator {
    Equals,
    NotEquals,
    Exists,
    DoesNotExist,
}

/// One term of a label selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRequirement {
    pub key: String,
    pub operator: LabelOperator,
    /// Empty for `Exists` and `DoesNotExist`
    pub value: String,
}

impl LabelRequirement {
    fn matches(&self, labels: Option<&BTreeMap<String, String>>) -> bool {
        let actual = labels.and_then(|l| l.get(&self.key));
        match self.operator {
            LabelOperator::Equals => actual == Some(&self.value),
            LabelOperator::NotEquals => actual != Some(&self.value),
            LabelOperator::Exists => actual.is_some(),
            LabelOperator::DoesNotExist => actual.is_none(),
        }
    }
}

/// Parsed label selector; an empty selector matches everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    requirements: Vec<LabelRequirement>,
}

impl LabelSelector {
    pub fn parse(selector: &str) -> Result<Self, CacheError> {
        let invalid = |reason: &str| CacheError::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.to_string(),
        };

        let mut requirements = Vec::new();
        for term in selector.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let (key, operator, value) = if let Some((k, v)) = term.split_once("!=") {
                (k, LabelOperator::NotEquals, v)
            } else if let Some((k, v)) = term.split_once("==") {
                (k, LabelOperator::Equals, v)
            } else if let Some((k, v)) = term.split_once('=') {
                (k, LabelOperator::Equals, v)
            } else if let Some(k) = term.strip_prefix('!') {
                (k, LabelOperator::DoesNotExist, "")
            } else {
                (term, LabelOperator::Exists, "")
            };

            let key = key.trim();
            let value = value.trim();
            if key.is_empty() {
                return Err(invalid("empty label key"));
            }
            if key.contains(char::is_whitespace) || value.contains(char::is_whitespace) {
                return Err(invalid("unsupported set-based expression"));
            }
            requirements.push(LabelRequirement {
                key: key.to_string(),
                operator,
                value: value.to_string(),
            });
        }

        Ok(Self { requirements })
    }

    pub fn requirements(&self) -> &[LabelRequirement] {
        &self.requirements
    }

    pub fn matches(&self, labels: Option<&BTreeMap<String, String>>) -> bool {
        self.requirements.iter().all(|r| r.matches(labels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_operators() {
        let selector = LabelSelector::parse("app=web, tier!=db,env==prod,canary,!legacy").unwrap();
        let ops: Vec<_> = selector.requirements().iter().map(|r| r.operator).collect();
        assert_eq!(
            ops,
            vec![
                LabelOperator::Equals,
                LabelOperator::NotEquals,
                LabelOperator::Equals,
                LabelOperator::Exists,
                LabelOperator::DoesNotExist,
            ]
        );
        assert_eq!(selector.requirements()[2].value, "prod");
    }

    #[test]
    fn test_empty_selector_matches_all() {
        let selector = LabelSelector::parse("").unwrap();
        assert!(selector.matches(None));
        assert!(selector.matches(Some(&labels(&[("a", "b")]))));
    }

    #[test]
    fn test_matching() {
        let selector = LabelSelector::parse("app=web,tier!=db").unwrap();
        assert!(selector.matches(Some(&labels(&[("app", "web")]))));
        assert!(selector.matches(Some(&labels(&[("app", "web"), ("tier", "api")]))));
        assert!(!selector.matches(Some(&labels(&[("app", "web"), ("tier", "db")]))));
        assert!(!selector.matches(None));
    }

    #[test]
    fn test_existence() {
        let selector = LabelSelector::parse("canary,!legacy").unwrap();
        assert!(selector.matches(Some(&labels(&[("canary", "")]))));
        assert!(!selector.matches(Some(&labels(&[("canary", "1"), ("legacy", "1")]))));
        assert!(!selector.matches(None));
    }

    #[test]
    fn test_invalid() {
        assert!(LabelSelector::parse("=web").is_err());
        assert!(LabelSelector::parse("env in (prod, dev)").is_err());
    }
}
