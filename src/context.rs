// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Layered variable scopes for template evaluation
//!
//! A scope never changes after construction. Extending it creates a child
//! layer that points at its parent through an `Arc`, so sibling sections
//! never observe each other's loop variables.
//!
//! # Variable Resolution Order
//!
//! 1. **Loop variables**: bound by the innermost section
//! 2. **Call parameters**: passed to a single `evaluate` call
//! 3. **Static parameters**: configured when the engine was built

use rustc_hash::FxHashMap;
use serde_json::Value;
use std::sync::Arc;

/// Immutable variable scope with an optional parent layer
#[derive(Clone, Debug, Default)]
pub struct VariableScope {
    variables: FxHashMap<String, Value>,
    parent: Option<Arc<VariableScope>>,
}

impl VariableScope {
    /// Create a root scope from the given bindings
    pub fn root<I>(bindings: I) -> Arc<Self>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        Arc::new(Self {
            variables: bindings.into_iter().collect(),
            parent: None,
        })
    }

    /// Create a child layer whose bindings override the parent's
    pub fn child<I>(parent: &Arc<Self>, bindings: I) -> Arc<Self>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        Arc::new(Self {
            variables: bindings.into_iter().collect(),
            parent: Some(Arc::clone(parent)),
        })
    }

    /// Create a child layer with a single binding
    pub fn with_variable(parent: &Arc<Self>, name: impl Into<String>, value: Value) -> Arc<Self> {
        Self::child(parent, [(name.into(), value)])
    }

    /// Look a variable up, innermost layer first
    pub fn get(&self, name: &str) -> Option<&Value> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(value) = current.variables.get(name) {
                return Some(value);
            }
            scope = current.parent.as_deref();
        }
        None
    }

    /// Check if a variable is visible from this scope
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of layers, including this one
    pub fn depth(&self) -> usize {
        1 + self.parent.as_ref().map_or(0, |p| p.depth())
    }

    /// All visible variable names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        let mut scope = Some(self);
        while let Some(current) = scope {
            names.extend(current.variables.keys().map(String::as_str));
            scope = current.parent.as_deref();
        }
        names.sort_unstable();
        names.dedup();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_child_overrides_parent() {
        let root = VariableScope::root([
            ("system".to_string(), json!("http://loinc.org")),
            ("source".to_string(), json!("lab")),
        ]);
        let child = VariableScope::with_variable(&root, "source", json!("ward"));

        assert_eq!(child.get("source"), Some(&json!("ward")));
        assert_eq!(child.get("system"), Some(&json!("http://loinc.org")));
        assert_eq!(root.get("source"), Some(&json!("lab")));
        assert_eq!(child.depth(), 2);
    }

    #[test]
    fn test_siblings_are_isolated() {
        let root = VariableScope::root(Vec::<(String, Value)>::new());
        let left = VariableScope::with_variable(&root, "m", json!(1));
        let right = VariableScope::with_variable(&root, "n", json!(2));

        assert!(left.contains("m"));
        assert!(!left.contains("n"));
        assert!(!right.contains("m"));
        assert!(!root.contains("m"));
    }

    #[test]
    fn test_names_are_deduplicated() {
        let root = VariableScope::root([("a".to_string(), json!(1))]);
        let child = VariableScope::child(
            &root,
            [("a".to_string(), json!(2)), ("b".to_string(), json!(3))],
        );
        assert_eq!(child.names(), vec!["a", "b"]);
    }
}
