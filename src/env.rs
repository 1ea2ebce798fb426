//! Grin variable environment.
//!
//! One flat, case-sensitive namespace for the whole run. There is no
//! scoping: a GOSUB body sees and changes the caller's variables.

use std::collections::HashMap;

use crate::value::Value;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Environment {
    vars: HashMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Bind `name`, replacing any earlier value.
    pub fn set(&mut self, name: &str, value: Value) {
        self.vars.insert(name.to_string(), value);
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// All bindings, ordered by name.
    pub fn sorted(&self) -> Vec<(&str, &Value)> {
        let mut entries: Vec<(&str, &Value)> =
            self.vars.iter().map(|(k, v)| (k.as_str(), v)).collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

impl<S: Into<String>> FromIterator<(S, Value)> for Environment {
    fn from_iter<I: IntoIterator<Item = (S, Value)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
