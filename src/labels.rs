//! Label indexing — runs once, before execution.
//!
//! Finds every `NAME:` prefix, records which statement it names, and hands
//! back a label-free copy of the program so the executor always sees the
//! statement keyword first.

use std::collections::HashMap;

use tracing::{trace, warn};

use crate::statement::Statement;

/// Label name → index of the statement it marks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelTable {
    labels: HashMap<String, usize>,
}

impl LabelTable {
    pub fn get(&self, name: &str) -> Option<usize> {
        self.labels.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Build the label table and the label-stripped statement sequence.
///
/// Statement positions never shift, since stripping a label does not remove
/// the statement. When a label is defined twice, the later definition wins.
pub fn index(statements: &[Statement]) -> (Vec<Statement>, LabelTable) {
    let mut table = LabelTable::default();
    let mut stripped = Vec::with_capacity(statements.len());

    for (idx, statement) in statements.iter().enumerate() {
        if let Some(name) = statement.label() {
            trace!(label = name, index = idx, "label defined");
            if let Some(previous) = table.labels.insert(name.to_string(), idx) {
                warn!(
                    label = name,
                    previous,
                    index = idx,
                    "label defined more than once; using the later definition"
                );
            }
            stripped.push(statement.without_label());
        } else {
            stripped.push(statement.clone());
        }
    }

    (stripped, table)
}
