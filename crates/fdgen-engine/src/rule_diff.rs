//! Rule diff engine: effective rule sets and minimal add/remove statements.

use fdgen_core::model::SourceNode;
use fdgen_core::output::RuleStatement;
use fdgen_core::rules::{RuleDefaults, RuleKey, RuleSet, default_rules};
use fdgen_core::types::TypeExpr;
use std::collections::BTreeSet;

/// Effective rules of a node plus the keys explicitly removed in its lineage.
///
/// Removed keys stay suppressed so that kind defaults never bring them back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleState {
    pub rules: RuleSet,
    pub suppressed: BTreeSet<RuleKey>,
}

/// Result of [`compute_rules`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDiff {
    pub state: RuleState,
    /// Removes first, then adds; each in canonical key order.
    pub statements: Vec<RuleStatement>,
}

/// Compute a node's effective rules and the statements it must emit.
///
/// `value_type` is the node's effective value type (after template binding or
/// inheritance). `ancestor` is the state of the node it supersedes, `None`
/// for a newly introduced node.
pub fn compute_rules(
    node: &SourceNode,
    value_type: Option<&TypeExpr>,
    ancestor: Option<&RuleState>,
    defaults: &RuleDefaults,
) -> RuleDiff {
    let implied = default_rules(node.kind, value_type, defaults);
    let removed: BTreeSet<RuleKey> = node.removed_rules.iter().copied().collect();

    let Some(ancestor) = ancestor else {
        let mut state = RuleState {
            rules: implied,
            suppressed: removed,
        };
        for (key, value) in &node.rules {
            state.rules.insert(*key, value.clone());
        }
        for key in &state.suppressed {
            state.rules.remove(key);
        }
        let statements = state
            .rules
            .iter()
            .map(|(key, value)| RuleStatement::Add {
                key: *key,
                value: value.clone(),
            })
            .collect();
        return RuleDiff { state, statements };
    };

    let mut state = ancestor.clone();
    let mut statements = Vec::new();

    for key in &removed {
        if state.rules.remove(key).is_some() {
            statements.push(RuleStatement::Remove { key: *key });
        }
        state.suppressed.insert(*key);
    }

    let mut adds = RuleSet::new();
    for (key, value) in &node.rules {
        state.suppressed.remove(key);
        if state.rules.get(key) != Some(value) {
            adds.insert(*key, value.clone());
        }
        state.rules.insert(*key, value.clone());
    }
    for (key, value) in implied {
        if !state.rules.contains_key(&key) && !state.suppressed.contains(&key) {
            adds.insert(key, value.clone());
            state.rules.insert(key, value);
        }
    }

    statements.extend(
        adds.into_iter()
            .map(|(key, value)| RuleStatement::Add { key, value }),
    );
    RuleDiff { state, statements }
}
