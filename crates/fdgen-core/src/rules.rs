//! Validation rule table: rule keys, literal values and per-kind defaults.

use crate::model::NodeKind;
use crate::types::TypeExpr;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A named validation rule.
///
/// The declaration order of the variants is the canonical order used for
/// emitted rule statements.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleKey {
    Mandatory,
    MinLength,
    MaxLength,
    MinValue,
    MaxValue,
    CodeType,
    LookupCall,
    MasterValueField,
    MasterValueRequired,
    ZeroNullEquality,
    Regex,
}

/// Shape of the literal a rule key accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleValueKind {
    Bool,
    Integer,
    Text,
    /// A class literal such as a code type or lookup call.
    TypeLiteral,
    /// A reference to another field of the same form.
    FieldRef,
}

impl RuleKey {
    pub const ALL: [RuleKey; 11] = [
        Self::Mandatory,
        Self::MinLength,
        Self::MaxLength,
        Self::MinValue,
        Self::MaxValue,
        Self::CodeType,
        Self::LookupCall,
        Self::MasterValueField,
        Self::MasterValueRequired,
        Self::ZeroNullEquality,
        Self::Regex,
    ];

    /// Wire name as written in model files and generated code.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Mandatory => "MANDATORY",
            Self::MinLength => "MIN_LENGTH",
            Self::MaxLength => "MAX_LENGTH",
            Self::MinValue => "MIN_VALUE",
            Self::MaxValue => "MAX_VALUE",
            Self::CodeType => "CODE_TYPE",
            Self::LookupCall => "LOOKUP_CALL",
            Self::MasterValueField => "MASTER_VALUE_FIELD",
            Self::MasterValueRequired => "MASTER_VALUE_REQUIRED",
            Self::ZeroNullEquality => "ZERO_NULL_EQUALITY",
            Self::Regex => "REGEX",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.wire_name() == name)
    }

    pub fn value_kind(self) -> RuleValueKind {
        match self {
            Self::Mandatory | Self::MasterValueRequired | Self::ZeroNullEquality => {
                RuleValueKind::Bool
            }
            Self::MinLength | Self::MaxLength | Self::MinValue | Self::MaxValue => {
                RuleValueKind::Integer
            }
            Self::CodeType | Self::LookupCall => RuleValueKind::TypeLiteral,
            Self::MasterValueField => RuleValueKind::FieldRef,
            Self::Regex => RuleValueKind::Text,
        }
    }

    /// Check that `value` has the shape this key expects.
    pub fn accepts(self, value: &RuleValue) -> bool {
        match (self.value_kind(), value) {
            (RuleValueKind::Bool, RuleValue::Bool(_))
            | (RuleValueKind::Integer, RuleValue::Integer(_)) => true,
            (
                RuleValueKind::Text | RuleValueKind::TypeLiteral | RuleValueKind::FieldRef,
                RuleValue::Text(_),
            ) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// A rule literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    Bool(bool),
    Integer(i64),
    Text(String),
}

impl fmt::Display for RuleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Effective rule set in canonical key order.
pub type RuleSet = BTreeMap<RuleKey, RuleValue>;

/// Tunables for the default-producing functions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleDefaults {
    /// Implicit `MAX_LENGTH` of string value fields.
    pub string_max_length: i64,
}

impl Default for RuleDefaults {
    fn default() -> Self {
        Self {
            string_max_length: 4000,
        }
    }
}

/// Rules a node of `kind` carrying `value_type` contributes without declaring them.
///
/// Only value fields have defaults. They have the lowest priority: any explicit
/// declaration or removal anywhere in the node's lineage wins.
pub fn default_rules(kind: NodeKind, value_type: Option<&TypeExpr>, defaults: &RuleDefaults) -> RuleSet {
    let mut rules = RuleSet::new();
    if kind != NodeKind::ValueField {
        return rules;
    }
    let Some(head) = value_type.and_then(|t| match t {
        TypeExpr::Named { name, args } if args.is_empty() => Some(name.as_str()),
        _ => None,
    }) else {
        return rules;
    };
    match simple_type_name(head) {
        "String" => {
            rules.insert(
                RuleKey::MaxLength,
                RuleValue::Integer(defaults.string_max_length),
            );
        }
        "Integer" | "int" => {
            rules.insert(RuleKey::MinValue, RuleValue::Integer(i64::from(i32::MIN)));
            rules.insert(RuleKey::MaxValue, RuleValue::Integer(i64::from(i32::MAX)));
        }
        "Long" | "long" => {
            rules.insert(RuleKey::MinValue, RuleValue::Integer(i64::MIN));
            rules.insert(RuleKey::MaxValue, RuleValue::Integer(i64::MAX));
        }
        _ => {}
    }
    rules
}

/// Strip a package qualifier: `java.lang.Integer` → `Integer`.
fn simple_type_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_order_follows_declaration() {
        let mut sorted = RuleKey::ALL.to_vec();
        sorted.sort();
        assert_eq!(sorted, RuleKey::ALL.to_vec());
        assert!(RuleKey::Mandatory < RuleKey::MaxLength);
    }

    #[test]
    fn test_wire_names_roundtrip() {
        for key in RuleKey::ALL {
            assert_eq!(RuleKey::from_wire_name(key.wire_name()), Some(key));
            let json = serde_json::to_string(&key).unwrap();
            assert_eq!(json, format!("\"{}\"", key.wire_name()));
        }
        assert_eq!(RuleKey::from_wire_name("NOPE"), None);
    }

    #[test]
    fn test_accepts_checks_value_shape() {
        assert!(RuleKey::Mandatory.accepts(&RuleValue::Bool(true)));
        assert!(!RuleKey::Mandatory.accepts(&RuleValue::Integer(1)));
        assert!(RuleKey::MaxLength.accepts(&RuleValue::Integer(60)));
        assert!(RuleKey::CodeType.accepts(&RuleValue::Text("CountryCodeType".into())));
        assert!(!RuleKey::Regex.accepts(&RuleValue::Bool(false)));
    }

    #[test]
    fn test_default_rules_by_value_type() {
        let defaults = RuleDefaults::default();
        let string = default_rules(
            NodeKind::ValueField,
            Some(&TypeExpr::named("String")),
            &defaults,
        );
        assert_eq!(string.get(&RuleKey::MaxLength), Some(&RuleValue::Integer(4000)));

        let integer = default_rules(
            NodeKind::ValueField,
            Some(&TypeExpr::named("java.lang.Integer")),
            &defaults,
        );
        assert_eq!(
            integer.get(&RuleKey::MinValue),
            Some(&RuleValue::Integer(-2_147_483_648))
        );
        assert_eq!(
            integer.get(&RuleKey::MaxValue),
            Some(&RuleValue::Integer(2_147_483_647))
        );

        assert!(default_rules(NodeKind::ValueField, Some(&TypeExpr::named("Date")), &defaults).is_empty());
        assert!(default_rules(NodeKind::ValueField, Some(&TypeExpr::named("T")), &defaults).is_empty());
        assert!(default_rules(NodeKind::Box, Some(&TypeExpr::named("String")), &defaults).is_empty());
    }

    #[test]
    fn test_rule_value_untagged_serde() {
        let v: RuleValue = serde_json::from_str("true").unwrap();
        assert_eq!(v, RuleValue::Bool(true));
        let v: RuleValue = serde_json::from_str("60").unwrap();
        assert_eq!(v, RuleValue::Integer(60));
        let v: RuleValue = serde_json::from_str("\"^[a-z]+$\"").unwrap();
        assert_eq!(v, RuleValue::Text("^[a-z]+$".into()));
    }
}
