//! Output model: the synthesized data-holder tree handed to renderers.

use crate::model::OpaqueTypeHandle;
use crate::rules::{RuleKey, RuleSet, RuleValue};
use crate::types::TypeExpr;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Well-known generic bases of generated data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaseType {
    AbstractFormData,
    AbstractFormFieldData,
    AbstractValueFieldData,
    AbstractTableFieldBeanData,
    AbstractTableRowData,
    AbstractPropertyData,
}

impl BaseType {
    pub fn name(self) -> &'static str {
        match self {
            Self::AbstractFormData => "AbstractFormData",
            Self::AbstractFormFieldData => "AbstractFormFieldData",
            Self::AbstractValueFieldData => "AbstractValueFieldData",
            Self::AbstractTableFieldBeanData => "AbstractTableFieldBeanData",
            Self::AbstractTableRowData => "AbstractTableRowData",
            Self::AbstractPropertyData => "AbstractPropertyData",
        }
    }
}

/// The type a generated node extends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SuperType {
    /// A well-known base, e.g. `AbstractValueFieldData<String>`.
    Base {
        base: BaseType,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<TypeExpr>,
    },
    /// Another generated node, addressed by its qualified path.
    Generated {
        path: Vec<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<TypeExpr>,
    },
    /// A type generated outside this engine (`USE` extension sites).
    External {
        reference: String,
        handle: OpaqueTypeHandle,
    },
}

impl SuperType {
    pub fn base(base: BaseType) -> Self {
        Self::Base {
            base,
            args: Vec::new(),
        }
    }

    pub fn base_of(base: BaseType, arg: TypeExpr) -> Self {
        Self::Base {
            base,
            args: vec![arg],
        }
    }

    pub fn generated(path: Vec<String>) -> Self {
        Self::Generated {
            path,
            args: Vec::new(),
        }
    }

    /// Path of the generated node this extends, if any.
    pub fn generated_path(&self) -> Option<&[String]> {
        match self {
            Self::Generated { path, .. } => Some(path),
            _ => None,
        }
    }

    pub fn args(&self) -> &[TypeExpr] {
        match self {
            Self::Base { args, .. } | Self::Generated { args, .. } => args,
            Self::External { .. } => &[],
        }
    }
}

impl fmt::Display for SuperType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (head, args) = match self {
            Self::Base { base, args } => (base.name().to_string(), args.as_slice()),
            Self::Generated { path, args } => (path.join("."), args.as_slice()),
            Self::External { handle, .. } => (handle.qualified_name.clone(), &[][..]),
        };
        write!(f, "{}", TypeExpr::generic(head, args.to_vec()))
    }
}

/// Role of a generated node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    FormData,
    FieldData,
    TableData,
    RowData,
    PropertyData,
}

/// One statement of a rule-initialization member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RuleStatement {
    Add { key: RuleKey, value: RuleValue },
    Remove { key: RuleKey },
}

impl RuleStatement {
    pub fn key(&self) -> RuleKey {
        match self {
            Self::Add { key, .. } | Self::Remove { key } => *key,
        }
    }
}

/// What a generated member does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    /// Returns a nested field data holder.
    FieldAccessor,
    /// Returns a nested property data holder.
    PropertyAccessor,
    /// Flattened getter reading through a property holder.
    LegacyGetter,
    /// Flattened setter writing through a property holder.
    LegacySetter,
    ValueGetter,
    ValueSetter,
    AddRow,
    CreateRow,
    GetRows,
    SetRows,
    GetRowType,
    RowAt,
    ColumnGetter,
    ColumnSetter,
    /// Applies the node's rule statements on top of the inherited rule map.
    InitValidationRules,
}

/// A method parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: TypeExpr,
}

/// A generated member declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    pub kind: MemberKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Param>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<TypeExpr>,
}

impl Member {
    pub fn getter(name: impl Into<String>, kind: MemberKind, returns: TypeExpr) -> Self {
        Self {
            name: name.into(),
            kind,
            params: Vec::new(),
            returns: Some(returns),
        }
    }

    pub fn setter(
        name: impl Into<String>,
        kind: MemberKind,
        param: impl Into<String>,
        ty: TypeExpr,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            params: vec![Param {
                name: param.into(),
                ty,
            }],
            returns: None,
        }
    }
}

/// One generated data-holder type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputNode {
    pub name: String,
    /// Qualified path from the top-level generated type, including `name`.
    pub path: Vec<String>,
    pub kind: OutputKind,
    pub super_type: SuperType,
    /// Unbound type parameters; non-empty only for templates.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_params: Vec<String>,
    #[serde(default, skip_serializing_if = "RuleSet::is_empty")]
    pub effective_rules: RuleSet,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rule_statements: Vec<RuleStatement>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<Member>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<OutputNode>,
}

impl OutputNode {
    pub fn new(path: Vec<String>, kind: OutputKind, super_type: SuperType) -> Self {
        Self {
            name: path.last().cloned().unwrap_or_default(),
            path,
            kind,
            super_type,
            type_params: Vec::new(),
            effective_rules: RuleSet::new(),
            rule_statements: Vec::new(),
            members: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn qualified_name(&self) -> String {
        self.path.join(".")
    }

    /// The type expression other members use to refer to this node.
    pub fn type_ref(&self) -> TypeExpr {
        TypeExpr::generic(
            self.name.clone(),
            self.type_params.iter().map(TypeExpr::named).collect(),
        )
    }

    pub fn child(&self, name: &str) -> Option<&OutputNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Follow a chain of child names below this node.
    pub fn at(&self, names: &[&str]) -> Option<&OutputNode> {
        names.iter().try_fold(self, |node, name| node.child(name))
    }

    /// Depth-first search by name, including this node.
    pub fn descendant(&self, name: &str) -> Option<&OutputNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.descendant(name))
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn has_rule_initializer(&self) -> bool {
        self.members
            .iter()
            .any(|m| m.kind == MemberKind::InitValidationRules)
    }

    /// Number of nodes in this subtree.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(OutputNode::node_count).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> OutputNode {
        let mut root = OutputNode::new(
            vec!["PersonFormData".into()],
            OutputKind::FormData,
            SuperType::base(BaseType::AbstractFormData),
        );
        let mut main = OutputNode::new(
            vec!["PersonFormData".into(), "MainBox".into()],
            OutputKind::FieldData,
            SuperType::base(BaseType::AbstractFormFieldData),
        );
        main.children.push(OutputNode::new(
            vec!["PersonFormData".into(), "MainBox".into(), "Name".into()],
            OutputKind::FieldData,
            SuperType::base_of(BaseType::AbstractValueFieldData, TypeExpr::named("String")),
        ));
        root.children.push(main);
        root
    }

    #[test]
    fn test_navigation() {
        let root = sample();
        assert_eq!(root.at(&["MainBox", "Name"]).map(|n| n.qualified_name()), Some("PersonFormData.MainBox.Name".to_string()));
        assert!(root.at(&["Name"]).is_none());
        assert_eq!(root.descendant("Name").map(|n| n.path.len()), Some(3));
        assert_eq!(root.node_count(), 3);
    }

    #[test]
    fn test_super_type_display() {
        let s = SuperType::base_of(BaseType::AbstractValueFieldData, TypeExpr::named("Integer"));
        assert_eq!(s.to_string(), "AbstractValueFieldData<Integer>");
        let g = SuperType::generated(vec!["BaseFormData".into(), "Name".into()]);
        assert_eq!(g.to_string(), "BaseFormData.Name");
        assert_eq!(g.generated_path().map(<[String]>::len), Some(2));
    }

    #[test]
    fn test_rule_statement_serde_shape() {
        let add = RuleStatement::Add {
            key: RuleKey::MaxLength,
            value: RuleValue::Integer(100),
        };
        let json = serde_json::to_string(&add).unwrap();
        assert_eq!(json, r#"{"op":"add","key":"MAX_LENGTH","value":100}"#);
        let remove = RuleStatement::Remove {
            key: RuleKey::Mandatory,
        };
        assert_eq!(remove.key(), RuleKey::Mandatory);
    }

    #[test]
    fn test_type_ref_keeps_params() {
        let mut node = sample();
        node.name = "AbstractTemplateData".into();
        node.type_params = vec!["T".into()];
        assert_eq!(node.type_ref().to_string(), "AbstractTemplateData<T>");
    }
}
