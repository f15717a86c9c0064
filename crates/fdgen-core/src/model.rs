//! Source model: the read-only form-composition tree the engine consumes.

use crate::error::GenerationError;
use crate::rules::{RuleKey, RuleValue};
use crate::types::TypeExpr;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Kind of a source node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Form,
    Box,
    ValueField,
    TableField,
    TableColumn,
    PlainField,
    BeanProperty,
}

impl NodeKind {
    /// UI composition (boxes, fields, columns) as opposed to bean properties.
    pub fn is_structural(self) -> bool {
        matches!(
            self,
            Self::Box | Self::ValueField | Self::TableField | Self::TableColumn | Self::PlainField
        )
    }

    /// Whether nodes of this kind carry a value type.
    pub fn is_value_bearing(self) -> bool {
        matches!(
            self,
            Self::ValueField | Self::TableColumn | Self::BeanProperty
        )
    }

    /// Whether nodes of this kind may own children.
    pub fn is_composite(self) -> bool {
        matches!(self, Self::Form | Self::Box | Self::TableField)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Form => "form",
            Self::Box => "box",
            Self::ValueField => "value_field",
            Self::TableField => "table_field",
            Self::TableColumn => "table_column",
            Self::PlainField => "plain_field",
            Self::BeanProperty => "bean_property",
        };
        f.write_str(s)
    }
}

/// Reference to a declared super type, optionally binding template parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuperTypeRef {
    pub identity: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_args: Vec<TypeExpr>,
}

impl SuperTypeRef {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            type_args: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_args(mut self, args: Vec<TypeExpr>) -> Self {
        self.type_args = args;
        self
    }
}

/// Command an extension layer applies at an attachment site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SdkCommand {
    /// Synthesize a brand-new member.
    Create,
    /// Reference an independently generated data type.
    Use,
    /// Plain member with a freshly derived type.
    None,
    /// Contribute nothing, here or in any deeper layer.
    Ignore,
}

impl SdkCommand {
    /// Label used when a layer does not name itself.
    pub fn default_label(self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Use => "Use",
            Self::None => "None",
            Self::Ignore => "Ignore",
        }
    }
}

/// One layer's declaration at an extension site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionLayer {
    pub command: SdkCommand,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Member declaration for `CREATE`/`NONE` layers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<Box<SourceNode>>,
    /// Reference to an externally generated type for `USE` layers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_type: Option<String>,
}

impl ExtensionLayer {
    pub fn new(command: SdkCommand) -> Self {
        Self {
            command,
            label: None,
            member: None,
            use_type: None,
        }
    }

    pub fn label(&self) -> &str {
        self.label
            .as_deref()
            .unwrap_or_else(|| self.command.default_label())
    }
}

/// Marks a composite as an attachment point for extension declarations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionSite {
    pub id: String,
    /// Declaration made by the site itself (layer 0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<ExtensionLayer>,
}

impl ExtensionSite {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            base: None,
        }
    }
}

/// An external extension declaration for a site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionDecl {
    pub site: String,
    /// Groups layers that compose into one member; defaults to the site's
    /// single anonymous contribution.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub contribution: String,
    /// Layer depth, 1 for the first extension over the base site.
    pub depth: u32,
    #[serde(flatten)]
    pub layer: ExtensionLayer,
}

impl ExtensionDecl {
    pub fn new(site: impl Into<String>, depth: u32, layer: ExtensionLayer) -> Self {
        Self {
            site: site.into(),
            contribution: String::new(),
            depth,
            layer,
        }
    }
}

/// Handle for a type generated outside this engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpaqueTypeHandle {
    pub qualified_name: String,
}

/// A node in the form-composition tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceNode {
    pub identity: String,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub super_type: Option<SuperTypeRef>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub replace: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub ignored: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<TypeExpr>,
    /// Type parameters of a template; empty for concrete nodes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_params: Vec<String>,
    /// Declared rules in authoring order.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub rules: IndexMap<RuleKey, RuleValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed_rules: Vec<RuleKey>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SourceNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension_site: Option<ExtensionSite>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(b: &bool) -> bool {
    !*b
}

impl SourceNode {
    pub fn new(identity: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            identity: identity.into(),
            kind,
            super_type: None,
            replace: false,
            ignored: false,
            value_type: None,
            type_params: Vec::new(),
            rules: IndexMap::new(),
            removed_rules: Vec::new(),
            children: Vec::new(),
            extension_site: None,
        }
    }

    pub fn form(identity: impl Into<String>) -> Self {
        Self::new(identity, NodeKind::Form)
    }

    pub fn group(identity: impl Into<String>) -> Self {
        Self::new(identity, NodeKind::Box)
    }

    pub fn value_field(identity: impl Into<String>, value_type: TypeExpr) -> Self {
        Self::new(identity, NodeKind::ValueField).with_value_type(value_type)
    }

    pub fn table(identity: impl Into<String>) -> Self {
        Self::new(identity, NodeKind::TableField)
    }

    pub fn column(identity: impl Into<String>, value_type: TypeExpr) -> Self {
        Self::new(identity, NodeKind::TableColumn).with_value_type(value_type)
    }

    pub fn property(identity: impl Into<String>, value_type: TypeExpr) -> Self {
        Self::new(identity, NodeKind::BeanProperty).with_value_type(value_type)
    }

    #[must_use]
    pub fn with_value_type(mut self, value_type: TypeExpr) -> Self {
        self.value_type = Some(value_type);
        self
    }

    #[must_use]
    pub fn with_super(mut self, super_type: SuperTypeRef) -> Self {
        self.super_type = Some(super_type);
        self
    }

    #[must_use]
    pub fn with_type_params(mut self, params: &[&str]) -> Self {
        self.type_params = params.iter().map(|p| (*p).to_string()).collect();
        self
    }

    #[must_use]
    pub fn with_rule(mut self, key: RuleKey, value: RuleValue) -> Self {
        self.rules.insert(key, value);
        self
    }

    #[must_use]
    pub fn without_rule(mut self, key: RuleKey) -> Self {
        self.removed_rules.push(key);
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: SourceNode) -> Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn with_site(mut self, site: ExtensionSite) -> Self {
        self.extension_site = Some(site);
        self
    }

    #[must_use]
    pub fn replacing(mut self) -> Self {
        self.replace = true;
        self
    }

    #[must_use]
    pub fn ignoring(mut self) -> Self {
        self.ignored = true;
        self
    }

    /// Whether this node is a generic template.
    pub fn is_template(&self) -> bool {
        !self.type_params.is_empty()
    }

    pub fn child(&self, identity: &str) -> Option<&SourceNode> {
        self.children.iter().find(|c| c.identity == identity)
    }

    /// Depth-first search for a descendant (or self) by identity.
    pub fn find(&self, identity: &str) -> Option<&SourceNode> {
        if self.identity == identity {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(identity))
    }

    /// Collect the ids of all extension sites in this subtree, in tree order.
    pub fn extension_sites(&self) -> Vec<&ExtensionSite> {
        let mut sites = Vec::new();
        self.collect_sites(&mut sites);
        sites
    }

    fn collect_sites<'a>(&'a self, out: &mut Vec<&'a ExtensionSite>) {
        if let Some(site) = &self.extension_site {
            out.push(site);
        }
        for child in &self.children {
            child.collect_sites(out);
        }
    }

    /// Check structural invariants of this subtree.
    ///
    /// `path` is the slash-separated location used in error messages.
    pub fn validate(&self, path: &str) -> Result<(), GenerationError> {
        let here = if path.is_empty() {
            self.identity.clone()
        } else {
            format!("{path}/{}", self.identity)
        };

        if self.identity.trim().is_empty() {
            return Err(GenerationError::invalid_model(&here, "empty identity"));
        }
        for (key, value) in &self.rules {
            if !key.accepts(value) {
                return Err(GenerationError::invalid_model(
                    &here,
                    format!("rule {key} does not accept value `{value}`"),
                ));
            }
        }
        if let Some(key) = self.removed_rules.iter().find(|k| self.rules.contains_key(*k)) {
            return Err(GenerationError::invalid_model(
                &here,
                format!("rule {key} is both declared and removed"),
            ));
        }
        if !self.children.is_empty() && !self.kind.is_composite() {
            return Err(GenerationError::invalid_model(
                &here,
                format!("a {} cannot have children", self.kind),
            ));
        }

        let mut seen = HashSet::new();
        for child in &self.children {
            if !seen.insert(child.identity.as_str()) {
                return Err(GenerationError::invalid_model(
                    &here,
                    format!("duplicate child identity `{}`", child.identity),
                ));
            }
            match (self.kind, child.kind) {
                (NodeKind::TableField, NodeKind::TableColumn) => {}
                (NodeKind::TableField, other) => {
                    return Err(GenerationError::invalid_model(
                        &here,
                        format!("table field child `{}` is a {other}, expected a table column", child.identity),
                    ));
                }
                (_, NodeKind::TableColumn) => {
                    return Err(GenerationError::invalid_model(
                        &here,
                        format!("table column `{}` outside a table field", child.identity),
                    ));
                }
                (_, NodeKind::Form) => {
                    return Err(GenerationError::invalid_model(
                        &here,
                        format!("form `{}` nested inside another node", child.identity),
                    ));
                }
                _ => {}
            }
            child.validate(&here)?;
        }

        if let Some(site) = &self.extension_site
            && let Some(base) = &site.base
        {
            validate_layer(&here, base)?;
        }
        Ok(())
    }
}

/// Check that a layer carries what its command needs.
pub fn validate_layer(path: &str, layer: &ExtensionLayer) -> Result<(), GenerationError> {
    match layer.command {
        SdkCommand::Use if layer.use_type.is_none() => Err(GenerationError::invalid_model(
            path,
            format!("USE layer `{}` without a referenced type", layer.label()),
        )),
        SdkCommand::Create if layer.member.is_none() => Err(GenerationError::invalid_model(
            path,
            format!("CREATE layer `{}` without a member declaration", layer.label()),
        )),
        _ => match &layer.member {
            Some(member) => member.validate(path),
            None => Ok(()),
        },
    }
}
