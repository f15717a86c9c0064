//! Model file format and version handling.

use crate::error::GenerationError;
use crate::model::{ExtensionDecl, SourceNode, validate_layer};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const CURRENT_VERSION: &str = "1.0.0";

/// A serialized type model: forms, templates, extension declarations and the
/// externally generated types `USE` sites may reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFile {
    pub version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub forms: Vec<SourceNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub templates: Vec<SourceNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<ExtensionDecl>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_types: Vec<ExternalType>,
}

/// An externally generated data type known to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalType {
    pub reference: String,
    pub qualified_name: String,
}

impl Default for ModelFile {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION.to_string(),
            forms: Vec::new(),
            templates: Vec::new(),
            extensions: Vec::new(),
            external_types: Vec::new(),
        }
    }
}

impl ModelFile {
    pub fn form(&self, identity: &str) -> Option<&SourceNode> {
        self.forms.iter().find(|f| f.identity == identity)
    }

    pub fn template(&self, identity: &str) -> Option<&SourceNode> {
        self.templates.iter().find(|t| t.identity == identity)
    }

    /// Check every form, template and extension declaration.
    pub fn validate(&self) -> Result<(), GenerationError> {
        let mut seen = std::collections::HashSet::new();
        for node in self.forms.iter().chain(&self.templates) {
            if !seen.insert(node.identity.as_str()) {
                return Err(GenerationError::invalid_model(
                    &node.identity,
                    "declared more than once at model level",
                ));
            }
            node.validate("")?;
        }
        for form in &self.forms {
            if form.kind != crate::model::NodeKind::Form {
                return Err(GenerationError::invalid_model(
                    &form.identity,
                    format!("top-level form has kind {}", form.kind),
                ));
            }
        }
        for decl in &self.extensions {
            if decl.depth == 0 {
                return Err(GenerationError::invalid_model(
                    &decl.site,
                    "extension depth 0 is reserved for the site's own declaration",
                ));
            }
            validate_layer(&decl.site, &decl.layer)?;
        }
        Ok(())
    }
}

/// Validate a model file's schema version.
pub fn validate_version(model: &ModelFile) -> Result<()> {
    if model.version != CURRENT_VERSION {
        anyhow::bail!(
            "model version mismatch: expected {}, found {}",
            CURRENT_VERSION,
            model.version
        );
    }
    Ok(())
}

/// Serialize a model to a pretty-printed JSON string.
pub fn to_json(model: &ModelFile) -> Result<String> {
    serde_json::to_string_pretty(model).context("failed to serialize model to JSON")
}

/// Deserialize a model from a JSON string and check its version.
pub fn from_json(json: &str) -> Result<ModelFile> {
    let model: ModelFile =
        serde_json::from_str(json).context("failed to deserialize model from JSON")?;
    validate_version(&model)?;
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeExpr;

    #[test]
    fn test_version_mismatch() {
        let json = r#"{ "version": "0.1.0" }"#;
        let err = from_json(json).unwrap_err();
        assert!(err.to_string().contains("version mismatch"));
    }

    #[test]
    fn test_validate_rejects_duplicate_forms() {
        let mut model = ModelFile::default();
        model.forms.push(SourceNode::form("A"));
        model.forms.push(SourceNode::form("A"));
        assert!(model.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_form_roots() {
        let mut model = ModelFile::default();
        model
            .forms
            .push(SourceNode::value_field("Name", TypeExpr::named("String")));
        let err = model.validate().unwrap_err();
        assert!(err.to_string().contains("top-level form has kind value_field"));
    }

    #[test]
    fn test_lookup() {
        let mut model = ModelFile::default();
        model.forms.push(SourceNode::form("A"));
        model.templates.push(
            SourceNode::value_field("AbstractTemplateField", TypeExpr::named("T"))
                .with_type_params(&["T"]),
        );
        assert!(model.form("A").is_some());
        assert!(model.template("AbstractTemplateField").is_some());
        assert!(model.form("AbstractTemplateField").is_none());
    }
}
