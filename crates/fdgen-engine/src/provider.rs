//! The read-only model view the generator collects snapshots from.

use crate::resolver::check_chain;
use fdgen_core::error::GenerationError;
use fdgen_core::model::{ExtensionDecl, OpaqueTypeHandle, SourceNode};
use fdgen_core::schema::ModelFile;

/// Source of form, template and extension declarations.
///
/// The generator calls these once per request, before synthesis starts.
pub trait TypeModelProvider {
    /// Identities of every form in the model, in declaration order.
    fn form_names(&self) -> Vec<String>;

    fn root(&self, identity: &str) -> Option<SourceNode>;

    /// Ancestor forms of `identity`, nearest first. Must be complete.
    fn resolve_ancestor_chain(&self, identity: &str) -> Result<Vec<SourceNode>, GenerationError>;

    fn template_names(&self) -> Vec<String>;

    fn template(&self, identity: &str) -> Option<SourceNode>;

    /// Every extension declaration the model knows about.
    fn extensions(&self) -> Vec<ExtensionDecl>;

    /// Resolve a `USE` reference to an independently generated type.
    fn resolve_external_type(&self, reference: &str) -> Option<OpaqueTypeHandle>;
}

impl TypeModelProvider for ModelFile {
    fn form_names(&self) -> Vec<String> {
        self.forms.iter().map(|f| f.identity.clone()).collect()
    }

    fn root(&self, identity: &str) -> Option<SourceNode> {
        self.form(identity).cloned()
    }

    fn resolve_ancestor_chain(&self, identity: &str) -> Result<Vec<SourceNode>, GenerationError> {
        let mut chain: Vec<SourceNode> = Vec::new();
        let mut current = self.form(identity);
        while let Some(super_ref) = current.and_then(|f| f.super_type.as_ref()) {
            let walked = std::iter::once(identity)
                .chain(chain.iter().map(|f| f.identity.as_str()))
                .chain(std::iter::once(super_ref.identity.as_str()));
            check_chain(walked)?;

            let parent = self.form(&super_ref.identity).ok_or_else(|| {
                GenerationError::invalid_model(
                    current.map_or(identity, |f| f.identity.as_str()),
                    format!("super form `{}` is not declared", super_ref.identity),
                )
            })?;
            chain.push(parent.clone());
            current = Some(parent);
        }
        Ok(chain)
    }

    fn template_names(&self) -> Vec<String> {
        self.templates.iter().map(|t| t.identity.clone()).collect()
    }

    fn template(&self, identity: &str) -> Option<SourceNode> {
        ModelFile::template(self, identity).cloned()
    }

    fn extensions(&self) -> Vec<ExtensionDecl> {
        self.extensions.clone()
    }

    fn resolve_external_type(&self, reference: &str) -> Option<OpaqueTypeHandle> {
        self.external_types
            .iter()
            .find(|e| e.reference == reference)
            .map(|e| OpaqueTypeHandle {
                qualified_name: e.qualified_name.clone(),
            })
    }
}
