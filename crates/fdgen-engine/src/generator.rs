//! Generation requests: collect a complete snapshot from the provider, then
//! hand it to the pure synthesizer.

use crate::generics::TemplateSet;
use crate::provider::TypeModelProvider;
use crate::synthesize::{ModelSnapshot, SynthesisOptions, synthesize, synthesize_template};
use fdgen_core::error::GenerationError;
use fdgen_core::model::{SdkCommand, SourceNode};
use fdgen_core::output::OutputNode;
use std::collections::{BTreeMap, BTreeSet};

/// Similarity below which no "did you mean" suggestion is offered.
const SUGGESTION_THRESHOLD: f64 = 0.6;

/// Runs generation requests against a [`TypeModelProvider`].
pub struct Generator<'p, P: TypeModelProvider + ?Sized> {
    provider: &'p P,
    options: SynthesisOptions,
}

impl<'p, P: TypeModelProvider + ?Sized> Generator<'p, P> {
    pub fn new(provider: &'p P, options: SynthesisOptions) -> Self {
        Self { provider, options }
    }

    /// Synthesize the data tree for the form `root_identity`.
    pub fn run(&self, root_identity: &str) -> Result<OutputNode, GenerationError> {
        tracing::info!(root = root_identity, "generating form data");
        let snapshot = self.snapshot(root_identity)?;
        let output = synthesize(&snapshot)?;
        tracing::info!(
            root = root_identity,
            types = output.node_count(),
            ancestors = snapshot.ancestors.len(),
            "form data generated"
        );
        Ok(output)
    }

    /// Synthesize a template with its type parameters left unbound.
    pub fn run_template(&self, identity: &str) -> Result<OutputNode, GenerationError> {
        tracing::info!(template = identity, "generating template data");
        let Some(template) = self.provider.template(identity) else {
            return Err(unknown(identity, &self.provider.template_names()));
        };
        let mut snapshot = ModelSnapshot::new(SourceNode::form(identity));
        snapshot.templates = self.collect_templates([&template]);
        snapshot.options = self.options.clone();
        synthesize_template(&snapshot, identity)
    }

    /// Collect everything a request for `root_identity` reads.
    pub fn snapshot(&self, root_identity: &str) -> Result<ModelSnapshot, GenerationError> {
        let Some(root) = self.provider.root(root_identity) else {
            return Err(unknown(root_identity, &self.provider.form_names()));
        };
        let ancestors = self.provider.resolve_ancestor_chain(root_identity)?;

        let chain_sites: BTreeSet<String> = std::iter::once(&root)
            .chain(&ancestors)
            .flat_map(|f| f.extension_sites().into_iter().map(|s| s.id.clone()))
            .collect();
        let foreign_sites = self.foreign_sites(root_identity, &ancestors);
        let extensions: Vec<_> = self
            .provider
            .extensions()
            .into_iter()
            .filter(|d| chain_sites.contains(&d.site) || !foreign_sites.contains(&d.site))
            .collect();

        let mut external_types = BTreeMap::new();
        let references = std::iter::once(&root)
            .chain(&ancestors)
            .flat_map(|f| f.extension_sites())
            .filter_map(|s| s.base.as_ref())
            .chain(extensions.iter().map(|d| &d.layer))
            .filter(|l| l.command == SdkCommand::Use)
            .filter_map(|l| l.use_type.clone());
        for reference in references {
            if let Some(handle) = self.provider.resolve_external_type(&reference) {
                external_types.insert(reference, handle);
            }
        }

        let members: Vec<&SourceNode> = extensions
            .iter()
            .filter_map(|d| d.layer.member.as_deref())
            .collect();
        let templates = self.collect_templates(
            std::iter::once(&root)
                .chain(&ancestors)
                .chain(members.iter().copied()),
        );

        Ok(ModelSnapshot {
            root,
            ancestors,
            templates,
            extensions,
            external_types,
            options: self.options.clone(),
        })
    }

    /// Sites declared by forms outside the requested chain. Declarations for
    /// them belong to other requests.
    fn foreign_sites(&self, root_identity: &str, ancestors: &[SourceNode]) -> BTreeSet<String> {
        let in_chain: BTreeSet<&str> = std::iter::once(root_identity)
            .chain(ancestors.iter().map(|a| a.identity.as_str()))
            .collect();
        self.provider
            .form_names()
            .iter()
            .filter(|name| !in_chain.contains(name.as_str()))
            .filter_map(|name| self.provider.root(name))
            .flat_map(|f| {
                f.extension_sites()
                    .into_iter()
                    .map(|s| s.id.clone())
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Every template the given nodes reach through super-type references.
    fn collect_templates<'n>(&self, roots: impl IntoIterator<Item = &'n SourceNode>) -> TemplateSet {
        let mut templates = TemplateSet::new();
        let mut pending: Vec<String> = Vec::new();
        for node in roots {
            referenced_types(node, &mut pending);
        }
        while let Some(identity) = pending.pop() {
            if templates.contains_key(&identity) {
                continue;
            }
            if let Some(template) = self.provider.template(&identity) {
                referenced_types(&template, &mut pending);
                templates.insert(identity, template);
            }
        }
        templates
    }
}

/// Push the super-type identities mentioned anywhere in `node`'s subtree.
fn referenced_types(node: &SourceNode, out: &mut Vec<String>) {
    if let Some(super_ref) = &node.super_type {
        out.push(super_ref.identity.clone());
    }
    if let Some(site) = &node.extension_site
        && let Some(member) = site.base.as_ref().and_then(|b| b.member.as_deref())
    {
        referenced_types(member, out);
    }
    for child in &node.children {
        referenced_types(child, out);
    }
}

fn unknown(identity: &str, candidates: &[String]) -> GenerationError {
    GenerationError::UnknownRoot {
        identity: identity.to_string(),
        suggestion: closest_name(identity, candidates),
    }
}

/// The candidate most similar to `identity`, if any is close enough.
pub fn closest_name(identity: &str, candidates: &[String]) -> Option<String> {
    candidates
        .iter()
        .map(|c| (strsim::normalized_levenshtein(identity, c), c))
        .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, c)| c.clone())
}
