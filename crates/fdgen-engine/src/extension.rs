//! Extension attachment: composes the layered declarations made for one
//! extension site into named composite members.

use fdgen_core::error::GenerationError;
use fdgen_core::model::{ExtensionDecl, ExtensionLayer, ExtensionSite, SdkCommand, SourceNode, validate_layer};
use indexmap::IndexMap;

/// What a composed contribution turns into.
#[derive(Debug, Clone, PartialEq)]
pub enum Composite<'a> {
    /// An `IGNORE` layer suppressed the member.
    Ignored,
    /// A `USE` layer references an independently generated type.
    External { reference: &'a str },
    /// A member derived from the last declared member node.
    Derived { member: &'a SourceNode },
    /// No layer declared a member.
    Empty,
}

/// One `(site, contribution)` after composition.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedExtension<'a> {
    pub contribution: &'a str,
    /// Concatenated layer labels, shallowest first.
    pub name: String,
    pub outcome: Composite<'a>,
}

/// Compose every contribution made to `site`.
///
/// The site's own declaration is layer 0 of the anonymous contribution.
/// Contributions come back in first-declaration order.
pub fn compose<'a>(
    site: &'a ExtensionSite,
    decls: &[&'a ExtensionDecl],
    path: &str,
) -> Result<Vec<ComposedExtension<'a>>, GenerationError> {
    let mut groups: IndexMap<&'a str, Vec<(u32, &'a ExtensionLayer)>> = IndexMap::new();
    if let Some(base) = &site.base {
        groups.entry("").or_default().push((0, base));
    }
    for decl in decls.iter().copied().filter(|d| d.site == site.id) {
        if decl.depth == 0 {
            return Err(GenerationError::invalid_model(
                path,
                format!("extension for site `{}` declares depth 0, reserved for the site itself", site.id),
            ));
        }
        validate_layer(path, &decl.layer)?;
        groups
            .entry(decl.contribution.as_str())
            .or_default()
            .push((decl.depth, &decl.layer));
    }

    let mut composed = Vec::with_capacity(groups.len());
    for (contribution, mut layers) in groups {
        layers.sort_by_key(|(depth, _)| *depth);
        if let Some(pair) = layers.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(GenerationError::invalid_model(
                path,
                format!(
                    "site `{}` has two layers at depth {} for contribution `{contribution}`",
                    site.id, pair[0].0
                ),
            ));
        }
        let outcome = fold_layers(&site.id, &layers, path)?;
        let name: String = layers.iter().map(|(_, layer)| layer.label()).collect();
        tracing::debug!(site = %site.id, contribution, %name, "composed extension");
        composed.push(ComposedExtension {
            contribution,
            name,
            outcome,
        });
    }
    Ok(composed)
}

fn fold_layers<'a>(
    site: &str,
    layers: &[(u32, &'a ExtensionLayer)],
    path: &str,
) -> Result<Composite<'a>, GenerationError> {
    let mut ignored_at = None;
    let mut external = None;
    let mut member = None;

    for &(depth, layer) in layers {
        if let Some(ignore_depth) = ignored_at
            && layer.command != SdkCommand::Ignore
        {
            return Err(GenerationError::ignore_conflict(
                path,
                format!(
                    "site `{site}` was ignored at depth {ignore_depth}; layer {depth} declares {}",
                    layer.label()
                ),
            ));
        }
        match layer.command {
            SdkCommand::Ignore => ignored_at = ignored_at.or(Some(depth)),
            SdkCommand::Use => external = layer.use_type.as_deref(),
            SdkCommand::Create | SdkCommand::None => {
                if let Some(m) = &layer.member {
                    member = Some(m.as_ref());
                }
            }
        }
    }

    Ok(match (ignored_at, external, member) {
        (Some(_), _, _) => Composite::Ignored,
        (None, Some(reference), _) => Composite::External { reference },
        (None, None, Some(member)) => Composite::Derived { member },
        (None, None, None) => Composite::Empty,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fdgen_core::types::TypeExpr;

    fn layer(command: SdkCommand) -> ExtensionLayer {
        ExtensionLayer::new(command)
    }

    fn with_member(command: SdkCommand) -> ExtensionLayer {
        let mut l = layer(command);
        l.member = Some(Box::new(SourceNode::value_field("Extra", TypeExpr::named("String"))));
        l
    }

    fn using(reference: &str) -> ExtensionLayer {
        let mut l = layer(SdkCommand::Use);
        l.use_type = Some(reference.to_string());
        l
    }

    #[test]
    fn test_create_then_none() {
        let site = ExtensionSite::new("main");
        let d1 = ExtensionDecl::new("main", 1, with_member(SdkCommand::Create));
        let d2 = ExtensionDecl::new("main", 2, layer(SdkCommand::None));
        let composed = compose(&site, &[&d2, &d1], "F/MainBox").unwrap();
        assert_eq!(composed.len(), 1);
        assert_eq!(composed[0].name, "CreateNone");
        assert!(matches!(composed[0].outcome, Composite::Derived { member } if member.identity == "Extra"));
    }

    #[test]
    fn test_three_layers_with_base() {
        let mut site = ExtensionSite::new("main");
        site.base = Some(with_member(SdkCommand::Create));
        let d1 = ExtensionDecl::new("main", 1, layer(SdkCommand::None));
        let d2 = ExtensionDecl::new("main", 2, using("ext.SharedData"));
        let composed = compose(&site, &[&d1, &d2], "F/MainBox").unwrap();
        assert_eq!(composed[0].name, "CreateNoneUse");
        assert_eq!(
            composed[0].outcome,
            Composite::External {
                reference: "ext.SharedData"
            }
        );
    }

    #[test]
    fn test_ignore_blocks_deeper_layers() {
        let site = ExtensionSite::new("main");
        let d1 = ExtensionDecl::new("main", 1, layer(SdkCommand::Ignore));
        let d2 = ExtensionDecl::new("main", 2, with_member(SdkCommand::Create));
        let err = compose(&site, &[&d1, &d2], "F/MainBox").unwrap_err();
        assert!(matches!(err, GenerationError::IgnoreConflict { .. }));

        let d3 = ExtensionDecl::new("main", 2, layer(SdkCommand::Ignore));
        let composed = compose(&site, &[&d1, &d3], "F/MainBox").unwrap();
        assert_eq!(composed[0].outcome, Composite::Ignored);
    }

    #[test]
    fn test_contributions_compose_independently() {
        let site = ExtensionSite::new("main");
        let mut a = ExtensionDecl::new("main", 1, with_member(SdkCommand::Create));
        a.contribution = "audit".into();
        let mut b = ExtensionDecl::new("main", 1, layer(SdkCommand::Ignore));
        b.contribution = "legacy".into();
        let other_site = ExtensionDecl::new("other", 1, with_member(SdkCommand::Create));
        let composed = compose(&site, &[&a, &b, &other_site], "F").unwrap();
        assert_eq!(composed.len(), 2);
        assert_eq!(composed[0].contribution, "audit");
        assert_eq!(composed[1].outcome, Composite::Ignored);
    }

    #[test]
    fn test_duplicate_depth_rejected() {
        let site = ExtensionSite::new("main");
        let d1 = ExtensionDecl::new("main", 1, with_member(SdkCommand::Create));
        let d2 = ExtensionDecl::new("main", 1, layer(SdkCommand::None));
        let err = compose(&site, &[&d1, &d2], "F").unwrap_err();
        assert!(err.to_string().contains("two layers at depth 1"));
    }

    #[test]
    fn test_labels_and_empty_outcome() {
        let site = ExtensionSite::new("main");
        let mut l = layer(SdkCommand::None);
        l.label = Some("Audit".into());
        let d1 = ExtensionDecl::new("main", 1, l);
        let composed = compose(&site, &[&d1], "F").unwrap();
        assert_eq!(composed[0].name, "Audit");
        assert_eq!(composed[0].outcome, Composite::Empty);
    }
}
