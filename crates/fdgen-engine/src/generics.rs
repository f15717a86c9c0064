//! Generic template binding.
//!
//! A template is a source node with type parameters. A consuming node names
//! the template as its super type and binds the parameters; the bound types
//! are substituted into every value type the template contributes.

use crate::resolver::TemplateBinding;
use fdgen_core::error::GenerationError;
use fdgen_core::model::SourceNode;
use fdgen_core::types::TypeExpr;
use std::collections::{BTreeMap, HashSet};

/// Templates available to a generation request, keyed by identity.
pub type TemplateSet = BTreeMap<String, SourceNode>;

/// A node's binding of a template.
#[derive(Debug, Clone)]
pub struct Bound<'s> {
    pub template: &'s SourceNode,
    pub binding: TemplateBinding,
    /// Parameter name → bound type.
    pub bindings: BTreeMap<String, TypeExpr>,
    /// The template's value type with the bindings applied.
    pub value_type: Option<TypeExpr>,
}

/// Bind the template `node` consumes, if its super type names one.
///
/// A super type with type arguments must name a known template. One without
/// arguments that is not a template is left to the override resolver.
pub fn bind<'s>(
    node: &SourceNode,
    path: &str,
    templates: &'s TemplateSet,
) -> Result<Option<Bound<'s>>, GenerationError> {
    let Some(super_ref) = &node.super_type else {
        return Ok(None);
    };
    let Some(template) = templates.get(&super_ref.identity) else {
        if super_ref.type_args.is_empty() {
            return Ok(None);
        }
        return Err(GenerationError::generic_binding(
            path,
            format!("`{}` is not a known template", super_ref.identity),
        ));
    };

    if template.kind != node.kind {
        return Err(GenerationError::generic_binding(
            path,
            format!(
                "a {} cannot consume the {} template `{}`",
                node.kind, template.kind, template.identity
            ),
        ));
    }
    let bindings = bind_params(template, &super_ref.type_args, path)?;
    let value_type = template_value_type(template, templates)?.map(|t| t.substitute(&bindings));

    if let (Some(own), Some(bound)) = (&node.value_type, &value_type)
        && own != bound
    {
        return Err(GenerationError::generic_binding(
            path,
            format!(
                "declares value type {own} but template `{}` binds {bound}",
                template.identity
            ),
        ));
    }

    Ok(Some(Bound {
        template,
        binding: TemplateBinding {
            template: template.identity.clone(),
            args: super_ref.type_args.clone(),
        },
        bindings,
        value_type,
    }))
}

/// Map a template's parameters to the given arguments.
pub fn bind_params(
    template: &SourceNode,
    args: &[TypeExpr],
    path: &str,
) -> Result<BTreeMap<String, TypeExpr>, GenerationError> {
    if template.type_params.len() != args.len() {
        return Err(GenerationError::generic_binding(
            path,
            format!(
                "template `{}` takes {} type argument(s) but {} were bound",
                template.identity,
                template.type_params.len(),
                args.len()
            ),
        ));
    }
    Ok(template
        .type_params
        .iter()
        .cloned()
        .zip(args.iter().cloned())
        .collect())
}

/// Value type a template contributes, following template-to-template chains.
///
/// The result is expressed in the template's own parameters.
pub fn template_value_type(
    template: &SourceNode,
    templates: &TemplateSet,
) -> Result<Option<TypeExpr>, GenerationError> {
    let mut visited = HashSet::new();
    let mut walked = Vec::new();
    let mut current = template;
    let mut substitution: Option<BTreeMap<String, TypeExpr>> = None;

    loop {
        walked.push(current.identity.as_str());
        if !visited.insert(current.identity.as_str()) {
            return Err(GenerationError::replace_ambiguity(
                &template.identity,
                format!("cyclic template chain: {}", walked.join(" -> ")),
            ));
        }
        if let Some(value_type) = &current.value_type {
            let resolved = match &substitution {
                Some(s) => value_type.substitute(s),
                None => value_type.clone(),
            };
            return Ok(Some(resolved));
        }
        let Some(super_ref) = &current.super_type else {
            return Ok(None);
        };
        let Some(next) = templates.get(&super_ref.identity) else {
            return Ok(None);
        };
        let args: Vec<TypeExpr> = match &substitution {
            Some(s) => super_ref.type_args.iter().map(|a| a.substitute(s)).collect(),
            None => super_ref.type_args.clone(),
        };
        substitution = Some(bind_params(next, &args, &current.identity)?);
        current = next;
    }
}

/// Type parameters of `scope` that `ty` mentions, in declaration order.
pub fn mentioned_params(ty: Option<&TypeExpr>, scope: &[String]) -> Vec<String> {
    let Some(ty) = ty else {
        return Vec::new();
    };
    scope
        .iter()
        .filter(|p| ty.mentions_any(std::slice::from_ref(*p)))
        .cloned()
        .collect()
}

/// Whether any node below `node` (or `node` itself) has a value type that
/// mentions one of `params`.
pub fn subtree_mentions(node: &SourceNode, params: &[String]) -> bool {
    node.value_type.as_ref().is_some_and(|t| t.mentions_any(params))
        || node.children.iter().any(|c| subtree_mentions(c, params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fdgen_core::model::{NodeKind, SuperTypeRef};

    fn t(s: &str) -> TypeExpr {
        TypeExpr::parse(s).unwrap()
    }

    fn templates() -> TemplateSet {
        let mut set = TemplateSet::new();
        set.insert(
            "AbstractTemplateField".into(),
            SourceNode::value_field("AbstractTemplateField", t("T")).with_type_params(&["T"]),
        );
        set.insert(
            "AbstractListField".into(),
            SourceNode::new("AbstractListField", NodeKind::ValueField)
                .with_type_params(&["E"])
                .with_super(SuperTypeRef::new("AbstractTemplateField").with_args(vec![t("List<E>")])),
        );
        set
    }

    #[test]
    fn test_bind_substitutes_value_type() {
        let set = templates();
        let node = SourceNode::new("Count", NodeKind::ValueField)
            .with_super(SuperTypeRef::new("AbstractTemplateField").with_args(vec![t("Integer")]));
        let bound = bind(&node, "F/Count", &set).unwrap().unwrap();
        assert_eq!(bound.value_type, Some(t("Integer")));
        assert_eq!(bound.binding.template, "AbstractTemplateField");
        assert_eq!(bound.bindings.get("T"), Some(&t("Integer")));
    }

    #[test]
    fn test_bind_through_template_chain() {
        let set = templates();
        let node = SourceNode::new("Tags", NodeKind::ValueField)
            .with_super(SuperTypeRef::new("AbstractListField").with_args(vec![t("String")]));
        let bound = bind(&node, "F/Tags", &set).unwrap().unwrap();
        assert_eq!(bound.value_type, Some(t("List<String>")));
    }

    #[test]
    fn test_arity_mismatch() {
        let set = templates();
        let node = SourceNode::new("Count", NodeKind::ValueField).with_super(
            SuperTypeRef::new("AbstractTemplateField").with_args(vec![t("Integer"), t("Long")]),
        );
        let err = bind(&node, "F/Count", &set).unwrap_err();
        assert!(matches!(err, GenerationError::GenericBinding { .. }));
    }

    #[test]
    fn test_unknown_template_with_args() {
        let set = templates();
        let node = SourceNode::new("Count", NodeKind::ValueField)
            .with_super(SuperTypeRef::new("Missing").with_args(vec![t("Integer")]));
        assert!(bind(&node, "F/Count", &set).is_err());

        let hint = SourceNode::new("Count", NodeKind::ValueField).with_super(SuperTypeRef::new("Missing"));
        assert!(bind(&hint, "F/Count", &set).unwrap().is_none());
    }

    #[test]
    fn test_conflicting_own_value_type() {
        let set = templates();
        let node = SourceNode::value_field("Count", t("String"))
            .with_super(SuperTypeRef::new("AbstractTemplateField").with_args(vec![t("Integer")]));
        let err = bind(&node, "F/Count", &set).unwrap_err();
        assert!(err.to_string().contains("declares value type String"));
    }

    #[test]
    fn test_cyclic_template_chain() {
        let mut set = TemplateSet::new();
        set.insert(
            "A".into(),
            SourceNode::new("A", NodeKind::ValueField)
                .with_type_params(&["T"])
                .with_super(SuperTypeRef::new("B").with_args(vec![t("T")])),
        );
        set.insert(
            "B".into(),
            SourceNode::new("B", NodeKind::ValueField)
                .with_type_params(&["T"])
                .with_super(SuperTypeRef::new("A").with_args(vec![t("T")])),
        );
        let err = template_value_type(&set["A"], &set).unwrap_err();
        assert!(err.to_string().contains("A -> B -> A"));
    }

    #[test]
    fn test_mentions() {
        let scope = vec!["K".to_string(), "V".to_string()];
        assert_eq!(mentioned_params(Some(&t("Map<V, String>")), &scope), vec!["V".to_string()]);
        assert!(mentioned_params(None, &scope).is_empty());

        let tree = SourceNode::group("Box").with_child(SourceNode::value_field("Inner", t("K")));
        assert!(subtree_mentions(&tree, &scope));
        assert!(!subtree_mentions(&tree, &["X".to_string()]));
    }
}
