//! Tree synthesizer: turns a resolved model snapshot into the output tree.
//!
//! Ancestor forms are synthesized first, farthest to nearest, with the same
//! machinery as the root. Their outputs are discarded; only the resolved
//! entries survive in the [`AncestorIndex`] the next level resolves against.

use crate::classify::{
    Classification, base_type, capitalize, classify, data_type_name, decapitalize, property_type_name,
    row_type_name,
};
use crate::extension::{self, Composite};
use crate::generics::{self, Bound, TemplateSet};
use crate::resolver::{self, AncestorIndex, AncestorLevel, Position, ResolvedEntry};
use crate::rule_diff::{RuleDiff, RuleState, compute_rules};
use fdgen_core::error::GenerationError;
use fdgen_core::model::{ExtensionDecl, ExtensionSite, NodeKind, OpaqueTypeHandle, SourceNode};
use fdgen_core::output::{Member, MemberKind, OutputKind, OutputNode, Param, SuperType};
use fdgen_core::rules::RuleDefaults;
use fdgen_core::types::TypeExpr;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Request-level switches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SynthesisOptions {
    pub rule_defaults: RuleDefaults,
    /// Reject extension declarations whose site exists nowhere in the chain.
    pub strict_extensions: bool,
}

/// Everything one generation request reads. Collected up front; the
/// synthesizer never asks for more.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub root: SourceNode,
    /// Ancestor forms of `root`, nearest first.
    pub ancestors: Vec<SourceNode>,
    pub templates: TemplateSet,
    pub extensions: Vec<ExtensionDecl>,
    /// `USE` references the model could resolve.
    pub external_types: BTreeMap<String, OpaqueTypeHandle>,
    pub options: SynthesisOptions,
}

impl ModelSnapshot {
    /// A snapshot of a root form with no ancestors, templates or extensions.
    pub fn new(root: SourceNode) -> Self {
        Self {
            root,
            ancestors: Vec::new(),
            templates: TemplateSet::new(),
            extensions: Vec::new(),
            external_types: BTreeMap::new(),
            options: SynthesisOptions::default(),
        }
    }
}

/// Synthesize the data tree for `snapshot.root`.
///
/// Returns no tree at all when any node fails.
pub fn synthesize(snapshot: &ModelSnapshot) -> Result<OutputNode, GenerationError> {
    check_snapshot(snapshot)?;

    let mut lineage = 0;
    let mut index = AncestorIndex::new();
    for form in snapshot.ancestors.iter().rev() {
        let level = {
            let mut builder = LevelBuilder::new(snapshot, &index, &mut lineage);
            builder.build_form(form)?;
            builder.entries
        };
        tracing::debug!(form = %form.identity, entries = level.len(), "resolved ancestor level");
        index.push_nearest(AncestorLevel {
            form: form.identity.clone(),
            form_data: data_type_name(&form.identity),
            entries: level,
        });
    }

    let mut builder = LevelBuilder::new(snapshot, &index, &mut lineage);
    builder.build_form(&snapshot.root)
}

/// Synthesize a template on its own, keeping its type parameters unbound.
pub fn synthesize_template(
    snapshot: &ModelSnapshot,
    identity: &str,
) -> Result<OutputNode, GenerationError> {
    let template = snapshot.templates.get(identity).ok_or_else(|| GenerationError::UnknownRoot {
        identity: identity.to_string(),
        suggestion: None,
    })?;
    template.validate("")?;
    if !template.is_template() {
        return Err(GenerationError::invalid_model(identity, "template declares no type parameters"));
    }

    let index = AncestorIndex::new();
    let mut lineage = 0;
    let mut builder = LevelBuilder::new(snapshot, &index, &mut lineage);
    let scope = Scope::top_level(&template.type_params);
    let built = builder.build_node(template, &scope)?;
    built.child.ok_or_else(|| {
        GenerationError::invalid_model(identity, "template produced no output type")
    })
}

/// Structural checks that do not depend on resolution.
fn check_snapshot(snapshot: &ModelSnapshot) -> Result<(), GenerationError> {
    let root = &snapshot.root;
    if root.kind != NodeKind::Form {
        return Err(GenerationError::invalid_model(
            &root.identity,
            format!("generation root is a {}, expected a form", root.kind),
        ));
    }
    resolver::check_chain(
        std::iter::once(root.identity.as_str()).chain(snapshot.ancestors.iter().map(|a| a.identity.as_str())),
    )?;
    root.validate("")?;
    for ancestor in &snapshot.ancestors {
        ancestor.validate("")?;
    }
    for template in snapshot.templates.values() {
        template.validate("")?;
    }

    let mut sites = BTreeSet::new();
    for form in std::iter::once(root).chain(&snapshot.ancestors) {
        sites.extend(form.extension_sites().into_iter().map(|s| s.id.as_str()));
    }
    for decl in &snapshot.extensions {
        if sites.contains(decl.site.as_str()) {
            continue;
        }
        if snapshot.options.strict_extensions {
            return Err(GenerationError::invalid_model(
                &root.identity,
                format!("extension declared for unknown site `{}`", decl.site),
            ));
        }
        tracing::warn!(site = %decl.site, form = %root.identity, "extension declared for unknown site");
    }
    Ok(())
}

/// Where the node being built sits.
#[derive(Debug, Clone)]
struct Scope<'p> {
    /// Slash-separated source location.
    path: String,
    rel_path: Vec<String>,
    /// Output path of the type members are added to.
    out_path: Vec<String>,
    excluded: bool,
    /// Lineage of the enclosing node.
    lineage: Option<usize>,
    /// Type parameters in scope while synthesizing a template.
    params: &'p [String],
    /// The node is a top-level type and takes the `<identity>Data` name.
    top: bool,
}

impl<'p> Scope<'p> {
    fn top_level(params: &'p [String]) -> Self {
        Self {
            path: String::new(),
            rel_path: Vec::new(),
            out_path: Vec::new(),
            excluded: false,
            lineage: None,
            params,
            top: true,
        }
    }

    fn enter(&self, node: &SourceNode, out_path: Vec<String>, excluded: bool, lineage: usize) -> Self {
        let mut rel_path = self.rel_path.clone();
        rel_path.push(node.identity.clone());
        Self {
            path: join_path(&self.path, &node.identity),
            rel_path,
            out_path,
            excluded,
            lineage: Some(lineage),
            params: self.params,
            top: false,
        }
    }
}

fn join_path(parent: &str, identity: &str) -> String {
    if parent.is_empty() {
        identity.to_string()
    } else {
        format!("{parent}/{identity}")
    }
}

fn child_path(parent: &[String], name: &str) -> Vec<String> {
    let mut path = parent.to_vec();
    path.push(name.to_string());
    path
}

/// What a node hands back to its parent.
#[derive(Debug, Default)]
struct Built {
    members: Vec<Member>,
    child: Option<OutputNode>,
}

/// Builds one level (form or template) against an already resolved index.
struct LevelBuilder<'a> {
    snapshot: &'a ModelSnapshot,
    index: &'a AncestorIndex,
    lineage: &'a mut usize,
    entries: Vec<ResolvedEntry>,
}

impl<'a> LevelBuilder<'a> {
    fn new(snapshot: &'a ModelSnapshot, index: &'a AncestorIndex, lineage: &'a mut usize) -> Self {
        Self {
            snapshot,
            index,
            lineage,
            entries: Vec::new(),
        }
    }

    fn templates(&self) -> &'a TemplateSet {
        &self.snapshot.templates
    }

    fn defaults(&self) -> &'a RuleDefaults {
        &self.snapshot.options.rule_defaults
    }

    fn next_lineage(&mut self) -> usize {
        *self.lineage += 1;
        *self.lineage
    }

    fn build_form(&mut self, form: &SourceNode) -> Result<OutputNode, GenerationError> {
        let name = data_type_name(&form.identity);
        let super_type = match self.index.nearest() {
            Some(level) => SuperType::generated(vec![level.form_data.clone()]),
            None => SuperType::base(base_type(NodeKind::Form)),
        };
        let mut out = OutputNode::new(vec![name], OutputKind::FormData, super_type);
        let lineage = self.next_lineage();
        let scope = Scope {
            path: form.identity.clone(),
            rel_path: Vec::new(),
            out_path: out.path.clone(),
            excluded: false,
            lineage: Some(lineage),
            params: &[],
            top: false,
        };
        self.build_children(form, &scope, &mut out)?;
        self.attach_extensions(form, &scope, &mut out)?;
        tracing::debug!(form = %form.identity, nodes = out.node_count(), "synthesized form");
        Ok(out)
    }

    fn build_children(
        &mut self,
        node: &SourceNode,
        scope: &Scope<'_>,
        out: &mut OutputNode,
    ) -> Result<(), GenerationError> {
        for child in &node.children {
            let built = self.build_node(child, scope)?;
            out.members.extend(built.members);
            if let Some(c) = built.child {
                out.children.push(c);
            }
        }
        Ok(())
    }

    /// Resolve, classify and build one node and its subtree.
    fn build_node(&mut self, node: &SourceNode, scope: &Scope<'_>) -> Result<Built, GenerationError> {
        let path = join_path(&scope.path, &node.identity);
        let mut rel_path = scope.rel_path.clone();
        rel_path.push(node.identity.clone());

        let bound = generics::bind(node, &path, self.templates())?;
        let target = match (&node.super_type, &bound) {
            (Some(super_ref), None) if node.replace => super_ref.identity.as_str(),
            (Some(super_ref), None) => {
                return Err(GenerationError::invalid_model(
                    &path,
                    format!(
                        "super type `{}` is neither a template nor a replace target",
                        super_ref.identity
                    ),
                ));
            }
            _ => node.identity.as_str(),
        };

        let index = self.index;
        let pos = Position {
            path: &path,
            rel_path: &rel_path,
            target,
            parent_excluded: scope.excluded,
            container_lineage: scope.lineage,
        };
        let resolution = resolver::resolve(node, &pos, index)?;
        let superseded = resolution.supersedes;

        if let (Some(b), Some(prev)) = (&bound, superseded)
            && let Some(prev_binding) = &prev.binding
            && *prev_binding != b.binding
        {
            return Err(GenerationError::generic_binding(
                &path,
                format!(
                    "binds `{}` with <{}> but {} already binds <{}>",
                    b.binding.template,
                    join_types(&b.binding.args),
                    prev.output_path.join("."),
                    join_types(&prev_binding.args)
                ),
            ));
        }

        let value_type = node
            .value_type
            .clone()
            .or_else(|| bound.as_ref().and_then(|b| b.value_type.clone()))
            .or_else(|| superseded.and_then(|e| e.value_type.clone()));
        if node.kind.is_value_bearing() && value_type.is_none() {
            return Err(GenerationError::invalid_model(&path, "no value type declared or inherited"));
        }

        let lineage = match superseded {
            Some(entry) => entry.lineage,
            None => self.next_lineage(),
        };
        let excluded = !resolution.participates;

        let class = classify(node.kind);
        let own_name = match class {
            Classification::Property => property_type_name(&node.identity),
            _ if scope.top => data_type_name(&node.identity),
            _ => node.identity.clone(),
        };
        let output_path = match class {
            Classification::Column => scope.out_path.clone(),
            _ => child_path(&scope.out_path, &own_name),
        };
        let row_path = (class == Classification::Table)
            .then(|| child_path(&output_path, &row_type_name(&node.identity)));

        let rules = if carries_rules(node.kind) {
            let ancestor_rules = match (superseded, &bound) {
                (Some(entry), _) => Some(entry.rules.clone()),
                (None, Some(b)) => Some(self.template_rules(b.template, &mut Vec::new())?),
                (None, None) => None,
            };
            Some(compute_rules(node, value_type.as_ref(), ancestor_rules.as_ref(), self.defaults()))
        } else {
            None
        };

        let site = node
            .extension_site
            .clone()
            .or_else(|| superseded.and_then(|e| e.site.clone()));
        // A replacing site keeps the composites its ancestor already attached.
        let inherits_site = matches!(
            (&node.extension_site, superseded.and_then(|e| e.site.as_ref())),
            (Some(own), Some(prev)) if own.id == prev.id
        );

        self.entries.push(ResolvedEntry {
            identity: node.identity.clone(),
            kind: node.kind,
            rel_path: rel_path.clone(),
            output_path: output_path.clone(),
            row_path: row_path.clone(),
            excluded,
            lineage,
            parent_lineage: scope.lineage,
            rules: rules.as_ref().map(|r| r.state.clone()).unwrap_or_default(),
            value_type: value_type.clone(),
            binding: bound.as_ref().map(|b| b.binding.clone()),
            site: site.clone(),
        });

        if excluded {
            tracing::debug!(path = %path, "excluded");
            if let Some(site) = &site {
                self.reject_extended_site(site, &path)?;
            }
            let inner = scope.enter(node, row_path.unwrap_or(output_path), true, lineage);
            for child in &node.children {
                self.build_node(child, &inner)?;
            }
            return Ok(Built::default());
        }

        if node.extension_site.is_some() && node.kind != NodeKind::Box {
            return Err(GenerationError::invalid_model(
                &path,
                format!("a {} cannot be an extension site", node.kind),
            ));
        }

        let retyped = superseded.is_none_or(|entry| entry.value_type != value_type);
        let type_params = if scope.top {
            node.type_params.clone()
        } else {
            generics::mentioned_params(value_type.as_ref(), scope.params)
        };
        let super_type = derive_super(node.kind, superseded, bound.as_ref(), value_type.as_ref());

        match class {
            Classification::Column => {
                let mut built = Built::default();
                if retyped && let Some(vt) = value_type {
                    built.members = column_pair(&node.identity, vt, MemberKind::ColumnGetter, MemberKind::ColumnSetter);
                }
                Ok(built)
            }
            Classification::Property => {
                let vt = value_type.unwrap_or_else(|| TypeExpr::named("Object"));
                let mut holder = OutputNode::new(output_path, OutputKind::PropertyData, super_type);
                holder.type_params = type_params;
                Ok(Built {
                    members: property_members(&node.identity, &holder, vt),
                    child: Some(holder),
                })
            }
            Classification::Table => {
                let row_path = row_path.unwrap_or_else(|| child_path(&output_path, &row_type_name(&node.identity)));
                let mut table = OutputNode::new(output_path, OutputKind::TableData, super_type);
                table.type_params = type_params;
                apply_rules(&mut table, rules);

                let template_row = bound.as_ref().map(|b| {
                    let tpl = &b.template.identity;
                    vec![data_type_name(tpl), row_type_name(tpl)]
                });
                let row_super = match (superseded.and_then(|e| e.row_path.clone()), &bound, &template_row) {
                    (Some(path), _, _) => SuperType::generated(path),
                    (None, Some(b), Some(tpl_row)) => SuperType::Generated {
                        path: tpl_row.clone(),
                        args: bound_column_args(b.template, b),
                    },
                    _ => SuperType::base(base_type(NodeKind::TableColumn)),
                };
                let mut row = OutputNode::new(row_path.clone(), OutputKind::RowData, row_super);
                row.type_params = params_of_columns(node, scope.params);
                let inner = scope.enter(node, row_path, false, lineage);
                for column in &node.children {
                    let built = self.build_node(column, &inner)?;
                    row.members.extend(built.members);
                }
                if superseded.is_none()
                    && let (Some(b), Some(tpl_row)) = (&bound, &template_row)
                {
                    self.materialize_children(b.template, b, tpl_row, &mut row, &path)?;
                }
                table.members.extend(table_members(&row));
                table.children.push(row);
                Ok(self.finish(node, table, &path))
            }
            Classification::Structural | Classification::Root => {
                let mut out = OutputNode::new(output_path.clone(), OutputKind::FieldData, super_type);
                out.type_params = type_params;
                if node.kind == NodeKind::ValueField
                    && retyped
                    && let Some(vt) = value_type
                {
                    out.members.push(Member::getter("getValue", MemberKind::ValueGetter, vt.clone()));
                    out.members.push(Member::setter("setValue", MemberKind::ValueSetter, "value", vt));
                }
                apply_rules(&mut out, rules);

                let inner = scope.enter(node, output_path, false, lineage);
                self.build_children(node, &inner, &mut out)?;
                if superseded.is_none()
                    && let Some(b) = &bound
                {
                    let template_root = vec![data_type_name(&b.template.identity)];
                    self.materialize_children(b.template, b, &template_root, &mut out, &path)?;
                }
                if inherits_site {
                    tracing::debug!(path = %path, "extension composites inherited");
                } else {
                    self.attach_extensions(node, &inner, &mut out)?;
                }
                Ok(self.finish(node, out, &path))
            }
        }
    }

    /// Wrap a finished nested type with its parent accessor.
    fn finish(&self, node: &SourceNode, out: OutputNode, path: &str) -> Built {
        tracing::debug!(path, super_type = %out.super_type, "synthesized node");
        let accessor = Member::getter(
            format!("get{}", capitalize(&node.identity)),
            MemberKind::FieldAccessor,
            out.type_ref(),
        );
        Built {
            members: vec![accessor],
            child: Some(out),
        }
    }

    /// Effective rules a template hands to its consumers.
    fn template_rules(
        &self,
        template: &SourceNode,
        visiting: &mut Vec<String>,
    ) -> Result<RuleState, GenerationError> {
        if visiting.contains(&template.identity) {
            visiting.push(template.identity.clone());
            return Err(GenerationError::replace_ambiguity(
                &template.identity,
                format!("cyclic template chain: {}", visiting.join(" -> ")),
            ));
        }
        visiting.push(template.identity.clone());
        let parent = match template
            .super_type
            .as_ref()
            .and_then(|s| self.templates().get(&s.identity))
        {
            Some(next) => Some(self.template_rules(next, visiting)?),
            None => None,
        };
        let value_type = generics::template_value_type(template, self.templates())?;
        Ok(compute_rules(template, value_type.as_ref(), parent.as_ref(), self.defaults()).state)
    }

    /// Re-declare the parts of a template that mention its parameters, with
    /// the consumer's bindings substituted.
    ///
    /// `template_path` is the output path of the template node matching `out`.
    fn materialize_children(
        &self,
        template_node: &SourceNode,
        bound: &Bound<'_>,
        template_path: &[String],
        out: &mut OutputNode,
        path: &str,
    ) -> Result<(), GenerationError> {
        let params = &bound.template.type_params;
        for child in &template_node.children {
            if !generics::subtree_mentions(child, params) {
                continue;
            }
            let child_location = join_path(path, &child.identity);
            let bound_type = child.value_type.as_ref().map(|t| t.substitute(&bound.bindings));
            let args: Vec<TypeExpr> = generics::mentioned_params(child.value_type.as_ref(), params)
                .iter()
                .map(|p| TypeExpr::named(p).substitute(&bound.bindings))
                .collect();

            match classify(child.kind) {
                Classification::Column => {
                    if let Some(vt) = bound_type {
                        out.members.extend(column_pair(
                            &child.identity,
                            vt,
                            MemberKind::ColumnGetter,
                            MemberKind::ColumnSetter,
                        ));
                    }
                }
                Classification::Property => {
                    let name = property_type_name(&child.identity);
                    let super_type = SuperType::Generated {
                        path: child_path(template_path, &name),
                        args,
                    };
                    let holder = OutputNode::new(child_path(&out.path, &name), OutputKind::PropertyData, super_type);
                    let vt = bound_type.unwrap_or_else(|| TypeExpr::named("Object"));
                    push_unique(out, property_members(&child.identity, &holder, vt), holder, &child_location)?;
                }
                Classification::Table => {
                    let tpl_table = child_path(template_path, &child.identity);
                    let tpl_row = child_path(&tpl_table, &row_type_name(&child.identity));
                    let table_path = child_path(&out.path, &child.identity);
                    let mut table = OutputNode::new(table_path.clone(), OutputKind::TableData, SuperType::generated(tpl_table));
                    let row_args = bound_column_args(child, bound);
                    let mut row = OutputNode::new(
                        child_path(&table_path, &row_type_name(&child.identity)),
                        OutputKind::RowData,
                        SuperType::Generated {
                            path: tpl_row.clone(),
                            args: row_args,
                        },
                    );
                    self.materialize_children(child, bound, &tpl_row, &mut row, &child_location)?;
                    table.members.extend(table_members(&row));
                    table.children.push(row);
                    let accessor = Member::getter(
                        format!("get{}", capitalize(&child.identity)),
                        MemberKind::FieldAccessor,
                        table.type_ref(),
                    );
                    push_unique(out, vec![accessor], table, &child_location)?;
                }
                Classification::Structural | Classification::Root => {
                    let tpl_child = child_path(template_path, &child.identity);
                    let mut node_out = OutputNode::new(
                        child_path(&out.path, &child.identity),
                        OutputKind::FieldData,
                        SuperType::Generated { path: tpl_child.clone(), args },
                    );
                    if let Some(vt) = bound_type {
                        node_out.members.push(Member::getter("getValue", MemberKind::ValueGetter, vt.clone()));
                        node_out.members.push(Member::setter("setValue", MemberKind::ValueSetter, "value", vt));
                    }
                    self.materialize_children(child, bound, &tpl_child, &mut node_out, &child_location)?;
                    let accessor = Member::getter(
                        format!("get{}", capitalize(&child.identity)),
                        MemberKind::FieldAccessor,
                        node_out.type_ref(),
                    );
                    push_unique(out, vec![accessor], node_out, &child_location)?;
                }
            }
        }
        Ok(())
    }

    /// Append the composite members contributed to `node`'s extension site.
    /// Fail when a site that takes no part in the output still has layers
    /// contributing members.
    fn reject_extended_site(&self, site: &ExtensionSite, path: &str) -> Result<(), GenerationError> {
        let decls: Vec<&ExtensionDecl> = self
            .snapshot
            .extensions
            .iter()
            .filter(|d| d.site == site.id)
            .collect();
        for composite in extension::compose(site, &decls, path)? {
            if !matches!(composite.outcome, Composite::Ignored | Composite::Empty) {
                return Err(GenerationError::ignore_conflict(
                    path,
                    format!(
                        "site `{}` is ignored but contribution `{}` still declares a member",
                        site.id, composite.name
                    ),
                ));
            }
        }
        Ok(())
    }

    fn attach_extensions(
        &mut self,
        node: &SourceNode,
        scope: &Scope<'_>,
        out: &mut OutputNode,
    ) -> Result<(), GenerationError> {
        let Some(site) = &node.extension_site else {
            return Ok(());
        };
        let snapshot = self.snapshot;
        let decls: Vec<&ExtensionDecl> = snapshot
            .extensions
            .iter()
            .filter(|d| d.site == site.id)
            .collect();
        let composed = extension::compose(site, &decls, &scope.path)?;

        for composite in composed {
            let location = join_path(&scope.path, &composite.name);
            match composite.outcome {
                Composite::Ignored | Composite::Empty => {
                    tracing::debug!(site = %site.id, name = %composite.name, "extension contributes no member");
                }
                Composite::External { reference } => {
                    let handle = snapshot.external_types.get(reference).cloned().ok_or_else(|| {
                        GenerationError::UnresolvedExternalType {
                            site: site.id.clone(),
                            reference: reference.to_string(),
                        }
                    })?;
                    let member = OutputNode::new(
                        child_path(&out.path, &composite.name),
                        OutputKind::FieldData,
                        SuperType::External {
                            reference: reference.to_string(),
                            handle,
                        },
                    );
                    let accessor = Member::getter(
                        format!("get{}", capitalize(&composite.name)),
                        MemberKind::FieldAccessor,
                        member.type_ref(),
                    );
                    push_unique(out, vec![accessor], member, &location)?;
                }
                Composite::Derived { member } => {
                    let mut derived = member.clone();
                    derived.identity.clone_from(&composite.name);
                    derived.replace = false;
                    derived.ignored = false;
                    let built = self.build_node(&derived, scope)?;
                    if let Some(child) = built.child {
                        push_unique(out, built.members, child, &location)?;
                    } else {
                        out.members.extend(built.members);
                    }
                }
            }
        }
        Ok(())
    }
}

fn carries_rules(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Box | NodeKind::ValueField | NodeKind::PlainField | NodeKind::TableField
    )
}

/// Super type of a nested type: the superseded output, the consumed
/// template, or a well-known base.
fn derive_super(
    kind: NodeKind,
    superseded: Option<&ResolvedEntry>,
    bound: Option<&Bound<'_>>,
    value_type: Option<&TypeExpr>,
) -> SuperType {
    if let Some(entry) = superseded {
        return SuperType::generated(entry.output_path.clone());
    }
    if let Some(b) = bound {
        let name = if kind == NodeKind::BeanProperty {
            property_type_name(&b.template.identity)
        } else {
            data_type_name(&b.template.identity)
        };
        return SuperType::Generated {
            path: vec![name],
            args: b.binding.args.clone(),
        };
    }
    match (kind, value_type) {
        (NodeKind::ValueField | NodeKind::BeanProperty, Some(vt)) => SuperType::base_of(base_type(kind), vt.clone()),
        _ => SuperType::base(base_type(kind)),
    }
}

fn apply_rules(out: &mut OutputNode, rules: Option<RuleDiff>) {
    let Some(diff) = rules else {
        return;
    };
    out.effective_rules = diff.state.rules;
    if !diff.statements.is_empty() {
        out.rule_statements = diff.statements;
        out.members.push(Member {
            name: "initValidationRules".to_string(),
            kind: MemberKind::InitValidationRules,
            params: Vec::new(),
            returns: None,
        });
    }
}

/// Getter/setter pair named after `identity`.
fn column_pair(identity: &str, vt: TypeExpr, get: MemberKind, set: MemberKind) -> Vec<Member> {
    let cap = capitalize(identity);
    vec![
        Member::getter(format!("get{cap}"), get, vt.clone()),
        Member::setter(format!("set{cap}"), set, decapitalize(identity), vt),
    ]
}

/// Property accessor plus the flattened legacy pair.
fn property_members(identity: &str, holder: &OutputNode, vt: TypeExpr) -> Vec<Member> {
    let cap = capitalize(identity);
    let getter = if vt.is_simple("boolean") {
        format!("is{cap}")
    } else {
        format!("get{cap}")
    };
    vec![
        Member::getter(format!("get{cap}Property"), MemberKind::PropertyAccessor, holder.type_ref()),
        Member::getter(getter, MemberKind::LegacyGetter, vt.clone()),
        Member::setter(format!("set{cap}"), MemberKind::LegacySetter, decapitalize(identity), vt),
    ]
}

/// Collection accessors of a table over its row bean.
fn table_members(row: &OutputNode) -> Vec<Member> {
    let row_type = row.type_ref();
    let rows = TypeExpr::array(row_type.clone());
    vec![
        Member::getter("addRow", MemberKind::AddRow, row_type.clone()),
        Member::getter("createRow", MemberKind::CreateRow, row_type.clone()),
        Member::getter("getRows", MemberKind::GetRows, rows.clone()),
        Member::setter("setRows", MemberKind::SetRows, "rows", rows),
        Member::getter(
            "getRowType",
            MemberKind::GetRowType,
            TypeExpr::generic("Class", vec![row_type.clone()]),
        ),
        Member {
            name: "rowAt".to_string(),
            kind: MemberKind::RowAt,
            params: vec![Param {
                name: "index".to_string(),
                ty: TypeExpr::named("int"),
            }],
            returns: Some(row_type),
        },
    ]
}

/// Parameters mentioned by any column of `table`, in declaration order.
fn params_of_columns(table: &SourceNode, params: &[String]) -> Vec<String> {
    params
        .iter()
        .filter(|p| {
            table
                .children
                .iter()
                .any(|c| c.value_type.as_ref().is_some_and(|t| t.mentions_any(std::slice::from_ref(*p))))
        })
        .cloned()
        .collect()
}

/// Row bean arguments a consumer binds for the columns of `table`.
fn bound_column_args(table: &SourceNode, bound: &Bound<'_>) -> Vec<TypeExpr> {
    params_of_columns(table, &bound.template.type_params)
        .iter()
        .map(|p| TypeExpr::named(p).substitute(&bound.bindings))
        .collect()
}

/// Add a nested type and its accessors, rejecting name collisions.
fn push_unique(
    out: &mut OutputNode,
    members: Vec<Member>,
    child: OutputNode,
    path: &str,
) -> Result<(), GenerationError> {
    if out.child(&child.name).is_some() {
        return Err(GenerationError::invalid_model(
            path,
            format!("`{}` collides with an existing member of {}", child.name, out.qualified_name()),
        ));
    }
    out.members.extend(members);
    out.children.push(child);
    Ok(())
}

fn join_types(types: &[TypeExpr]) -> String {
    types.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}
