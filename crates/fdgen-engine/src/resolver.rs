//! Override resolver: decides whether a node is new, ignored, or replaces an
//! ancestor node of the same identity.
//!
//! Ancestor forms are resolved farthest-first into an [`AncestorIndex`]; each
//! level records one [`ResolvedEntry`] per source node it declared (including
//! excluded ones, so later levels can detect ignore conflicts).

use crate::rule_diff::RuleState;
use fdgen_core::error::GenerationError;
use fdgen_core::model::{ExtensionSite, NodeKind, SourceNode};
use fdgen_core::types::TypeExpr;
use std::collections::HashSet;

/// A template consumed by a node, with the arguments bound to its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateBinding {
    pub template: String,
    pub args: Vec<TypeExpr>,
}

/// Everything later levels need to know about an already resolved node.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEntry {
    pub identity: String,
    pub kind: NodeKind,
    /// Source identities from the form root (exclusive) down to this node.
    pub rel_path: Vec<String>,
    /// Path of the generated node; for columns, the row bean's path.
    pub output_path: Vec<String>,
    /// Row bean path of a table field.
    pub row_path: Option<Vec<String>>,
    pub excluded: bool,
    /// Shared by a node and every node that replaces it.
    pub lineage: usize,
    pub parent_lineage: Option<usize>,
    pub rules: RuleState,
    pub value_type: Option<TypeExpr>,
    pub binding: Option<TemplateBinding>,
    /// Extension site in effect at this node, declared or inherited.
    pub site: Option<ExtensionSite>,
}

/// One resolved ancestor form.
#[derive(Debug, Clone, PartialEq)]
pub struct AncestorLevel {
    pub form: String,
    /// Name of the top-level data type generated for the form.
    pub form_data: String,
    pub entries: Vec<ResolvedEntry>,
}

/// Resolved ancestor chain, nearest level first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AncestorIndex {
    levels: Vec<AncestorLevel>,
}

impl AncestorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a level nearer than every existing one.
    pub fn push_nearest(&mut self, level: AncestorLevel) {
        self.levels.insert(0, level);
    }

    pub fn levels(&self) -> &[AncestorLevel] {
        &self.levels
    }

    pub fn nearest(&self) -> Option<&AncestorLevel> {
        self.levels.first()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

/// Where a node sits while it is being resolved.
#[derive(Debug, Clone, Copy)]
pub struct Position<'p> {
    /// Slash-separated location for error messages.
    pub path: &'p str,
    /// Source identities from the form root (exclusive) down to the node.
    pub rel_path: &'p [String],
    /// Identity to look up among ancestors: the node's own identity, or an
    /// explicit replace target.
    pub target: &'p str,
    pub parent_excluded: bool,
    /// Lineage of the enclosing node. Replacing containers keep the lineage
    /// of the container they replace.
    pub container_lineage: Option<usize>,
}

/// Outcome of [`resolve`].
#[derive(Debug, Clone, Copy)]
pub struct Resolution<'a> {
    pub participates: bool,
    pub supersedes: Option<&'a ResolvedEntry>,
}

/// Resolve a node against the ancestor chain.
pub fn resolve<'a>(
    node: &SourceNode,
    pos: &Position<'_>,
    index: &'a AncestorIndex,
) -> Result<Resolution<'a>, GenerationError> {
    let found = find_candidate(node, pos, index)?;

    let supersedes = match (found, node.replace) {
        (None, false) => None,
        (None, true) => {
            return Err(GenerationError::replace_ambiguity(
                pos.path,
                format!("marked as replace but no ancestor declares `{}`", pos.target),
            ));
        }
        (Some(entry), false) => {
            return Err(GenerationError::replace_ambiguity(
                pos.path,
                format!(
                    "`{}` is already declared at {} without replace intent",
                    node.identity,
                    entry.output_path.join(".")
                ),
            ));
        }
        (Some(entry), true) => Some(entry),
    };

    if let Some(entry) = supersedes {
        if entry.kind != node.kind {
            return Err(GenerationError::replace_ambiguity(
                pos.path,
                format!("a {} cannot replace the {} `{}`", node.kind, entry.kind, entry.identity),
            ));
        }
        if entry.excluded && !node.ignored && !pos.parent_excluded {
            return Err(GenerationError::ignore_conflict(
                pos.path,
                format!(
                    "replaces the ignored `{}` at {} without being ignored itself",
                    entry.identity,
                    entry.output_path.join(".")
                ),
            ));
        }
    }

    let participates = !(node.ignored
        || pos.parent_excluded
        || supersedes.is_some_and(|entry| entry.excluded));

    tracing::debug!(
        path = pos.path,
        participates,
        supersedes = ?supersedes.map(|e| e.output_path.join(".")),
        "resolved node"
    );

    Ok(Resolution {
        participates,
        supersedes,
    })
}

/// Nearest-first search for the single ancestor node `pos.target` refers to.
///
/// Replace nodes may reach anywhere in a level. Other nodes only collide with
/// nodes in the same container: same relative position, or a container the
/// enclosing node replaces.
fn find_candidate<'a>(
    node: &SourceNode,
    pos: &Position<'_>,
    index: &'a AncestorIndex,
) -> Result<Option<&'a ResolvedEntry>, GenerationError> {
    let is_column = node.kind == NodeKind::TableColumn;
    for level in index.levels() {
        let candidates: Vec<&ResolvedEntry> = level
            .entries
            .iter()
            .filter(|e| e.identity == pos.target)
            .filter(|e| {
                if is_column {
                    e.kind == NodeKind::TableColumn && same_container(e, pos)
                } else {
                    e.kind != NodeKind::TableColumn
                }
            })
            .filter(|e| {
                node.replace
                    || same_relative_position(&e.rel_path, pos.rel_path)
                    || same_container(e, pos)
            })
            .collect();

        match candidates.as_slice() {
            [] => {}
            [single] => return Ok(Some(*single)),
            many => {
                let same_position: Vec<&&ResolvedEntry> = many
                    .iter()
                    .filter(|e| same_relative_position(&e.rel_path, pos.rel_path))
                    .collect();
                if let [single] = same_position.as_slice() {
                    return Ok(Some(**single));
                }
                let places: Vec<String> = many.iter().map(|e| e.output_path.join(".")).collect();
                return Err(GenerationError::replace_ambiguity(
                    pos.path,
                    format!(
                        "`{}` matches {} nodes in {}: {}",
                        pos.target,
                        many.len(),
                        level.form,
                        places.join(", ")
                    ),
                ));
            }
        }
    }
    Ok(None)
}

fn same_container(entry: &ResolvedEntry, pos: &Position<'_>) -> bool {
    pos.container_lineage.is_some() && entry.parent_lineage == pos.container_lineage
}

/// Compare the containers of two nodes, ignoring the nodes' own identities.
fn same_relative_position(a: &[String], b: &[String]) -> bool {
    a[..a.len().saturating_sub(1)] == b[..b.len().saturating_sub(1)]
}

/// Reject super-type chains that revisit an identity.
///
/// `chain` lists the root first, then its ancestors nearest first.
pub fn check_chain<'a>(chain: impl IntoIterator<Item = &'a str>) -> Result<(), GenerationError> {
    let mut visited = HashSet::new();
    let mut walked = Vec::new();
    for identity in chain {
        walked.push(identity);
        if !visited.insert(identity) {
            return Err(GenerationError::replace_ambiguity(
                identity,
                format!("cyclic super-type chain: {}", walked.join(" -> ")),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(identity: &str, kind: NodeKind, rel: &[&str], lineage: usize) -> ResolvedEntry {
        ResolvedEntry {
            identity: identity.to_string(),
            kind,
            rel_path: rel.iter().map(|s| (*s).to_string()).collect(),
            output_path: std::iter::once("BaseFormData")
                .chain(rel.iter().copied())
                .map(str::to_string)
                .collect(),
            row_path: None,
            excluded: false,
            lineage,
            parent_lineage: None,
            rules: RuleState::default(),
            value_type: Some(TypeExpr::named("String")),
            binding: None,
            site: None,
        }
    }

    fn index_with(entries: Vec<ResolvedEntry>) -> AncestorIndex {
        let mut index = AncestorIndex::new();
        index.push_nearest(AncestorLevel {
            form: "BaseForm".into(),
            form_data: "BaseFormData".into(),
            entries,
        });
        index
    }

    fn pos<'p>(path: &'p str, rel: &'p [String], target: &'p str) -> Position<'p> {
        Position {
            path,
            rel_path: rel,
            target,
            parent_excluded: false,
            container_lineage: None,
        }
    }

    fn field(identity: &str) -> SourceNode {
        SourceNode::value_field(identity, TypeExpr::named("String"))
    }

    #[test]
    fn test_new_node() {
        let index = index_with(vec![entry("Name", NodeKind::ValueField, &["MainBox", "Name"], 1)]);
        let rel = vec!["Street".to_string()];
        let r = resolve(&field("Street"), &pos("F/Street", &rel, "Street"), &index).unwrap();
        assert!(r.participates);
        assert!(r.supersedes.is_none());
    }

    #[test]
    fn test_same_identity_without_replace_is_ambiguous() {
        let index = index_with(vec![entry("Name", NodeKind::ValueField, &["MainBox", "Name"], 1)]);
        let rel = vec!["MainBox".to_string(), "Name".to_string()];
        let err = resolve(&field("Name"), &pos("F/MainBox/Name", &rel, "Name"), &index).unwrap_err();
        assert!(matches!(err, GenerationError::ReplaceAmbiguity { .. }));
    }

    #[test]
    fn test_same_identity_in_other_container_is_new() {
        let mut person_name = entry("Name", NodeKind::ValueField, &["PersonBox", "Name"], 1);
        person_name.parent_lineage = Some(20);
        let index = index_with(vec![person_name]);
        let rel = vec!["CompanyBox".to_string(), "Name".to_string()];

        let mut p = pos("F/CompanyBox/Name", &rel, "Name");
        p.container_lineage = Some(30);
        let r = resolve(&field("Name"), &p, &index).unwrap();
        assert!(r.supersedes.is_none());

        // Inside a box that replaces PersonBox under another name.
        p.container_lineage = Some(20);
        let err = resolve(&field("Name"), &p, &index).unwrap_err();
        assert!(matches!(err, GenerationError::ReplaceAmbiguity { .. }));
    }

    #[test]
    fn test_replace_finds_node_anywhere_in_ancestor() {
        let index = index_with(vec![entry("Name", NodeKind::ValueField, &["MainBox", "Name"], 7)]);
        let rel = vec!["Name".to_string()];
        let r = resolve(&field("Name").replacing(), &pos("F/Name", &rel, "Name"), &index).unwrap();
        assert_eq!(r.supersedes.map(|e| e.lineage), Some(7));
    }

    #[test]
    fn test_replace_without_target() {
        let index = AncestorIndex::new();
        let rel = vec!["Name".to_string()];
        let err = resolve(&field("Name").replacing(), &pos("F/Name", &rel, "Name"), &index).unwrap_err();
        assert!(err.to_string().contains("no ancestor declares"));
    }

    #[test]
    fn test_replace_searches_transitive_chain() {
        let mut index = index_with(vec![entry("Name", NodeKind::ValueField, &["Name"], 3)]);
        index.push_nearest(AncestorLevel {
            form: "MiddleForm".into(),
            form_data: "MiddleFormData".into(),
            entries: vec![entry("Other", NodeKind::ValueField, &["Other"], 4)],
        });
        let rel = vec!["Name".to_string()];
        let r = resolve(&field("Name").replacing(), &pos("F/Name", &rel, "Name"), &index).unwrap();
        assert_eq!(r.supersedes.map(|e| e.lineage), Some(3));
    }

    #[test]
    fn test_nearest_level_wins() {
        let mut index = index_with(vec![entry("Name", NodeKind::ValueField, &["Name"], 3)]);
        let mut middle = entry("Name", NodeKind::ValueField, &["Name"], 3);
        middle.output_path[0] = "MiddleFormData".into();
        index.push_nearest(AncestorLevel {
            form: "MiddleForm".into(),
            form_data: "MiddleFormData".into(),
            entries: vec![middle],
        });
        let rel = vec!["Name".to_string()];
        let r = resolve(&field("Name").replacing(), &pos("F/Name", &rel, "Name"), &index).unwrap();
        assert_eq!(
            r.supersedes.map(|e| e.output_path[0].as_str()),
            Some("MiddleFormData")
        );
        assert_eq!(index.nearest().map(|l| l.form.as_str()), Some("MiddleForm"));
    }

    #[test]
    fn test_multiple_matches_disambiguated_by_position() {
        let index = index_with(vec![
            entry("Name", NodeKind::ValueField, &["BoxA", "Name"], 1),
            entry("Name", NodeKind::ValueField, &["BoxB", "Name"], 2),
        ]);
        let rel = vec!["BoxB".to_string(), "Name".to_string()];
        let r = resolve(&field("Name").replacing(), &pos("F/BoxB/Name", &rel, "Name"), &index).unwrap();
        assert_eq!(r.supersedes.map(|e| e.lineage), Some(2));

        let rel = vec!["Name".to_string()];
        let err = resolve(&field("Name").replacing(), &pos("F/Name", &rel, "Name"), &index).unwrap_err();
        assert!(err.to_string().contains("matches 2 nodes"));
    }

    #[test]
    fn test_ignore_propagation() {
        let mut ignored = entry("Name", NodeKind::ValueField, &["Name"], 1);
        ignored.excluded = true;
        let index = index_with(vec![ignored]);
        let rel = vec!["Name".to_string()];

        let err = resolve(&field("Name").replacing(), &pos("F/Name", &rel, "Name"), &index).unwrap_err();
        assert!(matches!(err, GenerationError::IgnoreConflict { .. }));

        let r = resolve(
            &field("Name").replacing().ignoring(),
            &pos("F/Name", &rel, "Name"),
            &index,
        )
        .unwrap();
        assert!(!r.participates);
    }

    #[test]
    fn test_kind_mismatch() {
        let index = index_with(vec![entry("Name", NodeKind::ValueField, &["Name"], 1)]);
        let rel = vec!["Name".to_string()];
        let err = resolve(
            &SourceNode::group("Name").replacing(),
            &pos("F/Name", &rel, "Name"),
            &index,
        )
        .unwrap_err();
        assert!(err.to_string().contains("cannot replace"));
    }

    #[test]
    fn test_columns_match_only_within_table_lineage() {
        let mut col = entry("first", NodeKind::TableColumn, &["Table", "first"], 10);
        col.parent_lineage = Some(5);
        let index = index_with(vec![col, entry("first", NodeKind::ValueField, &["first"], 11)]);
        let rel = vec!["Table".to_string(), "first".to_string()];
        let column = SourceNode::column("first", TypeExpr::named("Long")).replacing();

        let mut p = pos("F/Table/first", &rel, "first");
        p.container_lineage = Some(5);
        let r = resolve(&column, &p, &index).unwrap();
        assert_eq!(r.supersedes.map(|e| e.lineage), Some(10));

        p.container_lineage = Some(6);
        assert!(resolve(&column, &p, &index).is_err());
    }

    #[test]
    fn test_check_chain_detects_cycles() {
        assert!(check_chain(["A", "B", "C"]).is_ok());
        let err = check_chain(["A", "B", "A"]).unwrap_err();
        assert!(err.to_string().contains("A -> B -> A"));
    }
}
