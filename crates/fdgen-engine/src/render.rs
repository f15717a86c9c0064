//! Render an output tree as Java-like source, or as structured JSON.

use crate::classify::decapitalize;
use fdgen_core::config::RenderConfig;
use fdgen_core::output::{Member, MemberKind, OutputNode, RuleStatement};
use fdgen_core::rules::{RuleKey, RuleValue, RuleValueKind};
use fdgen_core::types::TypeExpr;
use std::fmt::Write;

/// Output format for rendered trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderFormat {
    Java,
    Json,
}

impl RenderFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Java => "java",
            Self::Json => "json",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub indent: usize,
    pub package: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            indent: 4,
            package: String::new(),
        }
    }
}

impl From<&RenderConfig> for RenderOptions {
    fn from(config: &RenderConfig) -> Self {
        Self {
            indent: config.indent,
            package: config.package.clone(),
        }
    }
}

/// Render in the requested format.
pub fn render(node: &OutputNode, format: RenderFormat, options: &RenderOptions) -> anyhow::Result<String> {
    match format {
        RenderFormat::Java => Ok(render_java(node, options)),
        RenderFormat::Json => to_json(node),
    }
}

/// Serialize the tree as pretty-printed JSON.
pub fn to_json(node: &OutputNode) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(node)?)
}

/// Render the tree as one Java-like compilation unit.
pub fn render_java(node: &OutputNode, options: &RenderOptions) -> String {
    let mut out = String::new();
    if !options.package.is_empty() {
        writeln!(out, "package {};", options.package).unwrap();
        writeln!(out).unwrap();
    }
    writeln!(out, "// Generated by fdgen. Do not edit.").unwrap();
    write_type(node, 0, true, options, &mut out);
    out
}

fn write_type(node: &OutputNode, depth: usize, top: bool, options: &RenderOptions, out: &mut String) {
    let pad = " ".repeat(depth * options.indent);
    let inner = " ".repeat((depth + 1) * options.indent);

    let modifiers = match (top, node.type_params.is_empty()) {
        (true, true) => "public class",
        (true, false) => "public abstract class",
        (false, true) => "public static class",
        (false, false) => "public abstract static class",
    };
    writeln!(
        out,
        "{pad}{modifiers} {} extends {} {{",
        node.type_ref(),
        node.super_type
    )
    .unwrap();

    let columns: Vec<&Member> = node
        .members
        .iter()
        .filter(|m| m.kind == MemberKind::ColumnGetter)
        .collect();
    for column in &columns {
        if let Some(ty) = &column.returns {
            writeln!(out, "{inner}private {ty} {};", field_name(&column.name)).unwrap();
        }
    }
    if !columns.is_empty() {
        writeln!(out).unwrap();
    }

    for member in &node.members {
        write_member(node, member, &inner, options, out);
    }
    for child in &node.children {
        writeln!(out).unwrap();
        write_type(child, depth + 1, false, options, out);
    }
    writeln!(out, "{pad}}}").unwrap();
}

fn write_member(node: &OutputNode, member: &Member, pad: &str, options: &RenderOptions, out: &mut String) {
    let body_pad = format!("{pad}{}", " ".repeat(options.indent));
    let returns = member
        .returns
        .as_ref()
        .map_or_else(|| "void".to_string(), ToString::to_string);
    let params = member
        .params
        .iter()
        .map(|p| format!("{} {}", p.ty, p.name))
        .collect::<Vec<_>>()
        .join(", ");

    if member.kind == MemberKind::InitValidationRules {
        writeln!(out, "{pad}@Override").unwrap();
        writeln!(out, "{pad}protected void initValidationRules(Map<String, Object> ruleMap) {{").unwrap();
        writeln!(out, "{body_pad}super.initValidationRules(ruleMap);").unwrap();
        for statement in &node.rule_statements {
            match statement {
                RuleStatement::Remove { key } => {
                    writeln!(out, "{body_pad}ruleMap.remove(ValidationRule.{});", key.wire_name()).unwrap();
                }
                RuleStatement::Add { key, value } => {
                    writeln!(
                        out,
                        "{body_pad}ruleMap.put(ValidationRule.{}, {});",
                        key.wire_name(),
                        rule_literal(*key, value)
                    )
                    .unwrap();
                }
            }
        }
        writeln!(out, "{pad}}}").unwrap();
        writeln!(out).unwrap();
        return;
    }

    writeln!(out, "{pad}public {returns} {}({params}) {{", member.name).unwrap();
    writeln!(out, "{body_pad}{}", member_body(member, &returns)).unwrap();
    writeln!(out, "{pad}}}").unwrap();
    writeln!(out).unwrap();
}

fn member_body(member: &Member, returns: &str) -> String {
    let param = member.params.first().map_or("", |p| p.name.as_str());
    let holder = member
        .name
        .strip_prefix("get")
        .or_else(|| member.name.strip_prefix("is"))
        .or_else(|| member.name.strip_prefix("set"))
        .unwrap_or(&member.name);
    // Class literals take the erased type.
    let erased = member.returns.as_ref().and_then(TypeExpr::head).unwrap_or(returns);
    match member.kind {
        MemberKind::FieldAccessor => format!("return getFieldByClass({erased}.class);"),
        MemberKind::PropertyAccessor => format!("return getPropertyByClass({erased}.class);"),
        MemberKind::LegacyGetter => format!("return get{holder}Property().getValue();"),
        MemberKind::LegacySetter => format!("get{holder}Property().setValue({param});"),
        MemberKind::ValueGetter => "return super.getValue();".to_string(),
        MemberKind::ValueSetter => format!("super.setValue({param});"),
        MemberKind::AddRow | MemberKind::RowAt | MemberKind::GetRows => {
            let call = if member.kind == MemberKind::RowAt {
                format!("rowAt({param})")
            } else {
                format!("{}()", member.name)
            };
            format!("return ({returns}) super.{call};")
        }
        MemberKind::CreateRow => format!("return new {returns}();"),
        MemberKind::SetRows => format!("super.setRows({param});"),
        MemberKind::GetRowType => {
            let row = member
                .returns
                .as_ref()
                .and_then(|t| match t {
                    TypeExpr::Named { args, .. } => args.first().and_then(TypeExpr::head).map(str::to_string),
                    TypeExpr::Array(_) => None,
                })
                .unwrap_or_default();
            format!("return {row}.class;")
        }
        MemberKind::ColumnGetter => format!("return {};", field_name(&member.name)),
        MemberKind::ColumnSetter => format!("{} = {param};", field_name(&member.name)),
        MemberKind::InitValidationRules => String::new(),
    }
}

/// Backing field of a column accessor: `getFirst` → `m_first`.
fn field_name(accessor: &str) -> String {
    let bare = accessor
        .strip_prefix("get")
        .or_else(|| accessor.strip_prefix("set"))
        .unwrap_or(accessor);
    format!("m_{}", decapitalize(bare))
}

fn rule_literal(key: RuleKey, value: &RuleValue) -> String {
    match (key.value_kind(), value) {
        (_, RuleValue::Bool(b)) => b.to_string(),
        (_, RuleValue::Integer(n)) if i32::try_from(*n).is_ok() => n.to_string(),
        (_, RuleValue::Integer(n)) => format!("{n}L"),
        (RuleValueKind::TypeLiteral | RuleValueKind::FieldRef, RuleValue::Text(s)) => format!("{s}.class"),
        (_, RuleValue::Text(s)) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
    }
}
