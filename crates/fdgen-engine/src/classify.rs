//! Field/property classification and output naming.

use fdgen_core::model::NodeKind;
use fdgen_core::output::BaseType;

/// How a source node contributes to the output tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The form itself; becomes the top-level data type.
    Root,
    /// Box, value field or plain field: a nested data holder plus an accessor.
    Structural,
    /// Table field: a nested table bean holding a generated row bean.
    Table,
    /// Table column: a property pair on the enclosing table's row bean.
    Column,
    /// Bean property: a nested property holder plus legacy accessors.
    Property,
}

pub fn classify(kind: NodeKind) -> Classification {
    match kind {
        NodeKind::Form => Classification::Root,
        NodeKind::Box | NodeKind::ValueField | NodeKind::PlainField => Classification::Structural,
        NodeKind::TableField => Classification::Table,
        NodeKind::TableColumn => Classification::Column,
        NodeKind::BeanProperty => Classification::Property,
    }
}

/// Base type of a freshly derived node of `kind`.
pub fn base_type(kind: NodeKind) -> BaseType {
    match kind {
        NodeKind::Form => BaseType::AbstractFormData,
        NodeKind::Box | NodeKind::PlainField => BaseType::AbstractFormFieldData,
        NodeKind::ValueField => BaseType::AbstractValueFieldData,
        NodeKind::TableField => BaseType::AbstractTableFieldBeanData,
        NodeKind::TableColumn => BaseType::AbstractTableRowData,
        NodeKind::BeanProperty => BaseType::AbstractPropertyData,
    }
}

/// Upper-case the first character: `firstName` → `FirstName`.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lower-case the first character, used for parameter names.
pub fn decapitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Name of the top-level data type generated for a form or template.
pub fn data_type_name(identity: &str) -> String {
    format!("{identity}Data")
}

/// Name of the nested holder generated for a bean property.
pub fn property_type_name(identity: &str) -> String {
    format!("{}Property", capitalize(identity))
}

/// Name of the row bean generated for a table field.
pub fn row_type_name(table_identity: &str) -> String {
    format!("{}RowData", capitalize(table_identity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_every_kind() {
        assert_eq!(classify(NodeKind::Form), Classification::Root);
        assert_eq!(classify(NodeKind::Box), Classification::Structural);
        assert_eq!(classify(NodeKind::ValueField), Classification::Structural);
        assert_eq!(classify(NodeKind::PlainField), Classification::Structural);
        assert_eq!(classify(NodeKind::TableField), Classification::Table);
        assert_eq!(classify(NodeKind::TableColumn), Classification::Column);
        assert_eq!(classify(NodeKind::BeanProperty), Classification::Property);
    }

    #[test]
    fn test_naming() {
        assert_eq!(capitalize("first"), "First");
        assert_eq!(capitalize(""), "");
        assert_eq!(decapitalize("Name"), "name");
        assert_eq!(data_type_name("PersonForm"), "PersonFormData");
        assert_eq!(property_type_name("personNr"), "PersonNrProperty");
        assert_eq!(row_type_name("Table"), "TableRowData");
    }

    #[test]
    fn test_base_types() {
        assert_eq!(base_type(NodeKind::ValueField), BaseType::AbstractValueFieldData);
        assert_eq!(base_type(NodeKind::Box), BaseType::AbstractFormFieldData);
        assert_eq!(base_type(NodeKind::TableField), BaseType::AbstractTableFieldBeanData);
        assert_eq!(base_type(NodeKind::BeanProperty), BaseType::AbstractPropertyData);
    }
}
