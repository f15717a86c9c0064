use fdgen_core::model::*;
use fdgen_core::rules::{RuleKey, RuleValue};
use fdgen_core::schema::{ExternalType, ModelFile};
use fdgen_core::storage;
use fdgen_core::types::TypeExpr;
use tempfile::TempDir;

fn make_model() -> ModelFile {
    let mut site = ExtensionSite::new("main");
    site.base = Some(ExtensionLayer::new(SdkCommand::None));

    let form = SourceNode::form("PersonForm").with_child(
        SourceNode::group("MainBox")
            .with_site(site)
            .with_child(
                SourceNode::value_field("Name", TypeExpr::named("String"))
                    .with_rule(RuleKey::Mandatory, RuleValue::Bool(true))
                    .with_rule(RuleKey::MaxLength, RuleValue::Integer(60)),
            )
            .with_child(
                SourceNode::table("Table")
                    .with_child(SourceNode::column("first", TypeExpr::named("String"))),
            ),
    );

    let mut model = ModelFile::default();
    model.forms.push(form);
    model.templates.push(
        SourceNode::value_field("AbstractTemplateField", TypeExpr::named("T"))
            .with_type_params(&["T"]),
    );
    let mut layer = ExtensionLayer::new(SdkCommand::Use);
    layer.use_type = Some("shared.Address".to_string());
    model.extensions.push(ExtensionDecl::new("main", 1, layer));
    model.external_types.push(ExternalType {
        reference: "shared.Address".to_string(),
        qualified_name: "org.example.shared.AddressData".to_string(),
    });
    model
}

#[test]
fn test_save_and_load_roundtrip() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();

    let model = make_model();
    storage::save(root, &model).unwrap();
    assert!(storage::model_exists(root));

    let loaded = storage::load(root).unwrap();
    assert_eq!(loaded, model);
    assert!(loaded.validate().is_ok());
}

#[test]
fn test_declared_rule_order_survives_roundtrip() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();

    let mut model = ModelFile::default();
    model.forms.push(
        SourceNode::form("F").with_child(
            SourceNode::value_field("Code", TypeExpr::named("String"))
                .with_rule(RuleKey::Regex, RuleValue::Text("[A-Z]+".into()))
                .with_rule(RuleKey::Mandatory, RuleValue::Bool(true)),
        ),
    );
    storage::save(root, &model).unwrap();

    let loaded = storage::load(root).unwrap();
    let keys: Vec<RuleKey> = loaded.forms[0].children[0].rules.keys().copied().collect();
    assert_eq!(keys, vec![RuleKey::Regex, RuleKey::Mandatory]);
}

#[test]
fn test_load_missing_model_fails() {
    let tmp = TempDir::new().unwrap();
    assert!(!storage::model_exists(tmp.path()));
    let err = storage::load(tmp.path()).unwrap_err();
    assert!(format!("{err:#}").contains("failed to read model"));
}

#[test]
fn test_load_from_reports_bad_json() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();
    let err = storage::load_from(&path).unwrap_err();
    assert!(format!("{err:#}").contains("invalid model file"));
}

#[test]
fn test_save_to_creates_parent_directories() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("models").join("nested").join("forms.json");

    let model = make_model();
    storage::save_to(&path, &model).unwrap();
    assert!(path.exists());
    assert_eq!(storage::load_from(&path).unwrap(), model);
}
