//! Integration tests that verify every definition shipped in
//! `data/definitions/` loads and validates.

use tabula_core::{Value, ValueType};
use tabula_definition::{DefinitionFamily, DefinitionLoader, DefinitionRepository, LoadStatus};

/// Integration tests run from the crate directory, so go up two levels.
fn definitions_dir() -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data/definitions")
}

fn loaded_loader() -> DefinitionLoader {
    let loader = DefinitionLoader::new(definitions_dir());
    let results = loader.load_all().unwrap();
    for result in &results {
        assert!(
            matches!(result.status, LoadStatus::Loaded { .. }),
            "{} did not load: {:?}",
            result.path.display(),
            result.status
        );
    }
    loader
}

#[test]
fn all_shipped_definitions_load() {
    let loader = loaded_loader();
    assert_eq!(
        loader.ids(),
        vec!["study-site", "visit-locations", "visit-overview", "visit-types"]
    );
}

#[test]
fn visit_types_schema() {
    let def = loaded_loader().load("visit-types").unwrap();
    assert_eq!(def.family, DefinitionFamily::DataSet);
    assert_eq!(def.definition_type.as_deref(), Some("inline"));
    let limit = def.parameter("limit").unwrap();
    assert_eq!(limit.value_type, ValueType::Integer);
    assert!(!limit.required);
}

#[test]
fn study_site_has_text_default() {
    let def = loaded_loader().load("study-site").unwrap();
    let value = def.parameter("value").unwrap();
    assert_eq!(value.default, Some(Value::from("North")));
}

#[test]
fn visit_overview_takes_data_sets() {
    let def = loaded_loader().load("visit-overview").unwrap();
    assert_eq!(def.family, DefinitionFamily::Report);
    assert!(def
        .parameters
        .iter()
        .all(|p| p.value_type == ValueType::DataSet));
}
