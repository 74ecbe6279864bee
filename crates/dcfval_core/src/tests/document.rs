//! Document round-trips, file persistence and template lookup

use std::fs;
use std::path::PathBuf;

use crate::model::{
    CalculationMode, Distribution, FinancialModel, ModelDocument, ModelSettings, Stream, StreamId,
    StreamKind,
};
use crate::persistence::{load_model, load_template, save_model, template_names};

fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("dcfval-test-{tag}-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn rich_model() -> FinancialModel {
    let settings = ModelSettings {
        forecast_months: 36,
        discount_rate: Distribution::Normal {
            mean: 0.12,
            std: 0.02,
        },
        terminal_growth_rate: 0.02,
        escalation_rate: Some(Distribution::Uniform {
            min: 0.01,
            max: 0.05,
        }),
        calculation_mode: CalculationMode::Npv,
    };
    let mut model = FinancialModel::new("Full House", settings);
    model
        .add_stream(Stream {
            id: StreamId::from("subs"),
            name: "Subscriptions".to_string(),
            kind: StreamKind::Revenue,
            start_month: 0,
            end_month: None,
            amount: Distribution::fixed(0.0),
            adoption_curve: Some(Distribution::Logistic {
                midpoint: 18.0,
                steepness: 0.35,
                amplitude: 12.0,
            }),
            parent_stream_id: None,
            conversion_rate: 1.0,
            trigger_delay_months: 0,
            periodicity_months: None,
            amount_is_ratio: true,
            unit_value: Some(Distribution::Normal {
                mean: 49.0,
                std: 4.0,
            }),
            market_units: Some(Distribution::Triangular {
                min: 800.0,
                likely: 1500.0,
                max: 4000.0,
            }),
        })
        .unwrap();
    model
        .add_stream(Stream {
            id: StreamId::from("onboarding"),
            name: "Onboarding Cost".to_string(),
            kind: StreamKind::Cost,
            start_month: 0,
            end_month: Some(35),
            amount: Distribution::Uniform {
                min: 0.05,
                max: 0.20,
            },
            adoption_curve: None,
            parent_stream_id: Some(StreamId::from("subs")),
            conversion_rate: 0.9,
            trigger_delay_months: 1,
            periodicity_months: Some(12),
            amount_is_ratio: true,
            unit_value: None,
            market_units: None,
        })
        .unwrap();
    model
}

#[test]
fn test_serialize_deserialize_round_trip() {
    let model = rich_model();
    let json = serde_json::to_string_pretty(&model.to_document()).unwrap();
    let document: ModelDocument = serde_json::from_str(&json).unwrap();
    let restored = FinancialModel::from_document(document).unwrap();
    assert_eq!(model, restored);

    // And a second pass yields byte-identical text
    let again = serde_json::to_string_pretty(&restored.to_document()).unwrap();
    assert_eq!(json, again);
}

#[test]
fn test_wire_enum_values_are_uppercase() {
    let model = rich_model();
    let value = serde_json::to_value(model.to_document()).unwrap();
    assert_eq!(value["settings"]["calculation_mode"], "NPV");
    assert_eq!(value["streams"][0]["stream_type"], "REVENUE");
    assert_eq!(value["streams"][1]["stream_type"], "COST");
    assert_eq!(value["streams"][0]["unit_value"]["type"], "NORMAL");
    assert_eq!(value["settings"]["discount_rate"]["params"]["mean"], 0.12);
}

#[test]
fn test_save_and_load_stamps_metadata() {
    let dir = scratch_dir("save");
    let path = dir.join("model.json");

    let model = rich_model();
    save_model(&model, &path).unwrap();

    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["_metadata"]["version"], "1.0");
    assert!(raw["_metadata"]["created"].is_string());

    let loaded = load_model(&path).unwrap();
    assert_eq!(model, loaded);
    assert!(loaded.validate().is_ok());

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_templates_scanned_and_bad_files_skipped() {
    let dir = scratch_dir("templates");
    save_model(&rich_model(), &dir.join("saas.json")).unwrap();
    save_model(&FinancialModel::default(), &dir.join("blank.json")).unwrap();
    fs::write(dir.join("broken.json"), "{ not json").unwrap();
    fs::write(dir.join("notes.txt"), "ignored").unwrap();

    let names = template_names(&dir);
    assert_eq!(names, vec!["blank", "saas"]);

    let template = load_template(&dir, "saas").unwrap();
    assert_eq!(template.name, "Full House");
    assert!(load_template(&dir, "missing").is_err());

    fs::remove_dir_all(&dir).unwrap();
}
