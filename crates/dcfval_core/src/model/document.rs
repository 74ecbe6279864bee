//! Persisted document form of a model
//!
//! Documents carry `name`, `settings`, an ordered `streams` list and an
//! optional `_metadata` block with a version tag and timestamps. Unknown
//! top-level fields (including `_comment`) are ignored on load, so
//! documents written by newer or foreign implementations still parse.

use serde::{Deserialize, Serialize};

use crate::error::GraphError;

use super::graph::FinancialModel;
use super::ids::StreamId;
use super::settings::ModelSettings;
use super::stream::Stream;

/// Version tag written into `_metadata` on save.
pub const DOCUMENT_VERSION: &str = "1.0";

fn default_model_name() -> String {
    "Untitled Model".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

impl DocumentMetadata {
    /// Fresh metadata stamped with the current time.
    pub fn now() -> Self {
        let timestamp = jiff::Timestamp::now().to_string();
        Self {
            version: DOCUMENT_VERSION.to_string(),
            created: Some(timestamp.clone()),
            last_modified: Some(timestamp),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDocument {
    #[serde(default = "default_model_name")]
    pub name: String,
    #[serde(default)]
    pub settings: ModelSettings,
    #[serde(default)]
    pub streams: Vec<Stream>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_order: Option<Vec<StreamId>>,
    #[serde(rename = "_metadata", default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DocumentMetadata>,
}

impl FinancialModel {
    pub fn to_document(&self) -> ModelDocument {
        ModelDocument {
            name: self.name.clone(),
            settings: self.settings.clone(),
            streams: self.streams().cloned().collect(),
            stream_order: Some(self.stream_order().to_vec()),
            metadata: None,
        }
    }

    /// Rebuild a model from its document form. Streams are inserted as
    /// listed without graph validation (a child may precede its parent in
    /// the list); only duplicate ids are rejected here. Run `validate()`
    /// for the full structural check.
    pub fn from_document(doc: ModelDocument) -> Result<Self, GraphError> {
        let mut model = FinancialModel::new(doc.name, doc.settings);
        for stream in doc.streams {
            if model.stream(&stream.id).is_some() {
                return Err(GraphError::DuplicateStream(stream.id));
            }
            model.insert_unchecked(stream);
        }
        if let Some(order) = doc.stream_order {
            // A stale or partial order list is tolerated; insertion order
            // already matches the document's stream list
            let _ = model.reorder_streams(order);
        }
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Distribution, StreamKind};

    fn sample_model() -> FinancialModel {
        let mut model = FinancialModel::new("Widget Factory", ModelSettings::default());
        model
            .add_stream(Stream {
                id: StreamId::from("sales"),
                name: "Widget Sales".to_string(),
                kind: StreamKind::Revenue,
                start_month: 0,
                end_month: None,
                amount: Distribution::Normal {
                    mean: 1000.0,
                    std: 150.0,
                },
                adoption_curve: Some(Distribution::Logistic {
                    midpoint: 12.0,
                    steepness: 0.4,
                    amplitude: 10.0,
                }),
                parent_stream_id: None,
                conversion_rate: 1.0,
                trigger_delay_months: 0,
                periodicity_months: None,
                amount_is_ratio: true,
                unit_value: None,
                market_units: None,
            })
            .unwrap();
        model
            .add_stream(Stream {
                id: StreamId::from("support"),
                name: "Support Cost".to_string(),
                kind: StreamKind::Cost,
                start_month: 0,
                end_month: Some(59),
                amount: Distribution::fixed(0.15),
                adoption_curve: None,
                parent_stream_id: Some(StreamId::from("sales")),
                conversion_rate: 0.8,
                trigger_delay_months: 1,
                periodicity_months: Some(3),
                amount_is_ratio: true,
                unit_value: None,
                market_units: None,
            })
            .unwrap();
        model
    }

    #[test]
    fn test_document_round_trip() {
        let model = sample_model();
        let json = serde_json::to_string(&model.to_document()).unwrap();
        let doc: ModelDocument = serde_json::from_str(&json).unwrap();
        let restored = FinancialModel::from_document(doc).unwrap();
        assert_eq!(model, restored);
    }

    #[test]
    fn test_unknown_fields_and_comments_ignored() {
        let json = r#"{
            "name": "Annotated",
            "_comment": "hand-edited; the engine must not choke on this",
            "some_future_field": {"nested": [1, 2, 3]},
            "settings": {
                "forecast_months": 24,
                "discount_rate": {"type": "FIXED", "params": {"value": 0.1}},
                "terminal_growth_rate": 0.02,
                "escalation_rate": null,
                "calculation_mode": "NPV"
            },
            "streams": [],
            "_metadata": {"version": "1.0", "created": "2024-01-01T00:00:00Z"}
        }"#;
        let doc: ModelDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.name, "Annotated");
        assert_eq!(doc.settings.forecast_months, 24);
        let model = FinancialModel::from_document(doc).unwrap();
        assert!(model.is_empty());
    }

    #[test]
    fn test_duplicate_ids_rejected_on_load() {
        let model = sample_model();
        let mut doc = model.to_document();
        doc.streams.push(doc.streams[0].clone());
        doc.stream_order = None;
        assert!(matches!(
            FinancialModel::from_document(doc),
            Err(GraphError::DuplicateStream(_))
        ));
    }

    #[test]
    fn test_child_before_parent_loads() {
        let model = sample_model();
        let mut doc = model.to_document();
        doc.streams.reverse();
        doc.stream_order = None;
        let restored = FinancialModel::from_document(doc).unwrap();
        assert_eq!(restored.len(), 2);
        assert!(restored.validate().is_ok());
    }
}
