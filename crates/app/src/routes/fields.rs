//! Field registry endpoint for the wizard.

use axum::{Json, Router, extract::State, routing::get};
use batchwise_core::bulk::{ChangeType, Operator};
use batchwise_core::registry::{ComparisonType, FieldCategory, FieldLevel};
use batchwise_core::{Field, FieldRegistry};
use serde::Serialize;

use crate::state::AppState;

/// Build the fields router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/fields", get(list_fields))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditableFieldView {
    pub field: Field,
    pub label: &'static str,
    pub category: FieldCategory,
    pub level: FieldLevel,
    pub change_types: &'static [ChangeType],
    pub options: &'static [&'static str],
    /// Whether price rounding applies.
    pub money: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterFieldView {
    pub field: Field,
    pub label: &'static str,
    pub comparison: ComparisonType,
    pub level: FieldLevel,
    pub operators: Vec<Operator>,
}

#[derive(Debug, Serialize)]
pub struct FieldsResponse {
    pub editable: Vec<EditableFieldView>,
    pub filterable: Vec<FilterFieldView>,
}

impl From<&FieldRegistry> for FieldsResponse {
    fn from(registry: &FieldRegistry) -> Self {
        Self {
            editable: registry
                .editable_fields()
                .map(|d| EditableFieldView {
                    field: d.field,
                    label: d.label,
                    category: d.category,
                    level: d.level(),
                    change_types: ChangeType::allowed_for(d.category),
                    options: d.options,
                    money: d.money,
                })
                .collect(),
            filterable: registry
                .filterable_fields()
                .map(|d| FilterFieldView {
                    field: d.field,
                    label: d.label,
                    comparison: d.comparison,
                    level: d.level(),
                    operators: Operator::allowed_for(d.comparison),
                })
                .collect(),
        }
    }
}

/// List editable and filterable fields.
async fn list_fields(State(state): State<AppState>) -> Json<FieldsResponse> {
    Json(FieldsResponse::from(state.registry()))
}
