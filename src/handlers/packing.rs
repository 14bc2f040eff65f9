use axum::extract::State;
use axum::http::{HeaderMap, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use std::sync::Arc;

use super::guest::authorize;
use super::parse_model_output;
use crate::error::{AppError, Result};
use crate::metrics::REQUEST_TOTAL;
use crate::models::{PackingItem, PackingRequest, PackingSuggestions};
use crate::prompts;
use crate::state::AppState;

// POST /api/packing/suggestions - AI packing list
pub async fn packing_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    uri: Uri,
    Json(payload): Json<PackingRequest>,
) -> Result<Response> {
    REQUEST_TOTAL.inc();
    let access = authorize(&state, &headers, &uri).await?;

    let result = suggest(&state, &payload).await;
    Ok(access.decorate(result.into_response()))
}

async fn suggest(state: &AppState, payload: &PackingRequest) -> Result<Json<PackingSuggestions>> {
    if payload.destination.trim().is_empty() {
        return Err(AppError::Validation("destination is required".to_string()));
    }

    let response = state.generate(prompts::packing_list(payload)).await?;
    let parsed = parse_model_output(&response.response)?;
    let items = packing_items(&parsed).ok_or(AppError::InvalidModelOutput)?;
    Ok(Json(PackingSuggestions { items }))
}

// Keep well-formed items, drop the rest; None when there is no item list at all
fn packing_items(parsed: &Value) -> Option<Vec<PackingItem>> {
    let raw = parsed.get("items")?.as_array()?;
    let items: Vec<PackingItem> = raw
        .iter()
        .filter_map(|item| serde_json::from_value(item.clone()).ok())
        .collect();

    if items.len() < raw.len() {
        tracing::debug!(dropped = raw.len() - items.len(), "discarded malformed packing items");
    }
    Some(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PackingCategory;
    use serde_json::json;

    #[test]
    fn malformed_items_are_dropped() {
        let parsed = json!({"items": [
            {"category": "documents", "name": "Passport", "quantity": 1},
            {"category": "clothing", "name": "Socks"},
            {"category": "snacks", "name": "Chips"},
            "just a string"
        ]});

        let items = packing_items(&parsed).unwrap();
        assert_eq!(
            items,
            vec![
                PackingItem {
                    name: "Passport".into(),
                    category: PackingCategory::Documents,
                    quantity: 1
                },
                PackingItem {
                    name: "Socks".into(),
                    category: PackingCategory::Clothing,
                    quantity: 1
                },
            ]
        );
    }

    #[test]
    fn loose_quantities_and_capitalized_categories_are_kept() {
        let parsed = json!({"items": [
            {"category": "clothing", "name": "Socks", "quantity": null},
            {"category": "Clothing", "name": "Jacket", "quantity": 1},
            {"category": "clothing", "name": "Hat", "quantity": 0},
            {"category": "ELECTRONICS", "name": "Charger", "quantity": 2}
        ]});

        let items = packing_items(&parsed).unwrap();
        let kept: Vec<_> = items
            .iter()
            .map(|item| (item.name.as_str(), item.category, item.quantity))
            .collect();
        assert_eq!(
            kept,
            vec![
                ("Socks", PackingCategory::Clothing, 1),
                ("Jacket", PackingCategory::Clothing, 1),
                ("Hat", PackingCategory::Clothing, 1),
                ("Charger", PackingCategory::Electronics, 2),
            ]
        );
    }

    #[test]
    fn missing_item_list_is_rejected() {
        assert!(packing_items(&json!({"list": []})).is_none());
        assert!(packing_items(&json!({"items": "none"})).is_none());
    }
}
