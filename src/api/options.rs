//! Suggested values for the open enumeration fields.

use axum::extract::State;
use chrono::Utc;
use serde::Serialize;

use super::{success, ApiResult};
use crate::config::OptionsConfig;
use crate::models::{Classified, Label, OptionSet, RequestItem};
use crate::AppState;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsResponse {
    pub statuses: OptionSet,
    pub tiers: OptionSet,
    pub request_types: OptionSet,
}

/// Configured options, extended with any unlisted values found in `items`.
pub fn collect_options(config: &OptionsConfig, items: &[RequestItem]) -> OptionsResponse {
    let mut options = OptionsResponse {
        statuses: config.statuses.clone(),
        tiers: config.tiers.clone(),
        request_types: config.request_types.clone(),
    };
    for item in items {
        extend(&mut options.statuses, &item.status);
        extend(&mut options.tiers, &item.tier);
        extend(&mut options.request_types, &item.request_type);
    }
    options
}

fn extend(set: &mut OptionSet, label: &Label) {
    if !label.is_empty() && set.classify(label) == Classified::Unlisted {
        set.insert(label.as_str());
    }
}

/// GET /api/options - Option sets for the dashboard's dropdowns.
pub async fn get_options(State(state): State<AppState>) -> ApiResult<OptionsResponse> {
    let items = state
        .sync
        .cache()
        .get(Utc::now())
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Could not read client cache for options: {}", e);
            Vec::new()
        });
    success(collect_options(&state.config.options, &items))
}
