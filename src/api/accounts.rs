//! Saved Colab accounts, stored as one JSON list under their own key.

use axum::{extract::State, Json};

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::ColabAccount;
use crate::AppState;

/// GET /api/colab-accounts - Saved accounts; empty when none or unreadable.
pub async fn list_accounts(State(state): State<AppState>) -> ApiResult<Vec<ColabAccount>> {
    let key = &state.config.accounts_key;
    let accounts = match state.kv.get(key).await? {
        Some(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
            tracing::warn!("Discarding unreadable account list under {:?}: {}", key, e);
            Vec::new()
        }),
        None => Vec::new(),
    };
    success(accounts)
}

/// PUT /api/colab-accounts - Replace the saved list.
pub async fn put_accounts(
    State(state): State<AppState>,
    Json(accounts): Json<Vec<ColabAccount>>,
) -> ApiResult<Vec<ColabAccount>> {
    if let Some(index) = accounts.iter().position(|a| a.email.trim().is_empty()) {
        return Err(AppError::Validation(format!(
            "Account {} has no email",
            index
        )));
    }

    let json = serde_json::to_string(&accounts)?;
    state.kv.put(&state.config.accounts_key, &json).await?;
    success(accounts)
}
