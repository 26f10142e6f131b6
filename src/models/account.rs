//! Saved Google accounts used to open Colab notebooks under the right `authuser`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColabAccount {
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Index passed as `authuser` in the Colab URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<u32>,
}
