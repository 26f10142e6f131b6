//! Request record models matching the frontend `RequestItem` type.

use serde::{Deserialize, Deserializer, Serialize};

use super::Label;

/// Work priority. Not stored in the sheet; derived from tier when absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    #[default]
    Normal,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Normal => "Normal",
            Priority::Low => "Low",
        }
    }

    /// Parse a priority, ignoring case and surrounding whitespace.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Priority::High),
            "medium" => Some(Priority::Medium),
            "normal" => Some(Priority::Normal),
            "low" => Some(Priority::Low),
            _ => None,
        }
    }
}

/// A fully normalized request record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestItem {
    pub id: String,
    pub patreon_name: String,
    pub tier: Label,
    pub character_name: String,
    /// Anime or other origin of the character
    pub origin: String,
    pub request_type: Label,
    pub status: Label,
    pub priority: Priority,
    /// ISO-8601 date or timestamp
    pub date_requested: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_started: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_completed: Option<String>,
    pub revision_count: u32,
    pub notes: String,
    pub details: String,
    /// Derived on every normalization, never persisted as a source of truth
    pub days_since_request: i64,
}

/// A partial request as delivered by a source adapter or an HTTP body.
///
/// Doubles as the patch type for updates: every `Some` field overrides the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patreon_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_requested: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_started: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_completed: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub revision_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Patch body for `PUT /api/requests`.
pub type RequestPatch = RawRequest;

impl RawRequest {
    /// Overlay every field the patch carries. The id is never patched.
    pub fn merge(&mut self, patch: &RawRequest) {
        fn overlay<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
            if let Some(v) = value {
                *target = Some(v.clone());
            }
        }

        overlay(&mut self.patreon_name, &patch.patreon_name);
        overlay(&mut self.tier, &patch.tier);
        overlay(&mut self.character_name, &patch.character_name);
        overlay(&mut self.origin, &patch.origin);
        overlay(&mut self.request_type, &patch.request_type);
        overlay(&mut self.status, &patch.status);
        overlay(&mut self.priority, &patch.priority);
        overlay(&mut self.date_requested, &patch.date_requested);
        overlay(&mut self.date_started, &patch.date_started);
        overlay(&mut self.date_completed, &patch.date_completed);
        overlay(&mut self.revision_count, &patch.revision_count);
        overlay(&mut self.notes, &patch.notes);
        overlay(&mut self.details, &patch.details);
    }

    /// True when the patch carries nothing but (at most) an id.
    pub fn is_empty_patch(&self) -> bool {
        *self
            == RawRequest {
                id: self.id.clone(),
                ..RawRequest::default()
            }
    }
}

impl From<RequestItem> for RawRequest {
    fn from(item: RequestItem) -> Self {
        RawRequest {
            id: Some(item.id),
            patreon_name: Some(item.patreon_name),
            tier: Some(item.tier.as_str().to_string()),
            character_name: Some(item.character_name),
            origin: Some(item.origin),
            request_type: Some(item.request_type.as_str().to_string()),
            status: Some(item.status.as_str().to_string()),
            priority: Some(item.priority.as_str().to_string()),
            date_requested: Some(item.date_requested),
            date_started: item.date_started,
            date_completed: item.date_completed,
            revision_count: Some(i64::from(item.revision_count)),
            notes: Some(item.notes),
            details: Some(item.details),
        }
    }
}

/// Accept `3`, `"3"`, `null` or garbage; garbage becomes `None`.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
