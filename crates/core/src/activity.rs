//! Admin activity logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::diff::{FieldDiff, diff_values};
use crate::types::{ActivityAction, ActivityLogId};

/// One recorded admin action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLog {
    pub id: ActivityLogId,
    pub action: ActivityAction,
    /// Entity kind, e.g. `order` or `coupon`.
    #[serde(alias = "entityType")]
    pub entity_type: String,
    #[serde(default, alias = "entityId")]
    pub entity_id: Option<Value>,
    #[serde(default, alias = "adminName")]
    pub admin_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "oldValues")]
    pub old_values: Option<Value>,
    #[serde(default, alias = "newValues")]
    pub new_values: Option<Value>,
    #[serde(default, alias = "ipAddress")]
    pub ip_address: Option<String>,
    #[serde(alias = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl ActivityLog {
    /// Changed fields between the old and new snapshots.
    #[must_use]
    pub fn changes(&self, include_unchanged: bool) -> Vec<FieldDiff> {
        diff_values(
            self.old_values.as_ref(),
            self.new_values.as_ref(),
            include_unchanged,
        )
    }

    /// Entity id as plain text.
    #[must_use]
    pub fn entity_label(&self) -> String {
        match &self.entity_id {
            Some(Value::String(s)) => format!("{} {s}", self.entity_type),
            Some(Value::Null) | None => self.entity_type.clone(),
            Some(other) => format!("{} #{other}", self.entity_type),
        }
    }
}

/// Filters for the activity log list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityLogQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl ActivityLogQuery {
    /// Drop blank values so they are not sent upstream.
    #[must_use]
    pub fn normalized(self) -> Self {
        let clean = |v: Option<String>| v.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty());
        Self {
            action: clean(self.action),
            entity_type: clean(self.entity_type),
            search: clean(self.search),
            page: self.page.filter(|p| *p > 1),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use serde_json::json;

    fn log() -> ActivityLog {
        serde_json::from_value(json!({
            "id": 7,
            "action": "update",
            "entityType": "order",
            "entityId": 42,
            "adminName": "ops",
            "oldValues": {"status": "pending"},
            "newValues": {"status": "confirmed"},
            "createdAt": "2025-03-01T08:00:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn test_changes() {
        let changes = log().changes(false);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].key, "status");
    }

    #[test]
    fn test_entity_label() {
        assert_eq!(log().entity_label(), "order #42");
        let mut l = log();
        l.entity_id = Some(json!("SUMMER"));
        assert_eq!(l.entity_label(), "order SUMMER");
        l.entity_id = None;
        assert_eq!(l.entity_label(), "order");
    }

    #[test]
    fn test_unknown_action() {
        let mut raw = serde_json::to_value(log()).unwrap();
        raw["action"] = json!("export");
        let parsed: ActivityLog = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.action, ActivityAction::Other);
    }

    #[test]
    fn test_query_normalized() {
        let q = ActivityLogQuery {
            action: Some(" ".into()),
            entity_type: Some("order".into()),
            search: None,
            page: Some(1),
        }
        .normalized();
        assert_eq!(q.action, None);
        assert_eq!(q.entity_type.as_deref(), Some("order"));
        assert_eq!(q.page, None);
    }
}
