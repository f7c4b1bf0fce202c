//! Activity log list and the field diff viewer.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use bazaar_core::activity::{ActivityLog, ActivityLogQuery};
use bazaar_core::cart::Toast;
use bazaar_core::catalog::Paginated;
use bazaar_core::diff::FieldDiff;
use bazaar_core::{ActivityAction, ActivityLogId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use url::form_urlencoded;

use super::{not_found_page, page_data, session_expired};
use crate::backend::ApiError;
use crate::filters;
use crate::middleware::RequireAdminAuth;
use crate::models::session::push_toast;
use crate::state::AppState;
use crate::views::{Layout, Pager, datetime};

const LOGS_PATH: &str = "/activity-logs";

/// Entity kinds offered in the filter, as `(value, label)`.
const ENTITY_TYPES: [(&str, &str); 7] = [
    ("order", "Orders"),
    ("product", "Products"),
    ("customer", "Customers"),
    ("coupon", "Coupons"),
    ("lucky_spin", "Lucky spin"),
    ("night_market", "Night market"),
    ("admin", "Admins"),
];

/// An option of a filter select.
#[derive(Debug, Clone)]
pub struct FilterOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Active filters, rendered back into the form.
#[derive(Debug, Clone, Default)]
pub struct LogFilters {
    pub search: String,
    pub actions: Vec<FilterOption>,
    pub entity_types: Vec<FilterOption>,
    pub is_filtered: bool,
}

impl LogFilters {
    fn new(query: &ActivityLogQuery) -> Self {
        let action = query.action.as_deref();
        let entity_type = query.entity_type.as_deref();
        Self {
            search: query.search.clone().unwrap_or_default(),
            actions: ActivityAction::FILTERABLE
                .into_iter()
                .map(|a| FilterOption {
                    value: a.as_str(),
                    label: a.label(),
                    selected: action == Some(a.as_str()),
                })
                .collect(),
            entity_types: ENTITY_TYPES
                .into_iter()
                .map(|(value, label)| FilterOption {
                    value,
                    label,
                    selected: entity_type == Some(value),
                })
                .collect(),
            is_filtered: query.action.is_some()
                || query.entity_type.is_some()
                || query.search.is_some(),
        }
    }
}

/// One log entry in the list.
#[derive(Debug, Clone)]
pub struct LogRow {
    pub id: i64,
    pub action: &'static str,
    pub action_class: &'static str,
    pub entity: String,
    pub admin: String,
    pub description: String,
    pub date: String,
    pub has_changes: bool,
}

impl From<&ActivityLog> for LogRow {
    fn from(log: &ActivityLog) -> Self {
        Self {
            id: log.id.as_i64(),
            action: log.action.label(),
            action_class: log.action.as_str(),
            entity: log.entity_label(),
            admin: log.admin_name.clone().unwrap_or_else(|| "System".to_string()),
            description: log.description.clone().unwrap_or_default(),
            date: datetime(log.created_at),
            has_changes: log.old_values.is_some() || log.new_values.is_some(),
        }
    }
}

/// One row of the diff table.
#[derive(Debug, Clone)]
pub struct DiffRow {
    pub key: String,
    pub kind: &'static str,
    pub old: Option<String>,
    pub new: Option<String>,
}

impl From<&FieldDiff> for DiffRow {
    fn from(diff: &FieldDiff) -> Self {
        Self {
            key: diff.key.clone(),
            kind: diff.change.kind(),
            old: diff.change.old_display(),
            new: diff.change.new_display(),
        }
    }
}

/// Build a list URL for the given filters and page. Defaults are left out.
fn logs_url(query: &ActivityLogQuery, page: u32) -> String {
    let mut params = form_urlencoded::Serializer::new(String::new());
    if let Some(action) = &query.action {
        params.append_pair("action", action);
    }
    if let Some(entity_type) = &query.entity_type {
        params.append_pair("entity_type", entity_type);
    }
    if let Some(search) = &query.search {
        params.append_pair("search", search);
    }
    if page > 1 {
        params.append_pair("page", &page.to_string());
    }
    let params = params.finish();
    if params.is_empty() {
        LOGS_PATH.to_string()
    } else {
        format!("{LOGS_PATH}?{params}")
    }
}

/// Activity log list template.
#[derive(Template, WebTemplate)]
#[template(path = "activity_logs/index.html")]
pub struct ActivityLogsTemplate {
    pub layout: Layout,
    pub logs: Vec<LogRow>,
    pub total: u64,
    pub filters: LogFilters,
    pub pager: Pager,
}

/// Activity log detail template.
#[derive(Template, WebTemplate)]
#[template(path = "activity_logs/show.html")]
pub struct ActivityLogTemplate {
    pub layout: Layout,
    pub log: LogRow,
    pub ip_address: String,
    pub changes: Vec<DiffRow>,
    pub show_all: bool,
    pub toggle_url: String,
}

/// Detail page options.
#[derive(Debug, Default, Deserialize)]
pub struct ShowQuery {
    /// `1` to list unchanged fields too.
    #[serde(default)]
    pub all: Option<String>,
}

impl ShowQuery {
    fn show_all(&self) -> bool {
        matches!(self.all.as_deref(), Some("1" | "true"))
    }
}

/// Display the filtered activity log.
#[instrument(skip(state, session, layout, admin))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    mut layout: Layout,
    RequireAdminAuth(admin): RequireAdminAuth,
    Query(query): Query<ActivityLogQuery>,
) -> Response {
    let query = query.normalized();
    let result = state.backend().activity_logs(&admin.token, &query).await;
    let page = match page_data(result, Paginated::empty(), &session, &mut layout).await {
        Ok(page) => page,
        Err(response) => return response,
    };

    ActivityLogsTemplate {
        layout,
        logs: page.items.iter().map(LogRow::from).collect(),
        total: page.total,
        filters: LogFilters::new(&query),
        pager: Pager::new(page.page, page.total_pages, |n| logs_url(&query, n)),
    }
    .into_response()
}

/// Display one log entry with its field diff.
#[instrument(skip(state, session, layout, admin))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    RequireAdminAuth(admin): RequireAdminAuth,
    Path(id): Path<i64>,
    Query(query): Query<ShowQuery>,
) -> Response {
    let log = match state
        .backend()
        .activity_log(&admin.token, ActivityLogId::new(id))
        .await
    {
        Ok(log) => log,
        Err(ApiError::NotFound(_)) => return not_found_page(layout),
        Err(ApiError::Unauthorized) => {
            return session_expired(&session, &format!("{LOGS_PATH}/{id}"), false).await;
        }
        Err(e) => {
            tracing::warn!(error = %e, log_id = id, "Failed to load activity log");
            push_toast(&session, Toast::error(e.user_message())).await;
            return Redirect::to(LOGS_PATH).into_response();
        }
    };

    let show_all = query.show_all();
    let toggle_url = if show_all {
        format!("{LOGS_PATH}/{id}")
    } else {
        format!("{LOGS_PATH}/{id}?all=1")
    };

    ActivityLogTemplate {
        layout,
        changes: log.changes(show_all).iter().map(DiffRow::from).collect(),
        ip_address: log.ip_address.clone().unwrap_or_default(),
        log: LogRow::from(&log),
        show_all,
        toggle_url,
    }
    .into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use serde_json::json;

    use super::*;

    fn log() -> ActivityLog {
        serde_json::from_value(json!({
            "id": 12,
            "action": "update",
            "entityType": "coupon",
            "entityId": "TET25",
            "oldValues": {"value": 10, "active": true},
            "newValues": {"value": 15, "active": true},
            "createdAt": "2025-02-01T10:15:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn test_log_row() {
        let row = LogRow::from(&log());
        assert_eq!(row.action, "Updated");
        assert_eq!(row.action_class, "update");
        assert_eq!(row.entity, "coupon TET25");
        assert_eq!(row.admin, "System");
        assert_eq!(row.date, "01/02/2025 10:15");
        assert!(row.has_changes);
    }

    #[test]
    fn test_diff_rows() {
        let rows: Vec<DiffRow> = log().changes(false).iter().map(DiffRow::from).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key, "value");
        assert_eq!(rows[0].kind, "changed");
        assert_eq!(rows[0].old.as_deref(), Some("10"));
        assert_eq!(rows[0].new.as_deref(), Some("15"));

        let all: Vec<DiffRow> = log().changes(true).iter().map(DiffRow::from).collect();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].kind, "unchanged");
    }

    #[test]
    fn test_logs_url_keeps_filters() {
        let query = ActivityLogQuery {
            action: Some("delete".to_string()),
            entity_type: Some("coupon".to_string()),
            search: Some("tet sale".to_string()),
            page: None,
        };
        assert_eq!(
            logs_url(&query, 2),
            "/activity-logs?action=delete&entity_type=coupon&search=tet+sale&page=2"
        );
        assert_eq!(logs_url(&ActivityLogQuery::default(), 1), "/activity-logs");
    }

    #[test]
    fn test_filters_mark_selection() {
        let query = ActivityLogQuery {
            action: Some("login".to_string()),
            ..ActivityLogQuery::default()
        };
        let filters = LogFilters::new(&query);
        assert!(filters.is_filtered);
        assert_eq!(filters.actions.iter().filter(|o| o.selected).count(), 1);
        assert!(filters.entity_types.iter().all(|o| !o.selected));
    }

    #[test]
    fn test_show_all_flag() {
        let on = ShowQuery {
            all: Some("1".to_string()),
        };
        assert!(on.show_all());
        assert!(!ShowQuery::default().show_all());
    }
}
