//! Push, notification-click and background-sync handlers.

use aerofisc_core::config::NotificationConfig;
use chrono::Utc;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationData {
    /// Milliseconds since the Unix epoch.
    pub date_of_arrival: i64,
    pub primary_key: u32,
}

/// What to show for an incoming push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
    pub actions: Vec<NotificationAction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClickOutcome {
    pub closed: bool,
    /// Route to open in a new window, if any.
    pub open_window: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    Scheduled { tag: String },
    Ignored { tag: String },
}

/// Build a notification from a push payload. Blank payloads get the default body.
pub fn render_push(config: &NotificationConfig, payload: Option<&str>) -> Notification {
    let body = payload
        .filter(|text| !text.is_empty())
        .unwrap_or(&config.default_body)
        .to_string();

    Notification {
        title: config.title.clone(),
        body,
        icon: config.icon.clone(),
        badge: config.badge.clone(),
        vibrate: config.vibrate.clone(),
        data: NotificationData { date_of_arrival: Utc::now().timestamp_millis(), primary_key: 1 },
        actions: vec![
            NotificationAction { action: "explore".into(), title: "View Details".into() },
            NotificationAction { action: "close".into(), title: "Close".into() },
        ],
    }
}

/// Clicking always dismisses; `explore` also opens the configured route.
pub fn notification_click(config: &NotificationConfig, action: Option<&str>) -> ClickOutcome {
    let open_window = match action {
        Some("explore") => Some(config.explore_route.clone()),
        _ => None,
    };
    ClickOutcome { closed: true, open_window }
}

/// Replay transactions recorded while offline.
///
/// Offline transactions are not queued anywhere yet, so there is nothing to
/// replay; the handler only records that a sync ran.
pub async fn sync_transactions() {
    tracing::info!("syncing transactions");
}
