use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,
    /// `appointment`, `medication`, `health`, or anything the backend adds later.
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    /// Relative time label, already formatted for display.
    pub time: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub action: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationFilter {
    All,
    Unread,
    Kind(String),
}

impl NotificationFilter {
    pub fn matches(&self, notification: &Notification) -> bool {
        match self {
            NotificationFilter::All => true,
            NotificationFilter::Unread => !notification.read,
            NotificationFilter::Kind(kind) => notification.kind == *kind,
        }
    }

    pub fn apply<'a>(&self, notifications: &'a [Notification]) -> Vec<&'a Notification> {
        notifications.iter().filter(|n| self.matches(n)).collect()
    }
}

/// Seeded the first time the notification list is opened.
pub fn default_notifications() -> Vec<Notification> {
    vec![
        Notification {
            id: 1,
            kind: "appointment".into(),
            message: "Upcoming appointment with Dr. Smith tomorrow at 2 PM".into(),
            time: "1 hour ago".into(),
            read: false,
            action: Some("View Details".into()),
        },
        Notification {
            id: 2,
            kind: "medication".into(),
            message: "Remember to take your evening medication".into(),
            time: "3 hours ago".into(),
            read: false,
            action: Some("Mark as Taken".into()),
        },
        Notification {
            id: 3,
            kind: "health".into(),
            message: "Your heart rate was higher than usual today".into(),
            time: "5 hours ago".into(),
            read: false,
            action: Some("View Report".into()),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_by_read_state_and_kind() {
        let mut notifications = default_notifications();
        notifications[0].read = true;

        assert_eq!(NotificationFilter::All.apply(&notifications).len(), 3);
        assert_eq!(NotificationFilter::Unread.apply(&notifications).len(), 2);

        let medication = NotificationFilter::Kind("medication".into()).apply(&notifications);
        assert_eq!(medication.len(), 1);
        assert_eq!(medication[0].id, 2);
    }
}
