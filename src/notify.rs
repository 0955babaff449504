//! User-visible notifications ("toasts").

use std::fmt;

use tracing::{info, warn};

use crate::api::ApiError;
use crate::utils::value::{capitalize, value_to_message};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationKind::Success => f.write_str("success"),
            NotificationKind::Error => f.write_str("error"),
        }
    }
}

/// Shows a message to the user. Fire-and-forget: never fails, never blocks.
pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NotificationKind, message: &str);
}

/// Emits notifications as log events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, kind: NotificationKind, message: &str) {
        match kind {
            NotificationKind::Success => info!(
                event_name = "notification.shown",
                event_domain = "notification",
                kind = %kind,
                "{}",
                message
            ),
            NotificationKind::Error => warn!(
                event_name = "notification.shown",
                event_domain = "notification",
                kind = %kind,
                "{}",
                message
            ),
        }
    }
}

/// One message per field of an API error body, e.g.
/// `"Could not log in! Email: Enter a valid email address."`.
///
/// `separator` sits between the field name and its message. Errors without a
/// field map produce a single `"<prefix> Details: <error>"` line.
pub fn failure_messages(prefix: &str, separator: &str, error: &ApiError) -> Vec<String> {
    match error.body().and_then(|body| body.as_object()) {
        Some(fields) if !fields.is_empty() => fields
            .iter()
            .map(|(field, value)| {
                format!(
                    "{} {}{}{}",
                    prefix,
                    capitalize(field),
                    separator,
                    value_to_message(value)
                )
            })
            .collect(),
        _ => vec![format!("{} Details: {}", prefix, error)],
    }
}

/// Send every failure message as an error notification.
pub fn notify_failure(notifier: &dyn Notifier, prefix: &str, separator: &str, error: &ApiError) {
    for message in failure_messages(prefix, separator, error) {
        notifier.notify(NotificationKind::Error, &message);
    }
}
