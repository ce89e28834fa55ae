//! Per-recipient, per-channel delivery.

use std::sync::Arc;

use serde::Serialize;

use super::mailer::{Mailer, NotificationEmail};
use crate::db::Repository;
use crate::models::{Channel, NewNotification, NotificationPayload, Subscriber};

/// Actor recorded on notifications the engine creates.
pub const SYSTEM_ACTOR: &str = "system";

/// Result of one channel for one recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelOutcome {
    NotRequested,
    Delivered,
    /// Requested but not applicable, e.g. email for a user without an address
    Skipped,
    Failed,
    /// Accepted by a channel with no transport wired yet
    Stubbed,
}

/// Outcome of every channel for one dispatch call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReport {
    pub in_app: ChannelOutcome,
    pub email: ChannelOutcome,
    pub push: ChannelOutcome,
}

impl Default for DeliveryReport {
    fn default() -> Self {
        Self {
            in_app: ChannelOutcome::NotRequested,
            email: ChannelOutcome::NotRequested,
            push: ChannelOutcome::NotRequested,
        }
    }
}

impl DeliveryReport {
    pub fn any_failed(&self) -> bool {
        [self.in_app, self.email, self.push].contains(&ChannelOutcome::Failed)
    }
}

/// Writes in-app records and sends emails. Never fails: each channel's error
/// is logged and reflected in the returned [`DeliveryReport`].
#[derive(Clone)]
pub struct NotificationDispatcher {
    repo: Arc<Repository>,
    mailer: Arc<dyn Mailer>,
    base_url: Option<String>,
}

impl NotificationDispatcher {
    pub fn new(repo: Arc<Repository>, mailer: Arc<dyn Mailer>, base_url: Option<String>) -> Self {
        Self {
            repo,
            mailer,
            base_url,
        }
    }

    pub async fn dispatch(
        &self,
        recipient: &Subscriber,
        payload: &NotificationPayload,
        channels: &[Channel],
    ) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        if channels.contains(&Channel::InApp) {
            report.in_app = self.deliver_in_app(recipient, payload).await;
        }
        if channels.contains(&Channel::Email) {
            report.email = self.deliver_email(recipient, payload).await;
        }
        if channels.contains(&Channel::Push) {
            tracing::debug!(user_id = %recipient.user_id, "Push channel has no transport yet");
            report.push = ChannelOutcome::Stubbed;
        }

        report
    }

    async fn deliver_in_app(
        &self,
        recipient: &Subscriber,
        payload: &NotificationPayload,
    ) -> ChannelOutcome {
        let new = NewNotification {
            user_id: &recipient.user_id,
            actor_type: SYSTEM_ACTOR,
            kind: &payload.kind,
            title: &payload.title,
            message: &payload.message,
            link: payload.link.as_deref(),
        };

        match self.repo.insert_notification(&new).await {
            Ok(_) => ChannelOutcome::Delivered,
            Err(e) => {
                tracing::error!(
                    user_id = %recipient.user_id,
                    error = %e,
                    "Failed to store in-app notification"
                );
                ChannelOutcome::Failed
            }
        }
    }

    async fn deliver_email(
        &self,
        recipient: &Subscriber,
        payload: &NotificationPayload,
    ) -> ChannelOutcome {
        let Some(to) = recipient.email.as_deref().filter(|e| !e.trim().is_empty()) else {
            return ChannelOutcome::Skipped;
        };

        let email = NotificationEmail {
            to: to.to_string(),
            user_name: recipient.first_name.clone(),
            title: payload.title.clone(),
            message: payload.message.clone(),
            link: payload.link.as_deref().map(|link| self.absolute_link(link)),
        };

        match self.mailer.send_notification_email(&email).await {
            Ok(()) => ChannelOutcome::Delivered,
            Err(e) => {
                tracing::warn!(
                    user_id = %recipient.user_id,
                    transport = self.mailer.transport_name(),
                    error = %e,
                    "Failed to send notification email"
                );
                ChannelOutcome::Failed
            }
        }
    }

    fn absolute_link(&self, link: &str) -> String {
        match &self.base_url {
            Some(base) if link.starts_with('/') => format!("{}{}", base, link),
            _ => link.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_report_requests_nothing() {
        let report = DeliveryReport::default();
        assert_eq!(report.in_app, ChannelOutcome::NotRequested);
        assert!(!report.any_failed());
    }

    #[test]
    fn test_any_failed() {
        let report = DeliveryReport {
            in_app: ChannelOutcome::Delivered,
            email: ChannelOutcome::Failed,
            push: ChannelOutcome::NotRequested,
        };
        assert!(report.any_failed());
    }
}
