//! Notification catalog, delivery records and channel types.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Slug of the topic the expiry engine publishes under.
pub const DOCUMENT_EXPIRY_TOPIC: &str = "document.expiry";

/// A delivery mechanism.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    InApp,
    Email,
    Push,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::InApp => "in_app",
            Channel::Email => "email",
            Channel::Push => "push",
        }
    }
}

impl FromStr for Channel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_app" => Ok(Channel::InApp),
            "email" => Ok(Channel::Email),
            "push" => Ok(Channel::Push),
            other => Err(AppError::Validation(format!("Unknown channel: {}", other))),
        }
    }
}

/// A named notification category with its default channel set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationTopic {
    pub id: String,
    pub slug: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub default_channels: Vec<Channel>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
}

/// Request body for creating a topic.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTopicRequest {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default_channels: Vec<Channel>,
}

/// Request body for updating a topic. The slug is immutable.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTopicRequest {
    #[serde(default)]
    pub name: Option<String>,
    /// An empty string clears the description
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default_channels: Option<Vec<Channel>>,
}

/// A resolved end recipient.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    pub user_id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
}

/// What gets delivered, independent of channel.
#[derive(Debug, Clone)]
pub struct NotificationPayload {
    pub kind: String,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
}

/// A persisted in-app notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub actor_type: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub is_read: bool,
    pub created_at: String,
}

/// Insert shape for [`Notification`].
#[derive(Debug, Clone)]
pub struct NewNotification<'a> {
    pub user_id: &'a str,
    pub actor_type: &'a str,
    pub kind: &'a str,
    pub title: &'a str,
    pub message: &'a str,
    pub link: Option<&'a str>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_names_parse_back() {
        for channel in [Channel::InApp, Channel::Email, Channel::Push] {
            assert_eq!(channel.as_str().parse::<Channel>().unwrap(), channel);
        }
    }

    #[test]
    fn test_unknown_channel_is_rejected() {
        let err = "sms".parse::<Channel>().unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }
}
