//! Company-scoped notification groups.

use serde::{Deserialize, Serialize};

/// A named set of recipients inside one company.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationGroup {
    pub id: String,
    pub company_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// User ids, sorted
    pub member_ids: Vec<String>,
    /// Topic slugs this group is subscribed to, sorted
    pub topic_slugs: Vec<String>,
    pub created_at: String,
}

/// Request body for creating a group.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    /// Ignored for staff users, who always create in their own company
    #[serde(default)]
    pub company_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Request body for adding a member.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub user_id: String,
}

/// Request body for subscribing a group to a topic.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeTopicRequest {
    pub topic_id: String,
}
