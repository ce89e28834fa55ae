//! Expiring document rows as the notification engine sees them.

use serde::{Deserialize, Serialize};

/// The entity class owning a document. Each class lives in its own table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DocumentClass {
    Vehicle,
    Driver,
    User,
}

impl DocumentClass {
    pub const ALL: [DocumentClass; 3] = [
        DocumentClass::Vehicle,
        DocumentClass::Driver,
        DocumentClass::User,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentClass::Vehicle => "vehicle",
            DocumentClass::Driver => "driver",
            DocumentClass::User => "user",
        }
    }

    /// Capitalized form used in notification titles.
    pub fn label(&self) -> &'static str {
        match self {
            DocumentClass::Vehicle => "Vehicle",
            DocumentClass::Driver => "Driver",
            DocumentClass::User => "User",
        }
    }

    /// In-app link to the owner's document list.
    pub fn owner_link(&self, owner_id: &str) -> String {
        match self {
            DocumentClass::Vehicle => format!("/vehicles/{}?tab=documents", owner_id),
            DocumentClass::Driver => format!("/drivers/{}?tab=documents", owner_id),
            DocumentClass::User => format!("/users/{}?tab=documents", owner_id),
        }
    }
}

impl std::fmt::Display for DocumentClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-deleted document with an expiry date, joined with its owner.
///
/// `owner_company_id` is `None` when the owning row is missing; the job
/// reports that as a per-document error instead of guessing a tenant.
#[derive(Debug, Clone)]
pub struct ExpiringDocument {
    pub id: String,
    pub owner_id: String,
    pub owner_company_id: Option<String>,
    pub title: String,
    pub document_type_slug: Option<String>,
    /// Raw stored value, parsed by the expiry policy
    pub expiry_date: String,
    /// Registration number for vehicles, full name for drivers and users
    pub owner_label: Option<String>,
}
