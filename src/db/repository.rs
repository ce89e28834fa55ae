//! Database repository for the notification engine.
//!
//! Uses prepared statements and transactions for data integrity.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Row, SqlitePool};

use crate::auth::AuthenticatedPrincipal;
use crate::errors::AppError;
use crate::models::{
    Channel, CreateGroupRequest, CreateTopicRequest, DocumentClass, ExpiringDocument,
    NewNotification, Notification, NotificationGroup, NotificationTopic, Subscriber,
    UpdateTopicRequest,
};

const TOPIC_COLUMNS: &str =
    "id, slug, name, description, default_channels, created_at, deleted_at";

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== DOCUMENT OPERATIONS ====================

    /// List non-deleted documents of one class whose expiry date falls in
    /// `[from, to]`, joined with the owning entity.
    ///
    /// Rows whose stored date SQLite cannot interpret are returned as well so
    /// the caller can report them instead of silently dropping them. Documents
    /// of soft-deleted owners are skipped; documents whose owner row is
    /// missing come back with no company.
    pub async fn list_expiring_documents(
        &self,
        class: DocumentClass,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ExpiringDocument>, AppError> {
        let sql = match class {
            DocumentClass::Vehicle => {
                r#"SELECT d.id, d.vehicle_id AS owner_id, o.company_id, d.title,
                          d.document_type_slug, d.expiry_date,
                          o.registration_number AS owner_label
                   FROM vehicle_documents d
                   LEFT JOIN vehicles o ON o.id = d.vehicle_id
                   WHERE d.deleted_at IS NULL AND d.expiry_date IS NOT NULL
                     AND (o.id IS NULL OR o.deleted_at IS NULL)
                     AND (date(d.expiry_date) IS NULL OR date(d.expiry_date) BETWEEN ? AND ?)
                   ORDER BY d.expiry_date, d.id"#
            }
            DocumentClass::Driver => {
                r#"SELECT d.id, d.driver_id AS owner_id, o.company_id, d.title,
                          d.document_type_slug, d.expiry_date,
                          TRIM(o.first_name || ' ' || COALESCE(o.last_name, '')) AS owner_label
                   FROM driver_documents d
                   LEFT JOIN drivers o ON o.id = d.driver_id
                   WHERE d.deleted_at IS NULL AND d.expiry_date IS NOT NULL
                     AND (o.id IS NULL OR o.deleted_at IS NULL)
                     AND (date(d.expiry_date) IS NULL OR date(d.expiry_date) BETWEEN ? AND ?)
                   ORDER BY d.expiry_date, d.id"#
            }
            DocumentClass::User => {
                r#"SELECT d.id, d.user_id AS owner_id, o.company_id, d.title,
                          d.document_type_slug, d.expiry_date,
                          TRIM(COALESCE(o.first_name, '') || ' ' || COALESCE(o.last_name, '')) AS owner_label
                   FROM user_documents d
                   LEFT JOIN users o ON o.id = d.user_id
                   WHERE d.deleted_at IS NULL AND d.expiry_date IS NOT NULL
                     AND (o.id IS NULL OR o.deleted_at IS NULL)
                     AND (date(d.expiry_date) IS NULL OR date(d.expiry_date) BETWEEN ? AND ?)
                   ORDER BY d.expiry_date, d.id"#
            }
        };

        let rows = sqlx::query(sql)
            .bind(from.format("%Y-%m-%d").to_string())
            .bind(to.format("%Y-%m-%d").to_string())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(document_from_row).collect())
    }

    // ==================== TOPIC OPERATIONS ====================

    /// Find a non-deleted topic by slug.
    pub async fn find_topic_by_slug(&self, slug: &str) -> Result<Option<NotificationTopic>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM notification_topics WHERE slug = ? AND deleted_at IS NULL",
            TOPIC_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(topic_from_row))
    }

    /// List all non-deleted topics.
    pub async fn list_topics(&self) -> Result<Vec<NotificationTopic>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM notification_topics WHERE deleted_at IS NULL ORDER BY slug",
            TOPIC_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(topic_from_row).collect())
    }

    /// Get a non-deleted topic by ID.
    pub async fn get_topic(&self, id: &str) -> Result<Option<NotificationTopic>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM notification_topics WHERE id = ? AND deleted_at IS NULL",
            TOPIC_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(topic_from_row))
    }

    /// Create a new topic. Slugs are unique, including soft-deleted ones.
    pub async fn create_topic(
        &self,
        request: &CreateTopicRequest,
    ) -> Result<NotificationTopic, AppError> {
        let existing = sqlx::query("SELECT id FROM notification_topics WHERE slug = ?")
            .bind(&request.slug)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(AppError::Validation(format!(
                "Topic slug {} is already taken",
                request.slug
            )));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let channels = dedup_channels(&request.default_channels);

        sqlx::query(
            "INSERT INTO notification_topics (id, slug, name, description, default_channels, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&request.slug)
        .bind(&request.name)
        .bind(&request.description)
        .bind(channels_to_json(&channels))
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(NotificationTopic {
            id,
            slug: request.slug.clone(),
            name: request.name.clone(),
            description: request.description.clone(),
            default_channels: channels,
            created_at: now,
            deleted_at: None,
        })
    }

    /// Update a topic's name, description or default channels.
    ///
    /// Omitted fields are kept. An empty description clears it.
    pub async fn update_topic(
        &self,
        id: &str,
        request: &UpdateTopicRequest,
    ) -> Result<NotificationTopic, AppError> {
        let existing = self
            .get_topic(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Topic {} not found", id)))?;

        let name = request.name.clone().unwrap_or(existing.name);
        // An empty description clears it; an omitted one is kept
        let description = match request.description.as_deref() {
            Some(d) if d.trim().is_empty() => None,
            Some(d) => Some(d.to_string()),
            None => existing.description,
        };
        let channels = request
            .default_channels
            .as_deref()
            .map(dedup_channels)
            .unwrap_or(existing.default_channels);

        sqlx::query(
            "UPDATE notification_topics SET name = ?, description = ?, default_channels = ? WHERE id = ?",
        )
        .bind(&name)
        .bind(&description)
        .bind(channels_to_json(&channels))
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(NotificationTopic {
            id: existing.id,
            slug: existing.slug,
            name,
            description,
            default_channels: channels,
            created_at: existing.created_at,
            deleted_at: None,
        })
    }

    /// Soft-delete a topic. Subscriptions are kept but stop resolving.
    pub async fn delete_topic(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE notification_topics SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Topic {} not found", id)));
        }
        Ok(())
    }

    /// Members of every group in `company_id` subscribed to the topic `slug`,
    /// in one join. May contain the same user more than once.
    pub async fn find_topic_subscribers(
        &self,
        slug: &str,
        company_id: &str,
    ) -> Result<Vec<Subscriber>, AppError> {
        let rows = sqlx::query(
            r#"SELECT u.id AS user_id, u.email, u.first_name
               FROM notification_topics t
               JOIN topic_subscriptions s ON s.topic_id = t.id
               JOIN notification_groups g ON g.id = s.group_id
               JOIN group_members m ON m.group_id = g.id
               JOIN users u ON u.id = m.user_id
               WHERE t.slug = ? AND t.deleted_at IS NULL
                 AND g.company_id = ?
                 AND u.deleted_at IS NULL
               ORDER BY g.created_at, g.id, u.id"#,
        )
        .bind(slug)
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| Subscriber {
                user_id: row.get("user_id"),
                email: row.get("email"),
                first_name: row.get("first_name"),
            })
            .collect())
    }

    // ==================== GROUP OPERATIONS ====================

    /// List groups of one company with their members and subscriptions.
    pub async fn list_groups(&self, company_id: &str) -> Result<Vec<NotificationGroup>, AppError> {
        let rows = sqlx::query(
            "SELECT id, company_id, name, description, created_at FROM notification_groups WHERE company_id = ? ORDER BY name",
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        let mut groups = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut group = group_from_row(row);
            self.load_group_links(&mut group).await?;
            groups.push(group);
        }
        Ok(groups)
    }

    /// Get a group by ID.
    pub async fn get_group(&self, id: &str) -> Result<Option<NotificationGroup>, AppError> {
        let row = sqlx::query(
            "SELECT id, company_id, name, description, created_at FROM notification_groups WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let mut group = group_from_row(&row);
                self.load_group_links(&mut group).await?;
                Ok(Some(group))
            }
            None => Ok(None),
        }
    }

    async fn load_group_links(&self, group: &mut NotificationGroup) -> Result<(), AppError> {
        let members =
            sqlx::query("SELECT user_id FROM group_members WHERE group_id = ? ORDER BY user_id")
                .bind(&group.id)
                .fetch_all(&self.pool)
                .await?;
        group.member_ids = members.iter().map(|r| r.get("user_id")).collect();

        let topics = sqlx::query(
            r#"SELECT t.slug FROM topic_subscriptions s
               JOIN notification_topics t ON t.id = s.topic_id
               WHERE s.group_id = ? AND t.deleted_at IS NULL
               ORDER BY t.slug"#,
        )
        .bind(&group.id)
        .fetch_all(&self.pool)
        .await?;
        group.topic_slugs = topics.iter().map(|r| r.get("slug")).collect();

        Ok(())
    }

    /// Create a new group in `company_id`.
    pub async fn create_group(
        &self,
        company_id: &str,
        request: &CreateGroupRequest,
    ) -> Result<NotificationGroup, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO notification_groups (id, company_id, name, description, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(company_id)
        .bind(&request.name)
        .bind(&request.description)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(NotificationGroup {
            id,
            company_id: company_id.to_string(),
            name: request.name.clone(),
            description: request.description.clone(),
            member_ids: Vec::new(),
            topic_slugs: Vec::new(),
            created_at: now,
        })
    }

    /// Delete a group together with its memberships and subscriptions.
    pub async fn delete_group(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM group_members WHERE group_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM topic_subscriptions WHERE group_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM notification_groups WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Group {} not found", id)));
        }

        tx.commit().await?;
        Ok(())
    }

    /// Add a user to a group. Adding an existing member is a no-op.
    pub async fn add_group_member(&self, group_id: &str, user_id: &str) -> Result<(), AppError> {
        sqlx::query("INSERT OR IGNORE INTO group_members (group_id, user_id) VALUES (?, ?)")
            .bind(group_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Remove a user from a group.
    pub async fn remove_group_member(&self, group_id: &str, user_id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM group_members WHERE group_id = ? AND user_id = ?")
            .bind(group_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "User {} is not a member of group {}",
                user_id, group_id
            )));
        }
        Ok(())
    }

    /// Subscribe a group to a topic. Re-subscribing is a no-op.
    pub async fn subscribe_group(&self, group_id: &str, topic_id: &str) -> Result<(), AppError> {
        sqlx::query("INSERT OR IGNORE INTO topic_subscriptions (group_id, topic_id) VALUES (?, ?)")
            .bind(group_id)
            .bind(topic_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Remove a group's subscription to a topic.
    pub async fn unsubscribe_group(&self, group_id: &str, topic_id: &str) -> Result<(), AppError> {
        let result =
            sqlx::query("DELETE FROM topic_subscriptions WHERE group_id = ? AND topic_id = ?")
                .bind(group_id)
                .bind(topic_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Group {} is not subscribed to topic {}",
                group_id, topic_id
            )));
        }
        Ok(())
    }

    // ==================== USER OPERATIONS ====================

    /// Company of a non-deleted user, if the user exists.
    pub async fn get_user_company(&self, user_id: &str) -> Result<Option<String>, AppError> {
        let row = sqlx::query("SELECT company_id FROM users WHERE id = ? AND deleted_at IS NULL")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("company_id")))
    }

    // ==================== NOTIFICATION OPERATIONS ====================

    /// Insert one in-app notification. No uniqueness is enforced.
    pub async fn insert_notification(
        &self,
        new: &NewNotification<'_>,
    ) -> Result<Notification, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO notifications (id, user_id, actor_type, type, title, message, link, is_read, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?)",
        )
        .bind(&id)
        .bind(new.user_id)
        .bind(new.actor_type)
        .bind(new.kind)
        .bind(new.title)
        .bind(new.message)
        .bind(new.link)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Notification {
            id,
            user_id: new.user_id.to_string(),
            actor_type: new.actor_type.to_string(),
            kind: new.kind.to_string(),
            title: new.title.to_string(),
            message: new.message.to_string(),
            link: new.link.map(str::to_string),
            is_read: false,
            created_at: now,
        })
    }

    /// List a user's notifications, newest first.
    pub async fn list_notifications_for_user(
        &self,
        user_id: &str,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<Notification>, AppError> {
        let rows = sqlx::query(
            r#"SELECT id, user_id, actor_type, type, title, message, link, is_read, created_at
               FROM notifications
               WHERE user_id = ? AND (? = 0 OR is_read = 0)
               ORDER BY created_at DESC, rowid DESC
               LIMIT ?"#,
        )
        .bind(user_id)
        .bind(unread_only as i32)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(notification_from_row).collect())
    }

    /// Mark one of the user's notifications read.
    pub async fn mark_notification_read(&self, id: &str, user_id: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Notification {} not found", id)));
        }
        Ok(())
    }

    // ==================== SESSION OPERATIONS ====================

    /// Resolve an unexpired session token to the principal it belongs to.
    pub async fn find_session_principal(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthenticatedPrincipal>, AppError> {
        let row = sqlx::query(
            r#"SELECT s.principal_type, s.principal_id, s.expires_at,
                      u.company_id AS user_company_id, u.is_staff,
                      d.company_id AS driver_company_id
               FROM sessions s
               LEFT JOIN users u ON s.principal_type = 'user' AND u.id = s.principal_id AND u.deleted_at IS NULL
               LEFT JOIN drivers d ON s.principal_type = 'driver' AND d.id = s.principal_id AND d.deleted_at IS NULL
               WHERE s.token = ?"#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let expires_at: String = row.get("expires_at");
        match DateTime::parse_from_rfc3339(&expires_at) {
            Ok(at) if at.with_timezone(&Utc) > now => {}
            _ => return Ok(None),
        }

        let principal_type: String = row.get("principal_type");
        let id: String = row.get("principal_id");
        let principal = match principal_type.as_str() {
            "user" => {
                let company_id: Option<String> = row.get("user_company_id");
                let is_staff: Option<i32> = row.get("is_staff");
                company_id.map(|company_id| AuthenticatedPrincipal::User {
                    id,
                    company_id,
                    is_staff: is_staff.unwrap_or(0) != 0,
                })
            }
            "driver" => {
                let company_id: Option<String> = row.get("driver_company_id");
                company_id.map(|company_id| AuthenticatedPrincipal::Driver { id, company_id })
            }
            _ => None,
        };

        Ok(principal)
    }
}

// Helper functions for row conversion

fn document_from_row(row: &sqlx::sqlite::SqliteRow) -> ExpiringDocument {
    let owner_label: Option<String> = row.get("owner_label");
    ExpiringDocument {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        owner_company_id: row.get("company_id"),
        title: row.get("title"),
        document_type_slug: row.get("document_type_slug"),
        expiry_date: row.get("expiry_date"),
        owner_label: owner_label.filter(|s| !s.trim().is_empty()),
    }
}

fn topic_from_row(row: &sqlx::sqlite::SqliteRow) -> NotificationTopic {
    let channels: String = row.get("default_channels");
    NotificationTopic {
        id: row.get("id"),
        slug: row.get("slug"),
        name: row.get("name"),
        description: row.get("description"),
        default_channels: parse_channels(&channels),
        created_at: row.get("created_at"),
        deleted_at: row.get("deleted_at"),
    }
}

fn group_from_row(row: &sqlx::sqlite::SqliteRow) -> NotificationGroup {
    NotificationGroup {
        id: row.get("id"),
        company_id: row.get("company_id"),
        name: row.get("name"),
        description: row.get("description"),
        member_ids: Vec::new(),
        topic_slugs: Vec::new(),
        created_at: row.get("created_at"),
    }
}

fn notification_from_row(row: &sqlx::sqlite::SqliteRow) -> Notification {
    let is_read: i32 = row.get("is_read");
    Notification {
        id: row.get("id"),
        user_id: row.get("user_id"),
        actor_type: row.get("actor_type"),
        kind: row.get("type"),
        title: row.get("title"),
        message: row.get("message"),
        link: row.get("link"),
        is_read: is_read != 0,
        created_at: row.get("created_at"),
    }
}

/// Unknown channel names are dropped rather than failing the whole topic.
fn parse_channels(s: &str) -> Vec<Channel> {
    let names: Vec<String> = serde_json::from_str(s).unwrap_or_default();
    let channels: Vec<Channel> = names.iter().filter_map(|n| n.parse::<Channel>().ok()).collect();
    dedup_channels(&channels)
}

fn dedup_channels(channels: &[Channel]) -> Vec<Channel> {
    let mut out = Vec::with_capacity(channels.len());
    for channel in channels {
        if !out.contains(channel) {
            out.push(*channel);
        }
    }
    out
}

fn channels_to_json(channels: &[Channel]) -> String {
    let names: Vec<&str> = channels.iter().map(Channel::as_str).collect();
    serde_json::to_string(&names).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_channels_skips_unknown_and_duplicates() {
        let channels = parse_channels(r#"["email","sms","in_app","email"]"#);
        assert_eq!(channels, vec![Channel::Email, Channel::InApp]);
    }

    #[test]
    fn test_parse_channels_malformed_is_empty() {
        assert!(parse_channels("not json").is_empty());
    }

    #[test]
    fn test_channels_to_json() {
        assert_eq!(
            channels_to_json(&[Channel::InApp, Channel::Push]),
            r#"["in_app","push"]"#
        );
    }
}
