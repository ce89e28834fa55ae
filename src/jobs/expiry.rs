//! Document-expiry job.
//!
//! One run walks every qualifying document of a class, asks the reminder
//! policy whether today is a reminder day, and fans out to the owner
//! company's subscribers. A bad document or a failed delivery never aborts
//! the run; only failing to load the topic or the documents does.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{
    Channel, DocumentClass, ExpirySummary, ExpiringDocument, NotificationPayload, Subscriber,
    DOCUMENT_EXPIRY_TOPIC,
};
use crate::notify::policy::{self, NAG_FLOOR_DAYS, NOTICE_WINDOW_DAYS};
use crate::notify::{NotificationDispatcher, SubscriberResolver};

/// Notification type stored on in-app records.
pub const DOCUMENT_EXPIRY_KIND: &str = "document_expiry";

#[derive(Clone)]
pub struct ExpiryJob {
    repo: Arc<Repository>,
    resolver: SubscriberResolver,
    dispatcher: NotificationDispatcher,
}

impl ExpiryJob {
    pub fn new(
        repo: Arc<Repository>,
        resolver: SubscriberResolver,
        dispatcher: NotificationDispatcher,
    ) -> Self {
        Self {
            repo,
            resolver,
            dispatcher,
        }
    }

    /// Run every document class against the same `now`.
    ///
    /// The subscriber cache is shared across classes, so a company with
    /// documents in several classes counts once.
    pub async fn run_all(&self, now: DateTime<Utc>) -> Result<ExpirySummary, AppError> {
        let mut total = ExpirySummary::default();
        let mut run = RunState::default();
        for class in DocumentClass::ALL {
            total.absorb(self.run_class(class, now, &mut run).await?);
        }
        total.companies_processed = run.subscribers.len();
        Ok(total)
    }

    /// Run one document class. `now` is fixed for the whole run.
    pub async fn run(
        &self,
        class: DocumentClass,
        now: DateTime<Utc>,
    ) -> Result<ExpirySummary, AppError> {
        let mut run = RunState::default();
        let mut summary = self.run_class(class, now, &mut run).await?;
        summary.companies_processed = run.subscribers.len();
        Ok(summary)
    }

    async fn run_class(
        &self,
        class: DocumentClass,
        now: DateTime<Utc>,
        run: &mut RunState,
    ) -> Result<ExpirySummary, AppError> {
        let mut summary = ExpirySummary::for_class(class);
        let today = now.date_naive();

        let Some(topic) = self.repo.find_topic_by_slug(DOCUMENT_EXPIRY_TOPIC).await? else {
            tracing::warn!(
                topic = DOCUMENT_EXPIRY_TOPIC,
                class = %class,
                "Notification topic not configured, nothing to do"
            );
            return Ok(summary);
        };

        let documents = self
            .repo
            .list_expiring_documents(
                class,
                today + Duration::days(NAG_FLOOR_DAYS),
                today + Duration::days(NOTICE_WINDOW_DAYS),
            )
            .await?;

        tracing::info!(
            class = %class,
            documents = documents.len(),
            %today,
            "Checking expiring documents"
        );

        for document in &documents {
            summary.total_checked += 1;
            match self
                .process_document(class, document, today, &topic.default_channels, run)
                .await
            {
                Ok(sent) => summary.notifications_sent += sent,
                Err(message) => {
                    tracing::warn!(
                        class = %class,
                        document_id = %document.id,
                        error = %message,
                        "Skipping document"
                    );
                    summary
                        .errors
                        .push(format!("{} document {}: {}", class, document.id, message));
                }
            }
        }

        tracing::info!(
            class = %class,
            checked = summary.total_checked,
            sent = summary.notifications_sent,
            errors = summary.errors.len(),
            "Expiry check finished"
        );

        Ok(summary)
    }

    /// Returns the number of recipients dispatched to.
    async fn process_document(
        &self,
        class: DocumentClass,
        document: &ExpiringDocument,
        today: NaiveDate,
        channels: &[Channel],
        run: &mut RunState,
    ) -> Result<usize, String> {
        let expiry = policy::parse_expiry_date(&document.expiry_date)
            .ok_or_else(|| format!("unparseable expiry date {:?}", document.expiry_date))?;

        let days = policy::days_remaining(expiry, today);
        if !policy::should_notify(days) {
            return Ok(0);
        }

        let company_id = document
            .owner_company_id
            .as_deref()
            .ok_or_else(|| format!("{} {} has no company", class, document.owner_id))?;

        let subscribers = run
            .subscribers_for(&self.resolver, company_id)
            .await
            .map_err(|e| format!("resolving subscribers for company {}: {}", company_id, e))?;

        if subscribers.is_empty() {
            tracing::debug!(
                document_id = %document.id,
                company_id,
                "No subscribers for company"
            );
            return Ok(0);
        }

        tracing::debug!(
            document_id = %document.id,
            document_type = document.document_type_slug.as_deref().unwrap_or("-"),
            days,
            recipients = subscribers.len(),
            "Sending expiry reminder"
        );

        let payload = build_payload(class, document, days);
        for subscriber in subscribers.iter() {
            let report = self.dispatcher.dispatch(subscriber, &payload, channels).await;
            if report.any_failed() {
                tracing::debug!(
                    document_id = %document.id,
                    user_id = %subscriber.user_id,
                    ?report,
                    "Partial delivery"
                );
            }
        }

        Ok(subscribers.len())
    }
}

/// Per-run memoization of company → subscribers. Failed lookups are not cached.
#[derive(Default)]
struct RunState {
    subscribers: HashMap<String, Arc<Vec<Subscriber>>>,
}

impl RunState {
    async fn subscribers_for(
        &mut self,
        resolver: &SubscriberResolver,
        company_id: &str,
    ) -> Result<Arc<Vec<Subscriber>>, AppError> {
        if let Some(cached) = self.subscribers.get(company_id) {
            return Ok(cached.clone());
        }
        let resolved = Arc::new(resolver.resolve(company_id, DOCUMENT_EXPIRY_TOPIC).await?);
        self.subscribers
            .insert(company_id.to_string(), resolved.clone());
        Ok(resolved)
    }
}

fn build_payload(class: DocumentClass, document: &ExpiringDocument, days: i64) -> NotificationPayload {
    let state = if days < 0 { "Expired" } else { "Expiring" };
    let title = format!("{} Document {}: {}", class.label(), state, document.title);

    let owner = match &document.owner_label {
        Some(label) => format!(" for {} {}", class.as_str(), label),
        None => String::new(),
    };
    let message = format!(
        "{}{} {}.",
        document.title,
        owner,
        policy::urgency_phrase(days)
    );

    NotificationPayload {
        kind: DOCUMENT_EXPIRY_KIND.to_string(),
        title,
        message,
        link: Some(class.owner_link(&document.owner_id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(label: Option<&str>) -> ExpiringDocument {
        ExpiringDocument {
            id: "doc-1".into(),
            owner_id: "veh-1".into(),
            owner_company_id: Some("co-1".into()),
            title: "Insurance".into(),
            document_type_slug: Some("insurance".into()),
            expiry_date: "2026-10-21".into(),
            owner_label: label.map(str::to_string),
        }
    }

    #[test]
    fn test_payload_for_upcoming_expiry() {
        let payload = build_payload(DocumentClass::Vehicle, &document(Some("AB-123")), 5);
        assert_eq!(payload.title, "Vehicle Document Expiring: Insurance");
        assert_eq!(
            payload.message,
            "Insurance for vehicle AB-123 expires in 5 days."
        );
        assert_eq!(payload.kind, DOCUMENT_EXPIRY_KIND);
        assert_eq!(payload.link.as_deref(), Some("/vehicles/veh-1?tab=documents"));
    }

    #[test]
    fn test_payload_for_expired_document_without_owner_label() {
        let payload = build_payload(DocumentClass::Driver, &document(None), -2);
        assert_eq!(payload.title, "Driver Document Expired: Insurance");
        assert_eq!(payload.message, "Insurance expired 2 days ago.");
    }
}
