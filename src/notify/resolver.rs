//! Topic → group → member resolution.

use std::collections::HashSet;
use std::sync::Arc;

use crate::db::Repository;
use crate::errors::AppError;
use crate::models::Subscriber;

/// Resolves who should hear about a topic inside one company.
///
/// Stateless; callers that resolve the same company repeatedly cache the result.
#[derive(Clone)]
pub struct SubscriberResolver {
    repo: Arc<Repository>,
}

impl SubscriberResolver {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    /// Members of `company_id`'s groups subscribed to `topic_slug`, each user once.
    ///
    /// An unknown or soft-deleted topic, or a company with no subscribed
    /// group, yields an empty list.
    pub async fn resolve(
        &self,
        company_id: &str,
        topic_slug: &str,
    ) -> Result<Vec<Subscriber>, AppError> {
        let rows = self
            .repo
            .find_topic_subscribers(topic_slug, company_id)
            .await?;
        Ok(dedup_by_user(rows))
    }
}

/// Keeps the first occurrence of each user id.
fn dedup_by_user(rows: Vec<Subscriber>) -> Vec<Subscriber> {
    let mut seen = HashSet::with_capacity(rows.len());
    rows.into_iter()
        .filter(|s| seen.insert(s.user_id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(id: &str) -> Subscriber {
        Subscriber {
            user_id: id.to_string(),
            email: Some(format!("{}@example.com", id)),
            first_name: None,
        }
    }

    #[test]
    fn test_dedup_keeps_first_occurrence_order() {
        let out = dedup_by_user(vec![sub("b"), sub("a"), sub("b"), sub("c"), sub("a")]);
        let ids: Vec<&str> = out.iter().map(|s| s.user_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }
}
