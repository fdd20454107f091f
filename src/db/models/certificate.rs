use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::OffsetDateTime;

/// Proof of 100% completion for a (user, course) pair. Immutable once issued;
/// the workflow never deletes or reissues one.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Certificate {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub issued_at: OffsetDateTime,
    pub verification_id: String,
    pub certificate_url: String,
}

impl Certificate {
    pub fn new(user_id: Uuid, course_id: Uuid, now: OffsetDateTime) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            user_id,
            course_id,
            issued_at: now,
            verification_id: format!("CERT-{}-{}", now.year(), Uuid::new_v4().simple()),
            certificate_url: format!("/api/certificates/{}/download", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_ids_are_unique_per_certificate() {
        let now = OffsetDateTime::now_utc();
        let user = Uuid::new_v4();
        let course = Uuid::new_v4();
        let a = Certificate::new(user, course, now);
        let b = Certificate::new(user, course, now);
        assert!(a.verification_id.starts_with(&format!("CERT-{}-", now.year())));
        assert_ne!(a.verification_id, b.verification_id);
    }
}
