use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::OffsetDateTime;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub enrolled_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_accessed: OffsetDateTime,
}

impl Enrollment {
    pub fn new(user_id: Uuid, course_id: Uuid, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            course_id,
            enrolled_at: now,
            last_accessed: now,
        }
    }
}

/// Completion state of one (enrollment, lesson) pair. `completed_at` is only
/// meaningful while `completed` is true.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Progress {
    pub id: Uuid,
    pub enrollment_id: Uuid,
    pub lesson_id: Uuid,
    pub completed: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
}

impl Progress {
    pub fn new(enrollment_id: Uuid, lesson_id: Uuid, completed: bool, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            enrollment_id,
            lesson_id,
            completed,
            completed_at: completed.then_some(now),
        }
    }

    /// Applies a completion flag change. Stamps `completed_at` only on the
    /// false→true transition and clears it when the lesson is un-completed.
    pub fn set_completed(&mut self, completed: bool, now: OffsetDateTime) {
        if completed && !self.completed {
            self.completed_at = Some(now);
        } else if !completed {
            self.completed_at = None;
        }
        self.completed = completed;
    }
}

/// Completed lessons over total lessons, as a percentage. Defined as 0 for a
/// course with no lessons.
pub fn completion_percentage(completed: i64, total: i64) -> f64 {
    if total <= 0 {
        0.0
    } else {
        completed as f64 / total as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_of_zero_lessons_is_zero() {
        assert_eq!(completion_percentage(0, 0), 0.0);
    }

    #[test]
    fn percentage_is_completed_over_total() {
        assert_eq!(completion_percentage(1, 2), 50.0);
        assert_eq!(completion_percentage(2, 2), 100.0);
        assert_eq!(completion_percentage(1, 3), 100.0 / 3.0);
    }

    #[test]
    fn completed_at_stamped_once_and_cleared_on_uncomplete() {
        let now = OffsetDateTime::now_utc();
        let later = now + time::Duration::hours(1);

        let mut progress = Progress::new(Uuid::new_v4(), Uuid::new_v4(), false, now);
        assert!(progress.completed_at.is_none());

        progress.set_completed(true, now);
        assert_eq!(progress.completed_at, Some(now));

        // already completed: the original timestamp is kept
        progress.set_completed(true, later);
        assert_eq!(progress.completed_at, Some(now));

        progress.set_completed(false, later);
        assert!(progress.completed_at.is_none());
    }
}
