use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::OffsetDateTime;
use validator::Validate;

use super::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "webinar_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WebinarStatus {
    Upcoming,
    Live,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "registration_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Open,
    Closed,
    Full,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Webinar {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub presenter_id: Uuid,
    pub presenter_name: String,
    pub description: String,
    pub agenda: String,
    pub thumbnail_image: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub scheduled_date: OffsetDateTime,
    pub duration_minutes: i32,
    pub timezone: String,
    pub registration_status: RegistrationStatus,
    pub max_attendees: Option<i32>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub registration_deadline: Option<OffsetDateTime>,
    pub meeting_link: Option<String>,
    pub meeting_id: Option<String>,
    pub meeting_passcode: Option<String>,
    pub recording_url: Option<String>,
    pub recording_available: bool,
    pub status: WebinarStatus,
    pub registered_count: i32,
    pub attended_count: i32,
    pub category: String,
    pub tags: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Webinar {
    pub fn new(payload: NewWebinar, presenter: &User, slug: String, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: payload.title,
            slug,
            presenter_id: presenter.id,
            presenter_name: presenter.full_name(),
            description: payload.description,
            agenda: payload.agenda.unwrap_or_default(),
            thumbnail_image: payload.thumbnail_image,
            scheduled_date: payload.scheduled_date,
            duration_minutes: payload.duration_minutes.unwrap_or(60),
            timezone: payload.timezone.unwrap_or_else(|| "UTC".to_string()),
            registration_status: payload
                .registration_status
                .unwrap_or(RegistrationStatus::Open),
            max_attendees: payload.max_attendees,
            registration_deadline: payload.registration_deadline,
            meeting_link: payload.meeting_link,
            meeting_id: payload.meeting_id,
            meeting_passcode: payload.meeting_passcode,
            recording_url: None,
            recording_available: false,
            status: WebinarStatus::Upcoming,
            registered_count: 0,
            attended_count: 0,
            category: payload.category.unwrap_or_default(),
            tags: payload.tags.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_update(&mut self, update: UpdateWebinar, now: OffsetDateTime) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(agenda) = update.agenda {
            self.agenda = agenda;
        }
        if let Some(thumbnail_image) = update.thumbnail_image {
            self.thumbnail_image = Some(thumbnail_image);
        }
        if let Some(scheduled_date) = update.scheduled_date {
            self.scheduled_date = scheduled_date;
        }
        if let Some(duration_minutes) = update.duration_minutes {
            self.duration_minutes = duration_minutes;
        }
        if let Some(timezone) = update.timezone {
            self.timezone = timezone;
        }
        if let Some(registration_status) = update.registration_status {
            self.registration_status = registration_status;
        }
        if let Some(max_attendees) = update.max_attendees {
            self.max_attendees = Some(max_attendees);
        }
        if let Some(registration_deadline) = update.registration_deadline {
            self.registration_deadline = Some(registration_deadline);
        }
        if let Some(meeting_link) = update.meeting_link {
            self.meeting_link = Some(meeting_link);
        }
        if let Some(meeting_id) = update.meeting_id {
            self.meeting_id = Some(meeting_id);
        }
        if let Some(meeting_passcode) = update.meeting_passcode {
            self.meeting_passcode = Some(meeting_passcode);
        }
        if let Some(recording_url) = update.recording_url {
            self.recording_url = Some(recording_url);
        }
        if let Some(recording_available) = update.recording_available {
            self.recording_available = recording_available;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(tags) = update.tags {
            self.tags = tags;
        }
        self.updated_at = now;
    }

    /// Registration is open iff the flag says so, the deadline (if any) has
    /// not passed, and the attendee cap (if any) has not been reached.
    pub fn is_registration_open(&self, now: OffsetDateTime) -> bool {
        if let Some(deadline) = self.registration_deadline {
            if now > deadline {
                return false;
            }
        }
        if let Some(max) = self.max_attendees {
            if self.registered_count >= max {
                return false;
            }
        }
        self.registration_status == RegistrationStatus::Open
    }

    pub fn tags_list(&self) -> Vec<String> {
        super::tags_list(&self.tags)
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct WebinarRegistration {
    pub id: Uuid,
    pub webinar_id: Uuid,
    pub user_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub registered_at: OffsetDateTime,
    pub attended: bool,
    pub feedback_rating: Option<i16>,
    pub feedback_comment: Option<String>,
}

impl WebinarRegistration {
    pub fn new(webinar_id: Uuid, user_id: Uuid, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            webinar_id,
            user_id,
            registered_at: now,
            attended: false,
            feedback_rating: None,
            feedback_comment: None,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewWebinar {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub description: String,
    pub agenda: Option<String>,
    pub thumbnail_image: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub scheduled_date: OffsetDateTime,
    #[validate(range(min = 1))]
    pub duration_minutes: Option<i32>,
    pub timezone: Option<String>,
    pub registration_status: Option<RegistrationStatus>,
    #[validate(range(min = 1))]
    pub max_attendees: Option<i32>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub registration_deadline: Option<OffsetDateTime>,
    pub meeting_link: Option<String>,
    pub meeting_id: Option<String>,
    pub meeting_passcode: Option<String>,
    pub category: Option<String>,
    pub tags: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateWebinar {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub agenda: Option<String>,
    pub thumbnail_image: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub scheduled_date: Option<OffsetDateTime>,
    #[validate(range(min = 1))]
    pub duration_minutes: Option<i32>,
    pub timezone: Option<String>,
    pub registration_status: Option<RegistrationStatus>,
    #[validate(range(min = 1))]
    pub max_attendees: Option<i32>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub registration_deadline: Option<OffsetDateTime>,
    pub meeting_link: Option<String>,
    pub meeting_id: Option<String>,
    pub meeting_passcode: Option<String>,
    pub recording_url: Option<String>,
    pub recording_available: Option<bool>,
    pub status: Option<WebinarStatus>,
    pub category: Option<String>,
    pub tags: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct WebinarFilter {
    pub status: Option<WebinarStatus>,
    pub category: Option<String>,
    pub presenter_id: Option<Uuid>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebinarOrdering {
    ScheduledDate,
    CreatedAt,
}

impl WebinarOrdering {
    /// Default is soonest scheduled date first.
    pub fn parse(value: Option<&str>) -> (Self, bool) {
        let Some(value) = value else {
            return (Self::ScheduledDate, false);
        };
        let (field, descending) = match value.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (value, false),
        };
        match field {
            "scheduled_date" => (Self::ScheduledDate, descending),
            "created_at" => (Self::CreatedAt, descending),
            _ => (Self::ScheduledDate, false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::NewUser;
    use secrecy::SecretBox;

    fn presenter() -> User {
        let payload = NewUser {
            email: "p@example.com".into(),
            username: "presenter".into(),
            first_name: String::new(),
            last_name: String::new(),
            password: SecretBox::new(Box::new("pw".to_string())),
        };
        User::new(payload, "hash".into(), OffsetDateTime::now_utc())
    }

    fn webinar(now: OffsetDateTime) -> Webinar {
        let payload = NewWebinar {
            title: "Rust for LMS".into(),
            description: "desc".into(),
            agenda: None,
            thumbnail_image: None,
            scheduled_date: now + time::Duration::days(7),
            duration_minutes: None,
            timezone: None,
            registration_status: None,
            max_attendees: None,
            registration_deadline: None,
            meeting_link: None,
            meeting_id: None,
            meeting_passcode: None,
            category: None,
            tags: None,
        };
        Webinar::new(payload, &presenter(), "rust-for-lms".into(), now)
    }

    #[test]
    fn registration_open_by_default() {
        let now = OffsetDateTime::now_utc();
        assert!(webinar(now).is_registration_open(now));
    }

    #[test]
    fn registration_closed_after_deadline() {
        let now = OffsetDateTime::now_utc();
        let mut w = webinar(now);
        w.registration_deadline = Some(now - time::Duration::hours(1));
        assert!(!w.is_registration_open(now));
    }

    #[test]
    fn registration_closed_when_full() {
        let now = OffsetDateTime::now_utc();
        let mut w = webinar(now);
        w.max_attendees = Some(2);
        w.registered_count = 2;
        assert!(!w.is_registration_open(now));
    }

    #[test]
    fn registration_closed_by_flag() {
        let now = OffsetDateTime::now_utc();
        let mut w = webinar(now);
        w.registration_status = RegistrationStatus::Closed;
        assert!(!w.is_registration_open(now));
    }

    #[test]
    fn ordering_defaults_to_soonest_first() {
        assert_eq!(
            WebinarOrdering::parse(None),
            (WebinarOrdering::ScheduledDate, false)
        );
        assert_eq!(
            WebinarOrdering::parse(Some("-created_at")),
            (WebinarOrdering::CreatedAt, true)
        );
    }
}
