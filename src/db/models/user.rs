use secrecy::SecretBox;
use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::OffsetDateTime;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Student,
    Instructor,
    Admin,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub date_joined: OffsetDateTime,
}

impl User {
    pub fn new(payload: NewUser, password_hash: String, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: payload.email.to_lowercase(),
            username: payload.username,
            password_hash,
            first_name: payload.first_name,
            last_name: payload.last_name,
            role: UserRole::Student,
            is_active: true,
            date_joined: now,
        }
    }

    /// Display name used for denormalized instructor/author fields; falls
    /// back to the username when no real name was provided.
    pub fn full_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.username.clone()
        } else {
            name.to_string()
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn is_instructor(&self) -> bool {
        matches!(self.role, UserRole::Instructor | UserRole::Admin)
    }
}

/// Public projection of a user, safe to embed in any response.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date_joined: OffsetDateTime,
    pub is_active: bool,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            date_joined: user.date_joined,
            is_active: user.is_active,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewUser {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 3, max = 150))]
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub password: SecretBox<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfile {
    #[validate(length(min = 3, max = 150))]
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UserLogin {
    #[validate(email)]
    pub email: String,
    pub password: SecretBox<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PasswordChange {
    pub old_password: SecretBox<String>,
    pub new_password: SecretBox<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(first: &str, last: &str) -> NewUser {
        NewUser {
            email: "Jo@Example.COM".into(),
            username: "jo".into(),
            first_name: first.into(),
            last_name: last.into(),
            password: SecretBox::new(Box::new("hunter2".to_string())),
        }
    }

    #[test]
    fn new_user_lowercases_email_and_defaults_to_student() {
        let now = OffsetDateTime::now_utc();
        let user = User::new(payload("Jo", "Doe"), "hash".into(), now);
        assert_eq!(user.email, "jo@example.com");
        assert_eq!(user.role, UserRole::Student);
        assert!(user.is_active);
    }

    #[test]
    fn full_name_falls_back_to_username() {
        let now = OffsetDateTime::now_utc();
        let named = User::new(payload("Jo", "Doe"), "hash".into(), now);
        assert_eq!(named.full_name(), "Jo Doe");

        let anonymous = User::new(payload("", ""), "hash".into(), now);
        assert_eq!(anonymous.full_name(), "jo");
    }

    #[test]
    fn role_checks_treat_admin_as_instructor() {
        let now = OffsetDateTime::now_utc();
        let mut user = User::new(payload("Jo", "Doe"), "hash".into(), now);
        assert!(!user.is_instructor());
        user.role = UserRole::Instructor;
        assert!(user.is_instructor());
        assert!(!user.is_admin());
        user.role = UserRole::Admin;
        assert!(user.is_instructor());
        assert!(user.is_admin());
    }
}
