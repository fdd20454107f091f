use async_trait::async_trait;
use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::db::error::StoreError;
use crate::db::models::{Webinar, WebinarFilter, WebinarOrdering, WebinarRegistration};
use crate::db::repository::WebinarRepo;

use super::PgStore;

type Result<T> = std::result::Result<T, StoreError>;

#[async_trait]
impl WebinarRepo for PgStore {
    async fn create(&self, webinar: Webinar) -> Result<Webinar> {
        sqlx::query_as::<_, Webinar>(
            r#"
            INSERT INTO webinars (id, title, slug, presenter_id, presenter_name, description,
                                  agenda, thumbnail_image, scheduled_date, duration_minutes,
                                  timezone, registration_status, max_attendees,
                                  registration_deadline, meeting_link, meeting_id,
                                  meeting_passcode, recording_url, recording_available, status,
                                  registered_count, attended_count, category, tags, created_at,
                                  updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                    $18, $19, $20, $21, $22, $23, $24, $25, $26)
            RETURNING *
            "#,
        )
        .bind(webinar.id)
        .bind(&webinar.title)
        .bind(&webinar.slug)
        .bind(webinar.presenter_id)
        .bind(&webinar.presenter_name)
        .bind(&webinar.description)
        .bind(&webinar.agenda)
        .bind(&webinar.thumbnail_image)
        .bind(webinar.scheduled_date)
        .bind(webinar.duration_minutes)
        .bind(&webinar.timezone)
        .bind(webinar.registration_status)
        .bind(webinar.max_attendees)
        .bind(webinar.registration_deadline)
        .bind(&webinar.meeting_link)
        .bind(&webinar.meeting_id)
        .bind(&webinar.meeting_passcode)
        .bind(&webinar.recording_url)
        .bind(webinar.recording_available)
        .bind(webinar.status)
        .bind(webinar.registered_count)
        .bind(webinar.attended_count)
        .bind(&webinar.category)
        .bind(&webinar.tags)
        .bind(webinar.created_at)
        .bind(webinar.updated_at)
        .fetch_one(self.pool())
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Webinar> {
        sqlx::query_as::<_, Webinar>("SELECT * FROM webinars WHERE slug = $1")
            .bind(slug)
            .fetch_optional(self.pool())
            .await
            .map_err(StoreError::from_sqlx)?
            .ok_or(StoreError::NotFound)
    }

    async fn list(&self, filter: &WebinarFilter) -> Result<Vec<Webinar>> {
        let mut query = QueryBuilder::new("SELECT * FROM webinars WHERE TRUE");
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status);
        }
        if let Some(category) = &filter.category {
            query.push(" AND category = ").push_bind(category);
        }
        if let Some(presenter_id) = filter.presenter_id {
            query.push(" AND presenter_id = ").push_bind(presenter_id);
        }
        if let Some(term) = &filter.search {
            let pattern = format!("%{}%", term);
            query
                .push(" AND (title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR tags ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        let (ordering, descending) = WebinarOrdering::parse(filter.ordering.as_deref());
        let column = match ordering {
            WebinarOrdering::ScheduledDate => "scheduled_date",
            WebinarOrdering::CreatedAt => "created_at",
        };
        query.push(format!(
            " ORDER BY {} {}",
            column,
            if descending { "DESC" } else { "ASC" }
        ));

        query
            .build_query_as::<Webinar>()
            .fetch_all(self.pool())
            .await
            .map_err(StoreError::from_sqlx)
    }

    async fn update(&self, webinar: &Webinar) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE webinars
            SET title = $2, description = $3, agenda = $4, thumbnail_image = $5,
                scheduled_date = $6, duration_minutes = $7, timezone = $8,
                registration_status = $9, max_attendees = $10, registration_deadline = $11,
                meeting_link = $12, meeting_id = $13, meeting_passcode = $14,
                recording_url = $15, recording_available = $16, status = $17,
                attended_count = $18, category = $19, tags = $20, updated_at = $21
            WHERE id = $1
            "#,
        )
        .bind(webinar.id)
        .bind(&webinar.title)
        .bind(&webinar.description)
        .bind(&webinar.agenda)
        .bind(&webinar.thumbnail_image)
        .bind(webinar.scheduled_date)
        .bind(webinar.duration_minutes)
        .bind(&webinar.timezone)
        .bind(webinar.registration_status)
        .bind(webinar.max_attendees)
        .bind(webinar.registration_deadline)
        .bind(&webinar.meeting_link)
        .bind(&webinar.meeting_id)
        .bind(&webinar.meeting_passcode)
        .bind(&webinar.recording_url)
        .bind(webinar.recording_available)
        .bind(webinar.status)
        .bind(webinar.attended_count)
        .bind(&webinar.category)
        .bind(&webinar.tags)
        .bind(webinar.updated_at)
        .execute(self.pool())
        .await
        .map_err(StoreError::from_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM webinars WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(StoreError::from_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn create_registration(
        &self,
        registration: WebinarRegistration,
    ) -> Result<WebinarRegistration> {
        sqlx::query_as::<_, WebinarRegistration>(
            r#"
            INSERT INTO webinar_registrations (id, webinar_id, user_id, registered_at, attended,
                                               feedback_rating, feedback_comment)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(registration.id)
        .bind(registration.webinar_id)
        .bind(registration.user_id)
        .bind(registration.registered_at)
        .bind(registration.attended)
        .bind(registration.feedback_rating)
        .bind(&registration.feedback_comment)
        .fetch_one(self.pool())
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn delete_registration(&self, webinar_id: Uuid, user_id: Uuid) -> Result<()> {
        let result = sqlx::query(
            "DELETE FROM webinar_registrations WHERE webinar_id = $1 AND user_id = $2",
        )
        .bind(webinar_id)
        .bind(user_id)
        .execute(self.pool())
        .await
        .map_err(StoreError::from_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn find_registration(
        &self,
        webinar_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<WebinarRegistration>> {
        sqlx::query_as::<_, WebinarRegistration>(
            "SELECT * FROM webinar_registrations WHERE webinar_id = $1 AND user_id = $2",
        )
        .bind(webinar_id)
        .bind(user_id)
        .fetch_optional(self.pool())
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn registered_webinar_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT webinar_id FROM webinar_registrations WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn adjust_registered(&self, id: Uuid, delta: i32) -> Result<i32> {
        sqlx::query_scalar::<_, i32>(
            "UPDATE webinars SET registered_count = registered_count + $2 WHERE id = $1 RETURNING registered_count",
        )
        .bind(id)
        .bind(delta)
        .fetch_optional(self.pool())
        .await
        .map_err(StoreError::from_sqlx)?
        .ok_or(StoreError::NotFound)
    }
}
