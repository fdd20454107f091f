use axum::{middleware, routing::get, Json, Router};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

use crate::{
    app_state::AppState,
    middleware::tracing::request_tracing,
    modules::{
        articles::routes::article_routes, assignments::routes::assignment_routes,
        courses::routes::course_routes, learning::routes::learning_routes,
        quizzes::routes::quiz_routes, users::routes::user_routes,
        webinars::routes::webinar_routes,
    },
};

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(user_routes())
        .merge(course_routes())
        .merge(learning_routes())
        .merge(quiz_routes())
        .merge(assignment_routes())
        .merge(article_routes())
        .merge(webinar_routes());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(banner))
        .route("/health", get(health_check))
        .nest("/api", api)
        .layer(middleware::from_fn(request_tracing))
        .layer(cors)
        .with_state(state)
}

async fn banner(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Json<serde_json::Value> {
    Json(json!({
        "name": state.env.app.name,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Json<serde_json::Value> {
    let store_status = match state.store.ping().await {
        Ok(()) => "healthy",
        Err(err) => {
            tracing::warn!("store health check failed: {}", err);
            "unhealthy"
        }
    };

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "store": store_status,
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use crate::db::Store;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    fn router() -> Router {
        let state = AppState::new(Store::in_memory(), config::for_tests());
        create_router(state)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn authed_json_request(method: &str, uri: &str, token: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_store_status() {
        let response = router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["services"]["store"], "healthy");
    }

    #[tokio::test]
    async fn protected_routes_require_a_token() {
        let response = router()
            .oneshot(Request::get("/api/users/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn anonymous_catalog_is_open() {
        let response = router()
            .oneshot(Request::get("/api/courses").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn register_login_enroll_progress_flow() {
        // registered users are students; the instructor account is seeded
        // through the store directly
        let state = AppState::new(Store::in_memory(), config::for_tests());
        let app = create_router(state.clone());

        let now = time::OffsetDateTime::now_utc();
        let instructor = state
            .store
            .users
            .create(crate::db::models::User {
                id: uuid::Uuid::new_v4(),
                email: "teach@example.com".into(),
                username: "teach".into(),
                password_hash: crate::auth::hash_password("s3cretpass").unwrap(),
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                role: crate::db::models::UserRole::Instructor,
                is_active: true,
                date_joined: now,
            })
            .await
            .unwrap();

        // student registers and logs in over HTTP
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/register",
                json!({
                    "email": "student@example.com",
                    "username": "student",
                    "password": "hunter2pass"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/token",
                json!({"email": "student@example.com", "password": "hunter2pass"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let login = body_json(response).await;
        let student_token = login["access"].as_str().unwrap().to_string();

        // instructor creates a course with one lesson
        let instructor_token =
            crate::auth::issue_access_token(instructor.id, instructor.role, &state.env.auth).unwrap();
        let response = app
            .clone()
            .oneshot(authed_json_request(
                "POST",
                "/api/courses",
                &instructor_token,
                json!({
                    "title": "Rust 101",
                    "description": "intro",
                    "price": 0.0,
                    "duration": "4 weeks"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let course = body_json(response).await;
        let course_id = course["id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(authed_json_request(
                "POST",
                &format!("/api/courses/{}/lessons", course_id),
                &instructor_token,
                json!({"title": "Hello", "content": "fn main() {}"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let lesson = body_json(response).await;
        let lesson_id = lesson["id"].as_str().unwrap().to_string();

        // student enrolls
        let response = app
            .clone()
            .oneshot(authed_json_request(
                "POST",
                &format!("/api/courses/{}/enroll", course_id),
                &student_token,
                json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        // double enroll conflicts
        let response = app
            .clone()
            .oneshot(authed_json_request(
                "POST",
                &format!("/api/courses/{}/enroll", course_id),
                &student_token,
                json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        // completing the only lesson reaches 100% and issues a certificate
        let response = app
            .clone()
            .oneshot(authed_json_request(
                "PUT",
                &format!("/api/courses/{}/progress", course_id),
                &student_token,
                json!({"lesson_id": lesson_id, "completed": true}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let progress = body_json(response).await;
        assert_eq!(progress["progress"], 100.0);
        assert_eq!(progress["certificate_issued"], true);

        let response = app
            .clone()
            .oneshot(
                Request::get("/api/my/certificates")
                    .header(header::AUTHORIZATION, format!("Bearer {}", student_token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let certificates = body_json(response).await;
        assert_eq!(certificates.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn refresh_token_round_trip() {
        let app = router();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/register",
                json!({
                    "email": "jo@example.com",
                    "username": "jo2024",
                    "password": "hunter2pass"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/token",
                json!({"email": "jo@example.com", "password": "hunter2pass"}),
            ))
            .await
            .unwrap();
        let login = body_json(response).await;

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/token/refresh",
                json!({"refresh": login["refresh"]}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let refreshed = body_json(response).await;
        assert!(refreshed["access"].is_string());

        // an access token is not accepted as a refresh token
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/auth/token/refresh",
                json!({"refresh": login["access"]}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
