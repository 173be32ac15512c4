pub mod admin;
pub mod models;
pub mod review;

// Re-exports
pub use models::*;

use axum::{
    extract::{DefaultBodyLimit, State},
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

pub async fn health_handler(State(state): State<AppState>) -> impl axum::response::IntoResponse {
    let total_requests = state.store.read().await.requests().len();
    Json(models::HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        total_requests,
    })
}

/// Full application router: JSON API, rating page shell and static frontend
pub fn router(state: AppState) -> Router {
    let frontend = state.config.frontend.clone();
    let body_limit = state.config.upload.max_bytes;

    Router::new()
        .route("/health", get(health_handler))
        .merge(admin::routes())
        .merge(review::routes())
        .route_service("/r/{token}", ServeFile::new(frontend.index_file()))
        .fallback_service(ServeDir::new(&frontend.dir))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const BOUNDARY: &str = "X-REVIEW-BOUNDARY";

    fn app_with(config: AppConfig) -> Router {
        router(AppState::new(config))
    }

    fn app() -> Router {
        app_with(AppConfig::default())
    }

    fn multipart_body(csv: &str, company_id: Option<&str>) -> String {
        let mut body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"csv\"; filename=\"contacts.csv\"\r\nContent-Type: text/csv\r\n\r\n{csv}\r\n",
            b = BOUNDARY,
            csv = csv
        );
        if let Some(id) = company_id {
            body.push_str(&format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"companyId\"\r\n\r\n{id}\r\n",
                b = BOUNDARY,
                id = id
            ));
        }
        body.push_str(&format!("--{}--\r\n", BOUNDARY));
        body
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn upload(app: &Router, csv: &str, company_id: Option<&str>) -> (StatusCode, Value) {
        let request = Request::post("/api/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(csv, company_id)))
            .unwrap();
        send(app, request).await
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
        send(app, Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::HOST, "reviews.test:5000")
            .body(Body::from(body.to_string()))
            .unwrap();
        send(app, request).await
    }

    #[tokio::test]
    async fn upload_then_rate_positive() {
        let app = app();
        let (status, body) = upload(&app, "first_name,last_name,email\nJane,Doe,jane@x.com", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["total"], 1);

        let token = body["created"][0]["token"].as_str().unwrap().to_string();
        let (status, page) = get_json(&app, &format!("/api/r/{}", token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["customer"]["name"], "Jane Doe");
        assert_eq!(page["customer"]["email"], "jane@x.com");
        assert_eq!(page["request"]["id"], body["created"][0]["requestId"]);
        assert_eq!(page["company"]["name"], "Demo Salon");

        let (status, rated) = post_json(&app, "/api/rate", json!({"token": token, "rating": 5})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(rated["ok"], true);
        assert_eq!(rated["public"], true);
        assert!(rated["redirect"]
            .as_str()
            .unwrap()
            .starts_with("https://search.google.com/"));
    }

    #[tokio::test]
    async fn low_rating_has_null_redirect() {
        let app = app();
        let (_, body) = upload(&app, "first_name\nSam", Some("1")).await;
        let token = body["created"][0]["token"].as_str().unwrap().to_string();

        let (_, rated) = post_json(
            &app,
            "/api/rate",
            json!({"token": token, "rating": "2", "comment": "slow"}),
        )
        .await;
        assert_eq!(rated["public"], false);
        assert_eq!(rated["redirect"], Value::Null);

        let (_, page) = get_json(&app, &format!("/api/r/{}", token)).await;
        assert_eq!(page["request"]["rating"], 2.0);
        assert_eq!(page["request"]["comment"], "slow");
        assert_eq!(page["request"]["publicRequested"], false);
    }

    #[tokio::test]
    async fn send_all_marks_each_request_once() {
        let app = app();
        upload(&app, "first_name\nA\nB\nC", None).await;

        let (_, first) = post_json(&app, "/api/send-all", json!({})).await;
        assert_eq!(first["sent"], 3);
        let item = &first["items"][0];
        assert_eq!(
            item["link"],
            format!("http://reviews.test:5000/r/{}", item["token"].as_str().unwrap())
        );

        let (_, second) = post_json(&app, "/api/send-all", json!({})).await;
        assert_eq!(second["ok"], true);
        assert_eq!(second["sent"], 0);
        assert_eq!(second["items"], json!([]));

        let (_, stats) = get_json(&app, "/api/stats").await;
        assert_eq!(stats["total"], 3);
        assert_eq!(stats["sent"], 3);
    }

    #[tokio::test]
    async fn send_all_prefers_public_url() {
        let mut config = AppConfig::default();
        config.server.public_url = Some("https://reviews.example.com/".to_string());
        let app = app_with(config);
        upload(&app, "first_name\nA", None).await;

        let (_, sent) = post_json(&app, "/api/send-all", json!({})).await;
        assert_eq!(sent["items"][0]["link"], "https://reviews.example.com/r/MQ");
    }

    #[tokio::test]
    async fn stats_average_and_null_when_unrated() {
        let app = app();
        let (_, stats) = get_json(&app, "/api/stats").await;
        assert_eq!(stats["avgRating"], Value::Null);
        assert_eq!(stats["requests"], json!([]));

        let (_, body) = upload(&app, "first_name\nA\nB\nC", None).await;
        for (i, rating) in [5, 4, 4].into_iter().enumerate() {
            let token = body["created"][i]["token"].as_str().unwrap();
            post_json(&app, "/api/rate", json!({"token": token, "rating": rating})).await;
        }

        let (_, stats) = get_json(&app, "/api/stats").await;
        assert_eq!(stats["avgRating"], 4.33);
        assert_eq!(stats["requests"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn unknown_token_is_404() {
        let app = app();
        let (status, body) = get_json(&app, "/api/r/bm9wZQ").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"], "Invalid token");

        let (status, body) = post_json(&app, "/api/rate", json!({"token": "bm9wZQ", "rating": 5})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["ok"], false);
    }

    async fn post_rate_raw(app: &Router, content_type: Option<&str>, body: &str) -> (StatusCode, Value) {
        let mut request = Request::post("/api/rate");
        if let Some(ct) = content_type {
            request = request.header(header::CONTENT_TYPE, ct);
        }
        send(app, request.body(Body::from(body.to_string())).unwrap()).await
    }

    #[tokio::test]
    async fn rate_accepts_form_bodies() {
        let app = app();
        let (_, body) = upload(&app, "first_name\nJane", None).await;
        let token = body["created"][0]["token"].as_str().unwrap().to_string();

        let form = "application/x-www-form-urlencoded";
        let (status, rated) =
            post_rate_raw(&app, Some(form), &format!("token={}&rating=5&comment=great", token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(rated["public"], true);

        let (_, page) = get_json(&app, &format!("/api/r/{}", token)).await;
        assert_eq!(page["request"]["rating"], 5.0);
        assert_eq!(page["request"]["comment"], "great");

        let (status, body) = post_rate_raw(&app, Some(form), "token=bm9wZQ&rating=5").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"ok": false, "error": "Invalid token"}));
    }

    #[tokio::test]
    async fn unreadable_rate_bodies_end_in_404() {
        let app = app();
        upload(&app, "first_name\nJane", None).await;

        let cases = [
            (None, ""),
            (None, r#"{"token":"MQ","rating":5}"#),
            (Some("application/json"), ""),
            (Some("application/json"), "{not json"),
            (Some("text/plain"), "token=MQ"),
            (Some("application/json"), r#"{"token":123,"rating":5}"#),
        ];
        for (content_type, body) in cases {
            let (status, response) = post_rate_raw(&app, content_type, body).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "body {:?}", body);
            assert_eq!(response, json!({"ok": false, "error": "Invalid token"}));
        }

        let (_, page) = get_json(&app, "/api/r/MQ").await;
        assert_eq!(page["request"]["rating"], Value::Null);
    }

    #[tokio::test]
    async fn upload_with_invalid_utf8_is_accepted() {
        let app = app();
        let mut body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"csv\"; filename=\"contacts.csv\"\r\nContent-Type: text/csv\r\n\r\nfirst_name,email\nJos",
            b = BOUNDARY
        )
        .into_bytes();
        body.extend_from_slice(b"\xe9,jose@x.com\r\n");
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        let request = Request::post("/api/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();
        let (status, uploaded) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(uploaded["total"], 1);

        let (_, page) = get_json(&app, "/api/r/MQ").await;
        assert_eq!(page["customer"]["name"], "Jos\u{FFFD}");
        assert_eq!(page["customer"]["email"], "jose@x.com");
    }

    #[tokio::test]
    async fn upload_failures_are_500() {
        let app = app();
        let (status, body) = upload(&app, "first_name\nA", Some("42")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"], "Unknown company: 42");

        let request = Request::post("/api/upload")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["ok"], false);
    }

    #[tokio::test]
    async fn dump_shows_every_map() {
        let app = app();
        upload(&app, "first_name,phone\nJane,555-0100", None).await;

        let (status, dump) = get_json(&app, "/api/_dump").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(dump["companies"]["1"]["settings"]["delayHours"], 48);
        assert_eq!(dump["customers"]["1"]["phone"], "555-0100");
        assert_eq!(dump["requests"]["1"]["sent"], false);
    }

    #[tokio::test]
    async fn health_reports_request_count() {
        let app = app();
        upload(&app, "first_name\nA\nB", None).await;
        let (status, health) = get_json(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(health["status"], "healthy");
        assert_eq!(health["totalRequests"], 2);
    }

    #[tokio::test]
    async fn rating_page_route_serves_app_shell() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html>rate us</html>").unwrap();
        let mut config = AppConfig::default();
        config.frontend.dir = dir.path().to_path_buf();
        let app = app_with(config);

        let response = app
            .oneshot(Request::get("/r/MQ").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"<html>rate us</html>");
    }
}
