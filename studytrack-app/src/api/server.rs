use axum::{
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use studytrack_core::StudyService;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::api::routes::{
    create_card, create_user, due_cards, get_card, get_user, post_attempt, post_session, post_upload, user_report,
    AppState,
};

pub fn router(svc: StudyService) -> Router {
    let state = Arc::new(AppState { svc });

    Router::new()
        .route("/users", post(create_user))
        .route("/users/:id", get(get_user))
        .route("/users/:id/report", get(user_report))
        .route("/users/:id/sessions", post(post_session))
        .route("/users/:id/uploads", post(post_upload))
        .route("/users/:id/due", get(due_cards))
        .route("/cards", post(create_card))
        .route("/cards/:id", get(get_card))
        .route("/cards/:id/attempts", post(post_attempt))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn run(svc: StudyService, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router(svc).into_make_service()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use studytrack_core::{memory::MemoryRepo, StudyConfig};
    use tower::ServiceExt;

    fn app() -> Router {
        router(StudyService::new(Arc::new(MemoryRepo::new()), StudyConfig::default()))
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(v) => Body::from(v.to_string()),
                None => Body::empty(),
            })
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let v = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, v)
    }

    #[tokio::test]
    async fn attempt_and_session_flow() {
        let app = app();
        let (st, user) = call(&app, "POST", "/users", Some(json!({"email": "a@b.co", "name": "A"}))).await;
        assert_eq!(st, StatusCode::CREATED);
        let uid = user["id"].as_str().unwrap().to_string();

        let doc = uuid::Uuid::new_v4();
        let (st, card) = call(
            &app,
            "POST",
            "/cards",
            Some(json!({"user_id": uid, "document_id": doc, "kind": "definition", "front": "atom", "back": "smallest unit"})),
        )
        .await;
        assert_eq!(st, StatusCode::CREATED);
        let cid = card["id"].as_str().unwrap().to_string();

        let (st, card) = call(
            &app,
            "POST",
            &format!("/cards/{cid}/attempts"),
            Some(json!({"is_correct": true, "response_time_ms": 1200})),
        )
        .await;
        assert_eq!(st, StatusCode::OK);
        assert_eq!(card["progress"]["interval_days"], 3);
        assert_eq!(card["mastery_level"], "reviewing");

        let (st, stats) = call(
            &app,
            "POST",
            &format!("/users/{uid}/sessions"),
            Some(json!({"cards_studied": 1, "correct_answers": 1, "study_time_minutes": 2})),
        )
        .await;
        assert_eq!(st, StatusCode::OK);
        assert_eq!(stats["current_streak"], 1);

        let (st, report) = call(&app, "GET", &format!("/users/{uid}/report"), None).await;
        assert_eq!(st, StatusCode::OK);
        assert_eq!(report["mastery"]["reviewing"], 1);
    }

    #[tokio::test]
    async fn errors_map_to_statuses() {
        let app = app();
        let missing = uuid::Uuid::new_v4();

        let (st, body) = call(
            &app,
            "POST",
            &format!("/cards/{missing}/attempts"),
            Some(json!({"is_correct": false})),
        )
        .await;
        assert_eq!(st, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");

        let (_, user) = call(&app, "POST", "/users", Some(json!({"email": "c@d.co", "name": "C"}))).await;
        let uid = user["id"].as_str().unwrap().to_string();
        let (st, body) = call(
            &app,
            "POST",
            &format!("/users/{uid}/sessions"),
            Some(json!({"cards_studied": 1, "correct_answers": 2, "study_time_minutes": 2})),
        )
        .await;
        assert_eq!(st, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_SESSION_DATA");

        let (st, _) = call(&app, "POST", "/users", Some(json!({"email": "C@d.co", "name": "C2"}))).await;
        assert_eq!(st, StatusCode::CONFLICT);
    }
}
