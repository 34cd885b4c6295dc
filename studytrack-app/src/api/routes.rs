use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use studytrack_core::{NewCard, SessionInput, StudyService, StudyStats, UserReport};
use uuid::Uuid;

use crate::api::dto::{AttemptIn, CardOut, DueQuery, UserIn, UserOut};
use crate::api::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub svc: StudyService,
}

type ApiResult<T> = Result<Json<T>, ApiError>;

pub async fn create_user(State(st): State<Arc<AppState>>, Json(body): Json<UserIn>) -> Result<(StatusCode, Json<UserOut>), ApiError> {
    let u = st.svc.create_user(&body.email, &body.name).await?;
    Ok((StatusCode::CREATED, Json(u.into())))
}

pub async fn get_user(State(st): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult<UserOut> {
    Ok(Json(st.svc.get_user(id).await?.into()))
}

pub async fn user_report(State(st): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult<UserReport> {
    Ok(Json(st.svc.user_report(id, Utc::now()).await?))
}

pub async fn post_session(
    State(st): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<SessionInput>,
) -> ApiResult<StudyStats> {
    Ok(Json(st.svc.record_study_session(id, body).await?))
}

pub async fn post_upload(State(st): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult<StudyStats> {
    Ok(Json(st.svc.record_document_upload(id).await?))
}

pub async fn due_cards(
    State(st): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(q): Query<DueQuery>,
) -> ApiResult<Vec<CardOut>> {
    let cards = st.svc.due_cards(id, Utc::now(), q.max).await?;
    Ok(Json(cards.into_iter().map(CardOut::from).collect()))
}

pub async fn create_card(State(st): State<Arc<AppState>>, Json(body): Json<NewCard>) -> Result<(StatusCode, Json<CardOut>), ApiError> {
    let c = st.svc.add_card(body).await?;
    Ok((StatusCode::CREATED, Json(c.into())))
}

pub async fn get_card(State(st): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult<CardOut> {
    Ok(Json(st.svc.get_card(id).await?.into()))
}

pub async fn post_attempt(
    State(st): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<AttemptIn>,
) -> ApiResult<CardOut> {
    let c = st
        .svc
        .record_card_attempt(id, body.is_correct, body.response_time_ms)
        .await?;
    Ok(Json(c.into()))
}
