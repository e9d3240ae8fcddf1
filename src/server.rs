use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::backend::TutorBackend;
use crate::config::AppConfig;
use crate::models::{
    AnswerSubmission, AnswerVerdict, ChatRequest, ChatResponse, Explanation, RecommendRequest,
};
use crate::wire::{Envelope, RecommendedQuestions, WeakKnowledgePoints, WirePoint, WireQuestion};

#[derive(Clone)]
struct AppState {
    backend: Arc<dyn TutorBackend>,
}

pub fn router(backend: Arc<dyn TutorBackend>) -> Router {
    Router::new()
        .route("/api/chat", post(chat_handler))
        .route(
            "/api/student/recommend-questions",
            post(recommend_questions),
        )
        .route("/api/student/submit-answer", post(submit_answer))
        .route("/api/student/get-explanation", post(get_explanation))
        .route(
            "/api/student/weak-knowledge-points",
            get(weak_knowledge_points),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { backend })
}

pub async fn run_server(config: AppConfig, backend: Arc<dyn TutorBackend>) -> Result<()> {
    let app = router(backend);

    let addr: SocketAddr = config.bind_addr.parse()?;
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<Envelope<ChatResponse>>, ApiError> {
    let Json(request) = payload?;
    let response = state.backend.chat(&request).await?;
    Ok(Json(Envelope::success(response)))
}

async fn recommend_questions(
    State(state): State<AppState>,
    payload: Result<Json<RecommendRequest>, JsonRejection>,
) -> Result<Json<Envelope<RecommendedQuestions>>, ApiError> {
    let Json(request) = payload?;
    let questions = state.backend.recommend_questions(&request).await?;
    Ok(Json(Envelope::success(RecommendedQuestions {
        questions: questions.iter().map(WireQuestion::from_question).collect(),
    })))
}

async fn submit_answer(
    State(state): State<AppState>,
    payload: Result<Json<AnswerSubmission>, JsonRejection>,
) -> Result<Json<Envelope<AnswerVerdict>>, ApiError> {
    let Json(submission) = payload?;
    let verdict = state.backend.submit_answer(&submission).await?;
    Ok(Json(Envelope::success(verdict)))
}

async fn get_explanation(
    State(state): State<AppState>,
    payload: Result<Json<AnswerSubmission>, JsonRejection>,
) -> Result<Json<Envelope<Explanation>>, ApiError> {
    let Json(submission) = payload?;
    let explanation = state.backend.get_explanation(&submission).await?;
    Ok(Json(Envelope::success(explanation)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StudentQuery {
    student_id: String,
}

async fn weak_knowledge_points(
    State(state): State<AppState>,
    query: Result<Query<StudentQuery>, QueryRejection>,
) -> Result<Json<Envelope<WeakKnowledgePoints>>, ApiError> {
    let Query(query) = query?;
    let points = state.backend.weak_knowledge_points(&query.student_id).await?;
    Ok(Json(Envelope::success(WeakKnowledgePoints {
        weak_knowledge_points: points.iter().map(WirePoint::from_point).collect(),
    })))
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: String) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        Self::bad_request(value.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(value: QueryRejection) -> Self {
        Self::bad_request(value.body_text())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        tracing::error!("request failed: {value:#}");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: value.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = Envelope::<()>::failure(i64::from(self.status.as_u16()), self.message);
        (self.status, Json(body)).into_response()
    }
}
