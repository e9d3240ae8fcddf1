use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use super::TutorBackend;
use crate::models::{
    AnswerSubmission, AnswerVerdict, ChatRequest, ChatResponse, Explanation, Question,
    RecommendRequest, WeakKnowledgePoint,
};
use crate::wire::{Envelope, RecommendedQuestions, WeakKnowledgePoints, WirePoint};

#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build tutor backend http client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        route: &str,
        fallback: &str,
    ) -> Result<T> {
        let response = request
            .send()
            .await
            .with_context(|| format!("failed to call tutor backend {route}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "HTTP error! status: {status} ({route}): {}",
                normalize_err_body(&body)
            );
        }

        let envelope = response
            .json::<Envelope<T>>()
            .await
            .with_context(|| format!("failed to decode tutor backend {route} response"))?;

        envelope.into_data(fallback)
    }
}

#[async_trait]
impl TutorBackend for HttpBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let route = "/api/chat";
        self.call(
            self.client.post(self.url(route)).json(request),
            route,
            "chat request failed",
        )
        .await
    }

    async fn recommend_questions(&self, request: &RecommendRequest) -> Result<Vec<Question>> {
        let route = "/api/student/recommend-questions";
        let data: RecommendedQuestions = self
            .call(
                self.client.post(self.url(route)).json(request),
                route,
                "request failed",
            )
            .await?;

        Ok(questions_from_wire(data))
    }

    async fn submit_answer(&self, submission: &AnswerSubmission) -> Result<AnswerVerdict> {
        let route = "/api/student/submit-answer";
        self.call(
            self.client.post(self.url(route)).json(submission),
            route,
            "failed to submit answer",
        )
        .await
    }

    async fn get_explanation(&self, submission: &AnswerSubmission) -> Result<Explanation> {
        let route = "/api/student/get-explanation";
        self.call(
            self.client.post(self.url(route)).json(submission),
            route,
            "failed to fetch explanation",
        )
        .await
    }

    async fn weak_knowledge_points(&self, student_id: &str) -> Result<Vec<WeakKnowledgePoint>> {
        let route = "/api/student/weak-knowledge-points";
        let data: WeakKnowledgePoints = self
            .call(
                self.client
                    .get(self.url(route))
                    .query(&[("studentId", student_id)]),
                route,
                "failed to fetch weak knowledge points",
            )
            .await?;

        Ok(data
            .weak_knowledge_points
            .into_iter()
            .map(WirePoint::into_point)
            .collect())
    }
}

fn questions_from_wire(data: RecommendedQuestions) -> Vec<Question> {
    data.questions
        .into_iter()
        .filter_map(|question| match question.into_question() {
            Ok(question) => Some(question),
            Err(err) => {
                tracing::warn!("skipping recommended question: {err:#}");
                None
            }
        })
        .collect()
}

fn normalize_err_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }

    if let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) {
        for key in ["message", "error"] {
            if let Some(message) = json.get(key).and_then(|v| v.as_str()) {
                return message.to_string();
            }
        }
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let backend = HttpBackend::new("http://localhost:8080/", Duration::from_secs(1)).unwrap();
        assert_eq!(backend.base_url(), "http://localhost:8080");
        assert_eq!(
            backend.url("/api/chat"),
            "http://localhost:8080/api/chat"
        );
    }

    #[test]
    fn question_with_non_numeric_id_is_skipped() {
        let data: RecommendedQuestions = serde_json::from_str(
            r#"{"questions": [
                {"questionId": "q-1", "description": "坏题", "options": [], "knowledgePoint": "栈"},
                {"questionId": "8", "description": "好题", "options": [], "knowledgePoint": "栈"}
            ]}"#,
        )
        .unwrap();

        let questions = questions_from_wire(data);
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].id, 8);
        assert_eq!(questions[0].title, "好题");
    }

    #[test]
    fn error_body_prefers_envelope_message() {
        assert_eq!(
            normalize_err_body(r#"{"code": 500, "message": "database down"}"#),
            "database down"
        );
        assert_eq!(normalize_err_body(r#"{"error": "bad gateway"}"#), "bad gateway");
        assert_eq!(normalize_err_body("  plain text "), "plain text");
        assert_eq!(normalize_err_body(""), "<empty body>");
    }
}
