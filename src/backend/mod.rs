pub mod http;
pub mod mock;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::{AppConfig, BackendKind};
use crate::models::{
    AnswerSubmission, AnswerVerdict, ChatRequest, ChatResponse, Explanation, Question,
    RecommendRequest, WeakKnowledgePoint,
};

pub use http::HttpBackend;
pub use mock::{MockBackend, MockLatency};

#[async_trait]
pub trait TutorBackend: Send + Sync {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse>;

    async fn recommend_questions(&self, request: &RecommendRequest) -> Result<Vec<Question>>;

    async fn submit_answer(&self, submission: &AnswerSubmission) -> Result<AnswerVerdict>;

    async fn get_explanation(&self, submission: &AnswerSubmission) -> Result<Explanation>;

    async fn weak_knowledge_points(&self, student_id: &str) -> Result<Vec<WeakKnowledgePoint>>;
}

pub fn build(config: &AppConfig) -> Result<Arc<dyn TutorBackend>> {
    tracing::info!(backend = config.backend.as_str(), "using tutor backend");
    match config.backend {
        BackendKind::Mock => Ok(Arc::new(MockBackend::new(MockLatency::scaled(
            config.mock.latency_scale,
        )))),
        BackendKind::Http => Ok(Arc::new(HttpBackend::new(
            config.api_base_url.clone(),
            config.http_timeout,
        )?)),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Rejects every call with the given message.
    pub(crate) struct FailingBackend(pub &'static str);

    #[async_trait]
    impl TutorBackend for FailingBackend {
        async fn chat(&self, _: &ChatRequest) -> Result<ChatResponse> {
            anyhow::bail!("{}", self.0)
        }

        async fn recommend_questions(&self, _: &RecommendRequest) -> Result<Vec<Question>> {
            anyhow::bail!("{}", self.0)
        }

        async fn submit_answer(&self, _: &AnswerSubmission) -> Result<AnswerVerdict> {
            anyhow::bail!("{}", self.0)
        }

        async fn get_explanation(&self, _: &AnswerSubmission) -> Result<Explanation> {
            anyhow::bail!("{}", self.0)
        }

        async fn weak_knowledge_points(&self, _: &str) -> Result<Vec<WeakKnowledgePoint>> {
            anyhow::bail!("{}", self.0)
        }
    }
}
