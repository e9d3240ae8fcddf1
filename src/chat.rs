use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use uuid::Uuid;

use crate::backend::TutorBackend;
use crate::citation::CitationResolver;
use crate::models::{ChatRequest, ChatResponse};

#[derive(Clone)]
pub struct ChatService {
    backend: Arc<dyn TutorBackend>,
    resolver: Arc<CitationResolver>,
}

impl ChatService {
    pub fn new(backend: Arc<dyn TutorBackend>, resolver: CitationResolver) -> Self {
        Self {
            backend,
            resolver: Arc::new(resolver),
        }
    }

    pub async fn get_chat_response(&self, request: ChatRequest) -> Result<ChatResponse> {
        let request_id = Uuid::new_v4();
        let started = Instant::now();
        tracing::info!(%request_id, use_rag = request.use_rag, "sending chat message to backend");

        let mut response = match self.backend.chat(&request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(%request_id, "chat request failed: {err:#}");
                return Err(err);
            }
        };

        let mut cited = 0;
        if request.use_rag && !response.documents.is_empty() {
            cited = self.resolver.annotate(&mut response);
        }

        tracing::info!(
            %request_id,
            documents = response.documents.len(),
            cited,
            latency_ms = started.elapsed().as_millis() as u64,
            "chat response ready"
        );
        Ok(response)
    }
}
