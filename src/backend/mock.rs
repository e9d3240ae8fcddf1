use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::TutorBackend;
use crate::models::{
    AnswerSubmission, AnswerVerdict, ChatRequest, ChatResponse, DocumentReference, Explanation,
    Question, RecommendRequest, WeakKnowledgePoint,
};

const CORRECT_OPTION: &str = "B";
const PLACEHOLDER_EXPLANATION: &str = "HELLOWORLDHELLOWORLD";
const MOCK_CHAPTERS: u64 = 16;
const MOCK_PAGES_PER_CHAPTER: i64 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MockLatency {
    pub chat: Duration,
    pub recommend: Duration,
    pub submit: Duration,
    pub explanation: Duration,
    pub weak_points: Duration,
}

impl MockLatency {
    pub fn none() -> Self {
        Self::scaled(0.0)
    }

    pub fn scaled(scale: f64) -> Self {
        let scale = if scale.is_finite() && scale > 0.0 {
            scale
        } else {
            0.0
        };
        // Scales too large for a Duration keep the unscaled delay.
        let at = |ms: u64| {
            let base = Duration::from_millis(ms);
            Duration::try_from_secs_f64(base.as_secs_f64() * scale).unwrap_or(base)
        };

        Self {
            chat: at(1500),
            recommend: at(1000),
            submit: at(800),
            explanation: at(1000),
            weak_points: at(1000),
        }
    }
}

impl Default for MockLatency {
    fn default() -> Self {
        Self::scaled(1.0)
    }
}

pub struct MockBackend {
    latency: MockLatency,
    rng: Mutex<StdRng>,
}

impl MockBackend {
    pub fn new(latency: MockLatency) -> Self {
        Self {
            latency,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_seed(latency: MockLatency, seed: u64) -> Self {
        Self {
            latency,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn instant() -> Self {
        Self::new(MockLatency::none())
    }

    pub fn latency(&self) -> MockLatency {
        self.latency
    }

    fn random_documents(&self) -> Result<Vec<DocumentReference>> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| anyhow::anyhow!("mock rng lock poisoned"))?;

        let contents = ["这是第一个文档的摘要...", "这是第二个文档的摘要..."];
        let documents = contents
            .iter()
            .map(|content| {
                let chapter = rng.gen_range(1..=MOCK_CHAPTERS);
                let page = rng.gen_range(1..=MOCK_PAGES_PER_CHAPTER);
                DocumentReference {
                    source: format!("ch{chapter}.pdf"),
                    page,
                    content: content.to_string(),
                }
            })
            .collect();

        Ok(documents)
    }
}

async fn simulate_latency(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[async_trait]
impl TutorBackend for MockBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        tracing::debug!(use_rag = request.use_rag, "mock chat request");
        simulate_latency(self.latency.chat).await;

        let documents = if request.use_rag {
            self.random_documents()?
        } else {
            vec![]
        };

        let mode = if request.use_rag { "开启" } else { "关闭" };
        let response = ChatResponse {
            thought: format!(
                "用户输入是 \"{}\"。RAG模式为 {}。我需要思考如何回答这个问题。",
                request.user_input, mode
            ),
            answer: format!("这是对“{}”的模拟回答。", request.user_input),
            documents,
        };

        tracing::debug!(documents = response.documents.len(), "mock chat response");
        Ok(response)
    }

    async fn recommend_questions(&self, request: &RecommendRequest) -> Result<Vec<Question>> {
        tracing::debug!(
            student_id = %request.student_id,
            knowledge_points = ?request.knowledge_points,
            "mock recommend questions"
        );
        simulate_latency(self.latency.recommend).await;
        Ok(vec![])
    }

    async fn submit_answer(&self, submission: &AnswerSubmission) -> Result<AnswerVerdict> {
        tracing::debug!(question_id = %submission.question_id, "mock submit answer");
        simulate_latency(self.latency.submit).await;
        Ok(AnswerVerdict {
            is_correct: submission.selected_option == CORRECT_OPTION,
            correct_answer: CORRECT_OPTION.to_string(),
        })
    }

    async fn get_explanation(&self, submission: &AnswerSubmission) -> Result<Explanation> {
        tracing::debug!(question_id = %submission.question_id, "mock explanation");
        simulate_latency(self.latency.explanation).await;
        Ok(Explanation {
            explanation: PLACEHOLDER_EXPLANATION.to_string(),
        })
    }

    async fn weak_knowledge_points(&self, student_id: &str) -> Result<Vec<WeakKnowledgePoint>> {
        tracing::debug!(student_id, "mock weak knowledge points");
        simulate_latency(self.latency.weak_points).await;
        Ok(vec![])
    }
}
