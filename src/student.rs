use std::sync::Arc;

use anyhow::Result;

use crate::backend::TutorBackend;
use crate::models::{
    AnswerSubmission, AnswerVerdict, Explanation, Question, RecommendRequest, WeakKnowledgePoint,
};

#[derive(Clone)]
pub struct StudentService {
    backend: Arc<dyn TutorBackend>,
}

impl StudentService {
    pub fn new(backend: Arc<dyn TutorBackend>) -> Self {
        Self { backend }
    }

    pub async fn get_recommended_questions(
        &self,
        student_id: &str,
        knowledge_points: Option<Vec<String>>,
    ) -> Result<Vec<Question>> {
        let request = RecommendRequest {
            student_id: student_id.to_string(),
            knowledge_points: knowledge_points.unwrap_or_default(),
        };
        tracing::info!(
            student_id,
            knowledge_points = ?request.knowledge_points,
            "fetching recommended questions"
        );

        self.backend
            .recommend_questions(&request)
            .await
            .inspect_err(|err| tracing::error!("failed to fetch recommended questions: {err:#}"))
    }

    pub async fn submit_answer(&self, submission: AnswerSubmission) -> Result<AnswerVerdict> {
        tracing::info!(
            question_id = %submission.question_id,
            student_id = %submission.student_id,
            selected_option = %submission.selected_option,
            "submitting answer"
        );

        self.backend
            .submit_answer(&submission)
            .await
            .inspect_err(|err| tracing::error!("failed to submit answer: {err:#}"))
    }

    pub async fn get_explanation(&self, submission: AnswerSubmission) -> Result<Explanation> {
        tracing::info!(
            question_id = %submission.question_id,
            student_id = %submission.student_id,
            "fetching explanation"
        );

        self.backend
            .get_explanation(&submission)
            .await
            .inspect_err(|err| tracing::error!("failed to fetch explanation: {err:#}"))
    }

    pub async fn get_weak_knowledge_points(
        &self,
        student_id: &str,
    ) -> Result<Vec<WeakKnowledgePoint>> {
        tracing::info!(student_id, "fetching weak knowledge points");

        self.backend
            .weak_knowledge_points(student_id)
            .await
            .inspect_err(|err| tracing::error!("failed to fetch weak knowledge points: {err:#}"))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::backend::testing::FailingBackend;
    use crate::backend::MockBackend;
    use crate::models::{ChatRequest, ChatResponse};

    /// Records the recommendation requests it receives.
    #[derive(Default)]
    struct RecordingBackend {
        seen: Mutex<Vec<RecommendRequest>>,
    }

    #[async_trait]
    impl TutorBackend for RecordingBackend {
        async fn chat(&self, _: &ChatRequest) -> Result<ChatResponse> {
            anyhow::bail!("not used")
        }

        async fn recommend_questions(&self, request: &RecommendRequest) -> Result<Vec<Question>> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(vec![])
        }

        async fn submit_answer(&self, _: &AnswerSubmission) -> Result<AnswerVerdict> {
            anyhow::bail!("not used")
        }

        async fn get_explanation(&self, _: &AnswerSubmission) -> Result<Explanation> {
            anyhow::bail!("not used")
        }

        async fn weak_knowledge_points(&self, _: &str) -> Result<Vec<WeakKnowledgePoint>> {
            anyhow::bail!("not used")
        }
    }

    fn submission(question_id: &str, student_id: &str, option: &str) -> AnswerSubmission {
        AnswerSubmission {
            question_id: question_id.to_string(),
            student_id: student_id.to_string(),
            selected_option: option.to_string(),
        }
    }

    #[tokio::test]
    async fn missing_knowledge_points_are_sent_as_empty_list() {
        let backend = Arc::new(RecordingBackend::default());
        let service = StudentService::new(backend.clone());

        service.get_recommended_questions("s-1", None).await.unwrap();
        service
            .get_recommended_questions("s-2", Some(vec!["图".to_string()]))
            .await
            .unwrap();

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen[0].student_id, "s-1");
        assert!(seen[0].knowledge_points.is_empty());
        assert_eq!(seen[1].knowledge_points, vec!["图".to_string()]);
    }

    #[tokio::test]
    async fn verdict_depends_only_on_selected_option() {
        let service = StudentService::new(Arc::new(MockBackend::instant()));

        for (question_id, student_id) in [("1", "alice"), ("999", "bob"), ("", "")] {
            let right = service
                .submit_answer(submission(question_id, student_id, "B"))
                .await
                .unwrap();
            assert!(right.is_correct);

            let wrong = service
                .submit_answer(submission(question_id, student_id, "C"))
                .await
                .unwrap();
            assert!(!wrong.is_correct);
            assert_eq!(wrong.correct_answer, "B");
        }
    }

    #[tokio::test]
    async fn mock_student_lists_are_empty() {
        let service = StudentService::new(Arc::new(MockBackend::instant()));
        assert!(service
            .get_weak_knowledge_points("s-1")
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            service
                .get_explanation(submission("3", "s-1", "A"))
                .await
                .unwrap()
                .explanation,
            "HELLOWORLDHELLOWORLD"
        );
    }

    #[tokio::test]
    async fn failures_are_re_raised() {
        let service = StudentService::new(Arc::new(FailingBackend("service down")));

        let err = service
            .submit_answer(submission("1", "s-1", "B"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "service down");
        assert!(service.get_weak_knowledge_points("s-1").await.is_err());
        assert!(service.get_recommended_questions("s-1", None).await.is_err());
        assert!(service
            .get_explanation(submission("1", "s-1", "B"))
            .await
            .is_err());
    }
}
