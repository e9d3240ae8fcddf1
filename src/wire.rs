use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::{Question, QuestionOption, WeakKnowledgePoint};

pub const SUCCESS_CODE: i64 = 200;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: SUCCESS_CODE,
            message: Some("success".to_string()),
            data: Some(data),
        }
    }

    pub fn failure(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn into_data(self, fallback: &str) -> Result<T> {
        if self.code != SUCCESS_CODE {
            let message = self
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| fallback.to_string());
            anyhow::bail!("{message}");
        }

        self.data
            .ok_or_else(|| anyhow::anyhow!("{fallback}: response envelope has no data"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedQuestions {
    pub questions: Vec<WireQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireOption {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireQuestion {
    pub question_id: String,
    pub description: String,
    pub options: Vec<WireOption>,
    pub knowledge_point: String,
}

impl WireQuestion {
    pub fn from_question(question: &Question) -> Self {
        Self {
            question_id: question.id.to_string(),
            description: question.title.clone(),
            options: question
                .options
                .iter()
                .map(|opt| WireOption {
                    id: opt.key.clone(),
                    text: opt.text.clone(),
                })
                .collect(),
            knowledge_point: question.knowledge_point.clone(),
        }
    }

    pub fn into_question(self) -> Result<Question> {
        let id = self
            .question_id
            .trim()
            .parse::<i64>()
            .with_context(|| format!("question id is not numeric: {:?}", self.question_id))?;

        Ok(Question {
            id,
            title: self.description,
            question_type: "选择题".to_string(),
            options: self
                .options
                .into_iter()
                .map(|opt| QuestionOption {
                    key: opt.id,
                    text: opt.text,
                })
                .collect(),
            correct_answer: String::new(),
            explanation: String::new(),
            knowledge_point: self.knowledge_point,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeakKnowledgePoints {
    pub weak_knowledge_points: Vec<WirePoint>,
}

/// Backends send ids either as strings or as integers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum WireId {
    Number(i64),
    Text(String),
}

impl WireId {
    fn into_string(self) -> String {
        match self {
            WireId::Number(n) => n.to_string(),
            WireId::Text(s) => s,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePoint {
    pub id: WireId,
    pub name: String,
    pub current_score: f64,
}

impl WirePoint {
    pub fn from_point(point: &WeakKnowledgePoint) -> Self {
        Self {
            id: WireId::Text(point.id.clone()),
            name: point.name.clone(),
            current_score: point.score,
        }
    }

    pub fn into_point(self) -> WeakKnowledgePoint {
        WeakKnowledgePoint {
            id: self.id.into_string(),
            description: format!("{}掌握程度较低", self.name),
            name: self.name,
            score: self.current_score,
        }
    }
}
