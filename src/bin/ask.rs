use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use tutorbot::backend;
use tutorbot::chat::ChatService;
use tutorbot::citation::CitationResolver;
use tutorbot::config::{AppConfig, BackendKind};
use tutorbot::models::{AnswerSubmission, ChatRequest};
use tutorbot::student::StudentService;

#[derive(Parser, Debug)]
#[command(name = "ask")]
#[command(about = "Call the tutoring API from the command line and print the JSON result")]
struct Cli {
    /// Overrides TUTOR_BACKEND.
    #[arg(long, value_parser = ["mock", "http"])]
    backend: Option<String>,
    /// Overrides TUTOR_API_BASE_URL.
    #[arg(long)]
    base_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask the chatbot a question.
    Chat {
        message: String,
        /// Answer with textbook references.
        #[arg(long, default_value_t = false)]
        rag: bool,
    },
    /// List questions recommended for a student.
    Recommend {
        #[arg(long)]
        student: String,
        #[arg(long = "knowledge-point")]
        knowledge_points: Vec<String>,
    },
    /// Submit an answer and print the verdict.
    Submit {
        #[arg(long)]
        question: String,
        #[arg(long)]
        student: String,
        #[arg(long)]
        option: String,
    },
    /// Fetch the explanation for a question.
    Explain {
        #[arg(long)]
        question: String,
        #[arg(long)]
        student: String,
        #[arg(long)]
        option: String,
    },
    /// List a student's weak knowledge points.
    Weak {
        #[arg(long)]
        student: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = AppConfig::from_env();
    if let Some(kind) = cli.backend.as_deref() {
        config.backend = BackendKind::from_env_value(kind);
    }
    if let Some(base_url) = cli.base_url {
        config.api_base_url = base_url;
    }

    let backend = backend::build(&config)?;

    match cli.command {
        Command::Chat { message, rag } => {
            let resolver = CitationResolver::new(config.chapter_page_map()?)?;
            let chat = ChatService::new(backend, resolver);
            let response = chat
                .get_chat_response(ChatRequest {
                    user_input: message,
                    use_rag: rag,
                })
                .await?;
            print_json(&response)
        }
        Command::Recommend {
            student,
            knowledge_points,
        } => {
            let knowledge_points = (!knowledge_points.is_empty()).then_some(knowledge_points);
            let questions = StudentService::new(backend)
                .get_recommended_questions(&student, knowledge_points)
                .await?;
            print_json(&questions)
        }
        Command::Submit {
            question,
            student,
            option,
        } => {
            let verdict = StudentService::new(backend)
                .submit_answer(AnswerSubmission {
                    question_id: question,
                    student_id: student,
                    selected_option: option,
                })
                .await?;
            print_json(&verdict)
        }
        Command::Explain {
            question,
            student,
            option,
        } => {
            let explanation = StudentService::new(backend)
                .get_explanation(AnswerSubmission {
                    question_id: question,
                    student_id: student,
                    selected_option: option,
                })
                .await?;
            print_json(&explanation)
        }
        Command::Weak { student } => {
            let points = StudentService::new(backend)
                .get_weak_knowledge_points(&student)
                .await?;
            print_json(&points)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render response")?;
    println!("{rendered}");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
