pub mod backend;
pub mod chat;
pub mod citation;
pub mod config;
pub mod models;
pub mod server;
pub mod student;
pub mod wire;

pub use config::AppConfig;
pub use server::run_server;
