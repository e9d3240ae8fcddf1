use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use tutorbot::backend::{MockBackend, MockLatency, TutorBackend};
use tutorbot::{run_server, AppConfig};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = AppConfig::from_env();
    let backend: Arc<dyn TutorBackend> = Arc::new(MockBackend::new(MockLatency::scaled(
        config.mock.latency_scale,
    )));

    run_server(config, backend).await
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
