use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use trivia_party::{
    config::{self, Config},
    create_app,
};

#[tokio::main]
async fn main() {
    let env: String = config::run_env();
    let config: Config = Config::load().expect("Failed to load config.");

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.logging.level.clone().into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    tracing::info!(run_env = %env, "Starting Trivia Party server...");

    let app = create_app(config.clone()).expect("Failed to build application state.");
    tracing::info!("Listening on {}", &config.server.addr);

    let listener = tokio::net::TcpListener::bind(&config.server.addr).await.unwrap();

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {}", e);
    }
}
