// src/main.rs

use std::{process::ExitCode, sync::Arc, time::Duration};

use edu_backend::{
    clients::{openrouter::OpenRouterClient, piston::PistonClient},
    config::Config,
    grading::catalog::ExamCatalog,
    routes,
    state::{AppState, SessionRegistry},
};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> ExitCode {
    // Load configuration from environment (.env included)
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let Some(pool) = connect_with_retry(&config.database_url).await else {
        return ExitCode::FAILURE;
    };
    tracing::info!("Database connected...");

    // Run Migrations Automatically
    tracing::info!("Running migrations...");
    if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
        tracing::error!("Failed to run database migrations: {}", e);
        return ExitCode::FAILURE;
    }
    tracing::info!("Migrations applied successfully.");

    let catalog = match ExamCatalog::load_dir(&config.exam_dir) {
        Ok(catalog) => catalog,
        Err(e) => {
            tracing::error!("Failed to load exams from {}: {}", config.exam_dir, e);
            return ExitCode::FAILURE;
        }
    };
    tracing::info!("Loaded {} exam(s) from {}", catalog.len(), config.exam_dir);

    let http = match reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
    {
        Ok(http) => http,
        Err(e) => {
            tracing::error!("Failed to build HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let piston = PistonClient::new(
        http.clone(),
        &config.piston_url,
        config.piston_cpp_version.clone(),
    );
    let ai = Arc::new(OpenRouterClient::new(http, config.ai.clone()));
    if !ai.is_configured() {
        tracing::warn!("OPENROUTER_API_KEY is not set; AI grading and hints are unavailable");
    }

    let sessions = SessionRegistry::default();
    sessions.spawn_sweeper(config.session_retention, SESSION_SWEEP_INTERVAL);

    // Create AppState
    let state = AppState {
        pool,
        config: config.clone(),
        catalog: Arc::new(catalog),
        sessions,
        executor: Arc::new(piston),
        grader: ai.clone(),
        tutor: ai,
    };

    // Create the Axum application router
    let app = routes::create_router(state);

    let listener = match tokio::net::TcpListener::bind(&config.server_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", config.server_addr, e);
            return ExitCode::FAILURE;
        }
    };
    tracing::info!("Listening on {}", config.server_addr);

    // Start the server
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize Database Pool with Retry
async fn connect_with_retry(database_url: &str) -> Option<SqlitePool> {
    let mut retry_count = 0;
    loop {
        match SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await
        {
            Ok(pool) => return Some(pool),
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    tracing::error!("Failed to connect to database after 5 retries: {}", e);
                    return None;
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    }
}
