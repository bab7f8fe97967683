//! Server binary for edgequake-grader.
//!
//! Maps flags and environment variables onto `AppConfig`, wires up the
//! credential store, rasteriser and vision grader, then serves the web app.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_grader::pipeline::llm::VisionGrader;
use edgequake_grader::pipeline::render::PdfiumRasterizer;
use edgequake_grader::store::sessions::EXPIRED_SWEEP_PERIOD;
use edgequake_grader::{router, AppConfig, AppState, CredentialStore, ReportStore};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve on the default http://127.0.0.1:5000
  GEMINI_API_KEY=... grader

  # Postgres credential store, public bind
  grader --host 0.0.0.0 --database-url postgres://grader:pw@db/grader

  # Use a different vision provider
  OPENAI_API_KEY=... grader --provider openai --model gpt-4.1-mini --api-key "$OPENAI_API_KEY"

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY     Vision model API key (required)
  SECRET_KEY         Session cookie signing secret
  DATABASE_URL       sqlite://… or postgres://… for the users table
  PDFIUM_LIB_PATH    Directory or file holding libpdfium
  RUST_LOG           Overrides the log filter (e.g. edgequake_grader=debug)

A .env file in the working directory is loaded before flags are parsed.
"#;

/// Grade handwritten answer sheets with a Vision LLM.
#[derive(Parser, Debug)]
#[command(
    name = "grader",
    version,
    about = "Web app that grades PDF answer sheets with a Vision LLM",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Bind address.
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    host: String,

    /// Bind port.
    #[arg(short, long, env = "PORT", default_value_t = 5000)]
    port: u16,

    /// Credential store connection string.
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://grader.db?mode=rwc")]
    database_url: String,

    /// Session cookie signing secret.
    #[arg(long, env = "SECRET_KEY", hide_env_values = true)]
    secret_key: Option<String>,

    /// Vision model API key.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// edgequake-llm provider name.
    #[arg(long, env = "GRADER_PROVIDER", default_value = edgequake_grader::config::DEFAULT_PROVIDER)]
    provider: String,

    /// Vision model ID.
    #[arg(long, env = "GRADER_MODEL", default_value = edgequake_grader::config::DEFAULT_MODEL)]
    model: String,

    /// Where uploaded PDFs are saved.
    #[arg(long, env = "UPLOAD_DIR", default_value = "static/uploads")]
    upload_dir: PathBuf,

    /// Directory served under /static.
    #[arg(long, env = "STATIC_DIR", default_value = "static")]
    static_dir: PathBuf,

    /// CSV report file.
    #[arg(long, env = "REPORT_FILE", default_value = "student_scores.csv")]
    report_file: PathBuf,

    /// Request body limit in MiB.
    #[arg(long, env = "MAX_UPLOAD_MB", default_value_t = 32,
          value_parser = clap::value_parser!(u32).range(1..=1024))]
    max_upload_mb: u32,

    /// Longest rendered page edge in pixels.
    #[arg(long, env = "GRADER_MAX_PIXELS", default_value_t = 2000,
          value_parser = clap::value_parser!(u32).range(100..=10_000))]
    max_pixels: u32,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "GRADER_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Max output tokens per page.
    #[arg(long, env = "GRADER_MAX_TOKENS", default_value_t = 1024)]
    max_tokens: usize,

    /// Directory or file holding libpdfium.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "GRADER_VERBOSE")]
    verbose: bool,
}

impl Cli {
    fn to_config(&self) -> Result<AppConfig> {
        let mut builder = AppConfig::builder()
            .host(&self.host)
            .port(self.port)
            .database_url(&self.database_url)
            .api_key(self.api_key.clone().unwrap_or_default())
            .provider_name(&self.provider)
            .model(&self.model)
            .upload_dir(&self.upload_dir)
            .static_dir(&self.static_dir)
            .report_path(&self.report_file)
            .max_upload_bytes(self.max_upload_mb as usize * 1024 * 1024)
            .max_rendered_pixels(self.max_pixels)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens);

        if let Some(secret) = &self.secret_key {
            builder = builder.secret_key(secret);
        }
        if let Some(path) = &self.pdfium_lib_path {
            builder = builder.pdfium_lib_path(path);
        }
        Ok(builder.build()?)
    }
}

/// Environment variable the provider reads its key from.
fn provider_key_var(provider: &str) -> Option<&'static str> {
    match provider {
        "gemini" => Some("GEMINI_API_KEY"),
        "openai" => Some("OPENAI_API_KEY"),
        "anthropic" => Some("ANTHROPIC_API_KEY"),
        _ => None,
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = cli.to_config()?;

    // Still single-threaded here, before the runtime exists.
    if let Some(var) = provider_key_var(&config.provider_name) {
        if std::env::var_os(var).is_none() {
            std::env::set_var(var, &config.api_key);
        }
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start the tokio runtime")?
        .block_on(serve(config))
}

async fn serve(config: AppConfig) -> Result<()> {
    info!("Starting with {:?}", config);
    if config.uses_fallback_secret() {
        warn!("SECRET_KEY is not set; session cookies are signed with a placeholder secret");
    }

    let grader = VisionGrader::from_config(&config)
        .context("Could not create the vision grading client")?;
    let rasterizer = PdfiumRasterizer::new(config.pdfium_lib_path.clone(), config.max_rendered_pixels);

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("Cannot create upload dir {}", config.upload_dir.display()))?;

    let reports = ReportStore::new(config.report_path.clone());
    tokio::task::spawn_blocking(move || reports.ensure_initialized())
        .await
        .context("Report initialisation task failed")??;

    let credentials = CredentialStore::connect(&config.database_url).await;
    if !credentials.is_available() {
        warn!("Credential store unavailable; register and login will do nothing");
    }

    let addr = config.bind_addr();
    let state = AppState::new(config, credentials, Arc::new(rasterizer), Arc::new(grader))?;
    tokio::spawn(state.sessions.clone().run_expired_deletion(EXPIRED_SWEEP_PERIOD));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Cannot bind {addr}"))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_build_a_config() {
        let cli = Cli::try_parse_from(["grader", "--api-key", "k", "--max-upload-mb", "8"]).unwrap();
        let config = cli.to_config().unwrap();
        assert_eq!(config.api_key, "k");
        assert_eq!(config.max_upload_bytes, 8 * 1024 * 1024);
    }

    #[test]
    fn max_pixels_outside_range_is_rejected() {
        assert!(Cli::try_parse_from(["grader", "--max-pixels", "4294967295"]).is_err());
        assert!(Cli::try_parse_from(["grader", "--max-pixels", "99"]).is_err());
        let cli = Cli::try_parse_from(["grader", "--max-pixels", "10000"]).unwrap();
        assert_eq!(cli.max_pixels, 10_000);
    }

    #[test]
    fn provider_key_vars() {
        assert_eq!(provider_key_var("gemini"), Some("GEMINI_API_KEY"));
        assert_eq!(provider_key_var("ollama"), None);
    }
}
