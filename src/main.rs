mod applicant;
mod cli;
mod config;
mod error;
mod hh;
mod orchestrator;
mod store;
mod telegram;
mod telemetry;
mod ui;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::info;

use cli::{Cli, Command};
use config::AgentConfig;
use hh::{CredentialManager, HhClient, OAuthClient, build_http_client};
use orchestrator::ApplyOrchestrator;
use store::ApplicationStore;
use telegram::{TelegramApi, TelegramBot};
use ui::RunProgress;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AgentConfig::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;

    telemetry::init(&config.log_level, cli.verbose)?;

    match cli.command {
        Command::Run => {
            let orchestrator = build_orchestrator(&config, &cli.config).await?;
            let progress = RunProgress::start(&config.search.text);
            match orchestrator.run_search_and_apply(&progress).await {
                Ok(tally) => progress.complete(&tally),
                Err(e) => {
                    progress.abandon();
                    return Err(e).context("search-and-apply run failed");
                }
            }
        }
        Command::Bot => {
            config.require_telegram_token()?;
            let orchestrator = Arc::new(build_orchestrator(&config, &cli.config).await?);
            let http = reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .build()
                .context("failed to build Telegram HTTP client")?;
            let api = TelegramApi::new(
                http,
                &config.endpoints.telegram_api_url,
                &config.telegram_token,
            );
            let bot = TelegramBot::new(api, orchestrator, config.search_label.clone());
            tokio::select! {
                _ = bot.run() => {}
                _ = tokio::signal::ctrl_c() => info!("shutting down"),
            }
        }
        Command::Status { limit } => {
            let store = ApplicationStore::open(&config.database_path).await?;
            let total = store.count().await?;
            let recent = store.recent(limit).await?;
            ui::print_status(total, &recent);
        }
        Command::Refresh => {
            config.require_access_token()?;
            let credentials = credential_manager(&config, &cli.config)?;
            credentials.refresh().await.context("credential refresh failed")?;
            let fresh = credentials.credentials().await;
            println!(
                "Access token {}... saved to {}",
                fresh.access_token_prefix(),
                cli.config.display()
            );
        }
        Command::Authorize { code } => {
            let code = code.unwrap_or_else(|| config.auth_code.clone());
            if code.trim().is_empty() {
                bail!("no authorization code: pass --code or set auth_code in the config");
            }
            let credentials = credential_manager(&config, &cli.config)?;
            credentials
                .exchange_code(&code, config.redirect_uri.as_deref())
                .await
                .context("authorization code exchange failed")?;
            println!("Credentials saved to {}", cli.config.display());
        }
    }

    Ok(())
}

fn credential_manager(config: &AgentConfig, config_path: &Path) -> Result<Arc<CredentialManager>> {
    let http = build_http_client(&config.user_agent)?;
    Ok(Arc::new(CredentialManager::new(
        http,
        OAuthClient {
            token_url: config.endpoints.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        },
        config.credentials(),
        Some(config.credential_file(config_path)),
    )))
}

async fn build_orchestrator(
    config: &AgentConfig,
    config_path: &Path,
) -> Result<ApplyOrchestrator<HhClient>> {
    config.require_access_token()?;
    let credentials = credential_manager(config, config_path)?;
    let client = HhClient::new(
        build_http_client(&config.user_agent)?,
        config.endpoints.api_base_url.clone(),
        credentials,
        config.search.clone(),
    );
    let store = ApplicationStore::open(&config.database_path)
        .await
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    Ok(ApplyOrchestrator::new(
        Arc::new(client),
        store,
        Duration::from_millis(config.apply_delay_ms),
    ))
}
