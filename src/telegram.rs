//! Telegram chat front-end.
//!
//! Long-polls the Bot API, answers `/start` with a one-button menu and runs
//! the search-and-apply workflow whenever the button label arrives. Runs are
//! spawned so the poll loop keeps answering; a second trigger while a run is
//! active is answered from the orchestrator's run gate.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::error::AgentError;
use crate::hh::JobBoard;
use crate::orchestrator::{ApplyOrchestrator, SilentReporter};

const POLL_TIMEOUT_SECS: u64 = 30;
const POLL_ERROR_PAUSE: Duration = Duration::from_secs(5);

const GREETING: &str = "Привет! Я бот для автоотклика на вакансии.";
const ALREADY_RUNNING: &str = "⏳ Поиск уже выполняется, дождитесь результата.";
const RUN_FAILED: &str = "⚠️ Не удалось выполнить поиск вакансий.";
const AUTH_FAILED: &str = "⚠️ Авторизация HH не удалась. Обновите токены.";

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<ReplyKeyboard<'a>>,
}

#[derive(Debug, Serialize)]
struct ReplyKeyboard<'a> {
    keyboard: Vec<Vec<KeyboardButton<'a>>>,
    resize_keyboard: bool,
}

#[derive(Debug, Serialize)]
struct KeyboardButton<'a> {
    text: &'a str,
}

/// What an incoming message asks the bot to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatCommand {
    Start,
    Search,
    Ignore,
}

impl ChatCommand {
    pub fn parse(text: &str, search_label: &str) -> Self {
        let text = text.trim();
        // "/start@BotName" is how commands arrive in group chats.
        let command = text.split('@').next().unwrap_or(text);
        if command == "/start" {
            ChatCommand::Start
        } else if text == search_label.trim() {
            ChatCommand::Search
        } else {
            ChatCommand::Ignore
        }
    }
}

/// Thin Bot API client: just the two calls the bot needs.
#[derive(Clone)]
pub struct TelegramApi {
    http: Client,
    base: String,
}

impl TelegramApi {
    pub fn new(http: Client, api_url: &str, token: &str) -> Self {
        Self {
            http,
            base: format!("{}/bot{token}", api_url.trim_end_matches('/')),
        }
    }

    /// Errors from here on never carry the request URL, which embeds the
    /// bot token.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, reqwest::Error> {
        self.poll(offset).await.map_err(reqwest::Error::without_url)
    }

    async fn poll(&self, offset: i64) -> Result<Vec<Update>, reqwest::Error> {
        let response: ApiResponse<Vec<Update>> = self
            .http
            .get(format!("{}/getUpdates", self.base))
            .query(&[("offset", offset), ("timeout", POLL_TIMEOUT_SECS as i64)])
            .timeout(Duration::from_secs(POLL_TIMEOUT_SECS + 10))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if !response.ok {
            warn!(description = ?response.description, "getUpdates returned ok=false");
        }
        Ok(response.result.unwrap_or_default())
    }

    async fn send(&self, message: &SendMessage<'_>) -> Result<(), reqwest::Error> {
        self.post_message(message)
            .await
            .map_err(reqwest::Error::without_url)
    }

    async fn post_message(&self, message: &SendMessage<'_>) -> Result<(), reqwest::Error> {
        let response: ApiResponse<serde_json::Value> = self
            .http
            .post(format!("{}/sendMessage", self.base))
            .json(message)
            .send()
            .await?
            .json()
            .await?;
        if !response.ok {
            warn!(chat_id = message.chat_id, description = ?response.description, "sendMessage failed");
        }
        Ok(())
    }

    pub async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), reqwest::Error> {
        self.send(&SendMessage {
            chat_id,
            text,
            reply_markup: None,
        })
        .await
    }

    pub async fn send_menu(
        &self,
        chat_id: i64,
        text: &str,
        button: &str,
    ) -> Result<(), reqwest::Error> {
        self.send(&SendMessage {
            chat_id,
            text,
            reply_markup: Some(ReplyKeyboard {
                keyboard: vec![vec![KeyboardButton { text: button }]],
                resize_keyboard: true,
            }),
        })
        .await
    }
}

pub struct TelegramBot<B> {
    api: TelegramApi,
    orchestrator: Arc<ApplyOrchestrator<B>>,
    search_label: String,
}

impl<B: JobBoard + 'static> TelegramBot<B> {
    pub fn new(
        api: TelegramApi,
        orchestrator: Arc<ApplyOrchestrator<B>>,
        search_label: String,
    ) -> Self {
        Self {
            api,
            orchestrator,
            search_label,
        }
    }

    /// Polls forever. Transport errors are logged and polling resumes.
    pub async fn run(&self) {
        info!("telegram bot polling started");
        let mut offset = 0;
        loop {
            let updates = match self.api.get_updates(offset).await {
                Ok(updates) => updates,
                Err(e) => {
                    error!(error = %e, "failed to poll telegram updates");
                    sleep(POLL_ERROR_PAUSE).await;
                    continue;
                }
            };
            for update in updates {
                offset = offset.max(update.update_id + 1);
                self.handle(update).await;
            }
        }
    }

    /// Dispatches one update. Search runs are spawned and answered when
    /// they finish; the returned handle is for callers that want to wait.
    pub async fn handle(&self, update: Update) -> Option<tokio::task::JoinHandle<()>> {
        let message = update.message?;
        let text = message.text.as_deref()?;
        let chat_id = message.chat.id;

        match ChatCommand::parse(text, &self.search_label) {
            ChatCommand::Start => {
                if let Err(e) = self
                    .api
                    .send_menu(chat_id, GREETING, &self.search_label)
                    .await
                {
                    error!(chat_id, error = %e, "failed to send menu");
                }
                None
            }
            ChatCommand::Search => {
                info!(chat_id, "search triggered from chat");
                let api = self.api.clone();
                let orchestrator = self.orchestrator.clone();
                Some(tokio::spawn(async move {
                    let reply = match orchestrator.run_search_and_apply(&SilentReporter).await {
                        Ok(tally) => tally.summary(),
                        Err(AgentError::RunInProgress) => ALREADY_RUNNING.to_string(),
                        Err(e) if e.is_authentication_failure() => AUTH_FAILED.to_string(),
                        Err(e) => {
                            error!(error = %e, "search-and-apply run failed");
                            RUN_FAILED.to_string()
                        }
                    };
                    if let Err(e) = api.send_text(chat_id, &reply).await {
                        error!(chat_id, error = %e, "failed to send run summary");
                    }
                }))
            }
            ChatCommand::Ignore => {
                debug!(chat_id, "ignoring message");
                None
            }
        }
    }
}
