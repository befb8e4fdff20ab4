//! Configuração do agente carregada a partir de `autoapply.toml`.
//!
//! A struct [`AgentConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis. Variáveis de
//! ambiente (`HH_ACCESS_TOKEN`, `HH_REFRESH_TOKEN`, `HH_CLIENT_SECRET`,
//! `TELEGRAM_TOKEN`) têm precedência sobre o arquivo.
//!
//! [`CredentialFile`] regrava apenas os campos de credenciais, de forma
//! atômica, depois de cada renovação de token.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::warn;

use crate::hh::{Credentials, SearchQuery};

/// Caminho padrão do arquivo de configuração.
pub const DEFAULT_CONFIG_PATH: &str = "autoapply.toml";

const ACCESS_TOKEN_KEY: &str = "hh_access_token";
const REFRESH_TOKEN_KEY: &str = "refresh_token";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("missing required setting `{0}`; set it in the config file or environment")]
    Missing(&'static str),

    #[error("failed to replace {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Configuração de nível superior carregada de `autoapply.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Token do bot do Telegram.
    #[serde(default)]
    pub telegram_token: String,

    /// Access token OAuth do HeadHunter.
    #[serde(default)]
    pub hh_access_token: String,

    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,

    /// Código de autorização usado por `autoapply authorize`.
    #[serde(default)]
    pub auth_code: String,

    #[serde(default)]
    pub refresh_token: String,

    /// Redirect URI registrado na aplicação OAuth, se houver.
    #[serde(default)]
    pub redirect_uri: Option<String>,

    /// Pausa entre candidaturas consecutivas, em milissegundos.
    #[serde(default = "default_apply_delay_ms")]
    pub apply_delay_ms: u64,

    /// Banco SQLite com as candidaturas já enviadas.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// User-Agent enviado em todas as requisições HTTP.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Filtro de log quando `RUST_LOG` não está definido.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Texto do botão do menu que dispara a busca no bot.
    #[serde(default = "default_search_label")]
    pub search_label: String,

    #[serde(default)]
    pub search: SearchQuery,

    #[serde(default)]
    pub endpoints: Endpoints,

    /// Variáveis de ambiente que substituíram valores do arquivo.
    #[serde(skip)]
    env_overrides: Vec<&'static str>,
}

/// URLs base dos serviços externos. Sobrescrevíveis para testes.
#[derive(Debug, Clone, Deserialize)]
pub struct Endpoints {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_token_url")]
    pub token_url: String,

    #[serde(default = "default_telegram_api_url")]
    pub telegram_api_url: String,
}

fn default_apply_delay_ms() -> u64 {
    2000
}

fn default_database_path() -> PathBuf {
    PathBuf::from("jobs.db")
}

fn default_user_agent() -> String {
    format!("autoapply/{}", env!("CARGO_PKG_VERSION"))
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_search_label() -> String {
    "🔍 Найти вакансии".to_string()
}

fn default_api_base_url() -> String {
    "https://api.hh.ru".to_string()
}

fn default_token_url() -> String {
    "https://hh.ru/oauth/token".to_string()
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            token_url: default_token_url(),
            telegram_api_url: default_telegram_api_url(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            telegram_token: String::new(),
            hh_access_token: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            auth_code: String::new(),
            refresh_token: String::new(),
            redirect_uri: None,
            apply_delay_ms: default_apply_delay_ms(),
            database_path: default_database_path(),
            user_agent: default_user_agent(),
            log_level: default_log_level(),
            search_label: default_search_label(),
            search: SearchQuery::default(),
            endpoints: Endpoints::default(),
            env_overrides: Vec::new(),
        }
    }
}

impl AgentConfig {
    /// Carrega a configuração do caminho fornecido.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<AgentConfig>(&contents)?
        } else {
            Self::default()
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    // Variáveis de ambiente não vazias substituem os valores do arquivo.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let overrides: [(&str, &mut String); 4] = [
            ("HH_ACCESS_TOKEN", &mut self.hh_access_token),
            ("HH_REFRESH_TOKEN", &mut self.refresh_token),
            ("HH_CLIENT_SECRET", &mut self.client_secret),
            ("TELEGRAM_TOKEN", &mut self.telegram_token),
        ];
        for (name, slot) in overrides {
            if let Some(value) = lookup(name)
                && !value.is_empty()
            {
                *slot = value;
                self.env_overrides.push(name);
            }
        }
    }

    /// Arquivo onde as credenciais renovadas são gravadas. Se algum token
    /// veio do ambiente, o arquivo lembra a variável para avisar que ela
    /// continuará vencendo na próxima inicialização.
    pub fn credential_file(&self, path: impl Into<PathBuf>) -> CredentialFile {
        let shadowed_by = self
            .env_overrides
            .iter()
            .copied()
            .find(|name| matches!(*name, "HH_ACCESS_TOKEN" | "HH_REFRESH_TOKEN"));
        CredentialFile {
            path: path.into(),
            shadowed_by,
        }
    }

    /// Sem access token nenhuma chamada ao HeadHunter é possível: erro fatal.
    pub fn require_access_token(&self) -> Result<(), ConfigError> {
        if self.hh_access_token.trim().is_empty() {
            return Err(ConfigError::Missing(ACCESS_TOKEN_KEY));
        }
        Ok(())
    }

    pub fn require_telegram_token(&self) -> Result<(), ConfigError> {
        if self.telegram_token.trim().is_empty() {
            return Err(ConfigError::Missing("telegram_token"));
        }
        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            access_token: self.hh_access_token.clone(),
            refresh_token: self.refresh_token.clone(),
        }
    }
}

/// Arquivo de configuração visto apenas pelos campos de credenciais.
#[derive(Debug, Clone)]
pub struct CredentialFile {
    path: PathBuf,
    shadowed_by: Option<&'static str>,
}

impl CredentialFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            shadowed_by: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Variável de ambiente que sobrepõe os tokens gravados aqui, se houver.
    pub fn shadowed_by(&self) -> Option<&'static str> {
        self.shadowed_by
    }

    /// Substitui `hh_access_token` e `refresh_token` preservando todas as
    /// outras chaves. O conteúdo novo vai para um arquivo temporário no
    /// mesmo diretório, que então é renomeado por cima do original.
    ///
    /// Não há trava entre processos; dentro do processo as chamadas são
    /// serializadas pelo [`CredentialManager`](crate::hh::CredentialManager).
    pub fn persist(&self, credentials: &Credentials) -> Result<(), ConfigError> {
        let mut table = if self.path.exists() {
            std::fs::read_to_string(&self.path)?.parse::<toml::Table>()?
        } else {
            toml::Table::new()
        };
        table.insert(
            ACCESS_TOKEN_KEY.to_string(),
            toml::Value::String(credentials.access_token.clone()),
        );
        table.insert(
            REFRESH_TOKEN_KEY.to_string(),
            toml::Value::String(credentials.refresh_token.clone()),
        );
        let rendered = toml::to_string_pretty(&table)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(rendered.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| ConfigError::Persist {
            path: self.path.clone(),
            source: e.error,
        })?;
        if let Some(var) = self.shadowed_by {
            warn!(
                var,
                path = %self.path.display(),
                "refreshed tokens were saved, but {var} overrides them on the next start; unset it"
            );
        }
        Ok(())
    }
}
