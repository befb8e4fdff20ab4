//! Interface de linha de comando baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (run, bot, status,
//! refresh, authorize) e flags globais (--config, --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_PATH;

/// autoapply — envia candidaturas às vagas novas do HeadHunter.
#[derive(Debug, Parser)]
#[command(name = "autoapply", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho do arquivo de configuração TOML.
    #[arg(long, short, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Busca vagas e envia candidaturas uma vez, no terminal.
    Run,

    /// Inicia o bot do Telegram que dispara buscas pelo menu.
    Bot,

    /// Mostra quantas candidaturas já foram registradas.
    Status {
        /// Quantas candidaturas recentes listar.
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },

    /// Força a renovação do access token do HeadHunter.
    Refresh,

    /// Troca um código de autorização OAuth por um par de tokens novo.
    Authorize {
        /// Código de autorização; usa `auth_code` da configuração se omitido.
        #[arg(long)]
        code: Option<String>,
    },
}
