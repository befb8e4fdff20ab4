//! Tipos de erro para o cliente da API HeadHunter.
//!
//! Define [`HhError`] com variantes para falhas de autenticação, rejeição
//! na renovação de credenciais e erros de rede.

use thiserror::Error;

use crate::config::ConfigError;

/// Erros que podem ocorrer ao interagir com a API do HeadHunter.
///
/// Respostas de rejeição comuns (4xx/5xx fora do 401) não são erros: o
/// cliente as converte em listas vazias ou em
/// [`NegotiationOutcome::Rejected`](super::NegotiationOutcome::Rejected).
#[derive(Debug, Error)]
pub enum HhError {
    /// A API respondeu 401 mesmo após uma renovação e uma nova tentativa.
    #[error("authentication failed: access token still rejected after refresh")]
    AuthenticationFailed,

    /// O endpoint de tokens recusou a troca de credenciais.
    #[error("token endpoint rejected the request (status {status}): {message}")]
    RefreshRejected { status: u16, message: String },

    /// Falha de rede subjacente (DNS, conexão recusada, timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// As novas credenciais foram obtidas mas não puderam ser gravadas.
    #[error("failed to persist credentials: {0}")]
    Persist(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_rejected_display() {
        let err = HhError::RefreshRejected {
            status: 400,
            message: "invalid_grant".into(),
        };
        assert_eq!(
            err.to_string(),
            "token endpoint rejected the request (status 400): invalid_grant"
        );
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HhError>();
    }
}
