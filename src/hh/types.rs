//! Tipos de dados para requisições e respostas da API HeadHunter.
//!
//! Só os campos usados pelo fluxo de candidatura são modelados; o resto do
//! JSON das vagas é ignorado na desserialização.

use serde::{Deserialize, Serialize};

/// Par de credenciais OAuth usado em todas as chamadas autenticadas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: String,
}

impl Credentials {
    /// Prefixo do access token seguro para logs.
    pub fn access_token_prefix(&self) -> &str {
        let end = self
            .access_token
            .char_indices()
            .nth(10)
            .map(|(i, _)| i)
            .unwrap_or(self.access_token.len());
        &self.access_token[..end]
    }
}

/// Parâmetros fixos da busca de vagas (`GET /vacancies`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Texto livre da busca.
    #[serde(default = "default_text")]
    pub text: String,
    /// Código da região (1 = Moscou).
    #[serde(default = "default_area")]
    pub area: String,
    /// Tamanho da página retornada.
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_text() -> String {
    "Python разработчик".to_string()
}

fn default_area() -> String {
    "1".to_string()
}

fn default_per_page() -> u32 {
    10
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            text: default_text(),
            area: default_area(),
            per_page: default_per_page(),
        }
    }
}

/// Uma vaga retornada pela listagem. Só o `id` segue adiante no fluxo.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Vacancy {
    pub id: String,
    /// Título da vaga, usado apenas para exibição.
    #[serde(default)]
    pub name: Option<String>,
}

/// Corpo da resposta de `GET /vacancies`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VacancyPage {
    #[serde(default)]
    pub items: Vec<Vacancy>,
}

/// Corpo de `POST /negotiations`.
#[derive(Debug, Serialize)]
pub struct NegotiationRequest<'a> {
    pub vacancy_id: &'a str,
}

/// Resultado de uma tentativa de candidatura na API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationOutcome {
    /// HTTP 201: candidatura criada.
    Created,
    /// Qualquer outro status que não 401.
    Rejected { status: u16, message: String },
}

/// Resposta do endpoint de tokens OAuth.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl From<TokenResponse> for Credentials {
    fn from(tokens: TokenResponse) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vacancy_page_ignores_unknown_fields() {
        let json = r#"{
            "items": [
                {"id": "93354187", "name": "Python developer", "salary": null, "area": {"id": "1"}},
                {"id": "93354188"}
            ],
            "found": 2,
            "pages": 1
        }"#;
        let page: VacancyPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].id, "93354187");
        assert_eq!(page.items[0].name.as_deref(), Some("Python developer"));
        assert_eq!(page.items[1].name, None);
    }

    #[test]
    fn vacancy_page_without_items_is_empty() {
        let page: VacancyPage = serde_json::from_str(r#"{"found": 0}"#).unwrap();
        assert!(page.items.is_empty());
    }

    #[test]
    fn negotiation_request_body() {
        let body = serde_json::to_value(NegotiationRequest { vacancy_id: "42" }).unwrap();
        assert_eq!(body, serde_json::json!({"vacancy_id": "42"}));
    }

    #[test]
    fn token_response_without_expiry() {
        let tokens: TokenResponse =
            serde_json::from_str(r#"{"access_token": "a", "refresh_token": "r"}"#).unwrap();
        assert_eq!(tokens.expires_in, None);
        let creds = Credentials::from(tokens);
        assert_eq!(creds.access_token, "a");
        assert_eq!(creds.refresh_token, "r");
    }

    #[test]
    fn access_token_prefix_truncates() {
        let creds = Credentials {
            access_token: "USERABCDEFGHIJKLMNOP".into(),
            refresh_token: String::new(),
        };
        assert_eq!(creds.access_token_prefix(), "USERABCDEF");

        let short = Credentials {
            access_token: "abc".into(),
            refresh_token: String::new(),
        };
        assert_eq!(short.access_token_prefix(), "abc");
    }

    #[test]
    fn search_query_defaults() {
        let query = SearchQuery::default();
        assert_eq!(query.text, "Python разработчик");
        assert_eq!(query.area, "1");
        assert_eq!(query.per_page, 10);
    }
}
