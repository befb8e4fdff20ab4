use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{error, warn};

use super::auth::CredentialManager;
use super::error::HhError;
use super::types::{NegotiationOutcome, NegotiationRequest, SearchQuery, Vacancy, VacancyPage};

/// Builds the HTTP client shared by every HeadHunter call.
pub fn build_http_client(user_agent: &str) -> Result<Client, HhError> {
    let client = Client::builder()
        .user_agent(user_agent)
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(30))
        .build()?;
    Ok(client)
}

/// The two job-board operations the apply workflow depends on.
pub trait JobBoard: Send + Sync {
    /// Candidate vacancies for the fixed search query, in listing order.
    fn fetch_vacancies(&self) -> impl Future<Output = Result<Vec<Vacancy>, HhError>> + Send;

    /// Submits an application ("negotiation") for one vacancy.
    fn create_negotiation(
        &self,
        vacancy_id: &str,
    ) -> impl Future<Output = Result<NegotiationOutcome, HhError>> + Send;
}

pub struct HhClient {
    http: Client,
    base_url: String,
    credentials: Arc<CredentialManager>,
    search: SearchQuery,
}

impl HhClient {
    /// `base_url` is the API root, e.g. `https://api.hh.ru`.
    pub fn new(
        http: Client,
        base_url: String,
        credentials: Arc<CredentialManager>,
        search: SearchQuery,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            search,
        }
    }

    /// Sends a bearer-authenticated request. A 401 triggers one credential
    /// refresh and exactly one retry; a second 401 is
    /// [`HhError::AuthenticationFailed`].
    async fn send_authorized<F>(&self, build: F) -> Result<Response, HhError>
    where
        F: Fn(&str) -> RequestBuilder,
    {
        let token = self.credentials.access_token().await;
        let response = build(&token).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        warn!("HH returned 401, refreshing access token");
        if let Err(e) = self.credentials.refresh_after(&token).await {
            // Retry anyway: the outcome of the retry decides what the caller sees.
            error!(error = %e, "credential refresh failed");
        }

        let token = self.credentials.access_token().await;
        let response = build(&token).send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            error!("HH still returns 401 after refresh");
            return Err(HhError::AuthenticationFailed);
        }
        Ok(response)
    }
}

impl JobBoard for HhClient {
    async fn fetch_vacancies(&self) -> Result<Vec<Vacancy>, HhError> {
        let url = format!("{}/vacancies", self.base_url);
        let response = self
            .send_authorized(|token| self.http.get(&url).bearer_auth(token).query(&self.search))
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            error!(status = status.as_u16(), "HH vacancy search failed");
            return Ok(Vec::new());
        }

        let page = response.json::<VacancyPage>().await?;
        Ok(page.items)
    }

    async fn create_negotiation(&self, vacancy_id: &str) -> Result<NegotiationOutcome, HhError> {
        let url = format!("{}/negotiations", self.base_url);
        let body = NegotiationRequest { vacancy_id };
        let response = self
            .send_authorized(|token| self.http.post(&url).bearer_auth(token).json(&body))
            .await?;

        let status = response.status();
        if status == StatusCode::CREATED {
            return Ok(NegotiationOutcome::Created);
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        error!(vacancy_id, status = status.as_u16(), %message, "HH rejected application");
        Ok(NegotiationOutcome::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hh::auth::OAuthClient;
    use crate::hh::types::Credentials;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> HhClient {
        let http = build_http_client("autoapply-test").unwrap();
        let credentials = Arc::new(CredentialManager::new(
            http.clone(),
            OAuthClient {
                token_url: format!("{}/oauth/token", server.uri()),
                client_id: "cid".into(),
                client_secret: "secret".into(),
            },
            Credentials {
                access_token: "expired".into(),
                refresh_token: "refresh".into(),
            },
            None,
        ));
        HhClient::new(http, server.uri(), credentials, SearchQuery::default())
    }

    async fn mount_refresh(server: &MockServer, status: u16, expected_calls: u64) {
        let response = if status == 200 {
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh",
                "refresh_token": "refresh-2"
            }))
        } else {
            ResponseTemplate::new(status)
        };
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(response)
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn fetch_sends_search_query_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/vacancies"))
            .and(query_param("text", "Python разработчик"))
            .and(query_param("area", "1"))
            .and(query_param("per_page", "10"))
            .and(header("authorization", "Bearer expired"))
            .and(header("user-agent", "autoapply-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{"id": "1"}, {"id": "2"}, {"id": "3"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let ids: Vec<String> = client(&server)
            .fetch_vacancies()
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.id)
            .collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn fetch_without_items_returns_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/vacancies"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        assert!(client(&server).fetch_vacancies().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fetch_non_success_returns_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/vacancies"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        mount_refresh(&server, 200, 0).await;

        assert!(client(&server).fetch_vacancies().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fetch_401_refreshes_once_and_retries_with_new_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/vacancies"))
            .and(header("authorization", "Bearer expired"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/vacancies"))
            .and(header("authorization", "Bearer fresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{"id": "7"}]
            })))
            .expect(1)
            .mount(&server)
            .await;
        mount_refresh(&server, 200, 1).await;

        let vacancies = client(&server).fetch_vacancies().await.unwrap();
        assert_eq!(vacancies.len(), 1);
        assert_eq!(vacancies[0].id, "7");
    }

    #[tokio::test]
    async fn fetch_persistent_401_surfaces_authentication_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/vacancies"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&server)
            .await;
        mount_refresh(&server, 400, 1).await;

        let err = client(&server).fetch_vacancies().await.unwrap_err();
        assert!(matches!(err, HhError::AuthenticationFailed));
    }

    #[tokio::test]
    async fn negotiation_created_on_201() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/negotiations"))
            .and(body_json(serde_json::json!({"vacancy_id": "42"})))
            .and(header("authorization", "Bearer expired"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = client(&server).create_negotiation("42").await.unwrap();
        assert_eq!(outcome, NegotiationOutcome::Created);
    }

    #[tokio::test]
    async fn negotiation_rejected_carries_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/negotiations"))
            .respond_with(ResponseTemplate::new(400).set_body_string("resume not found"))
            .mount(&server)
            .await;

        let outcome = client(&server).create_negotiation("42").await.unwrap();
        assert_eq!(
            outcome,
            NegotiationOutcome::Rejected {
                status: 400,
                message: "resume not found".into()
            }
        );
    }

    #[tokio::test]
    async fn negotiation_401_refreshes_once_and_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/negotiations"))
            .and(header("authorization", "Bearer expired"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/negotiations"))
            .and(header("authorization", "Bearer fresh"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;
        mount_refresh(&server, 200, 1).await;

        let outcome = client(&server).create_negotiation("42").await.unwrap();
        assert_eq!(outcome, NegotiationOutcome::Created);
    }
    #[tokio::test]
    async fn negotiation_persistent_401_surfaces_authentication_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/negotiations"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&server)
            .await;
        mount_refresh(&server, 200, 1).await;

        let err = client(&server).create_negotiation("42").await.unwrap_err();
        assert!(matches!(err, HhError::AuthenticationFailed));
    }
}
