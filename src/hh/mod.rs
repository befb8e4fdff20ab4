pub mod auth;
pub mod client;
pub mod error;
pub mod types;

pub use auth::{CredentialManager, OAuthClient};
pub use client::{HhClient, JobBoard, build_http_client};
pub use error::HhError;
pub use types::{Credentials, NegotiationOutcome, SearchQuery, Vacancy};
