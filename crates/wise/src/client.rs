//! Wise API client.
//!
//! Provides async access to:
//! - Profiles
//! - Balances
//! - Balance statements (PDF)

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Method, Request, StatusCode, Url};
use rsa::RsaPrivateKey;
use tracing::debug;

use crate::error::WiseError;
use crate::http::{HttpClient, UserAgent};
use crate::model::{Balance, Profile, ProfileId, StatementRequest};
use crate::sca::PersonalTokenSca;

/// User agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("wise-rs / ", env!("CARGO_PKG_VERSION"));

/// Timestamp layout expected by the statement endpoint.
const INTERVAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

// ============================================================================
// API surface
// ============================================================================

/// Operations used to download statements.
#[async_trait]
pub trait WiseApi: Send + Sync {
    /// List all profiles belonging to the user.
    async fn list_profiles(&self) -> Result<Vec<Profile>, WiseError>;

    /// List the standard balances of a profile.
    async fn get_balances(&self, profile_id: ProfileId) -> Result<Vec<Balance>, WiseError>;

    /// Download a balance statement as PDF.
    ///
    /// The period between the interval start and end cannot exceed 455 days.
    async fn get_statement_pdf(&self, request: &StatementRequest) -> Result<Vec<u8>, WiseError>;
}

/// Wise API environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Production,
    Sandbox,
}

impl Environment {
    /// Get the API base URL.
    pub fn base_url(&self) -> &'static str {
        match self {
            Environment::Production => "https://api.transferwise.com/",
            Environment::Sandbox => "https://api.sandbox.transferwise.tech/",
        }
    }

    /// Get the parsed API base URL.
    pub fn url(&self) -> Result<Url, WiseError> {
        Url::parse(self.base_url()).map_err(|e| WiseError::InvalidBaseUrl(e.to_string()))
    }
}

// ============================================================================
// Client
// ============================================================================

/// Wise API client over any [`HttpClient`].
pub struct Client {
    base_url: Url,
    http: Arc<dyn HttpClient>,
    authorization: HeaderValue,
}

impl Client {
    /// Create a client for `base_url` authenticating with a bearer token.
    pub fn new(base_url: Url, http: Arc<dyn HttpClient>, token: &str) -> Result<Self, WiseError> {
        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| WiseError::InvalidToken)?;
        authorization.set_sensitive(true);

        Ok(Self {
            base_url,
            http,
            authorization,
        })
    }

    /// Create a client with the default transport chain:
    /// SCA signing over the user-agent decorator over `reqwest`.
    pub fn with_personal_token(
        environment: Environment,
        token: &str,
        key: RsaPrivateKey,
    ) -> Result<Self, WiseError> {
        let transport = UserAgent::new(
            reqwest::Client::new(),
            HeaderValue::from_static(DEFAULT_USER_AGENT),
        );
        let http = Arc::new(PersonalTokenSca::new(transport, key));

        Self::new(environment.url()?, http, token)
    }

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        let base = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{}/{}", base, path));
        url
    }

    async fn get(&self, url: Url) -> Result<Vec<u8>, WiseError> {
        debug!(%url, "GET");

        let mut request = Request::new(Method::GET, url);
        request
            .headers_mut()
            .insert(AUTHORIZATION, self.authorization.clone());

        let response = self.http.send(request).await?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| WiseError::Transport(e.into()))?;

        if status != StatusCode::OK {
            return Err(WiseError::from_failed_response(status, &body));
        }

        Ok(body.to_vec())
    }
}

#[async_trait]
impl WiseApi for Client {
    async fn list_profiles(&self) -> Result<Vec<Profile>, WiseError> {
        let body = self.get(self.endpoint("v2/profiles")).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn get_balances(&self, profile_id: ProfileId) -> Result<Vec<Balance>, WiseError> {
        let mut url = self.endpoint(&format!("v3/profiles/{}/balances", profile_id));
        url.query_pairs_mut().append_pair("types", "STANDARD");

        let body = self.get(url).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn get_statement_pdf(&self, request: &StatementRequest) -> Result<Vec<u8>, WiseError> {
        let mut url = self.endpoint(&format!(
            "v1/profiles/{}/balance-statements/{}/statement.pdf",
            request.profile_id, request.balance_id
        ));
        url.query_pairs_mut()
            .append_pair(
                "intervalStart",
                &request.interval_start.format(INTERVAL_FORMAT).to_string(),
            )
            .append_pair(
                "intervalEnd",
                &request.interval_end.format(INTERVAL_FORMAT).to_string(),
            )
            .append_pair("type", request.statement_type.as_str());

        self.get(url).await
    }
}
