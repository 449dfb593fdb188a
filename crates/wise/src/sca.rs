//! Strong customer authentication (SCA) for personal API tokens.
//!
//! Some endpoints (statements among them) answer `403 Forbidden` with a
//! one-time token in the `x-2fa-approval` header. The client proves possession
//! of the registered key by signing that token and repeating the request with
//! the token and the signature attached.
//!
//! ## Flow
//!
//! ```text
//! send(request) ──► 403 + x-2fa-approval: T
//!                       │
//!                       ▼
//!        sig = base64(rsa_pkcs1v15(sha256(T)))
//!                       │
//!                       ▼
//! send(request + x-2fa-approval: T + X-Signature: sig) ──► response
//! ```
//!
//! Only one retry is made. A second challenge is handed back to the caller.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::HeaderValue;
use reqwest::{Request, Response, StatusCode};
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

use crate::http::{HttpClient, HttpError};

/// Response and request header carrying the one-time token.
pub const APPROVAL_HEADER: &str = "x-2fa-approval";

/// Request header carrying the base64 signature of the one-time token.
pub const SIGNATURE_HEADER: &str = "x-signature";

/// Failure to produce a signature over a one-time token.
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("rsa: {0}")]
    Rsa(#[from] rsa::Error),

    #[error("{0}")]
    Other(String),
}

/// Signs the SHA-256 digest of a one-time token.
pub trait ChallengeSigner: Send + Sync {
    fn sign_digest(&self, digest: &[u8]) -> Result<Vec<u8>, SigningError>;
}

impl ChallengeSigner for RsaPrivateKey {
    fn sign_digest(&self, digest: &[u8]) -> Result<Vec<u8>, SigningError> {
        Ok(RsaPrivateKey::sign(
            self,
            Pkcs1v15Sign::new::<Sha256>(),
            digest,
        )?)
    }
}

/// Compute the `X-Signature` value for a one-time token.
pub fn sign_one_time_token<S: ChallengeSigner + ?Sized>(
    signer: &S,
    token: &[u8],
) -> Result<String, SigningError> {
    let digest = Sha256::digest(token);
    let signature = signer.sign_digest(&digest)?;
    Ok(STANDARD.encode(signature))
}

/// SCA transport for personal tokens.
///
/// See <https://docs.wise.com/api-docs/features/strong-customer-authentication-2fa/personal-token-sca>.
pub struct PersonalTokenSca<C, S = RsaPrivateKey> {
    inner: C,
    signer: S,
}

impl<C: HttpClient, S: ChallengeSigner> PersonalTokenSca<C, S> {
    pub fn new(inner: C, signer: S) -> Self {
        Self { inner, signer }
    }
}

#[async_trait]
impl<C: HttpClient, S: ChallengeSigner> HttpClient for PersonalTokenSca<C, S> {
    async fn send(&self, request: Request) -> Result<Response, HttpError> {
        let replay = request.try_clone();
        let response = self.inner.send(request).await?;

        if response.status() != StatusCode::FORBIDDEN {
            return Ok(response);
        }

        let token = response
            .headers()
            .get(APPROVAL_HEADER)
            .filter(|token| !token.is_empty())
            .cloned();
        let Some(token) = token else {
            return Ok(response);
        };

        let mut retry = replay.ok_or(HttpError::NotReplayable)?;
        let signature = sign_one_time_token(&self.signer, token.as_bytes())?;

        debug!(url = %retry.url(), "Answering step-up challenge");

        let headers = retry.headers_mut();
        headers.insert(APPROVAL_HEADER, token);
        headers.insert(SIGNATURE_HEADER, HeaderValue::try_from(signature)?);

        self.inner.send(retry).await
    }
}
