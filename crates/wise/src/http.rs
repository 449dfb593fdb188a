//! HTTP seam used by the API client.
//!
//! Every outbound call goes through an [`HttpClient`], so transports can be
//! stacked as decorators:
//!
//! ```text
//! Client
//!     ↓
//! PersonalTokenSca (step-up signing, optional)
//!     ↓
//! UserAgent
//!     ↓
//! reqwest::Client
//! ```

use async_trait::async_trait;
use reqwest::header::{HeaderValue, InvalidHeaderValue, USER_AGENT};
use reqwest::{Request, Response};
use thiserror::Error;

use crate::sca::SigningError;

/// Errors raised while sending a request.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The underlying HTTP client failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Signing a step-up challenge failed; the request was not retried.
    #[error("failed to sign step-up challenge: {0}")]
    Signing(#[from] SigningError),

    /// A step-up challenge was received for a request whose body cannot be replayed.
    #[error("request cannot be replayed for step-up authentication")]
    NotReplayable,

    /// A computed header value was rejected.
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] InvalidHeaderValue),
}

/// Something that can send a request and return the response.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response, HttpError>;
}

#[async_trait]
impl HttpClient for reqwest::Client {
    async fn send(&self, request: Request) -> Result<Response, HttpError> {
        Ok(self.execute(request).await?)
    }
}

#[async_trait]
impl<T: HttpClient + ?Sized> HttpClient for std::sync::Arc<T> {
    async fn send(&self, request: Request) -> Result<Response, HttpError> {
        (**self).send(request).await
    }
}

/// Decorator that sets a fixed `user-agent` header on every request.
pub struct UserAgent<C> {
    inner: C,
    user_agent: HeaderValue,
}

impl<C: HttpClient> UserAgent<C> {
    pub fn new(inner: C, user_agent: HeaderValue) -> Self {
        Self { inner, user_agent }
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for UserAgent<C> {
    async fn send(&self, mut request: Request) -> Result<Response, HttpError> {
        request
            .headers_mut()
            .insert(USER_AGENT, self.user_agent.clone());
        self.inner.send(request).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted delegate for transport tests.

    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Returns canned responses in order and records every request it sees.
    pub struct ScriptedClient {
        responses: Mutex<VecDeque<http::Response<Vec<u8>>>>,
        pub seen: Mutex<Vec<Request>>,
    }

    impl ScriptedClient {
        pub fn new(responses: Vec<http::Response<Vec<u8>>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                seen: Mutex::new(Vec::new()),
            }
        }

        pub fn requests(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl HttpClient for ScriptedClient {
        async fn send(&self, request: Request) -> Result<Response, HttpError> {
            self.seen.lock().unwrap().push(request);
            let response = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("no scripted response left");
            Ok(Response::from(response))
        }
    }

    pub fn response(status: u16) -> http::response::Builder {
        http::Response::builder().status(status)
    }

    pub fn get(url: &str) -> Request {
        Request::new(reqwest::Method::GET, url.parse().unwrap())
    }
}
