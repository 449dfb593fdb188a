//! Wise API client.
//!
//! This crate provides:
//! - The data model for profiles, balances and statements
//! - An HTTP seam (`HttpClient`) with a user-agent decorator
//! - Strong customer authentication (SCA) for personal tokens
//! - An API client covering the statement download endpoints

pub mod client;
pub mod error;
pub mod http;
pub mod model;
pub mod sca;

pub use client::{Client, Environment, WiseApi, DEFAULT_USER_AGENT};
pub use error::{ApiError, WiseError};
pub use http::{HttpClient, HttpError, UserAgent};
pub use model::{
    Balance, BalanceAmount, BalanceId, Profile, ProfileId, ProfileType, StatementRequest,
    StatementType,
};
pub use sca::{ChallengeSigner, PersonalTokenSca, SigningError, APPROVAL_HEADER, SIGNATURE_HEADER};
