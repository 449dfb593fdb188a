//! HTTP-level tests for the API client and its transport chain.

use std::sync::{Arc, OnceLock};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{TimeZone, Utc};
use reqwest::header::HeaderValue;
use reqwest::Url;
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use sha2::{Digest, Sha256};
use wiremock::matchers::{header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wise::{
    Client, HttpClient, PersonalTokenSca, ProfileType, StatementRequest, StatementType,
    UserAgent, WiseApi, WiseError, APPROVAL_HEADER, SIGNATURE_HEADER,
};

fn test_key() -> RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap())
        .clone()
}

fn client(server: &MockServer, key: RsaPrivateKey) -> Client {
    let transport = UserAgent::new(
        reqwest::Client::new(),
        HeaderValue::from_static("wise-rs / test"),
    );
    let http: Arc<dyn HttpClient> = Arc::new(PersonalTokenSca::new(transport, key));
    Client::new(Url::parse(&server.uri()).unwrap(), http, "secret-token").unwrap()
}

fn statement_request() -> StatementRequest {
    StatementRequest {
        profile_id: 1,
        balance_id: 10,
        interval_start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        interval_end: Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap(),
        statement_type: StatementType::Compact,
    }
}

#[tokio::test]
async fn test_list_profiles() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/profiles"))
        .and(header("authorization", "Bearer secret-token"))
        .and(header("user-agent", "wise-rs / test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"id": 1, "type": "PERSONAL", "fullName": "Jane Doe"},
            {"id": 2, "type": "BUSINESS", "fullName": "Doe Ltd"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let profiles = client(&server, test_key()).list_profiles().await.unwrap();

    assert_eq!(profiles.len(), 2);
    assert_eq!(profiles[0].full_name, "Jane Doe");
    assert_eq!(profiles[0].profile_type, ProfileType::Personal);
    assert_eq!(profiles[1].profile_type, ProfileType::Business);
}

#[tokio::test]
async fn test_get_balances_requests_standard_balances() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3/profiles/42/balances"))
        .and(query_param("types", "STANDARD"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"id": 10, "currency": "EUR", "type": "STANDARD"},
            {"id": 11, "currency": "GBP", "type": "STANDARD"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let balances = client(&server, test_key()).get_balances(42).await.unwrap();

    let currencies: Vec<_> = balances.iter().map(|b| b.currency.as_str()).collect();
    assert_eq!(currencies, vec!["EUR", "GBP"]);
}

#[tokio::test]
async fn test_structured_error_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/profiles"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "timestamp": "2022-04-07T07:15:31.399+00:00",
            "status": 401,
            "error": "Unauthorized",
            "message": "Invalid token",
            "path": "/v2/profiles"
        })))
        .mount(&server)
        .await;

    let err = client(&server, test_key()).list_profiles().await.unwrap_err();

    assert_eq!(err.api_message(), Some("Invalid token"));
    assert_eq!(err.to_string(), "Invalid token");
}

#[tokio::test]
async fn test_unstructured_error_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3/profiles/1/balances"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = client(&server, test_key()).get_balances(1).await.unwrap_err();

    assert!(matches!(err, WiseError::UnexpectedStatus { .. }));
    assert!(err.to_string().contains("bad gateway"));
}

#[tokio::test]
async fn test_statement_without_challenge() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/profiles/1/balance-statements/10/statement.pdf"))
        .and(query_param("intervalStart", "2024-01-01T00:00:00.000Z"))
        .and(query_param("intervalEnd", "2024-01-31T23:59:59.000Z"))
        .and(query_param("type", "COMPACT"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let pdf = client(&server, test_key())
        .get_statement_pdf(&statement_request())
        .await
        .unwrap();

    assert_eq!(pdf, b"%PDF-1.4");
}

#[tokio::test]
async fn test_statement_behind_step_up_challenge() {
    let server = MockServer::start().await;
    let key = test_key();
    let statement_path = "/v1/profiles/1/balance-statements/10/statement.pdf";

    Mock::given(method("GET"))
        .and(path(statement_path))
        .and(header(APPROVAL_HEADER, "one-time-token"))
        .and(header_exists(SIGNATURE_HEADER))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4".to_vec()))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(statement_path))
        .respond_with(
            ResponseTemplate::new(403).insert_header(APPROVAL_HEADER, "one-time-token"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let pdf = client(&server, key.clone())
        .get_statement_pdf(&statement_request())
        .await
        .unwrap();
    assert_eq!(pdf, b"%PDF-1.4");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);

    let retry = &requests[1];
    assert_eq!(retry.url, requests[0].url);
    assert_eq!(retry.headers["authorization"], "Bearer secret-token");
    assert_eq!(retry.headers["user-agent"], "wise-rs / test");

    let signature = STANDARD
        .decode(retry.headers[SIGNATURE_HEADER].as_bytes())
        .unwrap();
    key.to_public_key()
        .verify(
            Pkcs1v15Sign::new::<Sha256>(),
            &Sha256::digest(b"one-time-token"),
            &signature,
        )
        .unwrap();
}

#[tokio::test]
async fn test_repeated_challenge_surfaces_as_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/profiles/1/balance-statements/10/statement.pdf"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header(APPROVAL_HEADER, "again")
                .set_body_json(serde_json::json!({
                    "status": 403,
                    "error": "Forbidden",
                    "message": "You are forbidden to send this request"
                })),
        )
        .expect(2)
        .mount(&server)
        .await;

    let err = client(&server, test_key())
        .get_statement_pdf(&statement_request())
        .await
        .unwrap_err();

    assert_eq!(
        err.api_message(),
        Some("You are forbidden to send this request")
    );
}
