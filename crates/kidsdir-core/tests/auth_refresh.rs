mod common;

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde_json::{json, Value};

use kidsdir_core::api::{ApiClient, ApiError, ApiMode, Resource};
use kidsdir_core::auth::{
    AuthError, AuthManager, MemoryTokenStore, OAuthClient, OAuthConfig, Role, TokenSet,
    TokenStore,
};

use common::{fake_jwt, spawn, Hits};

#[derive(Clone, Default)]
struct Backend {
    token_calls: Hits,
    api_calls: Hits,
}

async fn token_endpoint(
    State(backend): State<Backend>,
    Form(form): Form<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    backend.token_calls.bump();
    assert_eq!(form.get("client_id").map(String::as_str), Some("client-1"));

    let grant = form.get("grant_type").map(String::as_str);
    let ok = match grant {
        Some("refresh_token") => form.get("refresh_token").map(String::as_str) == Some("good"),
        Some("authorization_code") => {
            form.get("code").map(String::as_str) == Some("the-code")
                && form.get("code_verifier").map(|v| v.len()) == Some(64)
        }
        _ => false,
    };
    if !ok {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_grant", "error_description": "Refresh Token has expired"})),
        );
    }

    let id_token = fake_jwt(&json!({
        "sub": "user-1",
        "email": "parent@example.com",
        "cognito:groups": ["admin"],
    }));
    let mut body = json!({"access_token": "fresh-access", "id_token": id_token, "expires_in": 3600});
    if grant == Some("authorization_code") {
        body["refresh_token"] = json!("good");
    }
    (StatusCode::OK, Json(body))
}

async fn whoami(State(backend): State<Backend>, headers: HeaderMap) -> Json<Value> {
    backend.api_calls.bump();
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    Json(json!({"id": "o1", "authorization": auth}))
}

async fn setup(tokens: Option<TokenSet>) -> (Backend, ApiClient, Arc<AuthManager>, Arc<MemoryTokenStore>) {
    let backend = Backend::default();
    let router = Router::new()
        .route("/oauth2/token", post(token_endpoint))
        .route("/v1/admin/organizations/:id", get(whoami))
        .with_state(backend.clone());
    let base = spawn(router).await;

    let store = Arc::new(match tokens {
        Some(tokens) => MemoryTokenStore::with_tokens(tokens),
        None => MemoryTokenStore::new(),
    });
    let oauth = OAuthClient::new(OAuthConfig::new(&base, "client-1", "http://localhost/cb"))
        .expect("oauth client");
    let auth = Arc::new(AuthManager::new(oauth, store.clone()));
    let api = ApiClient::new(&base).expect("api client").with_auth(auth.clone());
    (backend, api, auth, store)
}

fn expiring(refresh_token: &str, expires_in: i64) -> TokenSet {
    TokenSet::new(
        "old-access".to_string(),
        None,
        Some(refresh_token.to_string()),
        expires_in,
    )
}

#[tokio::test]
async fn test_token_expiring_soon_is_refreshed_before_request() {
    let (backend, api, _auth, store) = setup(Some(expiring("good", 30))).await;

    let org: Value = api
        .get(ApiMode::Admin, Resource::Organizations, "o1")
        .await
        .expect("get");
    assert_eq!(org["authorization"], "Bearer fresh-access");
    assert_eq!(backend.token_calls.count(), 1);

    let stored = store.load().expect("load").expect("tokens kept");
    assert_eq!(stored.access_token, "fresh-access");
    // Refresh responses do not rotate the refresh token
    assert_eq!(stored.refresh_token.as_deref(), Some("good"));
}

#[tokio::test]
async fn test_valid_token_is_not_refreshed() {
    let (backend, api, _auth, _store) = setup(Some(expiring("good", 3600))).await;

    let org: Value = api
        .get(ApiMode::Admin, Resource::Organizations, "o1")
        .await
        .expect("get");
    assert_eq!(org["authorization"], "Bearer old-access");
    assert_eq!(backend.token_calls.count(), 0);
}

#[tokio::test]
async fn test_rejected_refresh_clears_session() {
    let (backend, api, auth, store) = setup(Some(expiring("revoked", 30))).await;

    let err = api
        .get::<Value>(ApiMode::Admin, Resource::Organizations, "o1")
        .await
        .expect_err("refresh rejected");
    assert!(matches!(err, ApiError::Auth(AuthError::ReauthenticationRequired)));
    assert!(err.requires_login());
    assert_eq!(backend.api_calls.count(), 0);
    assert!(!auth.is_authenticated().await);
    assert!(store.load().expect("load").is_none());
}

#[tokio::test]
async fn test_concurrent_requests_share_one_refresh() {
    let (backend, api, _auth, _store) = setup(Some(expiring("good", 10))).await;

    let (a, b, c) = tokio::join!(
        api.get::<Value>(ApiMode::Admin, Resource::Organizations, "o1"),
        api.get::<Value>(ApiMode::Admin, Resource::Organizations, "o2"),
        api.get::<Value>(ApiMode::Admin, Resource::Organizations, "o3"),
    );
    for result in [a, b, c] {
        assert_eq!(result.expect("get")["authorization"], "Bearer fresh-access");
    }
    assert_eq!(backend.token_calls.count(), 1);
    assert_eq!(backend.api_calls.count(), 3);
}

#[tokio::test]
async fn test_login_with_code_and_claims() {
    let (backend, _api, auth, store) = setup(None).await;
    assert!(!auth.is_authenticated().await);

    let (url, pkce) = auth.begin_login().expect("begin");
    let query: HashMap<String, String> = url.query_pairs().into_owned().collect();
    assert_eq!(query.get("code_challenge"), Some(&pkce.challenge));
    assert_eq!(query.get("state"), Some(&pkce.state));

    let err = auth
        .login_with_code("the-code", &pkce, "forged")
        .await
        .expect_err("state mismatch");
    assert!(matches!(err, AuthError::StateMismatch));
    assert_eq!(backend.token_calls.count(), 0);

    auth.login_with_code("the-code", &pkce, &pkce.state)
        .await
        .expect("login");
    assert!(auth.is_authenticated().await);
    assert!(store.load().expect("load").is_some());

    let claims = auth.claims().await.expect("claims").expect("id token");
    assert_eq!(claims.sub, "user-1");
    assert_eq!(claims.role(), Role::Admin);
    assert_eq!(claims.role().default_mode(), ApiMode::Admin);
}

#[tokio::test]
async fn test_bad_code_is_a_token_endpoint_error() {
    let (_backend, _api, auth, _store) = setup(None).await;
    let (_url, pkce) = auth.begin_login().expect("begin");

    let err = auth
        .login_with_code("wrong-code", &pkce, &pkce.state)
        .await
        .expect_err("bad code");
    match err {
        AuthError::TokenEndpoint { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "invalid_grant: Refresh Token has expired");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(!auth.is_authenticated().await);
}
