//! Google device-login flow against a mock auth endpoint.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Form, State};
use axum::routing::post;
use secrecy::SecretString;

use pogo_client::auth::AuthProvider;
use pogo_client::auth::google::GoogleAuth;
use pogo_client::error::AuthError;

mod support;

use support::serve;

#[derive(Default)]
struct AndroidMock {
    forms: Mutex<Vec<HashMap<String, String>>>,
}

async fn auth_handler(
    State(mock): State<Arc<AndroidMock>>,
    Form(form): Form<HashMap<String, String>>,
) -> String {
    let service = form.get("service").cloned().unwrap_or_default();
    let password = form.get("Passwd").cloned();
    let refresh = form.get("EncryptedPasswd").cloned();
    mock.forms.lock().expect("not poisoned").push(form);
    if service == "ac2dm" {
        // master login
        if password.as_deref() == Some("good") {
            "SID=sid\nToken=refresh-123\nEmail=trainer@example.com\n".to_owned()
        } else {
            "Error=BadAuthentication\n".to_owned()
        }
    } else if refresh.as_deref() == Some("refresh-123") {
        "Auth=access-456\nExpiry=1999999999\n".to_owned()
    } else {
        "Error=BadAuthentication\n".to_owned()
    }
}

async fn start(mock: Arc<AndroidMock>) -> String {
    let router = Router::new()
        .route("/auth", post(auth_handler))
        .with_state(mock);
    let addr = serve(router).await;
    format!("http://{addr}")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn master_login_then_oauth_exchange() {
    let mock = Arc::new(AndroidMock::default());
    let base = start(Arc::clone(&mock)).await;
    let auth = GoogleAuth::new().with_auth_base(&base);

    auth.user_login("trainer@example.com", "good")
        .await
        .expect("logs in");
    let token = auth.access_token(false).await.expect("token cached");
    assert_eq!(token, "access-456");

    let forms = mock.forms.lock().expect("not poisoned");
    assert_eq!(forms.len(), 2);
    assert_eq!(forms[0].get("service").map(String::as_str), Some("ac2dm"));
    assert_eq!(
        forms[0].get("Email").map(String::as_str),
        Some("trainer@example.com")
    );
    // the oauth exchange carries the fixed device constants
    assert_eq!(
        forms[1].get("app").map(String::as_str),
        Some("com.nianticlabs.pokemongo")
    );
    assert_eq!(
        forms[1].get("androidId").map(String::as_str),
        Some("9774d56d682e549c")
    );
    assert_eq!(
        forms[1].get("EncryptedPasswd").map(String::as_str),
        Some("refresh-123")
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn provided_refresh_token_skips_master_login() {
    let mock = Arc::new(AndroidMock::default());
    let base = start(Arc::clone(&mock)).await;
    let auth = GoogleAuth::new().with_auth_base(&base);
    auth.set_refresh_token(
        "trainer@example.com",
        SecretString::from("refresh-123".to_owned()),
    );

    let token = auth.access_token(false).await.expect("exchanges");
    assert_eq!(token, "access-456");
    assert_eq!(mock.forms.lock().expect("not poisoned").len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bad_credentials_are_rejected() {
    let mock = Arc::new(AndroidMock::default());
    let base = start(Arc::clone(&mock)).await;
    let auth = GoogleAuth::new().with_auth_base(&base);
    let result = auth.user_login("trainer@example.com", "wrong").await;
    assert!(matches!(result, Err(AuthError::Auth(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn token_request_without_login_fails() {
    let auth = GoogleAuth::new();
    let result = auth.access_token(false).await;
    assert!(matches!(
        result,
        Err(AuthError::InvalidCredentials | AuthError::Auth(_))
    ));
}
