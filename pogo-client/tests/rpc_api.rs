//! End-to-end engine scenarios against in-process mock endpoints.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::routing::post;
use prost::Message;

use pogo_client::auth::AuthProvider;
use pogo_client::{Client, Error, RequestType, ResponseMessage};
use pogo_types::envelopes::{
    AuthTicket, RequestEnvelope, ResponseEnvelope, SendEncryptedSignatureRequest,
};
use pogo_types::responses::GetPlayerResponse;
use pogo_types::signal::SignalLog;

mod support;

use support::{NoopEncryptor, StaticAuth, serve};

#[derive(Default)]
struct RpcMock {
    hits: AtomicUsize,
    bodies: Mutex<Vec<Vec<u8>>>,
    script: Mutex<VecDeque<Vec<u8>>>,
}

impl RpcMock {
    fn scripted(responses: Vec<Vec<u8>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(responses.into()),
            ..Default::default()
        })
    }

    fn body(&self, index: usize) -> Vec<u8> {
        self.bodies.lock().expect("not poisoned")[index].clone()
    }
}

async fn rpc_handler(State(mock): State<Arc<RpcMock>>, body: Bytes) -> Vec<u8> {
    mock.hits.fetch_add(1, Ordering::SeqCst);
    mock.bodies.lock().expect("not poisoned").push(body.to_vec());
    let mut script = mock.script.lock().expect("not poisoned");
    if script.len() > 1 {
        script.pop_front().expect("non-empty")
    } else {
        script.front().cloned().unwrap_or_default()
    }
}

async fn start_rpc(mock: Arc<RpcMock>) -> String {
    let router = Router::new()
        .route("/rpc", post(rpc_handler))
        .route("/rpc2", post(rpc_handler))
        .with_state(mock);
    let addr = serve(router).await;
    format!("http://{addr}/rpc")
}

async fn start_hash(hits: Arc<AtomicUsize>) -> String {
    let router = Router::new()
        .route(
            "/hash",
            post(|State(hits): State<Arc<AtomicUsize>>| async move {
                hits.fetch_add(1, Ordering::SeqCst);
                support::hash_ok_response()
            }),
        )
        .with_state(hits);
    let addr = serve(router).await;
    format!("http://{addr}/hash")
}

fn ok_envelope(returns: Vec<Vec<u8>>) -> Vec<u8> {
    ResponseEnvelope {
        status_code: 1,
        request_id: 7,
        returns,
        ..Default::default()
    }
    .encode_to_vec()
}

fn status_envelope(status_code: i32) -> Vec<u8> {
    ResponseEnvelope {
        status_code,
        ..Default::default()
    }
    .encode_to_vec()
}

fn player_return() -> Vec<u8> {
    GetPlayerResponse {
        success: true,
        ..Default::default()
    }
    .encode_to_vec()
}

async fn build_client(
    rpc_endpoint: &str,
    hash_endpoint: &str,
    auth: Arc<StaticAuth>,
) -> Client {
    Client::builder()
        .auth(auth)
        .encryptor(Arc::new(NoopEncryptor))
        .hash_key("test-key")
        .hash_endpoint(hash_endpoint)
        .endpoint(rpc_endpoint)
        .build()
        .expect("builds")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn no_position_fails_without_traffic() {
    let rpc_mock = RpcMock::scripted(vec![ok_envelope(Vec::new())]);
    let hash_hits = Arc::new(AtomicUsize::new(0));
    let rpc_endpoint = start_rpc(Arc::clone(&rpc_mock)).await;
    let hash_endpoint = start_hash(Arc::clone(&hash_hits)).await;
    let client = build_client(&rpc_endpoint, &hash_endpoint, Arc::new(StaticAuth::new("ABC"))).await;

    let result = client.call(&[RequestType::GetPlayer.into()]).await;
    assert!(matches!(result, Err(Error::NoPlayerPosition)));
    assert_eq!(rpc_mock.hits.load(Ordering::SeqCst), 0);
    assert_eq!(hash_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn fresh_session_posts_auth_info_and_signature() {
    let rpc_mock = RpcMock::scripted(vec![ok_envelope(vec![player_return()])]);
    let hash_hits = Arc::new(AtomicUsize::new(0));
    let rpc_endpoint = start_rpc(Arc::clone(&rpc_mock)).await;
    let hash_endpoint = start_hash(Arc::clone(&hash_hits)).await;
    let client = build_client(&rpc_endpoint, &hash_endpoint, Arc::new(StaticAuth::new("ABC"))).await;
    client.set_position(47.5, 19.05, Some(100.0));

    let response = client
        .call(&[RequestType::GetPlayer.into()])
        .await
        .expect("call succeeds");
    assert!(matches!(
        response.responses.get("GetPlayer"),
        Some(ResponseMessage::GetPlayer(profile)) if profile.success
    ));
    assert_eq!(hash_hits.load(Ordering::SeqCst), 1);

    let posted = RequestEnvelope::decode(rpc_mock.body(0).as_slice()).expect("decodes");
    assert_eq!(posted.status_code, 2);
    assert_eq!(posted.latitude, 47.5);
    assert_eq!(posted.longitude, 19.05);
    assert!(posted.auth_ticket.is_none());
    let auth_info = posted.auth_info.expect("auth info present");
    assert_eq!(auth_info.provider, "ptc");
    let token = auth_info.token.expect("token present");
    assert_eq!(token.contents, "ABC");
    assert!([4, 19, 22, 26, 30, 44, 45, 50, 57, 58, 59].contains(&token.unknown2));

    // exactly one type-6 platform request, plus at most one type-8 probe
    let sixes: Vec<_> = posted
        .platform_requests
        .iter()
        .filter(|plat| plat.r#type == 6)
        .collect();
    assert_eq!(sixes.len(), 1);
    assert!(posted.platform_requests.len() <= 2);
    assert!(
        posted
            .platform_requests
            .iter()
            .all(|plat| plat.r#type == 6 || plat.r#type == 8)
    );

    // the identity cipher lets us check the signal that went out
    let signature =
        SendEncryptedSignatureRequest::decode(sixes[0].request_message.as_slice())
            .expect("decodes");
    let signal = SignalLog::decode(signature.encrypted_signature.as_slice()).expect("decodes");
    assert_eq!(signal.location_hash, 1);
    assert_eq!(signal.location_hash_by_token_seed, -2);
    assert_eq!(signal.request_hashes, vec![42]);
    assert!(signal.timestamp_ms_since_start > 0);
    let location = &signal.location_updates[0];
    assert_eq!(location.latitude, 47.5);
    assert_eq!(location.altitude, 100.0);
    assert_eq!(
        posted.ms_since_last_locationfix,
        signal.timestamp_ms_since_start - location.timestamp_ms
    );
    assert!(posted.ms_since_last_locationfix > 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn redirect_is_followed_once() {
    let rpc_mock = RpcMock::scripted(Vec::new());
    let hash_hits = Arc::new(AtomicUsize::new(0));
    let rpc_endpoint = start_rpc(Arc::clone(&rpc_mock)).await;
    let hash_endpoint = start_hash(Arc::clone(&hash_hits)).await;
    let redirect_target = rpc_endpoint.replace("/rpc", "/rpc2");
    {
        let mut script = rpc_mock.script.lock().expect("not poisoned");
        script.push_back(
            ResponseEnvelope {
                status_code: 53,
                api_url: redirect_target.clone(),
                ..Default::default()
            }
            .encode_to_vec(),
        );
        script.push_back(ok_envelope(vec![player_return()]));
    }
    let client = build_client(&rpc_endpoint, &hash_endpoint, Arc::new(StaticAuth::new("ABC"))).await;
    client.set_position(47.5, 19.05, None);

    let response = client
        .call(&[RequestType::GetPlayer.into()])
        .await
        .expect("call succeeds");
    assert_eq!(rpc_mock.hits.load(Ordering::SeqCst), 2);
    assert!(response.responses.contains_key("GetPlayer"));
    assert_eq!(client.endpoint(), redirect_target);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn token_expiry_triggers_exactly_one_refresh() {
    let rpc_mock = RpcMock::scripted(vec![
        status_envelope(102),
        ok_envelope(vec![player_return()]),
    ]);
    let hash_hits = Arc::new(AtomicUsize::new(0));
    let rpc_endpoint = start_rpc(Arc::clone(&rpc_mock)).await;
    let hash_endpoint = start_hash(Arc::clone(&hash_hits)).await;
    let auth = Arc::new(StaticAuth::new("ABC"));
    let client = build_client(&rpc_endpoint, &hash_endpoint, Arc::clone(&auth)).await;
    client.set_position(47.5, 19.05, None);

    client
        .call(&[RequestType::GetPlayer.into()])
        .await
        .expect("call succeeds");
    assert_eq!(auth.forced_refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(rpc_mock.hits.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn repeated_token_expiry_surfaces() {
    let rpc_mock = RpcMock::scripted(vec![status_envelope(102)]);
    let hash_hits = Arc::new(AtomicUsize::new(0));
    let rpc_endpoint = start_rpc(Arc::clone(&rpc_mock)).await;
    let hash_endpoint = start_hash(Arc::clone(&hash_hits)).await;
    let auth = Arc::new(StaticAuth::new("ABC"));
    let client = build_client(&rpc_endpoint, &hash_endpoint, Arc::clone(&auth)).await;
    client.set_position(47.5, 19.05, None);

    let result = client.call(&[RequestType::GetPlayer.into()]).await;
    assert!(matches!(result, Err(Error::AuthTokenExpired)));
    assert_eq!(auth.forced_refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(rpc_mock.hits.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn server_ticket_replaces_auth_info() {
    let ticket = AuthTicket {
        start: vec![1, 2, 3],
        end: vec![4, 5, 6],
        expire_timestamp_ms: now_ms() + 30 * 60 * 1000,
    };
    let rpc_mock = RpcMock::scripted(vec![
        ResponseEnvelope {
            status_code: 1,
            auth_ticket: Some(ticket.clone()),
            returns: vec![player_return()],
            ..Default::default()
        }
        .encode_to_vec(),
        ok_envelope(vec![player_return()]),
    ]);
    let hash_hits = Arc::new(AtomicUsize::new(0));
    let rpc_endpoint = start_rpc(Arc::clone(&rpc_mock)).await;
    let hash_endpoint = start_hash(Arc::clone(&hash_hits)).await;
    let auth = Arc::new(StaticAuth::new("ABC"));
    let client = build_client(&rpc_endpoint, &hash_endpoint, Arc::clone(&auth)).await;
    client.set_position(47.5, 19.05, None);

    client
        .call(&[RequestType::GetPlayer.into()])
        .await
        .expect("first call succeeds");
    assert!(auth.tickets().check_ticket());

    client
        .call(&[RequestType::GetHatchedEggs.into()])
        .await
        .expect("second call succeeds");
    let second = RequestEnvelope::decode(rpc_mock.body(1).as_slice()).expect("decodes");
    assert!(second.auth_info.is_none());
    assert_eq!(second.auth_ticket, Some(ticket));
    // only the first call consulted the provider
    assert_eq!(auth.token_requests.load(Ordering::SeqCst), 1);
}

fn now_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("epoch in the past")
        .as_millis() as u64
}
