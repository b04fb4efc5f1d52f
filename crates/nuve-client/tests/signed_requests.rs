//! End-to-end tests against a local MAuth-verifying server.
//!
//! The server parses the `Authorization` header with `nuve-mauth`, checks the
//! signature against its service table and echoes what it received:
//! 1. Valid requests get a JSON echo of method, path, service, actor and body
//! 2. Unknown services or bad signatures get a 401
//! 3. `/plain/...` paths reply with a non-JSON body
//!
//! A second, raw TCP server replays canned HTTP/1.1 responses byte for byte,
//! for status lines and bodies `axum` will not produce.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::Router;
use nuve_client::{Credentials, Error, NuveClient, ResponseBody};
use nuve_mauth::{verify_client_signature, MauthParams};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

struct ServerState {
    keys: HashMap<String, String>,
}

async fn handle(
    State(state): State<Arc<ServerState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let challenge = json!({"WWW-Authenticate": "MAuth realm=\"http://marte3.dit.upm.es\""});
    let unauthorized = (StatusCode::UNAUTHORIZED, challenge.to_string());

    let Some(header) = headers.get("authorization").and_then(|v| v.to_str().ok()) else {
        return unauthorized;
    };
    let Ok(params) = MauthParams::parse(header) else {
        return unauthorized;
    };
    let Some(key) = params.service_id().and_then(|s| state.keys.get(s)) else {
        return unauthorized;
    };
    if verify_client_signature(&params, key).is_err() {
        return unauthorized;
    }

    if uri.path().starts_with("/plain/") {
        return (StatusCode::OK, "not json".to_string());
    }

    let actor = params.actor();
    let echo = json!({
        "method": method.as_str(),
        "path": uri.path(),
        "service": params.service_id(),
        "username": actor.as_ref().map(|a| a.username.clone()),
        "role": actor.as_ref().map(|a| a.role.clone()),
        "content_type": headers.get("content-type").and_then(|v| v.to_str().ok()),
        "body": serde_json::from_str::<Value>(&body).ok(),
    });
    (StatusCode::OK, echo.to_string())
}

async fn start_server() -> SocketAddr {
    let state = Arc::new(ServerState {
        keys: HashMap::from([
            ("svc1".to_string(), "secret".to_string()),
            ("svc2".to_string(), "other-secret".to_string()),
        ]),
    });
    let app = Router::new().fallback(handle).with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Answer a single request with `response` verbatim, then close.
async fn start_raw_server(response: &'static [u8]) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        stream.write_all(response).await.unwrap();
        stream.shutdown().await.unwrap();
    });
    addr
}

fn client_for(addr: SocketAddr, service: &str, key: &str) -> NuveClient {
    NuveClient::new(service, key, addr.ip().to_string(), addr.port())
}

fn json_of(body: ResponseBody) -> Value {
    body.into_json().expect("expected a JSON body")
}

#[tokio::test(flavor = "multi_thread")]
async fn test_signed_get_is_accepted() {
    let addr = start_server().await;
    let client = client_for(addr, "svc1", "secret");

    let body = tokio::task::spawn_blocking(move || client.get_rooms(None))
        .await
        .unwrap()
        .unwrap();

    let echo = json_of(body);
    assert_eq!(echo["method"], "GET");
    assert_eq!(echo["path"], "/rooms/");
    assert_eq!(echo["service"], "svc1");
    assert_eq!(echo["content_type"], "application/json");
    assert!(echo["body"].is_null());
    assert!(echo["username"].is_null());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_create_room_body_reaches_server() {
    let addr = start_server().await;
    let client = client_for(addr, "svc1", "secret");

    let body = tokio::task::spawn_blocking(move || {
        client.create_room("room1", &json!({"p": true}), None)
    })
    .await
    .unwrap()
    .unwrap();

    let echo = json_of(body);
    assert_eq!(echo["method"], "POST");
    assert_eq!(echo["path"], "/rooms/");
    assert_eq!(echo["body"], json!({"name": "room1", "options": {"p": true}}));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_create_token_signature_includes_actor() {
    let addr = start_server().await;
    let client = client_for(addr, "svc1", "secret");

    let body = tokio::task::spawn_blocking(move || {
        client.create_token("r1", "alice", "presenter", None)
    })
    .await
    .unwrap()
    .unwrap();

    let echo = json_of(body);
    assert_eq!(echo["path"], "/rooms/r1/tokens");
    assert_eq!(echo["username"], "alice");
    assert_eq!(echo["role"], "presenter");
    assert_eq!(echo["body"], json!({}));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_wrong_key_is_unauthorized() {
    let addr = start_server().await;
    let client = client_for(addr, "svc1", "not-the-key");

    let err = tokio::task::spawn_blocking(move || client.get_services(None))
        .await
        .unwrap()
        .unwrap_err();

    assert!(err.is_unauthorized());
    match err {
        Error::Unauthorized { status, reason } => {
            assert_eq!(status, 401);
            assert_eq!(reason, "Unauthorized");
        }
        other => panic!("expected Unauthorized, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_credentials_override_per_call() {
    let addr = start_server().await;
    let client = client_for(addr, "svc1", "secret");
    let other = Credentials::new("svc2", "other-secret");

    let body = tokio::task::spawn_blocking(move || client.get_service("svc2", Some(&other)))
        .await
        .unwrap()
        .unwrap();

    let echo = json_of(body);
    assert_eq!(echo["service"], "svc2");
    assert_eq!(echo["path"], "/services/svc2");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_non_json_reply_is_returned_as_text() {
    let addr = start_server().await;
    let client = client_for(addr, "svc1", "secret");

    let body = tokio::task::spawn_blocking(move || {
        client.send(nuve_client::Method::GET, None, "/plain/hello", None, None)
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(body, ResponseBody::Text("not json".to_string()));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_calls_keep_signatures_intact() {
    let addr = start_server().await;
    let client = Arc::new(client_for(addr, "svc1", "secret"));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let client = Arc::clone(&client);
            tokio::task::spawn_blocking(move || {
                if i % 2 == 0 {
                    client.create_token(&format!("r{i}"), &format!("user{i}"), "viewer", None)
                } else {
                    client.get_users(&format!("r{i}"), None)
                }
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let echo = json_of(handle.await.unwrap().unwrap());
        if i % 2 == 0 {
            assert_eq!(echo["path"], format!("/rooms/r{i}/tokens"));
            assert_eq!(echo["username"], format!("user{i}"));
        } else {
            assert_eq!(echo["path"], format!("/rooms/r{i}/users/"));
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_connection_refused_is_transport_error() {
    // Bind then drop to get a port with nothing listening
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client_for(addr, "svc1", "secret");
    let err = tokio::task::spawn_blocking(move || client.get_rooms(None))
        .await
        .unwrap()
        .unwrap_err();

    assert!(matches!(err, Error::Http(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unauthorized_keeps_server_reason_phrase() {
    let addr = start_raw_server(
        b"HTTP/1.1 401 Bad Credentials\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
    )
    .await;
    let client = client_for(addr, "svc1", "secret");

    let err = tokio::task::spawn_blocking(move || client.get_rooms(None))
        .await
        .unwrap()
        .unwrap_err();

    match err {
        Error::Unauthorized { status, reason } => {
            assert_eq!(status, 401);
            assert_eq!(reason, "Bad Credentials");
        }
        other => panic!("expected Unauthorized, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_non_utf8_reply_is_returned_as_bytes() {
    let addr = start_raw_server(
        b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\nConnection: close\r\n\r\na\xff\xfeb",
    )
    .await;
    let client = client_for(addr, "svc1", "secret");

    let body = tokio::task::spawn_blocking(move || client.get_room("r1", None))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(body, ResponseBody::Bytes(vec![b'a', 0xff, 0xfe, b'b']));
}
