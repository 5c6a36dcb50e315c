#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use aiagent_client::{ApiClient, ClientConfig, TokenStore};
use anyhow::Result;
use axum::http::{HeaderMap, Method, Uri, header};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::sync::oneshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Recorder {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl Recorder {
    pub async fn record(&self, method: &Method, uri: &Uri, headers: &HeaderMap) {
        let header_value = |name: header::HeaderName| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };
        self.requests.lock().await.push(RecordedRequest {
            method: method.clone(),
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
            authorization: header_value(header::AUTHORIZATION),
            content_type: header_value(header::CONTENT_TYPE),
        });
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn find(&self, path: &str) -> Option<RecordedRequest> {
        self.requests
            .lock()
            .await
            .iter()
            .find(|request| request.path == path)
            .cloned()
    }
}

pub async fn spawn_http_server(app: axum::Router) -> Result<(SocketAddr, oneshot::Sender<()>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });
        let _ = server.await;
    });
    Ok((addr, shutdown_tx))
}

pub fn client_for(addr: SocketAddr, tokens: TokenStore) -> Result<ApiClient> {
    let config = ClientConfig::new(format!("http://{addr}")).with_timeout_ms(5_000);
    Ok(ApiClient::new(&config, tokens)?)
}
