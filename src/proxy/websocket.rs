use crate::logger::ApiLogger;
use crate::logger::color::log_colors;
use crate::proxy::address::AddressTemplate;
use crate::proxy::relay;
use anyhow::Result;
use async_trait::async_trait;
use hyper::upgrade::{self, Upgraded};
use hyper::{Body, Request, Response, StatusCode, Uri, header};
use log::{debug, error, info, warn};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::derive_accept_key;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::Role;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream};

/// Outbound connection to a remote WebSocket endpoint.
pub type RemoteSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Error)]
pub enum DialError {
    #[error("cannot create TLS config for {target}: {source}")]
    Tls { target: String, source: native_tls::Error },
    #[error("cannot dial {target}: {source}")]
    Connect { target: String, source: WsError },
}

/// Opens outbound WebSocket connections.
#[async_trait]
pub trait Dialer: Send + Sync {
    async fn dial(&self, target: &str) -> Result<RemoteSocket, DialError>;
}

/// Dials `ws://` and `wss://` targets without verifying TLS certificates.
/// Only suitable for development against sandboxed controllers.
pub struct InsecureDialer {
    origin: String,
}

impl InsecureDialer {
    pub fn new(origin: impl Into<String>) -> Self {
        Self { origin: origin.into() }
    }
}

#[async_trait]
impl Dialer for InsecureDialer {
    async fn dial(&self, target: &str) -> Result<RemoteSocket, DialError> {
        let connect_err = |source| DialError::Connect { target: target.to_string(), source };
        let mut request = target.into_client_request().map_err(connect_err)?;
        match HeaderValue::from_str(&self.origin) {
            Ok(origin) => {
                request.headers_mut().insert("Origin", origin);
            }
            Err(_) => warn!("Ignoring invalid origin {:?} for {}", self.origin, target),
        }
        let tls = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()
            .map_err(|source| DialError::Tls { target: target.to_string(), source })?;
        let (socket, response) = tokio_tungstenite::connect_async_tls_with_config(request, None, false, Some(Connector::NativeTls(tls)))
            .await
            .map_err(connect_err)?;
        debug!("WS upstream {target} responded with {status}", status = response.status());
        Ok(socket)
    }
}

/// Which logical remote a WebSocket route talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteKind {
    Controller,
    Model,
}

/// Check if the request is a WebSocket upgrade request
pub fn is_websocket(req: &Request<Body>) -> bool {
    let has_upgrade_ws =
        req.headers().get(header::UPGRADE).and_then(|v| v.to_str().ok()).map(|v| v.eq_ignore_ascii_case("websocket")).unwrap_or(false);
    let has_connection_upgrade =
        req.headers().get(header::CONNECTION).and_then(|v| v.to_str().ok()).map(|v| v.to_ascii_lowercase().contains("upgrade")).unwrap_or(false);
    has_upgrade_ws && has_connection_upgrade
}

/// Host and port of a target URL, used to label API log lines.
fn authority(target: &str) -> String {
    target.parse::<Uri>().ok().and_then(|u| u.authority().map(|a| a.to_string())).unwrap_or_else(|| target.to_string())
}

fn plain_response(status: StatusCode, body: impl Into<Body>) -> Result<Response<Body>> {
    Ok(Response::builder().status(status).header(header::CONTENT_TYPE, "text/plain").body(body.into())?)
}

/// Proxies GUI WebSocket sessions to the remote selected by an address
/// template.
pub struct WebSocketProxy {
    kind: RemoteKind,
    template: AddressTemplate,
    dialer: Arc<dyn Dialer>,
    no_color: bool,
}

impl WebSocketProxy {
    pub fn new(kind: RemoteKind, template: AddressTemplate, dialer: Arc<dyn Dialer>, no_color: bool) -> Self {
        Self { kind, template, dialer, no_color }
    }

    pub fn kind(&self) -> RemoteKind {
        self.kind
    }

    pub fn template(&self) -> &AddressTemplate {
        &self.template
    }

    /// Accept the upgrade and spawn the session. Bad handshakes and
    /// unresolvable addresses are rejected before anything is dialed.
    pub async fn handle(self: Arc<Self>, req: Request<Body>) -> Result<Response<Body>> {
        if !is_websocket(&req) {
            return plain_response(StatusCode::BAD_REQUEST, "Expected WebSocket upgrade");
        }
        let version_ok = req.headers().get(header::SEC_WEBSOCKET_VERSION).map(|v| v.as_bytes() == b"13").unwrap_or(false);
        let Some(key) = req.headers().get(header::SEC_WEBSOCKET_KEY).filter(|_| version_ok) else {
            warn!("Rejecting malformed WebSocket handshake for {}", req.uri());
            return plain_response(StatusCode::BAD_REQUEST, "Malformed WebSocket handshake");
        };
        let accept = derive_accept_key(key.as_bytes());

        let target = match self.template.resolve_uri(req.uri()) {
            Ok(target) => target,
            Err(e) => {
                warn!("Cannot resolve WebSocket target for {}: {}", req.uri(), e);
                return plain_response(StatusCode::BAD_REQUEST, format!("Cannot resolve WebSocket target: {e}"));
            }
        };

        let response = Response::builder()
            .status(StatusCode::SWITCHING_PROTOCOLS)
            .header(header::UPGRADE, "websocket")
            .header(header::CONNECTION, "Upgrade")
            .header(header::SEC_WEBSOCKET_ACCEPT, accept)
            .body(Body::empty())?;

        tokio::spawn(async move {
            match upgrade::on(req).await {
                Ok(upgraded) => self.run_session(upgraded, target).await,
                Err(e) => error!("WS client upgrade failed for {target}: {e}"),
            }
        });

        Ok(response)
    }

    async fn run_session(&self, upgraded: Upgraded, target: String) {
        let mut client = WebSocketStream::from_raw_socket(upgraded, Role::Server, None).await;

        info!("opening {target}");
        let mut remote = match self.dialer.dial(&target).await {
            Ok(remote) => remote,
            Err(e) => {
                let _ = client.close(None).await;
                error!("closed {target}: {e}");
                return;
            }
        };

        let addr = authority(&target);
        let (in_color, out_color) = log_colors(self.kind == RemoteKind::Model, self.no_color);
        let outgoing = ApiLogger::new().with_prefix(format!("--> {addr}")).with_color(out_color);
        let incoming = ApiLogger::new().with_prefix(format!("<-- {addr}")).with_color(in_color);

        let err = relay::relay(&mut client, &mut remote, &outgoing, &incoming).await;
        let _ = client.close(None).await;
        let _ = remote.close(None).await;
        info!("closed {target}: {err}");
    }
}
