use crate::logger::MessageLogger;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use hyper::client::HttpConnector;
use hyper::client::connect::Connect;
use hyper::http::uri::Authority;
use hyper::{Body, Client, Request, Response, StatusCode, Uri, header};
use hyper_tls::HttpsConnector;
use log::{debug, error};
use std::sync::Arc;

/// Headers that only make sense for a single hop.
const HOP_HEADERS: [header::HeaderName; 7] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Performs one HTTP round trip.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn round_trip(&self, req: Request<Body>) -> Result<Response<Body>>;
}

#[async_trait]
impl<C> Transport for Client<C, Body>
where
    C: Connect + Clone + Send + Sync + 'static,
{
    async fn round_trip(&self, req: Request<Body>) -> Result<Response<Body>> {
        Ok(self.request(req).await?)
    }
}

/// Reports method, URL and status of every completed round trip.
pub struct LoggingTransport<T> {
    inner: T,
    log: Arc<dyn MessageLogger>,
}

impl<T: Transport> LoggingTransport<T> {
    pub fn new(inner: T, log: Arc<dyn MessageLogger>) -> Self {
        Self { inner, log }
    }
}

#[async_trait]
impl<T: Transport> Transport for LoggingTransport<T> {
    async fn round_trip(&self, req: Request<Body>) -> Result<Response<Body>> {
        let line = format!("{} {}", req.method(), req.uri());
        let resp = self.inner.round_trip(req).await?;
        self.log.print(&format!("{line}: {}", resp.status()));
        Ok(resp)
    }
}

/// An HTTPS client that accepts any certificate.
pub fn insecure_https_client() -> Result<Client<HttpsConnector<HttpConnector>, Body>> {
    let tls = native_tls::TlsConnector::builder().danger_accept_invalid_certs(true).danger_accept_invalid_hostnames(true).build()?;
    let mut http = HttpConnector::new();
    http.enforce_http(false);
    let https = HttpsConnector::from((http, tokio_native_tls::TlsConnector::from(tls)));
    Ok(Client::builder().build::<_, Body>(https))
}

/// Forwards requests under a path prefix to a fixed HTTPS host.
pub struct TlsPassthrough {
    prefix: String,
    authority: Authority,
    transport: Arc<dyn Transport>,
}

impl TlsPassthrough {
    /// `host` is `name` or `name:port`; the default HTTPS port is dropped.
    pub fn new(prefix: impl Into<String>, host: &str, transport: Arc<dyn Transport>) -> Result<Self> {
        let host = host.strip_suffix(":443").unwrap_or(host);
        let authority = host.parse::<Authority>().map_err(|e| anyhow!("Invalid pass-through host {host:?}: {e}"))?;
        Ok(Self { prefix: prefix.into(), authority, transport })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Strip the route prefix and point the URI at the remote host.
    pub fn rewrite(&self, uri: &Uri) -> Result<Uri> {
        let rest = uri.path().strip_prefix(self.prefix.as_str()).ok_or_else(|| anyhow!("{} is not under {}", uri.path(), self.prefix))?;
        let mut path_and_query = format!("/{}", rest.trim_start_matches('/'));
        if let Some(query) = uri.query() {
            path_and_query.push('?');
            path_and_query.push_str(query);
        }
        Ok(Uri::builder().scheme("https").authority(self.authority.as_str()).path_and_query(path_and_query).build()?)
    }

    pub async fn handle(&self, req: Request<Body>) -> Result<Response<Body>> {
        let (mut parts, body) = req.into_parts();
        let requested = parts.uri.clone();
        parts.uri = self.rewrite(&parts.uri)?;
        for name in HOP_HEADERS.iter() {
            parts.headers.remove(name);
        }
        parts.headers.insert(header::HOST, header::HeaderValue::from_str(self.authority.as_str())?);
        debug!("HTTPS pass-through {requested} -> {uri}", uri = parts.uri);

        match self.transport.round_trip(Request::from_parts(parts, body)).await {
            Ok(resp) => Ok(resp),
            Err(e) => {
                error!("HTTPS pass-through error for {requested} -> {host}: {e:?}", host = self.authority);
                Ok(Response::builder()
                    .status(StatusCode::BAD_GATEWAY)
                    .header(header::CONTENT_TYPE, "text/plain")
                    .body(Body::from("Bad Gateway"))?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::testing::LogStorage;
    use std::sync::Mutex;

    /// Records requests and answers 200 with the request path.
    #[derive(Default)]
    struct RecordingTransport {
        requests: Mutex<Vec<(String, String, Option<String>)>>,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn round_trip(&self, req: Request<Body>) -> Result<Response<Body>> {
            let host = req.headers().get(header::HOST).and_then(|h| h.to_str().ok()).map(str::to_string);
            self.requests.lock().unwrap().push((req.method().to_string(), req.uri().to_string(), host));
            Ok(Response::new(Body::from(req.uri().path().to_string())))
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl Transport for FailingTransport {
        async fn round_trip(&self, _req: Request<Body>) -> Result<Response<Body>> {
            Err(anyhow!("connection refused"))
        }
    }

    #[test]
    fn test_rewrite_strips_prefix() {
        let proxy = TlsPassthrough::new("/juju-core/", "example.test:443", Arc::new(FailingTransport)).unwrap();
        let uri: Uri = "/juju-core/api/status?verbose=1".parse().unwrap();
        assert_eq!(proxy.rewrite(&uri).unwrap(), "https://example.test/api/status?verbose=1");
        let uri: Uri = "/juju-core/".parse().unwrap();
        assert_eq!(proxy.rewrite(&uri).unwrap(), "https://example.test/");
    }

    #[test]
    fn test_rewrite_keeps_custom_port() {
        let proxy = TlsPassthrough::new("/juju-core/", "10.0.0.1:17070", Arc::new(FailingTransport)).unwrap();
        let uri: Uri = "/juju-core/charms".parse().unwrap();
        assert_eq!(proxy.rewrite(&uri).unwrap(), "https://10.0.0.1:17070/charms");
    }

    #[test]
    fn test_rewrite_rejects_foreign_path() {
        let proxy = TlsPassthrough::new("/juju-core/", "example.test", Arc::new(FailingTransport)).unwrap();
        assert!(proxy.rewrite(&"/other".parse().unwrap()).is_err());
    }

    #[test]
    fn test_new_rejects_invalid_host() {
        assert!(TlsPassthrough::new("/juju-core/", "bad host", Arc::new(FailingTransport)).is_err());
    }

    #[tokio::test]
    async fn test_handle_forwards_rewritten_request() {
        let transport = Arc::new(RecordingTransport::default());
        let proxy = TlsPassthrough::new("/juju-core/", "example.test:443", transport.clone()).unwrap();
        let req = Request::builder()
            .uri("/juju-core/api/status")
            .header(header::HOST, "localhost:8042")
            .header(header::CONNECTION, "keep-alive")
            .body(Body::empty())
            .unwrap();

        let resp = proxy.handle(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = hyper::body::to_bytes(resp.into_body()).await.unwrap();
        assert_eq!(&body[..], b"/api/status");

        let requests = transport.requests.lock().unwrap();
        assert_eq!(
            *requests,
            vec![("GET".to_string(), "https://example.test/api/status".to_string(), Some("example.test".to_string()))]
        );
    }

    #[tokio::test]
    async fn test_handle_reports_bad_gateway() {
        let proxy = TlsPassthrough::new("/juju-core/", "example.test", Arc::new(FailingTransport)).unwrap();
        let req = Request::builder().uri("/juju-core/api").body(Body::empty()).unwrap();
        let resp = proxy.handle(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_logging_transport() {
        let storage = Arc::new(LogStorage::default());
        let transport = LoggingTransport::new(RecordingTransport::default(), storage.clone());
        let req = Request::builder().method("POST").uri("https://example.test/api/status").body(Body::empty()).unwrap();
        transport.round_trip(req).await.unwrap();
        assert_eq!(storage.messages(), vec!["POST https://example.test/api/status: 200 OK".to_string()]);

        let failing = LoggingTransport::new(FailingTransport, storage.clone());
        let req = Request::builder().uri("https://example.test/").body(Body::empty()).unwrap();
        assert!(failing.round_trip(req).await.is_err());
        assert_eq!(storage.messages().len(), 1);
    }

    #[test]
    fn test_insecure_https_client_builds() {
        assert!(insecure_https_client().is_ok());
    }
}
