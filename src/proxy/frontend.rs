use anyhow::Result;
use hyper::{Body, Request, Response, StatusCode, Uri};
use log::error;
use std::net::IpAddr;

/// Forwards everything not claimed by a route to the GUI sandbox.
pub struct Frontend {
    base: String,
}

impl Frontend {
    pub fn new(gui_url: &Uri) -> Self {
        let base = gui_url.to_string();
        Self { base: base.trim_end_matches('/').to_string() }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub async fn handle(&self, client_ip: IpAddr, req: Request<Body>) -> Result<Response<Body>> {
        let path = req.uri().path().to_string();
        match hyper_reverse_proxy::call(client_ip, self.base.as_str(), req).await {
            Ok(response) => Ok(response),
            Err(err) => {
                error!("GUI proxy error for {path} -> {base}: {err:?}", base = self.base);
                Ok(Response::builder().status(StatusCode::BAD_GATEWAY).body(Body::from("Bad Gateway"))?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::service::{make_service_fn, service_fn};
    use std::convert::Infallible;
    use std::net::{Ipv4Addr, SocketAddr};

    async fn gui_server() -> SocketAddr {
        let make_svc = make_service_fn(|_| async {
            Ok::<_, Infallible>(service_fn(|req: Request<Body>| async move {
                let body = format!("gui {}", req.uri().path_and_query().map(|p| p.as_str()).unwrap_or("/"));
                Ok::<_, Infallible>(Response::new(Body::from(body)))
            }))
        });
        let server = hyper::Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0))).serve(make_svc);
        let addr = server.local_addr();
        tokio::spawn(server);
        addr
    }

    #[test]
    fn test_base_has_no_trailing_slash() {
        let gui: Uri = "http://localhost:6543".parse().unwrap();
        assert_eq!(Frontend::new(&gui).base(), "http://localhost:6543");
        let gui: Uri = "http://localhost:6543/".parse().unwrap();
        assert_eq!(Frontend::new(&gui).base(), "http://localhost:6543");
    }

    #[tokio::test]
    async fn test_forwards_to_gui() {
        let addr = gui_server().await;
        let frontend = Frontend::new(&format!("http://{addr}").parse().unwrap());
        let req = Request::builder().uri("/static/app.js?v=1").body(Body::empty()).unwrap();
        let resp = frontend.handle(IpAddr::V4(Ipv4Addr::LOCALHOST), req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = hyper::body::to_bytes(resp.into_body()).await.unwrap();
        assert_eq!(&body[..], b"gui /static/app.js?v=1");
    }

    #[tokio::test]
    async fn test_unreachable_gui_is_bad_gateway() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let frontend = Frontend::new(&format!("http://{addr}").parse().unwrap());
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let resp = frontend.handle(IpAddr::V4(Ipv4Addr::LOCALHOST), req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }
}
