use crate::proxy::router::Router;
use anyhow::Result;
use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, StatusCode};
use log::{error, info};
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

/// Bind the listener and return its local address together with the
/// future driving it. Every connection is served on its own task.
pub fn bind(addr: SocketAddr, router: Arc<Router>) -> Result<(SocketAddr, impl Future<Output = Result<()>>)> {
    let make_svc = make_service_fn(move |conn: &AddrStream| {
        let client_ip = conn.remote_addr().ip();
        let router = router.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                let router = router.clone();
                async move {
                    match router.dispatch(client_ip, req).await {
                        Ok(resp) => Ok::<_, Infallible>(resp),
                        Err(e) => {
                            error!("handle_request error from {}: {}", client_ip, e);
                            let mut resp = Response::new(Body::empty());
                            *resp.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                            Ok::<_, Infallible>(resp)
                        }
                    }
                }
            }))
        }
    });

    let server = hyper::Server::try_bind(&addr)?.serve(make_svc);
    let local_addr = server.local_addr();
    Ok((local_addr, async move { server.await.map_err(anyhow::Error::from) }))
}

/// Serve until the listener fails. A bind failure is returned immediately.
pub async fn serve(addr: SocketAddr, router: Arc<Router>) -> Result<()> {
    let (local_addr, server) = bind(addr, router)?;
    info!("GUI proxy listening on {}", local_addr);
    server.await
}
