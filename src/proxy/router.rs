use crate::config::ServerParams;
use crate::config::gui_config::{self, GuiConfigContext, JUJU_VERSION, LEGACY_JUJU_VERSION};
use crate::proxy::address::AddressTemplate;
use crate::proxy::frontend::Frontend;
use crate::proxy::passthrough::{TlsPassthrough, Transport};
use crate::proxy::websocket::{Dialer, RemoteKind, WebSocketProxy};
use crate::utils::validation::split_host_port;
use anyhow::{Result, anyhow};
use hyper::body::Bytes;
use hyper::{Body, Request, Response, header};
use log::debug;
use std::net::IpAddr;
use std::sync::Arc;

pub const CONTROLLER_PREFIX: &str = "/controller/";
pub const MODEL_PREFIX: &str = "/model/";
pub const JUJU_CORE_PREFIX: &str = "/juju-core/";
pub const CONFIG_PATH: &str = "/config.js";

#[derive(Clone)]
pub enum RouteHandler {
    WebSocket(Arc<WebSocketProxy>),
    Passthrough(Arc<TlsPassthrough>),
    /// Pre-rendered GUI configuration script.
    Config(Bytes),
}

/// Binds a path to a handler. A prefix ending in '/' matches every path
/// below it; anything else only matches exactly.
#[derive(Clone)]
pub struct ProxyRoute {
    pub prefix: String,
    pub handler: RouteHandler,
}

impl ProxyRoute {
    pub fn new(prefix: impl Into<String>, handler: RouteHandler) -> Self {
        Self { prefix: prefix.into(), handler }
    }

    fn matches(&self, path: &str) -> bool {
        if self.prefix.ends_with('/') { path.starts_with(self.prefix.as_str()) } else { path == self.prefix }
    }
}

/// Static dispatch table built once at startup.
pub struct Router {
    routes: Vec<ProxyRoute>,
    fallback: Frontend,
}

impl Router {
    pub fn new(routes: Vec<ProxyRoute>, fallback: Frontend) -> Self {
        Self { routes, fallback }
    }

    /// Build the routes serving the GUI: WebSocket proxies for the
    /// controller and the model, the HTTPS pass-through, and config.js.
    pub fn from_params(params: &ServerParams, dialer: Arc<dyn Dialer>, transport: Arc<dyn Transport>) -> Result<Self> {
        let (server, port) = split_host_port(&params.controller_addr).map_err(|e| anyhow!("Invalid controller address: {e}"))?;
        let mut routes = Vec::new();

        let controller_template = if params.legacy_juju {
            String::new()
        } else {
            let template = AddressTemplate::new("?controller=$server:$port", "wss://$server:$port/api")?
                .with_default("server", server)
                .with_default("port", port);
            let advertised = format!("{CONTROLLER_PREFIX}{}", template.source());
            let proxy = WebSocketProxy::new(RemoteKind::Controller, template, dialer.clone(), params.no_color);
            routes.push(ProxyRoute::new(CONTROLLER_PREFIX, RouteHandler::WebSocket(Arc::new(proxy))));
            advertised
        };

        let model = if params.legacy_juju {
            AddressTemplate::new("?model=$server:$port", "wss://$server:$port/")?
        } else {
            AddressTemplate::new("?model=$server:$port&uuid=$uuid", "wss://$server:$port/model/$uuid/api")?
        };
        let mut model = model.with_default("server", server).with_default("port", port);
        if !params.model_uuid.is_empty() {
            model = model.with_default("uuid", params.model_uuid.as_str());
        }
        let model_template = format!("{MODEL_PREFIX}{}", model.source());
        let proxy = WebSocketProxy::new(RemoteKind::Model, model, dialer, params.no_color);
        routes.push(ProxyRoute::new(MODEL_PREFIX, RouteHandler::WebSocket(Arc::new(proxy))));

        let passthrough = TlsPassthrough::new(JUJU_CORE_PREFIX, &params.controller_addr, transport)?;
        routes.push(ProxyRoute::new(JUJU_CORE_PREFIX, RouteHandler::Passthrough(Arc::new(passthrough))));

        let ctx = GuiConfigContext {
            address: params.controller_addr.clone(),
            juju_version: if params.legacy_juju { LEGACY_JUJU_VERSION } else { JUJU_VERSION },
            controller_template,
            model_template,
            uuid: params.model_uuid.clone(),
        };
        let script = gui_config::render(&ctx, params.environment, &params.gui_overrides)?;
        routes.push(ProxyRoute::new(CONFIG_PATH, RouteHandler::Config(Bytes::from(script))));

        Ok(Self::new(routes, Frontend::new(&params.gui_url)))
    }

    pub fn routes(&self) -> &[ProxyRoute] {
        &self.routes
    }

    /// Longest matching route for a path, if any.
    pub fn lookup(&self, path: &str) -> Option<&ProxyRoute> {
        self.routes.iter().filter(|r| r.matches(path)).max_by_key(|r| r.prefix.len())
    }

    pub async fn dispatch(&self, client_ip: IpAddr, req: Request<Body>) -> Result<Response<Body>> {
        let Some(route) = self.lookup(req.uri().path()) else {
            debug!("{} {} -> GUI", req.method(), req.uri());
            return self.fallback.handle(client_ip, req).await;
        };
        debug!("{} {} -> {}", req.method(), req.uri(), route.prefix);
        match &route.handler {
            RouteHandler::WebSocket(proxy) => proxy.clone().handle(req).await,
            RouteHandler::Passthrough(proxy) => proxy.handle(req).await,
            RouteHandler::Config(script) => {
                Ok(Response::builder().header(header::CONTENT_TYPE, "application/javascript").body(Body::from(script.clone()))?)
            }
        }
    }
}
