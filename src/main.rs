use anyhow::Result;
use clap::Parser;
use guiproxy::cli::GuiProxyArguments;
use guiproxy::juju::SystemRunner;
use guiproxy::logger::ApiLogger;
use guiproxy::proxy::passthrough::{LoggingTransport, insecure_https_client};
use guiproxy::proxy::websocket::InsecureDialer;
use guiproxy::proxy::{self, Router};
use log::{LevelFilter, error, info, trace};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let args = GuiProxyArguments::parse();
    pretty_env_logger::env_logger::builder()
        .format_timestamp(None)
        .filter_level(if args.verbose { LevelFilter::Trace } else { LevelFilter::Info })
        .init();

    info!("Starting guiproxy {}", env!("CARGO_PKG_VERSION"));
    trace!("Arguments: {:#?}", args);

    let params = args.into_params(&SystemRunner).await?;
    info!("configuration:");
    info!("  controller: {}", params.controller_addr);
    info!("  model uuid: {}", if params.model_uuid.is_empty() { "none" } else { params.model_uuid.as_str() });
    info!("  GUI sandbox: {}", params.gui_url);
    if let Some(env) = params.environment {
        info!("  environment: {}", env.name);
    }
    if params.has_custom_config() {
        info!("  GUI config overrides: {}", serde_json::to_string(&params.gui_overrides)?);
    }
    if params.legacy_juju {
        info!("  Juju 1 model");
    }

    let dialer = Arc::new(InsecureDialer::new(params.origin_addr.clone()));
    let transport = Arc::new(LoggingTransport::new(insecure_https_client()?, Arc::new(ApiLogger::new().with_prefix("juju-core"))));
    let router = Arc::new(Router::from_params(&params, dialer, transport)?);
    for route in router.routes() {
        trace!("Registered route {}", route.prefix);
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], params.port));
    info!("visit the GUI at http://localhost:{}/", params.port);
    tokio::select! {
        result = proxy::serve(addr, router) => {
            if let Err(e) = &result {
                error!("GUI proxy stopped: {e}");
            }
            result
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down guiproxy");
            Ok(())
        }
    }
}
