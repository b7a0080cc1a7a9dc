use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use log::debug;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::net::TcpStream;

/// Timeout for TCP probes of controller endpoints.
pub const DIAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs external commands and returns their standard output.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn output(&self, program: &str, args: &[&str]) -> Result<Vec<u8>>;
}

/// Runs commands on the local system.
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn output(&self, program: &str, args: &[&str]) -> Result<Vec<u8>> {
        let output = tokio::process::Command::new(program).args(args).output().await?;
        if !output.status.success() {
            bail!("{program} exited with {}: {}", output.status, String::from_utf8_lossy(&output.stderr).trim());
        }
        Ok(output.stdout)
    }
}

#[derive(Debug, Deserialize)]
struct ControllerInfo {
    details: Option<ControllerDetails>,
    #[serde(default)]
    models: HashMap<String, ModelInfo>,
    #[serde(rename = "current-model", default)]
    current: String,
}

#[derive(Debug, Deserialize)]
struct ControllerDetails {
    #[serde(rename = "api-endpoints", default)]
    addrs: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ModelInfo {
    #[serde(default)]
    uuid: String,
}

/// Return the controller address and model uuid to proxy to. Values already
/// provided are kept; missing ones come from the current juju controller.
pub async fn info(runner: &dyn CommandRunner, controller_addr: &str, model_uuid: &str) -> Result<(String, String)> {
    if !controller_addr.is_empty() {
        return Ok((controller_addr.to_string(), model_uuid.to_string()));
    }

    let out = runner
        .output("juju", &["show-controller", "--format", "json"])
        .await
        .map_err(|e| anyhow!("cannot retrieve controller info: {e}"))?;
    let raw = String::from_utf8_lossy(&out);
    let infos: HashMap<String, ControllerInfo> = serde_json::from_slice(&out).map_err(|_| anyhow!("invalid controller info returned by juju: {raw:?}"))?;
    if infos.len() != 1 {
        bail!("invalid controller info returned by juju: {raw:?}");
    }
    let Some(info) = infos.into_values().next() else {
        bail!("invalid controller info returned by juju: {raw:?}");
    };

    let addrs = info.details.map(|d| d.addrs).unwrap_or_default();
    if addrs.is_empty() {
        bail!("no addresses found in controller info: {raw:?}");
    }
    let controller_addr = choose_address(&addrs, DIAL_TIMEOUT).await.map_err(|e| anyhow!("cannot connect to the Juju controller: {e}"))?;

    if !model_uuid.is_empty() {
        return Ok((controller_addr, model_uuid.to_string()));
    }
    let Some((_, model_name)) = info.current.split_once('/') else {
        bail!("invalid model name in controller info: {raw:?}");
    };
    match info.models.get(model_name) {
        Some(model) if !model.uuid.is_empty() => Ok((controller_addr, model.uuid.clone())),
        _ => bail!("no uuid found for model {model_name:?}: {raw:?}"),
    }
}

/// Return the first address accepting TCP connections. All addresses are
/// probed at once.
pub async fn choose_address(addrs: &[String], timeout: Duration) -> Result<String> {
    let mut probes: FuturesUnordered<_> = addrs
        .iter()
        .map(|addr| async move {
            match tokio::time::timeout(timeout, TcpStream::connect(addr.as_str())).await {
                Ok(Ok(_conn)) => Ok(addr.clone()),
                Ok(Err(e)) => Err(format!("dial {addr}: {e}")),
                Err(_) => Err(format!("dial {addr}: timed out")),
            }
        })
        .collect();

    let mut errs = Vec::with_capacity(addrs.len());
    while let Some(probe) = probes.next().await {
        match probe {
            Ok(addr) => {
                debug!("Controller endpoint {addr} is reachable");
                return Ok(addr);
            }
            Err(e) => errs.push(e),
        }
    }
    Err(anyhow!(errs.join("; ")))
}
