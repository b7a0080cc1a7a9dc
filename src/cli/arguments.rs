use crate::config::ServerParams;
use crate::config::environments::lookup;
use crate::config::overrides::parse_overrides;
use crate::config::types::{DEFAULT_GUI_ADDR, DEFAULT_PORT};
use crate::juju::{self, CommandRunner};
use crate::utils::validation::validate_port_range;
use anyhow::{Context, Result};
use clap::Parser;
use hyper::Uri;

fn parse_port(value: &str) -> Result<u16, String> {
    let port = value.parse::<u16>().map_err(|e| format!("Invalid port {value:?}: {e}"))?;
    validate_port_range(port)?;
    Ok(port)
}

#[derive(Parser, Debug, Clone)]
#[command(name = "guiproxy", about, author, version, long_about = None)]
pub struct GuiProxyArguments {
    #[arg(long = "port", default_value_t = DEFAULT_PORT, value_parser = parse_port, help = "GUI proxy server port")]
    pub port: u16,
    #[arg(long = "gui", default_value = DEFAULT_GUI_ADDR, help = "Address on which the GUI in sandbox mode is listening")]
    pub gui: String,
    #[arg(long = "controller", default_value = "", help = "Controller address (defaults to the address of the current controller)")]
    pub controller: String,
    #[arg(long = "uuid", default_value = "", help = "Model uuid (defaults to the uuid of the current model)")]
    pub uuid: String,
    #[arg(long = "config", default_value = "", help = "Override GUI configuration, e.g. 'gisf: true, charmstoreURL: \"https://1.2.3.4/cs\"'")]
    pub config: String,
    #[arg(long = "env", default_value = "production", help = "Pre-defined environment to use: production, staging, qa or none")]
    pub env: String,
    #[arg(long = "juju1", help = "Connect to a Juju 1 model")]
    pub juju1: bool,
    #[arg(long = "nocolor", help = "Do not use colors")]
    pub no_color: bool,
    #[arg(short = 'v', long = "verbose", help = "Enable verbose logging")]
    pub verbose: bool,
}

impl GuiProxyArguments {
    /// Turn the arguments into server parameters. The juju CLI is only
    /// consulted when neither the arguments nor the environment name a
    /// controller.
    pub async fn into_params(self, runner: &dyn CommandRunner) -> Result<ServerParams> {
        let gui = if self.gui.contains("://") { self.gui } else { format!("http://{}", self.gui) };
        let gui_url = gui.parse::<Uri>().with_context(|| format!("invalid GUI address {gui:?}"))?;

        let environment = lookup(&self.env)?;
        let gui_overrides = parse_overrides(&self.config)?;

        let controller = match (self.controller.as_str(), environment) {
            ("", Some(env)) => env.controller_addr,
            (controller, _) => controller,
        };
        let (controller_addr, model_uuid) = juju::info(runner, controller, &self.uuid).await?;

        let mut params = ServerParams::new(controller_addr, gui_url);
        params.model_uuid = model_uuid;
        params.origin_addr = format!("http://0.0.0.0:{}", self.port);
        params.port = self.port;
        params.environment = environment;
        params.gui_overrides = gui_overrides;
        params.legacy_juju = self.juju1;
        params.no_color = self.no_color;
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use async_trait::async_trait;

    struct NoJuju;

    #[async_trait]
    impl CommandRunner for NoJuju {
        async fn output(&self, program: &str, _args: &[&str]) -> Result<Vec<u8>> {
            bail!("{program} is not installed")
        }
    }

    fn args(extra: &[&str]) -> GuiProxyArguments {
        GuiProxyArguments::parse_from(std::iter::once("guiproxy").chain(extra.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let args = args(&[]);
        assert_eq!(args.port, 8042);
        assert_eq!(args.gui, "http://localhost:6543");
        assert_eq!(args.env, "production");
        assert!(!args.juju1 && !args.no_color && !args.verbose);
    }

    #[test]
    fn test_invalid_port() {
        assert!(GuiProxyArguments::try_parse_from(["guiproxy", "--port", "0"]).is_err());
        assert!(GuiProxyArguments::try_parse_from(["guiproxy", "--port", "70000"]).is_err());
    }

    #[tokio::test]
    async fn test_into_params_from_environment() {
        let params = args(&["--env", "qa", "--gui", "localhost:1234", "--port", "9000"]).into_params(&NoJuju).await.unwrap();
        assert_eq!(params.controller_addr, "jimm.jujugui.org:443");
        assert_eq!(params.model_uuid, "");
        assert_eq!(params.gui_url.scheme_str(), Some("http"));
        assert_eq!(params.gui_url.authority().map(|a| a.as_str()), Some("localhost:1234"));
        assert_eq!(params.origin_addr, "http://0.0.0.0:9000");
        assert_eq!(params.environment.map(|e| e.name), Some("qa"));
        assert!(!params.has_custom_config());
    }

    #[tokio::test]
    async fn test_into_params_explicit_controller() {
        let params = args(&["--env", "none", "--controller", "1.2.3.4:17070", "--uuid", "u-1", "--juju1", "--nocolor", "--config", "gisf: true"])
            .into_params(&NoJuju)
            .await
            .unwrap();
        assert_eq!(params.controller_addr, "1.2.3.4:17070");
        assert_eq!(params.model_uuid, "u-1");
        assert!(params.environment.is_none());
        assert!(params.legacy_juju && params.no_color);
        assert_eq!(params.gui_overrides["gisf"], true);
    }

    #[tokio::test]
    async fn test_into_params_errors() {
        assert!(args(&["--env", "moon"]).into_params(&NoJuju).await.unwrap_err().to_string().contains("invalid environment"));
        assert!(args(&["--config", "gisf"]).into_params(&NoJuju).await.is_err());
        let err = args(&["--env", "none"]).into_params(&NoJuju).await.unwrap_err();
        assert_eq!(err.to_string(), "cannot retrieve controller info: juju is not installed");
    }
}
