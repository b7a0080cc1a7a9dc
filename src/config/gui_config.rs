use crate::config::environments::{Environment, PRODUCTION_BASE_URL, service_urls};
use crate::config::overrides::{ConfigLayer, ConfigMap, MergeMode, merge_layers};
use serde_json::json;

/// Model uuid handed to the GUI when it runs disconnected.
pub const DISCONNECTED_UUID: &str = "disconnected";

pub const JUJU_VERSION: &str = "2.0.1";
pub const LEGACY_JUJU_VERSION: &str = "1.25.7";

const PREFIX: &str = "var juju_config = ";
const SUFFIX: &str = ";";

/// Values the generated configuration depends on.
#[derive(Debug, Clone)]
pub struct GuiConfigContext {
    pub address: String,
    pub juju_version: &'static str,
    pub controller_template: String,
    pub model_template: String,
    pub uuid: String,
}

fn defaults(ctx: &GuiConfigContext) -> ConfigMap {
    let mut map = ConfigMap::new();
    for (key, value) in [
        ("jujuCoreVersion", json!(ctx.juju_version)),
        ("apiAddress", json!(ctx.address)),
        ("controllerSocketTemplate", json!(ctx.controller_template)),
        ("socketTemplate", json!(ctx.model_template)),
        ("baseUrl", json!("/")),
        ("jujuEnvUUID", json!(ctx.uuid)),
        ("gisf", json!(ctx.uuid == DISCONNECTED_UUID)),
        ("socket_protocol", json!("ws")),
        ("interactiveLogin", json!(true)),
        ("html5", json!(true)),
        ("container", json!("#main")),
        ("viewContainer", json!("#main")),
        ("consoleEnabled", json!(true)),
        ("serverRouting", json!(false)),
    ] {
        map.insert(key.to_string(), value);
    }
    map
}

/// Merge the built-in defaults, production service URLs, the selected
/// environment and the user overrides, in that order of precedence.
pub fn merged(ctx: &GuiConfigContext, environment: Option<&Environment>, user: &ConfigMap) -> ConfigMap {
    let mut layers = vec![
        ConfigLayer::new("defaults", MergeMode::Overwrite, defaults(ctx)),
        ConfigLayer::new("production", MergeMode::FillMissing, service_urls(PRODUCTION_BASE_URL)),
    ];
    if let Some(env) = environment {
        layers.push(ConfigLayer::new("environment", MergeMode::Overwrite, env.overrides()));
    }
    layers.push(ConfigLayer::new("user", MergeMode::Overwrite, user.clone()));
    merge_layers(&layers)
}

/// Render the JavaScript configuration file served to the GUI.
pub fn render(ctx: &GuiConfigContext, environment: Option<&Environment>, user: &ConfigMap) -> serde_json::Result<String> {
    let body = serde_json::to_string_pretty(&merged(ctx, environment, user))?;
    Ok(format!("{PREFIX}{body}{SUFFIX}"))
}
