use crate::config::environments::Environment;
use crate::config::overrides::ConfigMap;
use hyper::Uri;

pub const DEFAULT_PORT: u16 = 8042;
pub const DEFAULT_GUI_ADDR: &str = "http://localhost:6543";

/// Everything the proxy server needs, fixed for the process lifetime.
#[derive(Debug, Clone)]
pub struct ServerParams {
    /// Address (`host:port`) of the remote Juju controller.
    pub controller_addr: String,
    /// Unique identifier of the target model; may be empty.
    pub model_uuid: String,
    /// Origin sent when dialing remote WebSocket endpoints.
    pub origin_addr: String,
    /// Port the proxy listens on.
    pub port: u16,
    /// Where the GUI sandbox is listening.
    pub gui_url: Uri,
    /// Selected pre-defined environment, if any.
    pub environment: Option<&'static Environment>,
    /// User supplied GUI configuration overrides.
    pub gui_overrides: ConfigMap,
    /// Whether the remote is a Juju 1 model.
    pub legacy_juju: bool,
    pub no_color: bool,
}

impl ServerParams {
    pub fn new(controller_addr: impl Into<String>, gui_url: Uri) -> Self {
        Self {
            controller_addr: controller_addr.into(),
            model_uuid: String::new(),
            origin_addr: format!("http://0.0.0.0:{DEFAULT_PORT}"),
            port: DEFAULT_PORT,
            gui_url,
            environment: None,
            gui_overrides: ConfigMap::new(),
            legacy_juju: false,
            no_color: false,
        }
    }

    pub fn has_custom_config(&self) -> bool {
        !self.gui_overrides.is_empty()
    }
}
