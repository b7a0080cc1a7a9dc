use crate::config::overrides::ConfigMap;
use serde_json::Value;
use thiserror::Error;

pub const PRODUCTION_BASE_URL: &str = "https://api.jujucharms.com";

/// A pre-defined place the GUI can run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Environment {
    pub name: &'static str,
    pub controller_addr: &'static str,
    pub base_url: &'static str,
}

pub static ENVIRONMENTS: [Environment; 3] = [
    Environment { name: "production", controller_addr: "jimm.jujucharms.com:443", base_url: PRODUCTION_BASE_URL },
    Environment { name: "staging", controller_addr: "jimm.staging.jujucharms.com:443", base_url: "https://api.staging.jujucharms.com" },
    Environment { name: "qa", controller_addr: "jimm.jujugui.org:443", base_url: "https://www.jujugui.org" },
];

#[derive(Debug, Error)]
#[error("invalid environment: {0:?}")]
pub struct UnknownEnvironment(pub String);

/// Find an environment by name. `none` and the empty string select no
/// environment at all.
pub fn lookup(name: &str) -> Result<Option<&'static Environment>, UnknownEnvironment> {
    if name.is_empty() || name == "none" {
        return Ok(None);
    }
    ENVIRONMENTS.iter().find(|env| env.name == name).map(Some).ok_or_else(|| UnknownEnvironment(name.to_string()))
}

impl Environment {
    pub fn overrides(&self) -> ConfigMap {
        service_urls(self.base_url)
    }
}

/// Service endpoints hanging off a base URL.
pub fn service_urls(base_url: &str) -> ConfigMap {
    let base = base_url.trim_end_matches('/');
    let mut urls = ConfigMap::new();
    for (key, path) in [
        ("bundleServiceURL", "bundleservice"),
        ("charmstoreURL", "charmstore"),
        ("identityURL", "identity"),
        ("plansURL", "plans"),
        ("termsURL", "terms"),
    ] {
        urls.insert(key.to_string(), Value::String(format!("{base}/{path}/")));
    }
    // Every hosted environment runs the GUI as a service.
    urls.insert("gisf".to_string(), Value::Bool(true));
    urls
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("staging").unwrap().unwrap().controller_addr, "jimm.staging.jujucharms.com:443");
        assert!(lookup("none").unwrap().is_none());
        assert!(lookup("").unwrap().is_none());
        assert_eq!(lookup("moon").unwrap_err().to_string(), "invalid environment: \"moon\"");
    }

    #[test]
    fn test_service_urls() {
        assert_eq!(
            Value::Object(service_urls("https://www.jujugui.org/")),
            json!({
                "bundleServiceURL": "https://www.jujugui.org/bundleservice/",
                "charmstoreURL": "https://www.jujugui.org/charmstore/",
                "identityURL": "https://www.jujugui.org/identity/",
                "plansURL": "https://www.jujugui.org/plans/",
                "termsURL": "https://www.jujugui.org/terms/",
                "gisf": true,
            })
        );
    }
}
