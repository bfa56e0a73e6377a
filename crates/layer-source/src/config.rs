//! Layer source configuration.
//!
//! - [`RefreshPolicy`]: timing of near-real-time refreshes
//! - [`ClientConfig`]: HTTP client settings for discovery and click queries
//! - [`PluginConfig`]: the services offered when creating a layer

use std::time::Duration;

use serde::{Deserialize, Serialize};
use wms_common::{WmsError, WmsResult};

/// Minimum time between two forced refreshes of a near-real-time source.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

/// Delay before the map is nudged into re-evaluating its sources.
pub const DEFAULT_NUDGE_DELAY: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    pub refresh_interval: Duration,
    pub nudge_delay: Duration,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            nudge_delay: DEFAULT_NUDGE_DELAY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: concat!("wms-layer/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Services offered in the layer wizard. The three lists are parallel:
/// entry `i` of each describes one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginConfig {
    #[serde(default = "default_titles")]
    pub titles: Vec<String>,
    #[serde(default = "default_urls")]
    pub urls: Vec<String>,
    #[serde(default = "default_layers")]
    pub layers: Vec<String>,
}

fn default_titles() -> Vec<String> {
    ["Mines", "Phosphate", "Energy"].map(String::from).to_vec()
}

fn default_urls() -> Vec<String> {
    [
        "https://mrdata.usgs.gov/services/active-mines",
        "https://mrdata.usgs.gov/services/phosphate",
        "https://idena.navarra.es/ogc/ows",
    ]
    .map(String::from)
    .to_vec()
}

fn default_layers() -> Vec<String> {
    ["mineplant", "phosphate", "IDENA:ENERGI_Lin_Peolico"]
        .map(String::from)
        .to_vec()
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            titles: default_titles(),
            urls: default_urls(),
            layers: default_layers(),
        }
    }
}

impl PluginConfig {
    /// Parse and validate a YAML document. Missing lists take their defaults.
    pub fn from_yaml(yaml: &str) -> WmsResult<Self> {
        let config: PluginConfig =
            serde_yaml::from_str(yaml).map_err(|e| WmsError::InvalidParameter {
                param: "config".to_string(),
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> WmsResult<()> {
        if self.titles.len() != self.urls.len() || self.layers.len() != self.urls.len() {
            return Err(invalid(format!(
                "titles ({}), urls ({}) and layers ({}) must have the same length",
                self.titles.len(),
                self.urls.len(),
                self.layers.len()
            )));
        }
        for url in &self.urls {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(invalid(format!("'{}' is not an http(s) URL", url)));
            }
        }
        Ok(())
    }
}

fn invalid(message: String) -> WmsError {
    WmsError::InvalidParameter {
        param: "config".to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PluginConfig::default();
        assert_eq!(config.urls.len(), 3);
        assert_eq!(config.layers[0], "mineplant");
        assert!(config.validate().is_ok());
        assert_eq!(RefreshPolicy::default().refresh_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = PluginConfig::from_yaml("titles: [A, B, C]\n").unwrap();
        assert_eq!(config.titles, vec!["A", "B", "C"]);
        assert_eq!(config.urls, default_urls());
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let yaml = "titles: [A]\nurls: [https://a.example/wms]\nlayers: [a, b]\n";
        assert!(matches!(
            PluginConfig::from_yaml(yaml),
            Err(WmsError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_non_http_url_rejected() {
        let yaml = "titles: [A]\nurls: [ftp://a.example/wms]\nlayers: [a]\n";
        assert!(PluginConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_malformed_yaml() {
        assert!(PluginConfig::from_yaml("titles: [unclosed").is_err());
    }
}
