//! Tooltips built from click query results.

use serde::Serialize;
use wms_protocol::{FeatureGroup, KeyPair};

/// Attributes of the clicked feature, titled with the layer name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tooltip {
    pub name: String,
    pub properties: Vec<KeyPair>,
}

impl Tooltip {
    /// Build a tooltip from one feature's attributes.
    ///
    /// With a non-empty `allowlist` only the listed keys are shown, in
    /// allowlist order; keys the feature lacks are skipped.
    pub fn from_group(name: &str, group: &FeatureGroup, allowlist: Option<&[String]>) -> Self {
        let properties = match allowlist {
            Some(keys) if !keys.is_empty() => keys
                .iter()
                .filter_map(|key| group.iter().find(|pair| &pair.key == key))
                .cloned()
                .collect(),
            _ => group.clone(),
        };
        Self {
            name: name.to_string(),
            properties,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|pair| pair.key == key)
            .map(|pair| pair.value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group() -> FeatureGroup {
        vec![
            KeyPair::new("the_geom", "[GEOMETRY (Point) with 1 points]"),
            KeyPair::new("site_name", "Eagle Mine"),
            KeyPair::new("commodity", "Nickel"),
        ]
    }

    #[test]
    fn test_all_properties_without_allowlist() {
        let tooltip = Tooltip::from_group("Mines", &group(), None);
        assert_eq!(tooltip.properties.len(), 3);
        assert_eq!(tooltip.get("site_name"), Some("Eagle Mine"));

        let tooltip = Tooltip::from_group("Mines", &group(), Some(&[] as &[String]));
        assert_eq!(tooltip.properties.len(), 3);
    }

    #[test]
    fn test_allowlist_order() {
        let allow = vec!["commodity".to_string(), "missing".to_string(), "site_name".to_string()];
        let tooltip = Tooltip::from_group("Mines", &group(), Some(allow.as_slice()));
        let keys: Vec<&str> = tooltip.properties.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["commodity", "site_name"]);
        assert_eq!(tooltip.name, "Mines");
    }
}
