//! Named volumes and networks managed by sandock

use serde_json::Value;

use super::fields::{Fields, Pairs};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    pub driver: String,
    pub driver_opts: Pairs,
    pub labels: Pairs,
}

impl Default for Volume {
    fn default() -> Self {
        Self {
            driver: "local".to_string(),
            driver_opts: Vec::new(),
            labels: Vec::new(),
        }
    }
}

impl Volume {
    pub fn from_value(path: &str, value: &Value) -> Result<Self> {
        let mut f = Fields::new(path, value)?;
        let volume = Self {
            driver: f.string_or("driver", "local")?,
            driver_opts: f.pairs("driver_opts")?,
            labels: f.pairs("labels")?,
        };
        f.finish()?;
        Ok(volume)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    pub driver: String,
    pub driver_opts: Pairs,
    /// Extra `network create` flags, e.g. `subnet`, `gateway`
    pub params: Pairs,
}

impl Default for Network {
    fn default() -> Self {
        Self {
            driver: "bridge".to_string(),
            driver_opts: Vec::new(),
            params: Vec::new(),
        }
    }
}

impl Network {
    pub fn from_value(path: &str, value: &Value) -> Result<Self> {
        let mut f = Fields::new(path, value)?;
        let network = Self {
            driver: f.string_or("driver", "bridge")?,
            driver_opts: f.pairs("driver_opts")?,
            params: f.pairs("params")?,
        };
        f.finish()?;
        Ok(network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_volume_defaults() {
        let o = Volume::from_value("volumes.v", &Value::Null).unwrap();
        assert_eq!(o.driver, "local");
        assert!(o.driver_opts.is_empty());
        assert!(o.labels.is_empty());
    }

    #[test]
    fn test_network_defaults() {
        let o = Network::from_value("networks.n", &json!({})).unwrap();
        assert_eq!(o.driver, "bridge");
        assert!(o.driver_opts.is_empty());
        assert!(o.params.is_empty());
    }

    #[test]
    fn test_network_params() {
        let o = Network::from_value(
            "networks.net1",
            &json!({
                "driver": "default",
                "params": {"subnet": "192.168.0.0/24", "gateway": "192.168.0.1"}
            }),
        )
        .unwrap();

        assert_eq!(o.driver, "default");
        assert_eq!(o.params[0], ("subnet".to_string(), "192.168.0.0/24".to_string()));
        assert_eq!(o.params[1], ("gateway".to_string(), "192.168.0.1".to_string()));
    }
}
