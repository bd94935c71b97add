use std::{fs, io, path::Path};

use helvar_protocol::members::{Cluster, Group, Router};
use serde::Deserialize;

use crate::Workgroup;

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("failed to read network file: {0}")]
    Io(#[from] io::Error),
    #[error("invalid network description: {0}")]
    Yaml(#[from] serde_saphyr::Error),
}

/// A lighting network described in YAML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Network {
    pub clusters: Vec<Cluster>,
    pub routers: Vec<Router>,
    pub groups: Vec<Group>,
}

impl Network {
    pub fn from_yaml(yaml: &str) -> Result<Network, NetworkError> {
        Ok(serde_saphyr::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Network, NetworkError> {
        Network::from_yaml(&fs::read_to_string(path)?)
    }
}

impl Workgroup for Network {
    fn cluster_ids(&self) -> Vec<u8> {
        self.clusters.iter().map(|c| c.id).collect()
    }

    fn router_ids(&self) -> Vec<u8> {
        self.routers.iter().map(|r| r.id).collect()
    }

    fn groups(&self) -> &[Group] {
        &self.groups
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use helvar_protocol::members::DeviceState;

    const YAML: &str = r#"
clusters:
  - id: 1
  - id: 2
routers:
  - id: 251
groups:
  - id: 11
    name: Group 11
    devices:
      - address: 1.251.1.1
        name: Lamp 1
        state: 2
  - id: 12
"#;

    #[test]
    fn parse_network() {
        let network = Network::from_yaml(YAML).unwrap();
        assert_eq!(network.cluster_ids(), vec![1, 2]);
        assert_eq!(network.router_ids(), vec![251]);
        assert_eq!(network.groups.len(), 2);

        let group = network.group(11).unwrap();
        assert_eq!(group.name, "Group 11");
        assert_eq!(group.last_scene, 0);
        assert!(network.group(12).unwrap().devices.is_empty());

        let device = network.device("1.251.1.1").unwrap();
        assert_eq!(device.name, "Lamp 1");
        assert_eq!(device.state, DeviceState::LAMP_FAILURE);
        assert!(network.device("1.251.1.2").is_none());
    }

    #[test]
    fn invalid_network() {
        assert!(matches!(
            Network::from_yaml("clusters: nope"),
            Err(NetworkError::Yaml(_))
        ));
        assert!(matches!(
            Network::from_yaml_file("/nonexistent/network.yml"),
            Err(NetworkError::Io(_))
        ));
    }
}
