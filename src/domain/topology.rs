//! Device topology as published for the graph-layout engine.
//!
//! The server describes the plant as nodes, links, and groups. Layout and
//! rendering belong to the external engine; this module only answers
//! which node is which and whether its tags can be monitored.

use serde::{Deserialize, Serialize};

use super::DeviceId;

/// Kind of a topology node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// Programmable logic controller.
    Plc,
    /// Human-machine interface.
    Hmi,
    /// Network switch.
    Switch,
    /// Physical motor driven by a PLC.
    Motor,
    /// Wireless access point.
    Ap,
    /// MQTT broker.
    Mqttbrkr,
    /// RFID reader.
    Rfidr,
    /// IIoT gateway.
    Iiotgw,
    /// Any kind this client does not know.
    #[serde(other)]
    Other,
}

impl DeviceKind {
    /// Returns `true` for kinds that expose tags (PLC, motor, HMI).
    #[must_use]
    pub const fn is_monitorable(self) -> bool {
        matches!(self, Self::Plc | Self::Motor | Self::Hmi)
    }
}

/// Kind of a topology link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkKind {
    /// Ethernet link through a switch.
    WiredNetwork,
    /// Wireless link through an access point.
    WirelessNetwork,
    /// I/O wiring between a PLC and a physical device.
    Io,
    /// Any kind this client does not know.
    #[serde(other)]
    Other,
}

/// Network settings of a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    /// IPv4 address.
    #[serde(default)]
    pub ip: Option<String>,
    /// MAC address.
    #[serde(default)]
    pub mac: Option<String>,
    /// Netmask.
    #[serde(default)]
    pub netmask: Option<String>,
}

/// One node of the topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyNode {
    /// Lower-cased node identifier.
    pub id: String,
    /// Device name, used as the subscription key.
    pub name: String,
    /// Node kind, absent for untyped nodes.
    #[serde(rename = "type", default)]
    pub kind: Option<DeviceKind>,
    /// Network settings, absent for physical devices.
    #[serde(default)]
    pub network: Option<NetworkInfo>,
}

impl TopologyNode {
    /// Device identifier for subscriptions and snapshots.
    #[must_use]
    pub fn device_id(&self) -> DeviceId {
        DeviceId::new(self.name.clone())
    }

    /// Returns `true` if the node's tags can be monitored.
    #[must_use]
    pub fn is_monitorable(&self) -> bool {
        self.kind.is_some_and(DeviceKind::is_monitorable)
    }
}

/// One link between two nodes, by node position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyLink {
    /// Position of the source node in [`Topology::nodes`].
    pub source: usize,
    /// Position of the target node in [`Topology::nodes`].
    pub target: usize,
    /// Link kind.
    #[serde(rename = "type", default)]
    pub kind: Option<LinkKind>,
}

/// Complete graph description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    /// All nodes.
    pub nodes: Vec<TopologyNode>,
    /// All links.
    #[serde(default)]
    pub links: Vec<TopologyLink>,
    /// Layout groups, opaque to this client.
    #[serde(default)]
    pub groups: Vec<serde_json::Value>,
}

impl Topology {
    /// Looks up a node by device name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&TopologyNode> {
        self.nodes.iter().find(|node| node.name == name)
    }

    /// Returns the nodes whose tags can be monitored.
    pub fn monitorable(&self) -> impl Iterator<Item = &TopologyNode> {
        self.nodes.iter().filter(|node| node.is_monitorable())
    }

    /// Returns the neighbours of `name` with the kind of the connecting link.
    ///
    /// Links pointing outside the node list are skipped.
    #[must_use]
    pub fn links_of(&self, name: &str) -> Vec<(&TopologyNode, Option<LinkKind>)> {
        let Some(pos) = self.nodes.iter().position(|node| node.name == name) else {
            return Vec::new();
        };
        self.links
            .iter()
            .filter_map(|link| {
                let other = if link.source == pos {
                    link.target
                } else if link.target == pos {
                    link.source
                } else {
                    return None;
                };
                self.nodes.get(other).map(|node| (node, link.kind))
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    const DATA: &str = r#"{
        "nodes": [
            {"id": "plc1", "name": "PLC1", "type": "plc",
             "network": {"ip": "10.0.0.1", "mac": "00:00:00:00:00:01", "netmask": "255.255.255.0"}},
            {"id": "switch1", "name": "Switch1", "type": "switch"},
            {"id": "motor1", "name": "Motor1", "type": "motor"},
            {"id": "hmi1", "name": "HMI1", "type": "hmi"},
            {"id": "robot1", "name": "Robot1", "type": "robot"}
        ],
        "groups": [],
        "links": [
            {"source": 1, "target": 0, "type": "wired-network"},
            {"source": 1, "target": 3, "type": "wired-network"},
            {"source": 2, "target": 0, "type": "io"},
            {"source": 2, "target": 9, "type": "io"}
        ]
    }"#;

    fn make_topology() -> Topology {
        let Ok(topology) = serde_json::from_str::<Topology>(DATA) else {
            panic!("topology did not parse");
        };
        topology
    }

    #[test]
    fn only_plc_motor_hmi_are_monitorable() {
        let topology = make_topology();
        let names: Vec<&str> = topology.monitorable().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["PLC1", "Motor1", "HMI1"]);
    }

    #[test]
    fn unknown_kind_is_accepted() {
        let topology = make_topology();
        let Some(robot) = topology.find("Robot1") else {
            panic!("Robot1 missing");
        };
        assert_eq!(robot.kind, Some(DeviceKind::Other));
        assert!(!robot.is_monitorable());
    }

    #[test]
    fn network_info_is_parsed() {
        let topology = make_topology();
        let ip = topology
            .find("PLC1")
            .and_then(|n| n.network.as_ref())
            .and_then(|net| net.ip.as_deref());
        assert_eq!(ip, Some("10.0.0.1"));
    }

    #[test]
    fn links_of_resolves_neighbours() {
        let topology = make_topology();
        let neighbours: Vec<(&str, Option<LinkKind>)> = topology
            .links_of("PLC1")
            .into_iter()
            .map(|(n, k)| (n.name.as_str(), k))
            .collect();
        assert_eq!(
            neighbours,
            vec![
                ("Switch1", Some(LinkKind::WiredNetwork)),
                ("Motor1", Some(LinkKind::Io)),
            ]
        );
    }

    #[test]
    fn dangling_link_is_skipped() {
        let topology = make_topology();
        let neighbours = topology.links_of("Motor1");
        assert_eq!(neighbours.len(), 1);
    }
}
