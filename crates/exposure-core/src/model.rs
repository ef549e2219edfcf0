//! Snapshot model: the typed inventory the diagram engine works on.
//!
//! A [`Components`] value is assembled once per request by a
//! [`SnapshotProvider`](crate::provider::SnapshotProvider) and is read-only
//! afterwards. Nothing in this crate mutates it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// The IPv4 "anywhere" range.
pub const IPV4_ANYWHERE: &str = "0.0.0.0/0";
/// The IPv6 "anywhere" range.
pub const IPV6_ANYWHERE: &str = "::/0";

/// Prefix that marks a rule source as a security-group reference.
const SECURITY_GROUP_PREFIX: &str = "sg-";

/// True when `source` names another security group rather than an address range.
pub fn is_security_group_reference(source: &str) -> bool {
    source.starts_with(SECURITY_GROUP_PREFIX)
}

/// True for the two internet-wide ranges.
pub fn is_anywhere(source: &str) -> bool {
    source == IPV4_ANYWHERE || source == IPV6_ANYWHERE
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    Ingress,
    Egress,
}

/// One permission with exactly one source (ingress) or destination (egress).
///
/// Ports are `0` when the provider left them unset, so a real port 0 and an
/// absent port look the same.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub protocol: String,
    pub from_port: i32,
    pub to_port: i32,
    /// Security-group id or CIDR literal.
    pub source: String,
    pub direction: Direction,
}

impl Rule {
    pub fn new(
        protocol: impl Into<String>,
        from_port: i32,
        to_port: i32,
        source: impl Into<String>,
        direction: Direction,
    ) -> Self {
        Self {
            protocol: protocol.into(),
            from_port,
            to_port,
            source: source.into(),
            direction,
        }
    }

    pub fn ingress(
        protocol: impl Into<String>,
        from_port: i32,
        to_port: i32,
        source: impl Into<String>,
    ) -> Self {
        Self::new(protocol, from_port, to_port, source, Direction::Ingress)
    }

    pub fn egress(
        protocol: impl Into<String>,
        from_port: i32,
        to_port: i32,
        destination: impl Into<String>,
    ) -> Self {
        Self::new(protocol, from_port, to_port, destination, Direction::Egress)
    }

    pub fn is_ingress(&self) -> bool {
        self.direction == Direction::Ingress
    }

    pub fn references_security_group(&self) -> bool {
        is_security_group_reference(&self.source)
    }

    /// `Port {from}-{to} ({protocol})`
    pub fn port_label(&self) -> String {
        format!(
            "Port {}-{} ({})",
            self.from_port, self.to_port, self.protocol
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroup {
    pub id: String,
    pub name: String,
    pub rules: Vec<Rule>,
}

impl SecurityGroup {
    pub fn new(id: impl Into<String>, name: impl Into<String>, rules: Vec<Rule>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            rules,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancer {
    /// Provider ARN-like identifier.
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub target_groups: Vec<String>,
}

impl LoadBalancer {
    /// The part of the id after its last `/`, or the whole id.
    pub fn short_id(&self) -> &str {
        self.id.rsplit('/').next().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub security_groups: Vec<String>,
}

impl Instance {
    pub fn new(
        id: impl Into<String>,
        kind: impl Into<String>,
        security_groups: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            security_groups,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoScalingGroup {
    /// Acts as the identifier.
    pub name: String,
    pub instance_ids: Vec<String>,
    /// Union of the member instances' security groups.
    pub security_groups: Vec<String>,
}

impl AutoScalingGroup {
    pub fn new(
        name: impl Into<String>,
        instance_ids: Vec<String>,
        security_groups: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            instance_ids,
            security_groups,
        }
    }
}

/// The whole snapshot for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Components {
    pub security_groups: Vec<SecurityGroup>,
    pub load_balancers: Vec<LoadBalancer>,
    pub instances: Vec<Instance>,
    pub auto_scaling_groups: Vec<AutoScalingGroup>,
    pub vpc_id: String,
    /// Carried for the presentation layer; the engine does not read it.
    pub subnet_ids: Vec<String>,
}

impl Components {
    /// First security group with the given id.
    pub fn security_group(&self, id: &str) -> Option<&SecurityGroup> {
        self.security_groups.iter().find(|sg| sg.id == id)
    }

    pub fn load_balancer_by_name(&self, name: &str) -> Option<&LoadBalancer> {
        self.load_balancers.iter().find(|lb| lb.name == name)
    }

    /// Every instance id listed as a member of some auto-scaling group.
    pub fn asg_member_ids(&self) -> HashSet<&str> {
        self.auto_scaling_groups
            .iter()
            .flat_map(|asg| asg.instance_ids.iter().map(String::as_str))
            .collect()
    }

    /// `(owner, group id)` pairs where an instance or ASG names a security
    /// group missing from the snapshot. Such owners just get fewer edges.
    pub fn dangling_security_group_references(&self) -> Vec<(&str, &str)> {
        let known: HashSet<&str> = self.security_groups.iter().map(|sg| sg.id.as_str()).collect();
        let instances = self
            .instances
            .iter()
            .map(|i| (i.id.as_str(), &i.security_groups));
        let asgs = self
            .auto_scaling_groups
            .iter()
            .map(|asg| (asg.name.as_str(), &asg.security_groups));

        instances
            .chain(asgs)
            .flat_map(|(owner, groups)| groups.iter().map(move |sg| (owner, sg.as_str())))
            .filter(|(_, sg)| !known.contains(sg))
            .collect()
    }
}
