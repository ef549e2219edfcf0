//! Snapshot acquisition boundary.
//!
//! The engine never talks to a cloud provider. It receives a [`Components`]
//! value from a [`SnapshotProvider`]. This module defines that capability and
//! ships one implementation, [`JsonInventoryProvider`], which reads a
//! provider-shaped inventory dump from disk and normalizes it the same way a
//! live provider integration would.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use exposure_error::{Error, Result};

use crate::model::{
    AutoScalingGroup, Components, Direction, Instance, LoadBalancer, Rule, SecurityGroup,
};

/// Parameters identifying which snapshot to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRequest {
    /// Credential profile name.
    pub profile: String,
    pub region: String,
    /// Restrict the snapshot to one VPC.
    pub vpc_id: Option<String>,
}

impl SnapshotRequest {
    pub fn new(profile: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
            region: region.into(),
            vpc_id: None,
        }
    }

    pub fn with_vpc_id(mut self, vpc_id: Option<String>) -> Self {
        self.vpc_id = vpc_id;
        self
    }
}

/// Anything that can produce a snapshot for a request.
pub trait SnapshotProvider {
    fn fetch(&self, request: &SnapshotRequest) -> Result<Components>;
}

impl<F> SnapshotProvider for F
where
    F: Fn(&SnapshotRequest) -> Result<Components>,
{
    fn fetch(&self, request: &SnapshotRequest) -> Result<Components> {
        self(request)
    }
}

// Inventory document

/// Raw inventory as dumped from a provider, before normalization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InventoryDocument {
    #[serde(default)]
    pub security_groups: Vec<InventorySecurityGroup>,
    #[serde(default)]
    pub load_balancers: Vec<InventoryLoadBalancer>,
    #[serde(default)]
    pub instances: Vec<InventoryInstance>,
    #[serde(default)]
    pub auto_scaling_groups: Vec<InventoryAutoScalingGroup>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InventorySecurityGroup {
    pub group_id: String,
    pub group_name: String,
    #[serde(default)]
    pub vpc_id: Option<String>,
    #[serde(default)]
    pub ip_permissions: Vec<Permission>,
    #[serde(default)]
    pub ip_permissions_egress: Vec<Permission>,
}

/// One provider permission, possibly naming several peers.
#[derive(Debug, Clone, Deserialize)]
pub struct Permission {
    pub ip_protocol: String,
    #[serde(default)]
    pub from_port: Option<i32>,
    #[serde(default)]
    pub to_port: Option<i32>,
    #[serde(default)]
    pub ip_ranges: Vec<String>,
    #[serde(default)]
    pub ipv6_ranges: Vec<String>,
    /// Referenced security-group ids.
    #[serde(default)]
    pub user_id_group_pairs: Vec<String>,
}

impl Permission {
    /// One rule per peer: IPv4 ranges, IPv6 ranges, then group references.
    /// Unset ports become 0.
    pub fn expand(&self, direction: Direction) -> impl Iterator<Item = Rule> + '_ {
        let from_port = self.from_port.unwrap_or(0);
        let to_port = self.to_port.unwrap_or(0);
        self.ip_ranges
            .iter()
            .chain(&self.ipv6_ranges)
            .chain(&self.user_id_group_pairs)
            .map(move |peer| Rule::new(&self.ip_protocol, from_port, to_port, peer, direction))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InventoryLoadBalancer {
    pub arn: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub vpc_id: Option<String>,
    #[serde(default)]
    pub target_groups: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InventoryInstance {
    pub instance_id: String,
    pub instance_type: String,
    #[serde(default)]
    pub vpc_id: Option<String>,
    #[serde(default)]
    pub security_groups: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InventoryAutoScalingGroup {
    pub name: String,
    #[serde(default)]
    pub instance_ids: Vec<String>,
}

fn in_scope(scope: Option<&str>, vpc_id: Option<&str>) -> bool {
    match scope {
        Some(scope) => vpc_id == Some(scope),
        None => true,
    }
}

/// Normalize a raw inventory into the snapshot model.
///
/// - every permission expands to one rule per peer, ingress before egress
/// - resources outside the requested VPC are dropped
/// - each ASG's security groups are derived from its in-scope members
pub fn assemble(document: InventoryDocument, request: &SnapshotRequest) -> Components {
    let scope = request.vpc_id.as_deref();

    let security_groups: Vec<SecurityGroup> = document
        .security_groups
        .iter()
        .filter(|sg| in_scope(scope, sg.vpc_id.as_deref()))
        .map(|sg| {
            let rules = sg
                .ip_permissions
                .iter()
                .flat_map(|p| p.expand(Direction::Ingress))
                .chain(
                    sg.ip_permissions_egress
                        .iter()
                        .flat_map(|p| p.expand(Direction::Egress)),
                )
                .collect();
            SecurityGroup::new(&sg.group_id, &sg.group_name, rules)
        })
        .collect();

    let load_balancers: Vec<LoadBalancer> = document
        .load_balancers
        .into_iter()
        .filter(|lb| in_scope(scope, lb.vpc_id.as_deref()))
        .map(|lb| LoadBalancer {
            id: lb.arn,
            name: lb.name,
            kind: lb.kind,
            target_groups: lb.target_groups,
        })
        .collect();

    let instances: Vec<Instance> = document
        .instances
        .into_iter()
        .filter(|i| in_scope(scope, i.vpc_id.as_deref()))
        .map(|i| Instance::new(i.instance_id, i.instance_type, i.security_groups))
        .collect();

    let auto_scaling_groups = document
        .auto_scaling_groups
        .into_iter()
        .map(|asg| {
            let mut security_groups: Vec<String> = Vec::new();
            for member in instances.iter().filter(|i| asg.instance_ids.contains(&i.id)) {
                for sg in &member.security_groups {
                    if !security_groups.contains(sg) {
                        security_groups.push(sg.clone());
                    }
                }
            }
            AutoScalingGroup::new(asg.name, asg.instance_ids, security_groups)
        })
        .collect();

    Components {
        security_groups,
        load_balancers,
        instances,
        auto_scaling_groups,
        vpc_id: request.vpc_id.clone().unwrap_or_default(),
        subnet_ids: Vec::new(),
    }
}

/// Reads an [`InventoryDocument`] from a JSON file.
#[derive(Debug, Clone)]
pub struct JsonInventoryProvider {
    path: PathBuf,
}

impl JsonInventoryProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse an inventory document from JSON text.
    pub fn parse(text: &str) -> Result<InventoryDocument> {
        serde_json::from_str(text)
            .map_err(|err| Error::from(err).with_operation("provider::parse_inventory"))
    }
}

impl SnapshotProvider for JsonInventoryProvider {
    fn fetch(&self, request: &SnapshotRequest) -> Result<Components> {
        debug!(
            path = %self.path.display(),
            profile = request.profile.as_str(),
            region = request.region.as_str(),
            "reading inventory"
        );

        if !self.path.exists() {
            return Err(Error::file_not_found(self.path.display().to_string())
                .with_operation("provider::fetch"));
        }

        let text = fs::read_to_string(&self.path).map_err(|err| {
            Error::from(err)
                .with_context("path", self.path.display().to_string())
                .with_operation("provider::fetch")
        })?;

        let document = Self::parse(&text)
            .map_err(|err| err.with_context("path", self.path.display().to_string()))?;
        let components = assemble(document, request);

        info!(
            security_groups = components.security_groups.len(),
            instances = components.instances.len(),
            asgs = components.auto_scaling_groups.len(),
            load_balancers = components.load_balancers.len(),
            "snapshot assembled"
        );
        Ok(components)
    }
}
