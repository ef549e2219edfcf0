//! Mapping from domain identifiers to diagram node tokens.
//!
//! The substitutions are fixed for output compatibility, which means two
//! identifiers differing only in a substituted character share a token
//! (`sg-1-2` and `sg-1_2` both become `sg_1_2`). [`find_token_collisions`]
//! reports those cases instead of papering over them.

use std::collections::{BTreeMap, BTreeSet};

use strum_macros::Display;

use crate::model::{Components, is_security_group_reference};

/// Category of the identifier being sanitized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[strum(serialize_all = "snake_case")]
pub enum NodeKind {
    SecurityGroup,
    AutoScalingGroup,
    Instance,
    Cidr,
    LoadBalancer,
}

/// Produce the node token for `ident` of the given kind.
///
/// Load-balancer identifiers are cut to the part after their last `/` first.
pub fn node_token(kind: NodeKind, ident: &str) -> String {
    match kind {
        NodeKind::SecurityGroup | NodeKind::AutoScalingGroup => ident.replace('-', "_"),
        NodeKind::Cidr => format!("CIDR_{}", ident.replace(['.', '/', ':'], "_")),
        NodeKind::Instance => ident.to_string(),
        NodeKind::LoadBalancer => ident.rsplit('/').next().unwrap_or(ident).to_string(),
    }
}

pub fn security_group_token(id: &str) -> String {
    node_token(NodeKind::SecurityGroup, id)
}

pub fn asg_token(name: &str) -> String {
    node_token(NodeKind::AutoScalingGroup, name)
}

pub fn instance_token(id: &str) -> String {
    node_token(NodeKind::Instance, id)
}

pub fn cidr_token(cidr: &str) -> String {
    node_token(NodeKind::Cidr, cidr)
}

/// Several distinct identifiers that sanitize to the same token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenCollision {
    pub token: String,
    pub identifiers: Vec<(NodeKind, String)>,
}

/// Report every token claimed by two or more distinct identifiers.
///
/// Covers security groups, auto-scaling groups, instances and the CIDR
/// sources of all rules. Load balancers are left out since their tokens
/// never share a diagram with the attack-surface nodes.
pub fn find_token_collisions(components: &Components) -> Vec<TokenCollision> {
    let mut claims: BTreeMap<String, BTreeSet<(NodeKind, String)>> = BTreeMap::new();
    let mut claim = |kind: NodeKind, ident: &str| {
        claims
            .entry(node_token(kind, ident))
            .or_default()
            .insert((kind, ident.to_string()));
    };

    for sg in &components.security_groups {
        claim(NodeKind::SecurityGroup, &sg.id);
        for rule in &sg.rules {
            if !is_security_group_reference(&rule.source) {
                claim(NodeKind::Cidr, &rule.source);
            }
        }
    }
    for asg in &components.auto_scaling_groups {
        claim(NodeKind::AutoScalingGroup, &asg.name);
    }
    for instance in &components.instances {
        claim(NodeKind::Instance, &instance.id);
    }

    claims
        .into_iter()
        .filter(|(_, idents)| idents.len() > 1)
        .map(|(token, idents)| TokenCollision {
            token,
            identifiers: idents.into_iter().collect(),
        })
        .collect()
}
