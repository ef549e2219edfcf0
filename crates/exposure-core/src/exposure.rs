//! Per-range attack-surface subgraph.
//!
//! For one external range, find the security groups that admit it, then
//! everything sitting behind those groups: auto-scaling groups and
//! standalone instances.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use crate::graph::{ATTACK_SURFACE_PALETTE, StyleClass, Subgraph};
use crate::model::Components;
use crate::sanitize::{asg_token, cidr_token, instance_token, security_group_token};

/// Token of the single node emitted when nothing is exposed.
pub const NO_EXPOSURE_TOKEN: &str = "NoExposure";

/// A security group admitting the focus range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExposedGroup<'a> {
    pub name: &'a str,
    /// One `Port {from}-{to} ({protocol})` entry per matching rule, in rule order.
    pub ports: Vec<String>,
}

/// Security groups with an ingress rule whose source is exactly `focus`,
/// keyed (and therefore sorted) by id.
///
/// If the snapshot lists the same id twice, the first name wins and the
/// port entries of both are kept.
pub fn exposed_security_groups<'a>(
    components: &'a Components,
    focus: &str,
) -> BTreeMap<&'a str, ExposedGroup<'a>> {
    let mut exposed: BTreeMap<&str, ExposedGroup<'_>> = BTreeMap::new();

    for sg in &components.security_groups {
        let ports: Vec<String> = sg
            .rules
            .iter()
            .filter(|rule| rule.is_ingress() && rule.source == focus)
            .map(|rule| rule.port_label())
            .collect();

        if ports.is_empty() {
            continue;
        }

        exposed
            .entry(sg.id.as_str())
            .or_insert_with(|| ExposedGroup {
                name: &sg.name,
                ports: Vec::new(),
            })
            .ports
            .extend(ports);
    }

    exposed
}

/// Build the attack-surface subgraph for one external range.
pub fn build_subgraph(components: &Components, focus: &str) -> Subgraph {
    let exposed = exposed_security_groups(components, focus);

    if exposed.is_empty() {
        debug!(range = focus, "no security group admits range");
        return no_exposure(focus);
    }

    let mut graph = Subgraph::new(&ATTACK_SURFACE_PALETTE);
    let mut claims = TokenClaims::default();

    let focus_token = cidr_token(focus);
    graph.add_node(focus_token.clone(), focus, Some(StyleClass::Cidr));

    for (sg_id, group) in &exposed {
        let token = security_group_token(sg_id);
        if claims.claim(&token, sg_id) {
            graph.add_node(token.clone(), group.name, Some(StyleClass::Sg));
        }
        for port in &group.ports {
            graph.add_labeled_edge(focus_token.clone(), token.clone(), port.clone());
        }
    }

    let is_exposed = |sg_id: &String| exposed.contains_key(sg_id.as_str());

    let mut asg_count = 0usize;
    for asg in components
        .auto_scaling_groups
        .iter()
        .filter(|asg| asg.security_groups.iter().any(is_exposed))
    {
        let token = asg_token(&asg.name);
        if claims.claim(&token, &asg.name) {
            graph.add_node(
                token.clone(),
                format!("ASG: {}", asg.name),
                Some(StyleClass::Asg),
            );
        }
        for sg_id in asg.security_groups.iter().filter(|id| is_exposed(id)) {
            graph.add_edge(security_group_token(sg_id), token.clone());
        }
        asg_count += 1;
    }

    let members = components.asg_member_ids();
    let mut instance_count = 0usize;
    for instance in components
        .instances
        .iter()
        .filter(|i| !members.contains(i.id.as_str()))
        .filter(|i| i.security_groups.iter().any(is_exposed))
    {
        let token = instance_token(&instance.id);
        if claims.claim(&token, &instance.id) {
            graph.add_node(
                token.clone(),
                format!("{} ({})", instance.id, instance.kind),
                Some(StyleClass::Ec2),
            );
        }
        for sg_id in instance.security_groups.iter().filter(|id| is_exposed(id)) {
            graph.add_edge(security_group_token(sg_id), token.clone());
        }
        instance_count += 1;
    }

    debug!(
        range = focus,
        security_groups = exposed.len(),
        asgs = asg_count,
        instances = instance_count,
        "built attack-surface subgraph"
    );
    graph
}

/// The single-node graph used when nothing admits `focus`.
fn no_exposure(focus: &str) -> Subgraph {
    let mut graph = Subgraph::new(&[]);
    graph.add_node(NO_EXPOSURE_TOKEN, format!("No exposure from {focus}"), None);
    graph
}

/// Tracks which identifier first claimed each token.
#[derive(Default)]
struct TokenClaims {
    owners: HashMap<String, String>,
}

impl TokenClaims {
    /// Returns true when `token` is new. Warns when a different identifier
    /// already owns it.
    fn claim(&mut self, token: &str, ident: &str) -> bool {
        match self.owners.get(token) {
            Some(owner) => {
                if owner != ident {
                    warn!(
                        token,
                        kept = owner.as_str(),
                        dropped = ident,
                        "node token collision"
                    );
                }
                false
            }
            None => {
                self.owners.insert(token.to_string(), ident.to_string());
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AutoScalingGroup, Instance, Rule, SecurityGroup};

    fn web_snapshot() -> Components {
        Components {
            security_groups: vec![
                SecurityGroup::new(
                    "sg-2",
                    "api-sg",
                    vec![Rule::ingress("tcp", 8080, 8080, "0.0.0.0/0")],
                ),
                SecurityGroup::new(
                    "sg-1",
                    "web-sg",
                    vec![
                        Rule::ingress("tcp", 80, 80, "0.0.0.0/0"),
                        Rule::ingress("tcp", 443, 443, "0.0.0.0/0"),
                        Rule::egress("tcp", 80, 80, "0.0.0.0/0"),
                    ],
                ),
                SecurityGroup::new(
                    "sg-3",
                    "db-sg",
                    vec![Rule::ingress("tcp", 5432, 5432, "sg-1")],
                ),
            ],
            instances: vec![
                Instance::new("i-1", "t3.micro", vec!["sg-1".into()]),
                Instance::new("i-2", "t3.micro", vec!["sg-1".into(), "sg-2".into()]),
                Instance::new("i-3", "r5.large", vec!["sg-3".into()]),
            ],
            auto_scaling_groups: vec![AutoScalingGroup::new(
                "web-asg",
                vec!["i-1".into()],
                vec!["sg-1".into(), "sg-2".into()],
            )],
            ..Default::default()
        }
    }

    #[test]
    fn test_exposed_groups_are_sorted_and_keep_every_port() {
        let snapshot = web_snapshot();
        let exposed = exposed_security_groups(&snapshot, "0.0.0.0/0");
        let ids: Vec<_> = exposed.keys().copied().collect();
        assert_eq!(ids, vec!["sg-1", "sg-2"]);
        assert_eq!(
            exposed["sg-1"].ports,
            vec!["Port 80-80 (tcp)", "Port 443-443 (tcp)"]
        );
    }

    #[test]
    fn test_repeated_rules_draw_repeated_edges() {
        let snapshot = Components {
            security_groups: vec![SecurityGroup::new(
                "sg-1",
                "web-sg",
                vec![
                    Rule::ingress("tcp", 80, 80, "0.0.0.0/0"),
                    Rule::ingress("tcp", 80, 80, "0.0.0.0/0"),
                ],
            )],
            ..Default::default()
        };

        assert_eq!(
            exposed_security_groups(&snapshot, "0.0.0.0/0")["sg-1"].ports,
            vec!["Port 80-80 (tcp)", "Port 80-80 (tcp)"]
        );

        let graph = build_subgraph(&snapshot, "0.0.0.0/0");
        let edges: Vec<_> = graph
            .edges()
            .iter()
            .map(|e| (e.from.as_str(), e.to.as_str(), e.label.as_deref()))
            .collect();
        assert_eq!(
            edges,
            vec![
                ("CIDR_0_0_0_0_0", "sg_1", Some("Port 80-80 (tcp)")),
                ("CIDR_0_0_0_0_0", "sg_1", Some("Port 80-80 (tcp)")),
            ]
        );
    }

    #[test]
    fn test_asg_members_are_not_standalone() {
        let graph = build_subgraph(&web_snapshot(), "0.0.0.0/0");
        assert!(!graph.contains_node("i-1"));
        assert!(graph.contains_node("i-2"));
        assert!(!graph.contains_node("i-3"));
        assert!(graph.contains_node("web_asg"));
    }

    #[test]
    fn test_one_edge_per_matching_group() {
        let graph = build_subgraph(&web_snapshot(), "0.0.0.0/0");
        let into_asg = graph.edges().iter().filter(|e| e.to == "web_asg").count();
        let into_i2 = graph.edges().iter().filter(|e| e.to == "i-2").count();
        assert_eq!(into_asg, 2);
        assert_eq!(into_i2, 2);
    }

    #[test]
    fn test_no_exposure_replaces_graph() {
        let graph = build_subgraph(&web_snapshot(), "203.0.113.9/32");
        assert_eq!(graph.nodes().len(), 1);
        assert_eq!(graph.nodes()[0].token, NO_EXPOSURE_TOKEN);
        assert_eq!(graph.nodes()[0].label, "No exposure from 203.0.113.9/32");
        assert!(graph.edges().is_empty());
        assert!(graph.classes_in_use().is_empty());
    }

    #[test]
    fn test_egress_rule_does_not_expose() {
        let snapshot = Components {
            security_groups: vec![SecurityGroup::new(
                "sg-9",
                "egress-only",
                vec![Rule::egress("-1", 0, 0, "0.0.0.0/0")],
            )],
            ..Default::default()
        };
        assert!(exposed_security_groups(&snapshot, "0.0.0.0/0").is_empty());
    }

    #[test]
    fn test_dangling_security_group_reference_is_tolerated() {
        let snapshot = Components {
            security_groups: vec![SecurityGroup::new(
                "sg-1",
                "web",
                vec![Rule::ingress("tcp", 22, 22, "198.51.100.4/32")],
            )],
            instances: vec![Instance::new("i-7", "t3.nano", vec!["sg-missing".into()])],
            ..Default::default()
        };
        let graph = build_subgraph(&snapshot, "198.51.100.4/32");
        assert_eq!(graph.nodes().len(), 2);
        assert!(!graph.contains_node("i-7"));
    }

    #[test]
    fn test_colliding_tokens_keep_first_group() {
        let snapshot = Components {
            security_groups: vec![
                SecurityGroup::new(
                    "sg-1_2",
                    "second",
                    vec![Rule::ingress("tcp", 22, 22, "::/0")],
                ),
                SecurityGroup::new(
                    "sg-1-2",
                    "first",
                    vec![Rule::ingress("tcp", 80, 80, "::/0")],
                ),
            ],
            ..Default::default()
        };
        let graph = build_subgraph(&snapshot, "::/0");
        // "sg-1-2" sorts before "sg-1_2" and claims the token.
        assert_eq!(graph.node("sg_1_2").map(|n| n.label.as_str()), Some("first"));
        assert_eq!(graph.nodes().len(), 2);
        assert_eq!(graph.edges().len(), 2);
    }
}
