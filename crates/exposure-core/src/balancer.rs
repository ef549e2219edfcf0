//! Load-balancer focused subgraph.
//!
//! A scoped view around one load balancer, or the whole environment when no
//! load balancer is given. Broad subnets (prefix length 16 or shorter) are
//! left out. The two anywhere ranges are exempt from that filter and are
//! grouped into an "External Networks" cluster instead.

use std::collections::BTreeSet;

use tracing::debug;

use crate::correlate::{Correlation, CorrelationStrategy, default_correlation};
use crate::graph::{LOAD_BALANCER_PALETTE, StyleClass, Subgraph};
use crate::model::{Components, LoadBalancer, Rule, is_anywhere, is_security_group_reference};
use crate::sanitize::{asg_token, cidr_token, instance_token, security_group_token};

pub const EXTERNAL_CLUSTER_ID: &str = "External";
pub const EXTERNAL_CLUSTER_LABEL: &str = "External Networks";

/// True for a CIDR whose prefix length parses and is at most 16.
///
/// Missing or malformed prefixes count as not broad.
pub fn is_broad_subnet(cidr: &str) -> bool {
    let Some((_, prefix)) = cidr.split_once('/') else {
        return false;
    };
    prefix.parse::<i32>().is_ok_and(|len| len <= 16)
}

/// Whether an address-range source is shown in this view.
fn keeps_range(source: &str) -> bool {
    is_anywhere(source) || !is_broad_subnet(source)
}

fn load_balancer_label(lb: &LoadBalancer) -> String {
    format!("{} ({})", lb.name, lb.kind)
}

fn edge_label(rule: &Rule) -> String {
    format!(
        "{} {}",
        rule.direction.to_string().to_uppercase(),
        rule.port_label()
    )
}

/// Build the load-balancer view with the default correlation strategy.
pub fn build_load_balancer_subgraph(
    components: &Components,
    focus: Option<&LoadBalancer>,
) -> Subgraph {
    build_load_balancer_subgraph_with(components, focus, &default_correlation())
}

/// Build the load-balancer view, deciding what sits behind `focus` with `strategy`.
pub fn build_load_balancer_subgraph_with(
    components: &Components,
    focus: Option<&LoadBalancer>,
    strategy: &dyn CorrelationStrategy,
) -> Subgraph {
    let relevant = match focus {
        Some(lb) => strategy.correlate(components, lb),
        None => Correlation {
            security_groups: components
                .security_groups
                .iter()
                .map(|sg| sg.id.clone())
                .collect(),
            auto_scaling_groups: components
                .auto_scaling_groups
                .iter()
                .map(|asg| asg.name.clone())
                .collect(),
            instances: components.instances.iter().map(|i| i.id.clone()).collect(),
        },
    };

    let mut graph = Subgraph::new(&LOAD_BALANCER_PALETTE);

    if relevant.is_empty() {
        if let Some(lb) = focus {
            graph.add_node(lb.short_id(), load_balancer_label(lb), Some(StyleClass::Lb));
        }
        return graph;
    }

    let cidrs = relevant_ranges(components, &relevant.security_groups);
    let (external, other): (Vec<&str>, Vec<&str>) =
        cidrs.iter().map(String::as_str).partition(|c| is_anywhere(c));

    if !external.is_empty() {
        let mut members = Vec::with_capacity(external.len());
        for cidr in &external {
            let token = cidr_token(cidr);
            graph.add_node(token.clone(), *cidr, Some(StyleClass::Cidr));
            members.push(token);
        }
        graph.add_cluster(EXTERNAL_CLUSTER_ID, EXTERNAL_CLUSTER_LABEL, members);
    }

    for cidr in &other {
        graph.add_node(cidr_token(cidr), *cidr, Some(StyleClass::Cidr));
    }

    if let Some(lb) = focus {
        graph.add_node(lb.short_id(), load_balancer_label(lb), Some(StyleClass::Lb));
    }

    let relevant_groups = components
        .security_groups
        .iter()
        .filter(|sg| relevant.security_groups.contains(&sg.id));
    for sg in relevant_groups.clone() {
        graph.add_node(security_group_token(&sg.id), sg.name.as_str(), Some(StyleClass::Sg));
    }

    for asg in components
        .auto_scaling_groups
        .iter()
        .filter(|asg| relevant.auto_scaling_groups.contains(&asg.name))
    {
        graph.add_node(
            asg_token(&asg.name),
            format!("ASG: {}", asg.name),
            Some(StyleClass::Asg),
        );
    }

    for instance in components
        .instances
        .iter()
        .filter(|i| relevant.instances.contains(&i.id))
    {
        graph.add_node(
            instance_token(&instance.id),
            format!("{} ({})", instance.id, instance.kind),
            Some(StyleClass::Ec2),
        );
    }

    if let Some(lb) = focus {
        for cidr in &external {
            graph.add_labeled_edge(cidr_token(cidr), lb.short_id(), "HTTP/HTTPS");
        }
    }

    for sg in relevant_groups {
        let sg_node = security_group_token(&sg.id);

        for rule in &sg.rules {
            let peer = if rule.references_security_group() {
                if !relevant.security_groups.contains(&rule.source) {
                    continue;
                }
                security_group_token(&rule.source)
            } else {
                if !cidrs.contains(&rule.source) {
                    continue;
                }
                cidr_token(&rule.source)
            };

            let label = edge_label(rule);
            if rule.is_ingress() {
                graph.add_labeled_edge(peer, sg_node.clone(), label);
            } else {
                graph.add_labeled_edge(sg_node.clone(), peer, label);
            }
        }

        for asg in components.auto_scaling_groups.iter().filter(|asg| {
            relevant.auto_scaling_groups.contains(&asg.name) && asg.security_groups.contains(&sg.id)
        }) {
            graph.add_edge(sg_node.clone(), asg_token(&asg.name));
        }

        for instance in components.instances.iter().filter(|i| {
            relevant.instances.contains(&i.id) && i.security_groups.contains(&sg.id)
        }) {
            graph.add_edge(sg_node.clone(), instance_token(&instance.id));
        }
    }

    debug!(
        focus = focus.map(|lb| lb.name.as_str()).unwrap_or("<all>"),
        nodes = graph.nodes().len(),
        edges = graph.edges().len(),
        "built load-balancer subgraph"
    );
    graph
}

/// Address ranges referenced by the relevant groups' rules, minus broad subnets.
fn relevant_ranges(components: &Components, groups: &BTreeSet<String>) -> BTreeSet<String> {
    components
        .security_groups
        .iter()
        .filter(|sg| groups.contains(&sg.id))
        .flat_map(|sg| sg.rules.iter())
        .filter(|rule| !is_security_group_reference(&rule.source) && keeps_range(&rule.source))
        .map(|rule| rule.source.clone())
        .collect()
}
