//! Load-balancer correlation strategies.
//!
//! The snapshot carries no authoritative link between a load balancer and
//! the resources behind it, so the load-balancer view asks a
//! [`CorrelationStrategy`] to guess. The default guesses by name and falls
//! back to public web ports. A strategy backed by target-health data can be
//! dropped in without touching the view.

use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use crate::model::{Components, LoadBalancer, is_anywhere};

/// Ports treated as "web" by [`PublicWebPortCorrelation`].
pub const WEB_PORTS: [i32; 3] = [80, 443, 8080];

/// Resources judged to sit behind a load balancer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Correlation {
    pub security_groups: BTreeSet<String>,
    pub auto_scaling_groups: BTreeSet<String>,
    pub instances: BTreeSet<String>,
}

impl Correlation {
    pub fn is_empty(&self) -> bool {
        self.security_groups.is_empty()
            && self.auto_scaling_groups.is_empty()
            && self.instances.is_empty()
    }

    pub fn merge(&mut self, other: Correlation) {
        self.security_groups.extend(other.security_groups);
        self.auto_scaling_groups.extend(other.auto_scaling_groups);
        self.instances.extend(other.instances);
    }
}

pub trait CorrelationStrategy: Send + Sync {
    fn correlate(&self, components: &Components, lb: &LoadBalancer) -> Correlation;
}

/// Leading hyphen-delimited token, e.g. "web" for "web-prod-asg".
fn leading_token(name: &str) -> &str {
    name.split('-').next().unwrap_or(name)
}

/// Case-insensitive naming-convention match.
///
/// An auto-scaling group matches when its name contains the load-balancer
/// name, or the load-balancer name contains the group's leading token. A
/// standalone instance matches when its id contains the load balancer's
/// leading token.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameCorrelation;

impl CorrelationStrategy for NameCorrelation {
    fn correlate(&self, components: &Components, lb: &LoadBalancer) -> Correlation {
        let pattern = lb.name.to_lowercase();
        let lb_lead = leading_token(&pattern);
        let mut result = Correlation::default();
        let mut targeted: HashSet<&str> = HashSet::new();

        for asg in &components.auto_scaling_groups {
            let name = asg.name.to_lowercase();
            if name.contains(&pattern) || pattern.contains(leading_token(&name)) {
                result.auto_scaling_groups.insert(asg.name.clone());
                targeted.extend(asg.instance_ids.iter().map(String::as_str));
                result
                    .security_groups
                    .extend(asg.security_groups.iter().cloned());
            }
        }

        for instance in &components.instances {
            if targeted.contains(instance.id.as_str()) {
                continue;
            }
            if instance.id.to_lowercase().contains(lb_lead) {
                result.instances.insert(instance.id.clone());
                result
                    .security_groups
                    .extend(instance.security_groups.iter().cloned());
            }
        }

        debug!(
            lb = lb.name.as_str(),
            asgs = result.auto_scaling_groups.len(),
            instances = result.instances.len(),
            "name correlation"
        );
        result
    }
}

/// Security groups that open a web port to the whole internet.
///
/// Only the rule's `from_port` is compared.
#[derive(Debug, Clone, Copy, Default)]
pub struct PublicWebPortCorrelation;

impl CorrelationStrategy for PublicWebPortCorrelation {
    fn correlate(&self, components: &Components, _lb: &LoadBalancer) -> Correlation {
        let security_groups = components
            .security_groups
            .iter()
            .filter(|sg| {
                sg.rules.iter().any(|rule| {
                    rule.is_ingress()
                        && is_anywhere(&rule.source)
                        && WEB_PORTS.contains(&rule.from_port)
                })
            })
            .map(|sg| sg.id.clone())
            .collect();

        Correlation {
            security_groups,
            ..Default::default()
        }
    }
}

/// Consult `fallback` only when `primary` found no security groups.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackCorrelation<P, F> {
    pub primary: P,
    pub fallback: F,
}

impl<P, F> CorrelationStrategy for FallbackCorrelation<P, F>
where
    P: CorrelationStrategy,
    F: CorrelationStrategy,
{
    fn correlate(&self, components: &Components, lb: &LoadBalancer) -> Correlation {
        let mut result = self.primary.correlate(components, lb);
        if result.security_groups.is_empty() {
            debug!(lb = lb.name.as_str(), "primary correlation empty, falling back");
            result.merge(self.fallback.correlate(components, lb));
        }
        result
    }
}

pub type DefaultCorrelation = FallbackCorrelation<NameCorrelation, PublicWebPortCorrelation>;

/// Name matching, then public web ports.
pub fn default_correlation() -> DefaultCorrelation {
    FallbackCorrelation {
        primary: NameCorrelation,
        fallback: PublicWebPortCorrelation,
    }
}
