//! Format-agnostic subgraph representation.
//!
//! Builders decide *what* a diagram contains and record it here as nodes,
//! edges, clusters and style classes. Serializers (see `exposure-mermaid`)
//! decide how it is printed.

use std::collections::HashMap;

use strum_macros::{Display, IntoStaticStr};

// Style Classes

/// Declarative styling tag attached to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum StyleClass {
    Cidr,
    Sg,
    Asg,
    Ec2,
    Lb,
}

impl StyleClass {
    pub fn as_str(&self) -> &'static str {
        (*self).into()
    }
}

/// A style class together with its fill colour (hex, without `#`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassDef {
    pub class: StyleClass,
    pub fill: &'static str,
}

/// Palette of the per-range attack-surface view, in declaration order.
pub const ATTACK_SURFACE_PALETTE: [ClassDef; 4] = [
    ClassDef {
        class: StyleClass::Cidr,
        fill: "ff6666",
    },
    ClassDef {
        class: StyleClass::Sg,
        fill: "99ccff",
    },
    ClassDef {
        class: StyleClass::Asg,
        fill: "ffb3ff",
    },
    ClassDef {
        class: StyleClass::Ec2,
        fill: "ff9999",
    },
];

/// Palette of the load-balancer view, in declaration order.
pub const LOAD_BALANCER_PALETTE: [ClassDef; 5] = [
    ClassDef {
        class: StyleClass::Ec2,
        fill: "ff9999",
    },
    ClassDef {
        class: StyleClass::Sg,
        fill: "99ccff",
    },
    ClassDef {
        class: StyleClass::Lb,
        fill: "99ff99",
    },
    ClassDef {
        class: StyleClass::Cidr,
        fill: "ffcc99",
    },
    ClassDef {
        class: StyleClass::Asg,
        fill: "ffb3ff",
    },
];

// Render Node & Edge

/// Node representation for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderNode {
    /// Sanitized diagram identifier (e.g. "sg_0a1b")
    pub token: String,
    /// Display text (e.g. "web-sg", "ASG: web-asg")
    pub label: String,
    pub class: Option<StyleClass>,
}

/// Directed edge, optionally labelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderEdge {
    pub from: String,
    pub to: String,
    pub label: Option<String>,
}

/// A visually grouped set of nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    pub id: String,
    pub label: String,
    /// Member node tokens, in declaration order.
    pub members: Vec<String>,
}

// Subgraph

/// Nodes, edges, clusters and the palette of one diagram.
///
/// Node tokens are unique: a second node with a token already present is
/// dropped and [`Subgraph::add_node`] reports it. Edges keep insertion order
/// and are never deduplicated.
#[derive(Debug, Clone, Default)]
pub struct Subgraph {
    nodes: Vec<RenderNode>,
    edges: Vec<RenderEdge>,
    clusters: Vec<Cluster>,
    palette: Vec<ClassDef>,
    index: HashMap<String, usize>,
}

impl Subgraph {
    pub fn new(palette: &[ClassDef]) -> Self {
        Self {
            palette: palette.to_vec(),
            ..Default::default()
        }
    }

    /// Add a node. Returns false when the token was already declared.
    pub fn add_node(
        &mut self,
        token: impl Into<String>,
        label: impl Into<String>,
        class: Option<StyleClass>,
    ) -> bool {
        let token = token.into();
        if self.index.contains_key(&token) {
            return false;
        }
        self.index.insert(token.clone(), self.nodes.len());
        self.nodes.push(RenderNode {
            token,
            label: label.into(),
            class,
        });
        true
    }

    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.edges.push(RenderEdge {
            from: from.into(),
            to: to.into(),
            label: None,
        });
    }

    pub fn add_labeled_edge(
        &mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        label: impl Into<String>,
    ) {
        self.edges.push(RenderEdge {
            from: from.into(),
            to: to.into(),
            label: Some(label.into()),
        });
    }

    pub fn add_cluster(
        &mut self,
        id: impl Into<String>,
        label: impl Into<String>,
        members: Vec<String>,
    ) {
        self.clusters.push(Cluster {
            id: id.into(),
            label: label.into(),
            members,
        });
    }

    pub fn nodes(&self) -> &[RenderNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[RenderEdge] {
        &self.edges
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn palette(&self) -> &[ClassDef] {
        &self.palette
    }

    pub fn node(&self, token: &str) -> Option<&RenderNode> {
        self.index.get(token).map(|&idx| &self.nodes[idx])
    }

    pub fn contains_node(&self, token: &str) -> bool {
        self.index.contains_key(token)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The cluster a node belongs to, if any.
    pub fn cluster_of(&self, token: &str) -> Option<&Cluster> {
        self.clusters
            .iter()
            .find(|cluster| cluster.members.iter().any(|m| m == token))
    }

    /// Palette entries used by at least one node, in palette order.
    pub fn classes_in_use(&self) -> Vec<ClassDef> {
        self.palette
            .iter()
            .filter(|def| self.nodes.iter().any(|n| n.class == Some(def.class)))
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_tokens_are_dropped() {
        let mut graph = Subgraph::new(&ATTACK_SURFACE_PALETTE);
        assert!(graph.add_node("sg_1", "web", Some(StyleClass::Sg)));
        assert!(!graph.add_node("sg_1", "other", Some(StyleClass::Sg)));
        assert_eq!(graph.nodes().len(), 1);
        assert_eq!(graph.node("sg_1").map(|n| n.label.as_str()), Some("web"));
    }

    #[test]
    fn test_classes_in_use_follow_palette_order() {
        let mut graph = Subgraph::new(&ATTACK_SURFACE_PALETTE);
        graph.add_node("i-1", "i-1 (t3.micro)", Some(StyleClass::Ec2));
        graph.add_node("CIDR_0_0_0_0_0", "0.0.0.0/0", Some(StyleClass::Cidr));
        graph.add_node("plain", "no class", None);

        let used: Vec<_> = graph.classes_in_use().iter().map(|d| d.class).collect();
        assert_eq!(used, vec![StyleClass::Cidr, StyleClass::Ec2]);
    }

    #[test]
    fn test_edges_keep_duplicates() {
        let mut graph = Subgraph::default();
        graph.add_edge("a", "b");
        graph.add_edge("a", "b");
        graph.add_labeled_edge("a", "b", "Port 80-80 (tcp)");
        assert_eq!(graph.edges().len(), 3);
        assert_eq!(graph.edges()[2].label.as_deref(), Some("Port 80-80 (tcp)"));
    }

    #[test]
    fn test_style_class_names() {
        assert_eq!(StyleClass::Ec2.as_str(), "ec2");
        assert_eq!(StyleClass::Lb.to_string(), "lb");
    }
}
