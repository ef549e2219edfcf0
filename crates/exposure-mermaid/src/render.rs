//! Subgraph serialization.

use std::collections::HashSet;

use exposure_core::Subgraph;

use crate::mermaid::MermaidBuilder;

/// Render a subgraph as Mermaid flowchart text.
///
/// Emits, in order: the `graph TD` header, clustered nodes inside their
/// `subgraph` blocks, the remaining nodes, the edges, and finally (after a
/// blank line) one `classDef` per class in use and one `class` line per
/// styled node. The style section is omitted when no node carries a class.
pub fn render(graph: &Subgraph) -> String {
    let estimated = graph.nodes().len() * 48 + graph.edges().len() * 64 + 64;
    let mut builder = MermaidBuilder::with_capacity(estimated);

    let mut clustered: HashSet<&str> = HashSet::new();
    for cluster in graph.clusters() {
        builder.start_cluster(&cluster.id, &cluster.label);
        for member in &cluster.members {
            if let Some(node) = graph.node(member) {
                builder.node(&node.token, &node.label);
                clustered.insert(node.token.as_str());
            }
        }
        builder.end_cluster();
    }

    for node in graph
        .nodes()
        .iter()
        .filter(|n| !clustered.contains(n.token.as_str()))
    {
        builder.node(&node.token, &node.label);
    }

    for edge in graph.edges() {
        match &edge.label {
            Some(label) => builder.labeled_edge(&edge.from, &edge.to, label),
            None => builder.edge(&edge.from, &edge.to),
        };
    }

    let classes = graph.classes_in_use();
    if !classes.is_empty() {
        builder.blank();
        for def in &classes {
            builder.class_def(def.class.as_str(), def.fill);
        }
        for node in graph.nodes() {
            if let Some(class) = node.class {
                builder.class(&node.token, class.as_str());
            }
        }
    }

    builder.build()
}
