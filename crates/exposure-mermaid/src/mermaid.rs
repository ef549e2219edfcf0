//! Mermaid flowchart utilities.

use std::fmt::Write;

/// Escape characters that would end a quoted Mermaid label.
pub fn escape_label(input: &str) -> String {
    input.replace('"', "#quot;").replace('\n', "<br/>")
}

/// Write indentation to output.
pub fn write_indent(output: &mut String, level: usize) {
    for _ in 0..level {
        output.push_str("  ");
    }
}

/// Builder for `graph TD` flowchart text.
///
/// Every statement is written on its own line, indented two spaces per
/// nesting level. Callers are expected to pass tokens that are already
/// sanitized.
pub struct MermaidBuilder {
    output: String,
    indent: usize,
}

impl Default for MermaidBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MermaidBuilder {
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut output = String::with_capacity(capacity);
        output.push_str("graph TD\n");
        Self { output, indent: 1 }
    }

    /// Add a blank line.
    pub fn blank(&mut self) -> &mut Self {
        self.output.push('\n');
        self
    }

    /// `token["label"]`
    pub fn node(&mut self, token: &str, label: &str) -> &mut Self {
        write_indent(&mut self.output, self.indent);
        let _ = writeln!(self.output, "{}[\"{}\"]", token, escape_label(label));
        self
    }

    /// `from --> to`
    pub fn edge(&mut self, from: &str, to: &str) -> &mut Self {
        write_indent(&mut self.output, self.indent);
        let _ = writeln!(self.output, "{from} --> {to}");
        self
    }

    /// `from -->|"label"| to`
    pub fn labeled_edge(&mut self, from: &str, to: &str, label: &str) -> &mut Self {
        write_indent(&mut self.output, self.indent);
        let _ = writeln!(
            self.output,
            "{} -->|\"{}\"| {}",
            from,
            escape_label(label),
            to
        );
        self
    }

    /// Open a `subgraph id["label"]` block.
    pub fn start_cluster(&mut self, id: &str, label: &str) -> &mut Self {
        write_indent(&mut self.output, self.indent);
        let _ = writeln!(self.output, "subgraph {}[\"{}\"]", id, escape_label(label));
        self.indent += 1;
        self
    }

    /// Close the innermost `subgraph` block.
    pub fn end_cluster(&mut self) -> &mut Self {
        self.indent = self.indent.saturating_sub(1).max(1);
        write_indent(&mut self.output, self.indent);
        self.output.push_str("end\n");
        self
    }

    /// `classDef class fill:#hex`
    pub fn class_def(&mut self, class: &str, fill: &str) -> &mut Self {
        write_indent(&mut self.output, self.indent);
        let _ = writeln!(self.output, "classDef {class} fill:#{fill}");
        self
    }

    /// `class token class`
    pub fn class(&mut self, token: &str, class: &str) -> &mut Self {
        write_indent(&mut self.output, self.indent);
        let _ = writeln!(self.output, "class {token} {class}");
        self
    }

    /// Finish building and return the text.
    pub fn build(self) -> String {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statements() {
        let mut builder = MermaidBuilder::new();
        builder
            .node("sg_1", "web-sg")
            .edge("sg_1", "i-1")
            .labeled_edge("CIDR_0_0_0_0_0", "sg_1", "Port 80-80 (tcp)")
            .blank()
            .class_def("sg", "99ccff")
            .class("sg_1", "sg");
        assert_eq!(
            builder.build(),
            "graph TD\n  sg_1[\"web-sg\"]\n  sg_1 --> i-1\n  CIDR_0_0_0_0_0 -->|\"Port 80-80 (tcp)\"| sg_1\n\n  classDef sg fill:#99ccff\n  class sg_1 sg\n"
        );
    }

    #[test]
    fn test_cluster_nesting() {
        let mut builder = MermaidBuilder::new();
        builder
            .start_cluster("External", "External Networks")
            .node("CIDR____0", "::/0")
            .end_cluster()
            .node("lb", "web (application)");
        assert_eq!(
            builder.build(),
            "graph TD\n  subgraph External[\"External Networks\"]\n    CIDR____0[\"::/0\"]\n  end\n  lb[\"web (application)\"]\n"
        );
    }

    #[test]
    fn test_quotes_are_escaped() {
        assert_eq!(escape_label("say \"hi\""), "say #quot;hi#quot;");
    }
}
