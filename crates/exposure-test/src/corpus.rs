//! `.exposure` corpus files.
//!
//! ```text
//! $// optional comment, kept with the next case
//! ===============================================================================
//! single web server
//! ===============================================================================
//!
//! args: --vpc-id vpc-1
//!
//! --- file: inventory.json ---
//! { "security_groups": [] }
//!
//! --- expect:report ---
//! No external CIDR exposures found.
//! ```
//!
//! Case names only come from banner blocks, so report text such as
//! `=== Attack Surface: 0.0.0.0/0 ===` can sit inside an expectation.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use shell_words::{join, split};
use walkdir::WalkDir;

pub const CORPUS_EXTENSION: &str = "exposure";

const CASE_BANNER: &str =
    "===============================================================================";

fn slugify_case_name(raw: &str) -> String {
    let mut slug = String::new();
    let mut pending_dash = false;

    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(ch.to_ascii_lowercase());
            pending_dash = false;
        } else if !slug.is_empty() {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "case".to_string()
    } else {
        slug
    }
}

/// Every corpus file found under a root directory (e.g. `tests/corpus`).
pub struct Corpus {
    files: Vec<CorpusFile>,
}

impl Corpus {
    pub fn load(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        if !root.exists() {
            bail!("corpus root {} does not exist", root.display());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root)
            .into_iter()
            .filter_map(|res| res.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                entry.path().extension().and_then(|ext| ext.to_str()) == Some(CORPUS_EXTENSION)
            })
        {
            let rel = entry
                .path()
                .strip_prefix(root)
                .unwrap_or_else(|_| entry.path());
            let suite = rel.with_extension("").to_string_lossy().replace('\\', "/");
            files.push(CorpusFile::load(entry.path(), suite)?);
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(Self { files })
    }

    pub fn files(&self) -> &[CorpusFile] {
        &self.files
    }

    pub fn files_mut(&mut self) -> &mut [CorpusFile] {
        &mut self.files
    }

    /// Rewrite every file whose expectations were blessed.
    pub fn write_updates(&mut self) -> Result<()> {
        for file in self.files.iter_mut().filter(|f| f.dirty) {
            fs::write(&file.path, file.render())
                .with_context(|| format!("failed to update {}", file.path.display()))?;
            file.dirty = false;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct CorpusFile {
    pub path: PathBuf,
    pub suite: String,
    pub cases: Vec<CorpusCase>,
    pub(crate) dirty: bool,
}

impl CorpusFile {
    pub fn load(path: &Path, suite: String) -> Result<Self> {
        let canonical = path
            .canonicalize()
            .with_context(|| format!("failed to resolve {}", path.display()))?;
        let content = fs::read_to_string(&canonical)
            .with_context(|| format!("failed to read {}", canonical.display()))?;
        let cases = parse_corpus_file(&suite, &canonical, &content)?;
        Ok(Self {
            path: canonical,
            suite,
            cases,
            dirty: false,
        })
    }

    pub fn cases(&self) -> &[CorpusCase] {
        &self.cases
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn render(&self) -> String {
        let rendered: Vec<String> = self
            .cases
            .iter()
            .map(|case| case.render().trim_end_matches('\n').to_string())
            .collect();
        let mut buf = rendered.join("\n\n\n");
        buf.push('\n');
        buf
    }
}

#[derive(Debug, Clone)]
pub struct CorpusCase {
    pub suite: String,
    pub name: String,
    /// Extra command-line style arguments, e.g. `--vpc-id vpc-1`.
    pub args: Vec<String>,
    pub files: Vec<TestFile>,
    pub expectations: Vec<CorpusCaseExpectation>,
    /// `$//` comment lines preceding the banner.
    pub comments: Vec<String>,
}

impl CorpusCase {
    fn new(suite: &str, name: &str, comments: Vec<String>) -> Self {
        Self {
            suite: suite.to_string(),
            name: slugify_case_name(name),
            args: Vec::new(),
            files: Vec::new(),
            expectations: Vec::new(),
            comments,
        }
    }

    pub fn id(&self) -> String {
        format!("{}::{}", self.suite, self.name)
    }

    pub fn file(&self, path: &str) -> Option<&TestFile> {
        self.files.iter().find(|file| file.path == path)
    }

    pub fn expectation(&self, kind: &str) -> Option<&str> {
        self.expectations
            .iter()
            .find(|entry| entry.kind == kind)
            .map(|entry| entry.value.as_str())
    }

    pub fn render(&self) -> String {
        let mut buf = String::new();
        for comment in &self.comments {
            buf.push_str(comment);
            buf.push('\n');
        }
        for line in [CASE_BANNER, self.name.as_str(), CASE_BANNER] {
            buf.push_str(line);
            buf.push('\n');
        }
        buf.push('\n');
        if !self.args.is_empty() {
            buf.push_str(&format!("args: {}\n\n", join(&self.args)));
        }

        let sections = self
            .files
            .iter()
            .map(|file| (format!("file: {}", file.path), &file.contents))
            .chain(
                self.expectations
                    .iter()
                    .map(|expect| (format!("expect:{}", expect.kind), &expect.value)),
            );
        for (header, body) in sections {
            buf.push_str(&format!("--- {header} ---\n"));
            buf.push_str(body);
            if !body.ends_with('\n') {
                buf.push('\n');
            }
            buf.push('\n');
        }
        buf
    }
}

#[derive(Debug, Clone)]
pub struct TestFile {
    pub path: String,
    pub contents: String,
}

#[derive(Debug, Clone)]
pub struct CorpusCaseExpectation {
    pub kind: String,
    pub value: String,
}

#[derive(Debug, Clone)]
enum SectionHeader {
    File { path: String },
    Expect { kind: String },
}

fn parse_section_header(line: &str) -> Option<SectionHeader> {
    let inner = line.strip_prefix("---")?.strip_suffix("---")?.trim();
    if let Some(rest) = inner.strip_prefix("file:") {
        return Some(SectionHeader::File {
            path: rest.trim().to_string(),
        });
    }
    inner.strip_prefix("expect:").map(|rest| SectionHeader::Expect {
        kind: rest.trim().to_string(),
    })
}

fn is_banner_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 5 && trimmed.chars().all(|ch| ch == '=')
}

/// Where the reader is inside a banner block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Banner {
    Outside,
    AwaitingName,
    AwaitingClose,
}

/// Line-driven reader that accumulates cases.
struct CaseReader<'a> {
    suite: &'a str,
    path: &'a Path,
    cases: Vec<CorpusCase>,
    current: Option<CorpusCase>,
    section: Option<SectionHeader>,
    section_lines: Vec<String>,
    comments: Vec<String>,
    banner: Banner,
}

impl<'a> CaseReader<'a> {
    fn new(suite: &'a str, path: &'a Path) -> Self {
        Self {
            suite,
            path,
            cases: Vec::new(),
            current: None,
            section: None,
            section_lines: Vec::new(),
            comments: Vec::new(),
            banner: Banner::Outside,
        }
    }

    fn feed(&mut self, raw_line: &str) -> Result<()> {
        let line = raw_line.trim_end_matches('\r');
        let trimmed = line.trim();

        if trimmed.starts_with("$//") {
            self.comments.push(line.to_string());
            return Ok(());
        }

        match self.banner {
            Banner::AwaitingClose => {
                if trimmed.is_empty() {
                    return Ok(());
                }
                if !is_banner_line(line) {
                    bail!(
                        "expected closing banner after case '{}' in {}",
                        self.current.as_ref().map(|c| c.name.as_str()).unwrap_or("unknown"),
                        self.path.display()
                    );
                }
                self.banner = Banner::Outside;
                return Ok(());
            }
            Banner::AwaitingName => {
                if trimmed.is_empty() {
                    return Ok(());
                }
                self.finish_case()?;
                let comments = std::mem::take(&mut self.comments);
                self.current = Some(CorpusCase::new(self.suite, trimmed, comments));
                self.banner = Banner::AwaitingClose;
                return Ok(());
            }
            Banner::Outside => {}
        }

        if is_banner_line(line) {
            self.finish_case()?;
            self.banner = Banner::AwaitingName;
            return Ok(());
        }

        if let Some(section) = parse_section_header(line) {
            self.finish_section()?;
            self.section = Some(section);
            return Ok(());
        }

        if self.section.is_some() {
            self.section_lines.push(line.to_string());
            return Ok(());
        }

        if trimmed.is_empty() {
            return Ok(());
        }
        self.metadata(line, trimmed)
    }

    fn metadata(&mut self, line: &str, trimmed: &str) -> Result<()> {
        let path = self.path;
        let case = self.current.as_mut().ok_or_else(|| {
            anyhow!(
                "content encountered before case header in {}",
                path.display()
            )
        })?;

        match trimmed.split_once(':') {
            Some(("args", value)) => {
                case.args = split(value.trim())
                    .map_err(|err| anyhow!("invalid args in {}: {}", path.display(), err))?;
                Ok(())
            }
            Some((other, _)) => Err(anyhow!(
                "unsupported metadata '{}' in {} case {}",
                other.trim(),
                path.display(),
                case.name
            )),
            None => Err(anyhow!(
                "unexpected line '{}' in {} (within case {})",
                line,
                path.display(),
                case.name
            )),
        }
    }

    fn finish_section(&mut self) -> Result<()> {
        let lines = std::mem::take(&mut self.section_lines);
        let Some(section) = self.section.take() else {
            return Ok(());
        };
        let case = self
            .current
            .as_mut()
            .ok_or_else(|| anyhow!("section declared before any case header"))?;

        // Trailing blank lines separate sections; they are not content.
        let mut content = lines.join("\n").trim_end_matches('\n').to_string();
        if !content.is_empty() {
            content.push('\n');
        }

        match section {
            SectionHeader::File { path } => case.files.push(TestFile {
                path,
                contents: content,
            }),
            SectionHeader::Expect { kind } => case.expectations.push(CorpusCaseExpectation {
                kind,
                value: content,
            }),
        }
        Ok(())
    }

    fn finish_case(&mut self) -> Result<()> {
        self.finish_section()?;
        if let Some(case) = self.current.take() {
            self.cases.push(case);
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<CorpusCase>> {
        if self.banner != Banner::Outside {
            bail!(
                "unterminated banner in {} (missing case name or closing separator)",
                self.path.display()
            );
        }
        self.finish_case()?;

        if self.cases.is_empty() {
            bail!("corpus file {} does not contain any cases", self.path.display());
        }
        if let Some(case) = self.cases.iter().find(|case| case.files.is_empty()) {
            bail!(
                "case {} in {} does not declare any files",
                case.id(),
                self.path.display()
            );
        }
        Ok(self.cases)
    }
}

fn parse_corpus_file(suite: &str, path: &Path, content: &str) -> Result<Vec<CorpusCase>> {
    let mut reader = CaseReader::new(suite, path);
    for line in content.lines() {
        reader.feed(line)?;
    }
    reader.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "$// exposes one web server
===============================================================================
Single web server!
===============================================================================

args: --vpc-id vpc-1

--- file: inventory.json ---
{ \"security_groups\": [] }

--- expect:report ---
=== Attack Surface: 0.0.0.0/0 ===

graph TD
  CIDR_0_0_0_0_0[\"0.0.0.0/0\"]


===============================================================================
second
===============================================================================

--- file: inventory.json ---
{}
";

    fn parse(text: &str) -> Result<Vec<CorpusCase>> {
        parse_corpus_file("suite", Path::new("sample.exposure"), text)
    }

    #[test]
    fn test_parse_cases() {
        let cases = parse(SAMPLE).unwrap();
        assert_eq!(cases.len(), 2);

        let first = &cases[0];
        assert_eq!(first.id(), "suite::single-web-server");
        assert_eq!(first.args, vec!["--vpc-id", "vpc-1"]);
        assert_eq!(first.comments, vec!["$// exposes one web server"]);
        assert_eq!(
            first.file("inventory.json").map(|f| f.contents.as_str()),
            Some("{ \"security_groups\": [] }\n")
        );
        // Report headers inside an expectation are plain content.
        assert_eq!(
            first.expectation("report"),
            Some("=== Attack Surface: 0.0.0.0/0 ===\n\ngraph TD\n  CIDR_0_0_0_0_0[\"0.0.0.0/0\"]\n")
        );
        assert!(cases[1].expectations.is_empty());
    }

    #[test]
    fn test_render_round_trip() {
        let cases = parse(SAMPLE).unwrap();
        let file = CorpusFile {
            path: PathBuf::from("sample.exposure"),
            suite: "suite".to_string(),
            cases,
            dirty: false,
        };
        let reparsed = parse(&file.render()).unwrap();
        assert_eq!(reparsed.len(), 2);
        assert_eq!(reparsed[0].args, file.cases[0].args);
        assert_eq!(
            reparsed[0].expectation("report"),
            file.cases[0].expectation("report")
        );
    }

    #[test]
    fn test_rejects_unknown_metadata() {
        let text = "=====\nx\n=====\nlang: rust\n--- file: inventory.json ---\n{}\n";
        let err = parse(text).unwrap_err();
        assert!(err.to_string().contains("unsupported metadata 'lang'"));
    }

    #[test]
    fn test_rejects_case_without_files() {
        let err = parse("=====\nempty\n=====\n").unwrap_err();
        assert!(err.to_string().contains("does not declare any files"));
    }

    #[test]
    fn test_slug() {
        assert_eq!(slugify_case_name("  VPC scoping (B) "), "vpc-scoping-b");
        assert_eq!(slugify_case_name("!!!"), "case");
    }
}
