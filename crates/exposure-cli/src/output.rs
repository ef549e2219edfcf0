//! Writing results to stdout, a file, or one file per report section.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use exposure_error::{Error, Result};
use exposure_mermaid::split_sections;

/// Write `text` to `path`, or to stdout when no path is given.
pub fn write_output(text: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, text).map_err(|err| {
                Error::from(err)
                    .with_context("path", path.display().to_string())
                    .with_operation("output::write")
            })?;
            info!(path = %path.display(), "output written");
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            if !text.ends_with('\n') {
                stdout.write_all(b"\n")?;
            }
        }
    }
    Ok(())
}

/// File name for a section title, e.g. `01-attack_surface_0_0_0_0_0.mmd`.
pub fn section_file_name(index: usize, title: &str) -> String {
    let mut stem = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            stem.push(c.to_ascii_lowercase());
        } else if !stem.ends_with('_') {
            stem.push('_');
        }
    }
    let stem = stem.trim_matches('_');
    format!("{:02}-{}.mmd", index + 1, stem)
}

/// Split `text` into sections and write each body to `dir`.
///
/// Returns the written paths in section order. Text without section headers
/// writes nothing.
pub fn write_sections(text: &str, dir: &Path) -> Result<Vec<PathBuf>> {
    let sections = split_sections(text);
    if sections.is_empty() {
        warn!(dir = %dir.display(), "no sections to split");
        return Ok(Vec::new());
    }

    fs::create_dir_all(dir).map_err(|err| {
        Error::from(err)
            .with_context("path", dir.display().to_string())
            .with_operation("output::write_sections")
    })?;

    let mut written = Vec::with_capacity(sections.len());
    for (index, section) in sections.iter().enumerate() {
        let path = dir.join(section_file_name(index, &section.title));
        let mut body = section.body.clone();
        body.push('\n');
        fs::write(&path, body).map_err(|err| {
            Error::from(err)
                .with_context("path", path.display().to_string())
                .with_operation("output::write_sections")
        })?;
        written.push(path);
    }

    info!(count = written.len(), dir = %dir.display(), "sections written");
    Ok(written)
}
