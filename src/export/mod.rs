// src/export/mod.rs

//! Workflow exporters: shell script, Makefile, and Graphviz DOT.
//!
//! All exporters share the same contract: jobs come out in execution order
//! as computed by the planner, an `outdated_only` switch restricts them to
//! the stale subset, and a file-writing exporter that ends up with zero jobs
//! removes its target instead of leaving an empty artifact behind.

mod graphviz;
mod makefile;
mod shell;

pub use graphviz::{GraphvizOptions, to_dot, write_dot};
pub use makefile::{MakefileOptions, to_makefile};
pub use shell::{ShellScriptOptions, to_shell_script};

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::errors::Result;

/// Strip the common leading indentation from a text block.
///
/// Lines are right-trimmed first. With `skip_empty_lines`, blank lines are
/// dropped entirely (Make rejects them inside a recipe); otherwise they are
/// kept but do not count towards the common indentation. A single leading
/// and trailing blank line are removed either way, so templates written as
/// indented multi-line string literals export cleanly.
fn dedent(text: &str, skip_empty_lines: bool) -> Vec<String> {
    let mut lines: Vec<&str> = Vec::new();
    let mut common_indent = usize::MAX;

    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            if !skip_empty_lines {
                lines.push(line);
            }
            continue;
        }
        let indent = line.len() - line.trim_start().len();
        common_indent = common_indent.min(indent);
        lines.push(line);
    }

    if lines.first().is_some_and(|l| l.is_empty()) {
        lines.remove(0);
    }
    if lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    let common_indent = if common_indent == usize::MAX {
        0
    } else {
        common_indent
    };
    lines
        .into_iter()
        .map(|line| line.get(common_indent..).unwrap_or("").to_string())
        .collect()
}

/// POSIX shell quoting for Makefile variable values.
fn shell_quote(text: &str) -> String {
    let safe = !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_@%+=:,./-".contains(c));
    if safe {
        text.to_string()
    } else {
        format!("'{}'", text.replace('\'', r"'\''"))
    }
}

/// Remove the target of an exporter that produced zero jobs.
fn remove_empty_target(path: &Path) -> Result<()> {
    if path.exists() {
        debug!(path = %path.display(), "removing target; no jobs to export");
        fs::remove_file(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedent_strips_common_indentation() {
        let block = "\n    first\n      second\n    third\n";
        assert_eq!(dedent(block, false), ["first", "  second", "third"]);
    }

    #[test]
    fn dedent_can_drop_blank_lines() {
        let block = "  a\n\n  b";
        assert_eq!(dedent(block, true), ["a", "b"]);
        assert_eq!(dedent(block, false), ["a", "", "b"]);
    }

    #[test]
    fn quote_only_when_needed() {
        assert_eq!(shell_quote("plain-value_1.0"), "plain-value_1.0");
        assert_eq!(shell_quote("has space"), "'has space'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
    }
}
