// src/export/shell.rs

//! Shell script exporter.
//!
//! Jobs run sequentially in execution order, so every input is produced by
//! an earlier line of the script. Each job becomes a `# id` comment followed
//! by its rendered, dedented content.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::errors::Result;
use crate::fs::PathOracle;
use crate::plan::{PlanOptions, plan_ids};
use crate::render::{ShellEngine, render_job};
use crate::workflow::Workflow;

use super::{dedent, remove_empty_target};

#[derive(Debug, Clone)]
pub struct ShellScriptOptions {
    /// Interpreter for the shebang line.
    pub shell: String,
    /// Lines inserted verbatim between the shebang and the first job, e.g.
    /// `set -e` so a failing job aborts the run.
    pub args: Vec<String>,
    /// Export only outdated jobs (default true).
    pub outdated_only: bool,
}

impl Default for ShellScriptOptions {
    fn default() -> Self {
        Self {
            shell: "/bin/bash".to_string(),
            args: vec!["set -e".to_string()],
            outdated_only: true,
        }
    }
}

/// Write `workflow` as an executable shell script at `path`.
///
/// Returns the number of jobs exported. With zero jobs no script is written
/// and any existing file at `path` is removed.
pub fn to_shell_script(
    workflow: &Workflow,
    oracle: &dyn PathOracle,
    path: impl AsRef<Path>,
    options: &ShellScriptOptions,
) -> Result<usize> {
    let path = path.as_ref();
    let plan_options = PlanOptions {
        outdated_only: options.outdated_only,
        with_descendants: true,
    };
    let ids = plan_ids(workflow, oracle, &plan_options);

    if ids.is_empty() {
        remove_empty_target(path)?;
        return Ok(0);
    }

    let engine = ShellEngine;
    let mut script = format!("#!{}\n", options.shell.trim());
    if !options.args.is_empty() {
        script.push('\n');
        for arg in &options.args {
            script.push_str(arg.trim());
            script.push('\n');
        }
    }

    for id in &ids {
        let body = dedent(&render_job(workflow, id, &engine)?, false);
        script.push_str(&format!("\n# {id}\n{}\n", body.join("\n")));
    }

    fs::write(path, script)?;
    make_executable(path)?;

    debug!(jobs = ids.len(), path = %path.display(), "shell script exported");
    info!(
        workflow = %workflow.name(),
        jobs = ids.len(),
        "exported workflow as shell script"
    );
    Ok(ids.len())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockOracle;
    use crate::workflow::JobDef;

    fn chain() -> Workflow {
        let mut workflow = Workflow::new("chain");
        workflow
            .add_jobs([
                JobDef::new(["a"], ["b"]).id("first").content("gen $INPUT $OUTPUT"),
                JobDef::new(["b"], ["c"]).id("second").content("gen $INPUT $OUTPUT"),
            ])
            .unwrap();
        workflow
    }

    #[test]
    fn script_lists_jobs_in_execution_order() {
        let workflow = chain();
        let oracle = MockOracle::new();
        oracle.add_file("a", 10);

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("run.sh");
        let exported =
            to_shell_script(&workflow, &oracle, &target, &ShellScriptOptions::default()).unwrap();

        assert_eq!(exported, 2);
        let script = fs::read_to_string(&target).unwrap();
        assert!(script.starts_with("#!/bin/bash\n"));
        assert!(script.contains("set -e"));
        let first = script.find("# first").unwrap();
        let second = script.find("# second").unwrap();
        assert!(first < second);
        assert!(script.contains("gen a b"));
        assert!(script.contains("gen b c"));
    }

    #[test]
    fn zero_jobs_removes_the_target() {
        let workflow = chain();
        let oracle = MockOracle::new();
        // everything exists, downstream newer than upstream
        oracle.add_file("a", 10);
        oracle.add_file("b", 20);
        oracle.add_file("c", 30);

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("run.sh");
        fs::write(&target, "stale leftover").unwrap();

        let exported =
            to_shell_script(&workflow, &oracle, &target, &ShellScriptOptions::default()).unwrap();
        assert_eq!(exported, 0);
        assert!(!target.exists());
    }

    #[cfg(unix)]
    #[test]
    fn script_is_executable() {
        use std::os::unix::fs::PermissionsExt;

        let workflow = chain();
        let oracle = MockOracle::new();
        oracle.add_file("a", 10);

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("run.sh");
        to_shell_script(&workflow, &oracle, &target, &ShellScriptOptions::default()).unwrap();

        let mode = fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}
