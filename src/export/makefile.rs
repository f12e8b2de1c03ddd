// src/export/makefile.rs

//! Makefile exporter.
//!
//! Each job becomes a rule with its outputs as targets and inputs as
//! prerequisites; a synthetic main target depends on every terminal output
//! (paths no job consumes). Make imposes two constraints the graph itself
//! does not: every job needs at least one output, and paths cannot contain
//! spaces. Violations surface as [`SpillwayError::Export`].

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::data::DataMap;
use crate::errors::{Result, SpillwayError};
use crate::fs::PathOracle;
use crate::plan::{PlanOptions, plan};
use crate::render::{ShellEngine, render_job};
use crate::workflow::Workflow;

use super::{dedent, remove_empty_target, shell_quote};

#[derive(Debug, Clone)]
pub struct MakefileOptions {
    /// Value for the `SHELL :=` assignment; `None` omits it.
    pub shell: Option<String>,
    /// Extra Makefile variables, declared after the workflow's own data
    /// entries and overriding them on key collisions.
    pub variables: DataMap,
    /// Export only outdated jobs (default true).
    pub outdated_only: bool,
}

impl Default for MakefileOptions {
    fn default() -> Self {
        Self {
            shell: Some("/bin/bash".to_string()),
            variables: DataMap::default(),
            outdated_only: true,
        }
    }
}

/// Write `workflow` as a Makefile at `path`.
///
/// Returns the number of jobs exported. With zero jobs no Makefile is
/// written and any existing file at `path` is removed.
pub fn to_makefile(
    workflow: &Workflow,
    oracle: &dyn PathOracle,
    path: impl AsRef<Path>,
    options: &MakefileOptions,
) -> Result<usize> {
    let path = path.as_ref();
    let plan_options = PlanOptions {
        outdated_only: options.outdated_only,
        with_descendants: true,
    };
    let jobs = plan(workflow, oracle, &plan_options);

    if jobs.is_empty() {
        remove_empty_target(path)?;
        return Ok(0);
    }

    let engine = ShellEngine;
    let mut rules = String::new();
    let mut terminal_outputs: Vec<String> = Vec::new();
    let mut all_paths: Vec<String> = Vec::new();

    for job in &jobs {
        let inputs = job.input_paths();
        let outputs = job.output_paths();

        if outputs.is_empty() {
            return Err(SpillwayError::Export(format!(
                "make requires at least one output per job; job '{}' has none",
                job.id
            )));
        }
        for path in inputs.iter().chain(outputs.iter()) {
            if path.contains(' ') {
                return Err(SpillwayError::Export(format!(
                    "make cannot handle spaces in path names: '{path}'"
                )));
            }
            if !all_paths.contains(path) {
                all_paths.push(path.clone());
            }
        }

        for output in &outputs {
            let (_, consumers) = workflow.path_jobs(output)?;
            if consumers.is_empty() && !terminal_outputs.contains(output) {
                terminal_outputs.push(output.clone());
            }
        }

        let body = dedent(&render_job(workflow, &job.id, &engine)?, true);
        let recipe: Vec<String> = body.into_iter().map(|line| format!("\t@{line}")).collect();
        rules.push_str(&format!(
            "\n# {}\n{}: {}\n{}\n",
            job.id,
            outputs.join(" "),
            inputs.join(" "),
            recipe.join("\n")
        ));
    }

    // Main target name must not collide with any path.
    let mut main_target = "all".to_string();
    let mut suffix = 0;
    while all_paths.contains(&main_target) {
        suffix += 1;
        main_target = format!("all_{suffix}");
    }

    let mut text = String::new();
    if let Some(shell) = &options.shell {
        text.push_str(&format!("SHELL := {shell}\n"));
    }
    let mut variables = workflow.data();
    for (key, value) in options.variables.iter() {
        variables.set(key, value.clone());
    }
    for (key, value) in variables.iter() {
        text.push_str(&format!("{key} = {}\n", shell_quote(&value.as_text())));
    }
    text.push_str(&format!(
        "\n{main_target}: {}\n",
        terminal_outputs.join(" ")
    ));
    text.push_str(&rules);

    fs::write(path, text)?;

    debug!(jobs = jobs.len(), path = %path.display(), "makefile exported");
    info!(
        workflow = %workflow.name(),
        jobs = jobs.len(),
        "exported workflow as makefile"
    );
    Ok(jobs.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PathList;
    use crate::fs::mock::MockOracle;
    use crate::workflow::JobDef;

    fn diamond() -> Workflow {
        let mut workflow = Workflow::new("diamond");
        workflow
            .add_jobs([
                JobDef::new(["src"], ["left", "right"])
                    .id("split")
                    .content("split $INPUT"),
                JobDef::new(["left", "right"], ["merged"])
                    .id("merge")
                    .content("cat $INPUTS > $OUTPUT"),
            ])
            .unwrap();
        workflow
    }

    #[test]
    fn rules_and_main_target() {
        let workflow = diamond();
        let oracle = MockOracle::new();
        oracle.add_file("src", 10);

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("Makefile");
        let exported = to_makefile(&workflow, &oracle, &target, &MakefileOptions::default()).unwrap();
        assert_eq!(exported, 2);

        let text = fs::read_to_string(&target).unwrap();
        assert!(text.starts_with("SHELL := /bin/bash\n"));
        assert!(text.contains("\nall: merged\n"));
        assert!(text.contains("left right: src\n\t@split src\n"));
        assert!(text.contains("merged: left right\n\t@cat left right > merged\n"));
    }

    #[test]
    fn job_without_output_is_rejected() {
        let mut workflow = Workflow::new("sink");
        workflow
            .add_job(JobDef::new(["in"], PathList::empty()).id("consume").content("eat $INPUT"))
            .unwrap();
        let oracle = MockOracle::new();

        let dir = tempfile::tempdir().unwrap();
        let err = to_makefile(
            &workflow,
            &oracle,
            dir.path().join("Makefile"),
            &MakefileOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SpillwayError::Export(_)));
    }

    #[test]
    fn path_with_space_is_rejected() {
        let mut workflow = Workflow::new("spaced");
        workflow
            .add_job(JobDef::new(["raw file"], ["out"]).id("j").content("x"))
            .unwrap();
        let oracle = MockOracle::new();

        let dir = tempfile::tempdir().unwrap();
        let err = to_makefile(
            &workflow,
            &oracle,
            dir.path().join("Makefile"),
            &MakefileOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SpillwayError::Export(_)));
    }

    #[test]
    fn main_target_avoids_path_collisions() {
        let mut workflow = Workflow::new("collide");
        workflow
            .add_job(JobDef::new(["src"], ["all"]).id("build").content("make-it"))
            .unwrap();
        let oracle = MockOracle::new();
        oracle.add_file("src", 10);

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("Makefile");
        to_makefile(&workflow, &oracle, &target, &MakefileOptions::default()).unwrap();

        let text = fs::read_to_string(&target).unwrap();
        assert!(text.contains("\nall_1: all\n"));
    }
}
