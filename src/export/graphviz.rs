// src/export/graphviz.rs

//! Graphviz DOT exporter.
//!
//! Jobs render as boxes, paths as ellipses, with fill colors reflecting the
//! planner's status for each node. Node identifiers are prefixed `JOB:` and
//! `PATH:` so a job and a path sharing a name stay distinct.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::errors::Result;
use crate::fs::PathOracle;
use crate::plan::{JobStatus, PathStatus, PlanOptions, plan};
use crate::workflow::Workflow;

use super::remove_empty_target;

#[derive(Debug, Clone)]
pub struct GraphvizOptions {
    /// Export only outdated jobs (default true).
    pub outdated_only: bool,
    /// Fill nodes with status colors (default true).
    pub decorated: bool,
}

impl Default for GraphvizOptions {
    fn default() -> Self {
        Self {
            outdated_only: true,
            decorated: true,
        }
    }
}

const JOB_CURRENT_COLOR: &str = "#00FF00";
const JOB_OUTDATED_COLOR: &str = "#FF4000";
const PATH_CURRENT_COLOR: &str = "#E5FFCC";
const PATH_MISSING_COLOR: &str = "#FF8C8C";
const PATH_OUTDATED_COLOR: &str = "#FFDC00";

fn job_color(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Current => JOB_CURRENT_COLOR,
        JobStatus::Outdated => JOB_OUTDATED_COLOR,
    }
}

fn path_color(status: PathStatus) -> &'static str {
    match status {
        PathStatus::Current => PATH_CURRENT_COLOR,
        PathStatus::Missing => PATH_MISSING_COLOR,
        PathStatus::Outdated => PATH_OUTDATED_COLOR,
    }
}

fn quoted(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', r"\\").replace('"', "\\\""))
}

/// Render `workflow` as a DOT digraph.
pub fn to_dot(
    workflow: &Workflow,
    oracle: &dyn PathOracle,
    options: &GraphvizOptions,
) -> Result<String> {
    let plan_options = PlanOptions {
        outdated_only: options.outdated_only,
        with_descendants: true,
    };
    let jobs = plan(workflow, oracle, &plan_options);

    let mut dot = String::new();
    dot.push_str(&format!("digraph {} {{\n", quoted(workflow.name())));
    dot.push_str("    rankdir=LR;\n");
    dot.push_str("    node [style=\"rounded,filled\", fontname=\"Monospace\"];\n");

    let mut seen_paths: Vec<&str> = Vec::new();
    for job in &jobs {
        let job_key = quoted(&format!("JOB:{}", job.id));
        if options.decorated {
            dot.push_str(&format!(
                "    {job_key} [label={}, shape=box, fillcolor={}];\n",
                quoted(&job.id),
                quoted(job_color(job.status))
            ));
        } else {
            dot.push_str(&format!(
                "    {job_key} [label={}, shape=box];\n",
                quoted(&job.id)
            ));
        }

        for (path, status) in job.inputs.iter().chain(job.outputs.iter()) {
            if seen_paths.contains(&path.as_str()) {
                continue;
            }
            seen_paths.push(path);
            let path_key = quoted(&format!("PATH:{path}"));
            if options.decorated {
                dot.push_str(&format!(
                    "    {path_key} [label={}, shape=ellipse, fillcolor={}];\n",
                    quoted(path),
                    quoted(path_color(*status))
                ));
            } else {
                dot.push_str(&format!(
                    "    {path_key} [label={}, shape=ellipse];\n",
                    quoted(path)
                ));
            }
        }

        for (path, _) in &job.inputs {
            dot.push_str(&format!(
                "    {} -> {job_key};\n",
                quoted(&format!("PATH:{path}"))
            ));
        }
        for (path, _) in &job.outputs {
            dot.push_str(&format!(
                "    {job_key} -> {};\n",
                quoted(&format!("PATH:{path}"))
            ));
        }
    }

    dot.push_str("}\n");
    debug!(jobs = jobs.len(), "DOT graph rendered");
    Ok(dot)
}

/// Write the DOT rendition of `workflow` to `path`.
///
/// Returns the number of jobs exported. With zero jobs no file is written
/// and any existing file at `path` is removed.
pub fn write_dot(
    workflow: &Workflow,
    oracle: &dyn PathOracle,
    path: impl AsRef<Path>,
    options: &GraphvizOptions,
) -> Result<usize> {
    let path = path.as_ref();
    let plan_options = PlanOptions {
        outdated_only: options.outdated_only,
        with_descendants: true,
    };
    let count = plan(workflow, oracle, &plan_options).len();

    if count == 0 {
        remove_empty_target(path)?;
        return Ok(0);
    }

    fs::write(path, to_dot(workflow, oracle, options)?)?;
    info!(
        workflow = %workflow.name(),
        jobs = count,
        path = %path.display(),
        "exported workflow as DOT graph"
    );
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockOracle;
    use crate::workflow::JobDef;

    fn pipeline() -> Workflow {
        let mut workflow = Workflow::new("viz");
        workflow
            .add_job(JobDef::new(["in.txt"], ["out.txt"]).id("convert"))
            .unwrap();
        workflow
    }

    #[test]
    fn nodes_and_edges_are_present() {
        let workflow = pipeline();
        let oracle = MockOracle::new();
        oracle.add_file("in.txt", 10);

        let dot = to_dot(&workflow, &oracle, &GraphvizOptions::default()).unwrap();
        assert!(dot.contains("\"JOB:convert\" [label=\"convert\", shape=box"));
        assert!(dot.contains("\"PATH:in.txt\""));
        assert!(dot.contains("\"PATH:in.txt\" -> \"JOB:convert\";"));
        assert!(dot.contains("\"JOB:convert\" -> \"PATH:out.txt\";"));
    }

    #[test]
    fn status_colors_follow_the_plan() {
        let workflow = pipeline();
        let oracle = MockOracle::new();
        oracle.add_file("in.txt", 10);
        // out.txt missing, so the job is outdated

        let dot = to_dot(&workflow, &oracle, &GraphvizOptions::default()).unwrap();
        assert!(dot.contains(&format!("fillcolor=\"{JOB_OUTDATED_COLOR}\"")));
        assert!(dot.contains(&format!("fillcolor=\"{PATH_MISSING_COLOR}\"")));
    }

    #[test]
    fn undecorated_output_has_no_colors() {
        let workflow = pipeline();
        let oracle = MockOracle::new();

        let options = GraphvizOptions {
            decorated: false,
            ..GraphvizOptions::default()
        };
        let dot = to_dot(&workflow, &oracle, &options).unwrap();
        assert!(!dot.contains("fillcolor"));
    }

    #[test]
    fn zero_jobs_removes_the_target() {
        let workflow = pipeline();
        let oracle = MockOracle::new();
        oracle.add_file("in.txt", 10);
        oracle.add_file("out.txt", 20);

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("graph.dot");
        fs::write(&target, "old").unwrap();

        let count = write_dot(&workflow, &oracle, &target, &GraphvizOptions::default()).unwrap();
        assert_eq!(count, 0);
        assert!(!target.exists());
    }
}
