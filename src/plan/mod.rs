// src/plan/mod.rs

//! Staleness propagation over a workflow.
//!
//! Given a [`Workflow`] and a [`PathOracle`], [`plan`] computes one
//! deterministic topological order over the combined job/path graph,
//! resolves every path's effective mtime once, then folds a single pass over
//! the jobs in execution order, threading forward the set of paths that an
//! earlier stale job will (re)generate. The result is the ordered, filtered
//! sequence of [`JobPlan`] reports consumers and exporters work from.
//!
//! A job is outdated iff any of:
//! - an input will be (re)generated by an earlier outdated job,
//! - an input is missing (and nothing upstream will produce it),
//! - an output is missing,
//! - an input is newer than an output.
//!
//! Nothing persists between calls: re-planning after a filesystem change
//! recomputes everything from scratch.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::time::SystemTime;

use tracing::{debug, warn};

use crate::fs::PathOracle;
use crate::workflow::Workflow;

/// Per-job verdict for one planning pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// The job is current and will not run.
    Current,
    /// The job is outdated and will run.
    Outdated,
}

/// Per-path verdict for one planning pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStatus {
    /// The path is current and will not be updated.
    Current,
    /// The path does not exist.
    Missing,
    /// The path is outdated and will be (re)generated.
    Outdated,
}

/// Selection options for [`plan`].
#[derive(Debug, Clone, Copy)]
pub struct PlanOptions {
    /// Keep only outdated jobs (default true).
    pub outdated_only: bool,
    /// Keep jobs that depend on other selected jobs (default true). When
    /// false, only "root" jobs with respect to the active `outdated_only`
    /// setting are returned, guaranteed not to depend on each other.
    pub with_descendants: bool,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            outdated_only: true,
            with_descendants: true,
        }
    }
}

/// One job of the planned sequence, with its per-path statuses in edge order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPlan {
    pub id: String,
    pub status: JobStatus,
    pub inputs: Vec<(String, PathStatus)>,
    pub outputs: Vec<(String, PathStatus)>,
}

impl JobPlan {
    pub fn input_paths(&self) -> Vec<String> {
        self.inputs.iter().map(|(p, _)| p.clone()).collect()
    }

    pub fn output_paths(&self) -> Vec<String> {
        self.outputs.iter().map(|(p, _)| p.clone()).collect()
    }
}

/// Compute the ordered, filtered job sequence for `workflow`.
pub fn plan(workflow: &Workflow, oracle: &dyn PathOracle, options: &PlanOptions) -> Vec<JobPlan> {
    let order = topo_order(workflow);

    // Phase 1: resolve every path mtime once, and extract the job sequence.
    let mut resolver = MtimeResolver::new(oracle);
    let mut mtimes: HashMap<&str, Option<SystemTime>> = HashMap::new();
    let mut job_sequence: Vec<&str> = Vec::new();
    for node in &order {
        match *node {
            PlanNode::Path(path) => {
                mtimes.insert(path, resolver.mtime(path));
            }
            PlanNode::Job(id) => job_sequence.push(id),
        }
    }

    // Phase 2: fold job statuses forward in execution order.
    let mut will_regenerate: HashSet<&str> = HashSet::new();
    let mut plans = Vec::new();

    for id in job_sequence {
        let Some((inputs, outputs)) = workflow.job_io(id) else {
            warn!(job = %id, "job in topological order missing from job table");
            continue;
        };

        let mut flagged: HashMap<&str, PathStatus> = HashMap::new();

        for input in inputs {
            // an earlier stale job will (re)generate this input
            if will_regenerate.contains(input.as_str()) {
                flagged.insert(input, PathStatus::Outdated);
            }
            // missing, and nothing upstream will produce it
            else if mtimes.get(input.as_str()).copied().flatten().is_none() {
                flagged.insert(input, PathStatus::Missing);
            }
        }

        for output in outputs {
            if mtimes.get(output.as_str()).copied().flatten().is_none() {
                flagged.insert(output, PathStatus::Missing);
            }
        }

        // an input newer than an output invalidates that output
        for input in inputs {
            let Some(input_mtime) = mtimes.get(input.as_str()).copied().flatten() else {
                continue;
            };
            for output in outputs {
                let Some(output_mtime) = mtimes.get(output.as_str()).copied().flatten() else {
                    continue;
                };
                if input_mtime > output_mtime {
                    flagged.insert(output, PathStatus::Outdated);
                }
            }
        }

        let status = if flagged.is_empty() {
            JobStatus::Current
        } else {
            JobStatus::Outdated
        };

        if status == JobStatus::Outdated {
            // every output will be (re)generated; outputs not already
            // flagged missing or stale are marked outdated as well
            for output in outputs {
                will_regenerate.insert(output);
                flagged.entry(output).or_insert(PathStatus::Outdated);
            }
        }

        let input_status: Vec<(String, PathStatus)> = inputs
            .iter()
            .map(|p| {
                let st = flagged.get(p.as_str()).copied().unwrap_or(PathStatus::Current);
                (p.clone(), st)
            })
            .collect();
        let output_status: Vec<(String, PathStatus)> = outputs
            .iter()
            .map(|p| {
                let st = flagged.get(p.as_str()).copied().unwrap_or(PathStatus::Current);
                (p.clone(), st)
            })
            .collect();

        // Selection.
        if options.outdated_only && status == JobStatus::Current {
            continue;
        }

        if !options.with_descendants {
            let depends_on_selected = if options.outdated_only {
                input_status
                    .iter()
                    .any(|(_, st)| *st == PathStatus::Outdated)
            } else {
                inputs
                    .iter()
                    .any(|p| !workflow.path_producers(p).is_empty())
            };
            if depends_on_selected {
                continue;
            }
        }

        plans.push(JobPlan {
            id: id.to_string(),
            status,
            inputs: input_status,
            outputs: output_status,
        });
    }

    debug!(
        selected = plans.len(),
        total = workflow.job_count(),
        outdated_only = options.outdated_only,
        "planning pass complete"
    );
    plans
}

/// Like [`plan`], returning job ids only.
pub fn plan_ids(workflow: &Workflow, oracle: &dyn PathOracle, options: &PlanOptions) -> Vec<String> {
    plan(workflow, oracle, options)
        .into_iter()
        .map(|job| job.id)
        .collect()
}

impl Workflow {
    /// Convenience for [`plan`].
    pub fn plan(&self, oracle: &dyn PathOracle, options: &PlanOptions) -> Vec<JobPlan> {
        plan(self, oracle, options)
    }

    /// Convenience for [`plan_ids`].
    pub fn plan_ids(&self, oracle: &dyn PathOracle, options: &PlanOptions) -> Vec<String> {
        plan_ids(self, oracle, options)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlanNode<'a> {
    Job(&'a str),
    Path(&'a str),
}

/// Deterministic topological order over the combined job/path graph.
///
/// Stable Kahn's algorithm: among ready nodes, the one declared earliest
/// goes first. Declaration order interleaves each job's inputs, the job
/// itself, then its outputs, so two runs over the same workflow always
/// produce the same sequence.
fn topo_order(workflow: &Workflow) -> Vec<PlanNode<'_>> {
    // Assign declaration indices.
    let mut nodes: Vec<PlanNode<'_>> = Vec::new();
    let mut path_index: HashMap<&str, usize> = HashMap::new();
    let mut job_index: HashMap<&str, usize> = HashMap::new();

    for id in workflow.job_ids() {
        let Some((inputs, outputs)) = workflow.job_io(id) else {
            continue;
        };
        for input in inputs {
            path_index.entry(input).or_insert_with(|| {
                nodes.push(PlanNode::Path(input));
                nodes.len() - 1
            });
        }
        job_index.insert(id, nodes.len());
        nodes.push(PlanNode::Job(id));
        for output in outputs {
            path_index.entry(output).or_insert_with(|| {
                nodes.push(PlanNode::Path(output));
                nodes.len() - 1
            });
        }
    }

    // Adjacency + in-degrees, edges input -> job -> output.
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    let mut in_degree: Vec<usize> = vec![0; nodes.len()];

    for id in workflow.job_ids() {
        let Some((inputs, outputs)) = workflow.job_io(id) else {
            continue;
        };
        let job = job_index[id];
        for input in inputs {
            let path = path_index[input.as_str()];
            successors[path].push(job);
            in_degree[job] += 1;
        }
        for output in outputs {
            let path = path_index[output.as_str()];
            successors[job].push(path);
            in_degree[path] += 1;
        }
    }

    let mut ready: BTreeSet<usize> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, d)| **d == 0)
        .map(|(i, _)| i)
        .collect();

    let mut order = Vec::with_capacity(nodes.len());
    while let Some(&next) = ready.iter().next() {
        ready.remove(&next);
        order.push(nodes[next]);
        for &succ in &successors[next] {
            in_degree[succ] -= 1;
            if in_degree[succ] == 0 {
                ready.insert(succ);
            }
        }
    }

    // The graph is validated acyclic at construction, so every node came out.
    if order.len() != nodes.len() {
        warn!(
            emitted = order.len(),
            total = nodes.len(),
            "topological order incomplete; graph contains a cycle"
        );
    }
    order
}

/// Per-pass memoization of oracle lookups.
struct MtimeResolver<'a> {
    oracle: &'a dyn PathOracle,
    cache: HashMap<String, Option<SystemTime>>,
}

impl<'a> MtimeResolver<'a> {
    fn new(oracle: &'a dyn PathOracle) -> Self {
        Self {
            oracle,
            cache: HashMap::new(),
        }
    }

    fn mtime(&mut self, path: &str) -> Option<SystemTime> {
        if let Some(cached) = self.cache.get(path) {
            return *cached;
        }
        let resolved = self.oracle.mtime(Path::new(path));
        self.cache.insert(path.to_string(), resolved);
        resolved
    }
}
