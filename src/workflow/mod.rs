// src/workflow/mod.rs

//! The bipartite job/path dependency graph.
//!
//! A [`Workflow`] holds jobs (units of work) and the paths they consume and
//! produce. Structural invariants are enforced on every mutation:
//!
//! - job ids are unique,
//! - a job never lists the same path twice among its inputs (or outputs),
//! - a job declares at least one input or one output,
//! - any path is the output of at most one job,
//! - the combined path -> job -> path graph stays acyclic,
//! - per-job edge order is the declaration order.
//!
//! [`Workflow::add_jobs`] is transactional: if any definition in a batch is
//! rejected, every job inserted by that call is removed again (together with
//! the paths it orphaned) before the error is returned, so a failed call
//! leaves the graph exactly as it was.

pub mod validate;

use std::collections::HashMap;
use std::fmt;
use std::ops::Add;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use crate::data::{DataMap, DataValue, PathList};
use crate::errors::{Result, SpillwayError};

/// A job definition handed to [`Workflow::add_job`] / [`Workflow::add_jobs`].
#[derive(Debug, Clone, Default)]
pub struct JobDef {
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub content: Option<String>,
    pub id: Option<String>,
    pub data: DataMap,
}

impl JobDef {
    pub fn new(inputs: impl Into<PathList>, outputs: impl Into<PathList>) -> Self {
        Self {
            inputs: inputs.into().into_vec(),
            outputs: outputs.into().into_vec(),
            content: None,
            id: None,
            data: DataMap::new(),
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn data(mut self, key: impl Into<String>, value: impl Into<DataValue>) -> Self {
        self.data.set(key, value);
        self
    }
}

/// Internal job node: ordered input/output edges plus payload.
#[derive(Debug, Clone)]
struct JobNode {
    /// Input paths in declaration order (edge order 1..N by position).
    inputs: Vec<String>,
    /// Output paths in declaration order.
    outputs: Vec<String>,
    content: Option<String>,
    data: DataMap,
}

/// Internal path node: adjacent jobs.
///
/// `producers` can transiently hold more than one entry while a batch insert
/// is in flight; the whole-graph check in [`validate`] rejects such a batch,
/// so a committed graph always has at most one producer per path.
#[derive(Debug, Clone, Default)]
struct PathNode {
    producers: Vec<String>,
    consumers: Vec<String>,
}

/// A file-based data-processing workflow.
#[derive(Debug, Clone)]
pub struct Workflow {
    name: String,
    data: DataMap,
    jobs: HashMap<String, JobNode>,
    job_order: Vec<String>,
    paths: HashMap<String, PathNode>,
    path_order: Vec<String>,
}

impl Workflow {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        debug!(workflow = %name, "created a new workflow");
        Self {
            name,
            data: DataMap::new(),
            jobs: HashMap::new(),
            job_order: Vec::new(),
            paths: HashMap::new(),
            path_order: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        debug!(workflow = %self.name, "workflow renamed");
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    pub fn has_job(&self, id: &str) -> bool {
        self.jobs.contains_key(id)
    }

    pub fn has_path(&self, path: &str) -> bool {
        self.paths.contains_key(path)
    }

    /// Job ids in declaration order.
    pub fn job_ids(&self) -> impl Iterator<Item = &str> {
        self.job_order.iter().map(String::as_str)
    }

    /// Path ids in first-reference order.
    pub fn path_ids(&self) -> impl Iterator<Item = &str> {
        self.path_order.iter().map(String::as_str)
    }

    /// Add a single job; see [`Workflow::add_jobs`].
    pub fn add_job(&mut self, def: JobDef) -> Result<String> {
        let mut ids = self.add_jobs([def])?;
        // add_jobs returns exactly one id per definition
        Ok(ids.remove(0))
    }

    /// Add a batch of jobs transactionally.
    ///
    /// Definitions are validated and inserted in order. A definition without
    /// an id gets a default `JOB_<n>` id derived from the job count at call
    /// time; a default colliding with an existing id is an error, never a
    /// silent rename. After all definitions are in place, two whole-graph
    /// checks run once: unique producers and acyclicity. On any failure the
    /// jobs inserted by this call are removed again and the error is
    /// returned; jobs from earlier, committed calls are untouched.
    pub fn add_jobs(&mut self, defs: impl IntoIterator<Item = JobDef>) -> Result<Vec<String>> {
        let mut added: Vec<String> = Vec::new();
        let mut next_index = self.job_count() + 1;
        let mut failure: Option<SpillwayError> = None;

        for def in defs {
            match self.insert_definition(def, &mut next_index) {
                Ok(id) => added.push(id),
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        if failure.is_none() {
            failure = validate::find_duplicate_producer(self);
        }

        if failure.is_none() && !validate::is_acyclic(self) {
            failure = Some(SpillwayError::CycleDetected(quoted_list(&added)));
        }

        if let Some(err) = failure {
            for id in added.iter().rev() {
                if let Err(remove_err) = self.remove_job(id) {
                    warn!(job = %id, error = %remove_err, "rollback failed to remove job");
                }
            }
            return Err(err);
        }

        debug!(count = added.len(), "jobs added");
        Ok(added)
    }

    fn insert_definition(&mut self, def: JobDef, next_index: &mut usize) -> Result<String> {
        let JobDef {
            inputs,
            outputs,
            content,
            id,
            data,
        } = def;

        let id = match id {
            Some(id) if id.trim().is_empty() => {
                return Err(SpillwayError::InvalidIdentifier(
                    "job id must not be empty".to_string(),
                ));
            }
            Some(id) => id,
            None => {
                let id = format!("JOB_{next_index}");
                *next_index += 1;
                id
            }
        };

        if self.jobs.contains_key(&id) {
            return Err(SpillwayError::DuplicateJob(id));
        }

        ensure_unique_paths(&id, &inputs)?;
        ensure_unique_paths(&id, &outputs)?;

        if inputs.is_empty() && outputs.is_empty() {
            return Err(SpillwayError::EmptyJob(id));
        }

        for path in &inputs {
            self.touch_path(path).consumers.push(id.clone());
        }
        for path in &outputs {
            self.touch_path(path).producers.push(id.clone());
        }

        debug!(
            job = %id,
            inputs = inputs.len(),
            outputs = outputs.len(),
            "job added"
        );

        self.jobs.insert(
            id.clone(),
            JobNode {
                inputs,
                outputs,
                content,
                data,
            },
        );
        self.job_order.push(id.clone());
        Ok(id)
    }

    fn touch_path(&mut self, path: &str) -> &mut PathNode {
        if !self.paths.contains_key(path) {
            self.path_order.push(path.to_string());
        }
        self.paths.entry(path.to_string()).or_default()
    }

    /// Remove a job; paths left with no producer and no consumer go with it.
    pub fn remove_job(&mut self, id: &str) -> Result<()> {
        let node = self
            .jobs
            .remove(id)
            .ok_or_else(|| SpillwayError::UnknownJob(id.to_string()))?;
        self.job_order.retain(|j| j != id);

        for path in node.inputs.iter().chain(node.outputs.iter()) {
            if let Some(path_node) = self.paths.get_mut(path) {
                path_node.consumers.retain(|j| j != id);
                path_node.producers.retain(|j| j != id);
                if path_node.producers.is_empty() && path_node.consumers.is_empty() {
                    self.paths.remove(path);
                    self.path_order.retain(|p| p != path);
                    debug!(path = %path, "removed orphan path");
                }
            }
        }

        debug!(job = %id, "job removed");
        Ok(())
    }

    /// Input and output paths of a job, in edge order.
    pub fn job_paths(&self, id: &str) -> Result<(Vec<String>, Vec<String>)> {
        let node = self.job_node(id)?;
        Ok((node.inputs.clone(), node.outputs.clone()))
    }

    /// Producing and consuming jobs of a path.
    ///
    /// Producers has zero or one entry in a committed graph; consumers are
    /// de-duplicated and keep their first-reference order.
    pub fn path_jobs(&self, path: &str) -> Result<(Vec<String>, Vec<String>)> {
        let node = self
            .paths
            .get(path)
            .ok_or_else(|| SpillwayError::UnknownPath(path.to_string()))?;
        Ok((node.producers.clone(), dedup_in_order(&node.consumers)))
    }

    /// Jobs upstream of `id`, reached through its input paths in edge order,
    /// de-duplicated on first occurrence.
    pub fn job_predecessors(&self, id: &str) -> Result<Vec<String>> {
        let node = self.job_node(id)?;
        let mut upstream = Vec::new();
        for path in &node.inputs {
            if let Some(path_node) = self.paths.get(path) {
                for producer in &path_node.producers {
                    if !upstream.contains(producer) {
                        upstream.push(producer.clone());
                    }
                }
            }
        }
        Ok(upstream)
    }

    /// Jobs downstream of `id`, reached through its output paths in edge
    /// order, de-duplicated on first occurrence.
    pub fn job_successors(&self, id: &str) -> Result<Vec<String>> {
        let node = self.job_node(id)?;
        let mut downstream = Vec::new();
        for path in &node.outputs {
            if let Some(path_node) = self.paths.get(path) {
                for consumer in &path_node.consumers {
                    if !downstream.contains(consumer) {
                        downstream.push(consumer.clone());
                    }
                }
            }
        }
        Ok(downstream)
    }

    pub fn job_content(&self, id: &str) -> Result<Option<String>> {
        Ok(self.job_node(id)?.content.clone())
    }

    pub fn set_job_content(&mut self, id: &str, content: Option<String>) -> Result<()> {
        self.job_node_mut(id)?.content = content;
        Ok(())
    }

    /// Copy of the workflow-scoped data bag.
    pub fn data(&self) -> DataMap {
        self.data.clone()
    }

    /// Replace the workflow-scoped data bag.
    pub fn set_data(&mut self, data: DataMap) {
        self.data = data;
    }

    pub fn data_value(&self, key: &str) -> Option<DataValue> {
        self.data.get(key).cloned()
    }

    pub fn set_data_value(&mut self, key: impl Into<String>, value: impl Into<DataValue>) {
        self.data.set(key, value);
    }

    pub fn remove_data_value(&mut self, key: &str) -> Option<DataValue> {
        self.data.remove(key)
    }

    /// Copy of a job's data bag.
    pub fn job_data(&self, id: &str) -> Result<DataMap> {
        Ok(self.job_node(id)?.data.clone())
    }

    pub fn set_job_data(&mut self, id: &str, data: DataMap) -> Result<()> {
        self.job_node_mut(id)?.data = data;
        Ok(())
    }

    pub fn job_data_value(&self, id: &str, key: &str) -> Result<Option<DataValue>> {
        Ok(self.job_node(id)?.data.get(key).cloned())
    }

    pub fn set_job_data_value(
        &mut self,
        id: &str,
        key: impl Into<String>,
        value: impl Into<DataValue>,
    ) -> Result<()> {
        self.job_node_mut(id)?.data.set(key, value);
        Ok(())
    }

    pub fn remove_job_data_value(&mut self, id: &str, key: &str) -> Result<Option<DataValue>> {
        Ok(self.job_node_mut(id)?.data.remove(key))
    }

    /// Merge two workflows into a new one.
    ///
    /// Job ids are prefixed with their origin workflow's name to avoid
    /// collisions; paths keep their identity and are shared across operands.
    /// The merged graph goes through the same validation as any other
    /// construction, so combining two workflows whose shared paths would
    /// yield a second producer or a cycle is an error rather than a silently
    /// invalid graph.
    pub fn merge(&self, other: &Workflow) -> Result<Workflow> {
        let mut merged = Workflow::new(format!("{}+{}", self.name, other.name));
        for workflow in [self, other] {
            let defs: Vec<JobDef> = workflow
                .job_ids()
                .map(|id| {
                    let node = &workflow.jobs[id];
                    JobDef {
                        inputs: node.inputs.clone(),
                        outputs: node.outputs.clone(),
                        content: node.content.clone(),
                        id: Some(format!("{}:{}", workflow.name, id)),
                        data: node.data.clone(),
                    }
                })
                .collect();
            merged.add_jobs(defs)?;
        }
        debug!(left = %self.name, right = %other.name, "merged workflows");
        Ok(merged)
    }

    fn job_node(&self, id: &str) -> Result<&JobNode> {
        self.jobs
            .get(id)
            .ok_or_else(|| SpillwayError::UnknownJob(id.to_string()))
    }

    fn job_node_mut(&mut self, id: &str) -> Result<&mut JobNode> {
        self.jobs
            .get_mut(id)
            .ok_or_else(|| SpillwayError::UnknownJob(id.to_string()))
    }

    /// Borrowed input/output slices, for the planner.
    pub(crate) fn job_io(&self, id: &str) -> Option<(&[String], &[String])> {
        self.jobs
            .get(id)
            .map(|node| (node.inputs.as_slice(), node.outputs.as_slice()))
    }

    pub(crate) fn path_producers(&self, path: &str) -> &[String] {
        self.paths
            .get(path)
            .map(|node| node.producers.as_slice())
            .unwrap_or(&[])
    }
}

impl Default for Workflow {
    /// A workflow with a generated name, for callers that do not care.
    fn default() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos() as u64 ^ d.as_secs())
            .unwrap_or(0);
        Workflow::new(format!("workflow-{nanos:08x}"))
    }
}

impl PartialEq for Workflow {
    /// Two workflows are equal iff they share a name, job/path counts, and —
    /// matching jobs by id — identical input/output path sets, content and
    /// data. Edge order is deliberately not part of equality, matching the
    /// persisted document round-trip guarantee.
    fn eq(&self, other: &Self) -> bool {
        if self.name != other.name
            || self.job_count() != other.job_count()
            || self.path_count() != other.path_count()
        {
            return false;
        }

        self.jobs.iter().all(|(id, node)| {
            let Some(other_node) = other.jobs.get(id) else {
                return false;
            };
            sorted(&node.inputs) == sorted(&other_node.inputs)
                && sorted(&node.outputs) == sorted(&other_node.outputs)
                && node.content == other_node.content
                && node.data == other_node.data
        })
    }
}

impl Add for &Workflow {
    type Output = Result<Workflow>;

    fn add(self, other: &Workflow) -> Result<Workflow> {
        self.merge(other)
    }
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "workflow '{}' ({} jobs, {} paths)",
            self.name,
            self.job_count(),
            self.path_count()
        )
    }
}

fn ensure_unique_paths(job: &str, paths: &[String]) -> Result<()> {
    for (i, path) in paths.iter().enumerate() {
        if paths[..i].contains(path) {
            return Err(SpillwayError::DuplicatePath {
                job: job.to_string(),
                path: path.clone(),
            });
        }
    }
    Ok(())
}

fn dedup_in_order(items: &[String]) -> Vec<String> {
    let mut seen = Vec::new();
    for item in items {
        if !seen.contains(item) {
            seen.push(item.clone());
        }
    }
    seen
}

fn sorted(items: &[String]) -> Vec<&String> {
    let mut items: Vec<&String> = items.iter().collect();
    items.sort();
    items
}

pub(crate) fn quoted_list(ids: &[String]) -> String {
    ids.iter()
        .map(|id| format!("'{id}'"))
        .collect::<Vec<_>>()
        .join(", ")
}
