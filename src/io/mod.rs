// src/io/mod.rs

//! Workflow document serialization.
//!
//! A workflow serializes to a two-key document: a `workflow` block holding
//! the name, and a `jobs` list sorted by job id. Both JSON and YAML carry the
//! same shape; [`load`] and [`save`] pick the format from the file extension,
//! with [`load`] additionally falling back from JSON to YAML so extension-less
//! files still parse.
//!
//! ```yaml
//! workflow:
//!   name: pipeline
//! jobs:
//! - id: convert
//!   inputs: [raw.csv]
//!   outputs: [clean.csv]
//!   template: "convert $INPUT > $OUTPUT"
//!   data:
//!     MODE: fast
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::data::DataMap;
use crate::errors::{Result, SpillwayError};
use crate::workflow::{JobDef, Workflow};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub workflow: WorkflowMeta,
    pub jobs: Vec<JobDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "DataMap::is_empty")]
    pub data: DataMap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDocument {
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "DataMap::is_empty")]
    pub data: DataMap,
}

/// Snapshot `workflow` into its document form. Jobs are sorted by id so the
/// output is diff-stable across runs.
pub fn to_document(workflow: &Workflow) -> Result<Document> {
    let mut ids: Vec<&str> = workflow.job_ids().collect();
    ids.sort_unstable();

    let mut jobs = Vec::with_capacity(ids.len());
    for id in ids {
        let (inputs, outputs) = workflow
            .job_io(id)
            .ok_or_else(|| SpillwayError::UnknownJob(id.to_string()))?;
        // Blank content is treated as absent.
        let template = workflow
            .job_content(id)?
            .filter(|content| !content.trim().is_empty());
        jobs.push(JobDocument {
            id: id.to_string(),
            inputs: inputs.to_vec(),
            outputs: outputs.to_vec(),
            template,
            data: workflow.job_data(id)?,
        });
    }

    Ok(Document {
        workflow: WorkflowMeta {
            name: workflow.name().to_string(),
            data: workflow.data(),
        },
        jobs,
    })
}

/// Rebuild a workflow from its document form. All jobs go in as one batch,
/// so a document that violates the graph invariants leaves nothing behind.
pub fn from_document(document: Document) -> Result<Workflow> {
    let mut workflow = Workflow::new(document.workflow.name);
    workflow.set_data(document.workflow.data);

    let defs: Vec<JobDef> = document
        .jobs
        .into_iter()
        .map(|job| {
            let mut def = JobDef::new(job.inputs, job.outputs).id(job.id);
            if let Some(template) = job.template {
                def = def.content(template);
            }
            for (key, value) in job.data.iter() {
                def = def.data(key, value.clone());
            }
            def
        })
        .collect();
    workflow.add_jobs(defs)?;

    debug!(
        workflow = %workflow.name(),
        jobs = workflow.job_count(),
        "workflow rebuilt from document"
    );
    Ok(workflow)
}

pub fn to_json(workflow: &Workflow) -> Result<String> {
    Ok(serde_json::to_string_pretty(&to_document(workflow)?)?)
}

pub fn from_json(text: &str) -> Result<Workflow> {
    from_document(serde_json::from_str(text)?)
}

pub fn to_yaml(workflow: &Workflow) -> Result<String> {
    Ok(serde_yaml::to_string(&to_document(workflow)?)?)
}

pub fn from_yaml(text: &str) -> Result<Workflow> {
    from_document(serde_yaml::from_str(text)?)
}

/// Read a workflow from a JSON- or YAML-formatted file.
///
/// The content is tried as JSON first, then as YAML, regardless of the
/// extension; a file that parses as neither is a [`SpillwayError::Document`].
/// A file that does parse but does not match the document schema keeps the
/// schema error, so a missing `workflow` block or job `id` is reported by
/// name rather than as an unknown format.
pub fn load(path: impl AsRef<Path>) -> Result<Workflow> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;

    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(value) => {
            let document = serde_json::from_value::<Document>(value)?;
            return from_document(document);
        }
        Err(err) => debug!(path = %path.display(), %err, "not JSON; trying YAML"),
    }
    match serde_yaml::from_str::<serde_yaml::Value>(&text) {
        Ok(value) => {
            let document = serde_yaml::from_value::<Document>(value)?;
            from_document(document)
        }
        Err(_) => Err(SpillwayError::Document(format!(
            "'{}' is neither a JSON nor a YAML workflow document",
            path.display()
        ))),
    }
}

/// Write `workflow` to `path`, picking YAML for `.yaml`/`.yml` extensions and
/// JSON otherwise.
pub fn save(workflow: &Workflow, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase());
    let text = match extension.as_deref() {
        Some("yaml") | Some("yml") => to_yaml(workflow)?,
        _ => to_json(workflow)?,
    };
    fs::write(path, text)?;
    info!(
        workflow = %workflow.name(),
        path = %path.display(),
        "workflow saved"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::JobDef;

    fn sample() -> Workflow {
        let mut workflow = Workflow::new("pipeline");
        workflow.set_data_value("SHELL", "/bin/sh");
        workflow
            .add_jobs([
                JobDef::new(["raw.csv"], ["clean.csv"])
                    .id("clean")
                    .content("scrub $INPUT > $OUTPUT"),
                JobDef::new(["clean.csv"], ["report.html"])
                    .id("report")
                    .data("TITLE", "weekly"),
            ])
            .unwrap();
        workflow
    }

    #[test]
    fn jobs_are_sorted_by_id() {
        let mut workflow = Workflow::new("sorted");
        workflow
            .add_jobs([
                JobDef::new(["a"], ["b"]).id("zeta"),
                JobDef::new(["b"], ["c"]).id("alpha"),
            ])
            .unwrap();
        let document = to_document(&workflow).unwrap();
        let ids: Vec<&str> = document.jobs.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, ["alpha", "zeta"]);
    }

    #[test]
    fn blank_template_is_dropped() {
        let mut workflow = Workflow::new("blank");
        workflow
            .add_job(JobDef::new(["a"], ["b"]).id("j").content("   "))
            .unwrap();
        let document = to_document(&workflow).unwrap();
        assert_eq!(document.jobs[0].template, None);
    }

    #[test]
    fn json_round_trip() {
        let workflow = sample();
        let text = to_json(&workflow).unwrap();
        let rebuilt = from_json(&text).unwrap();
        assert_eq!(rebuilt, workflow);
    }

    #[test]
    fn yaml_round_trip() {
        let workflow = sample();
        let text = to_yaml(&workflow).unwrap();
        let rebuilt = from_yaml(&text).unwrap();
        assert_eq!(rebuilt, workflow);
    }

    #[test]
    fn missing_required_key_is_an_error() {
        // no "workflow" block
        let text = r#"{"jobs": [{"id": "a", "inputs": ["x"]}]}"#;
        assert!(from_json(text).is_err());
    }

    #[test]
    fn document_violating_graph_rules_is_rejected() {
        let text = r#"
            {
                "workflow": {"name": "bad"},
                "jobs": [
                    {"id": "a", "inputs": ["x"], "outputs": ["y"]},
                    {"id": "b", "inputs": ["y"], "outputs": ["x"]}
                ]
            }
        "#;
        assert!(matches!(
            from_json(text),
            Err(SpillwayError::CycleDetected(_))
        ));
    }
}
