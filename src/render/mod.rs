// src/render/mod.rs

//! Job content rendering.
//!
//! A job's content is a template; rendering substitutes `$NAME` and
//! `${NAME}` placeholders from a context assembled out of the job's
//! dependency lists and the workflow/job data maps. The built-in
//! placeholders:
//!
//! - `INPUTS` / `OUTPUTS`: the whole list, space-joined
//! - `INPUTN` / `OUTPUTN`: list length
//! - `INPUT` / `OUTPUT`: the first element, or empty when the list is empty
//! - `INPUT0`, `INPUT1`, ... / `OUTPUT0`, ...: positional access
//!
//! Workflow-level data entries come first; job-level entries override them,
//! and the built-in path placeholders override both.
//! `$$` renders a literal `$`; any other unresolved placeholder is an error.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use tracing::debug;

use crate::errors::{Result, SpillwayError};
use crate::workflow::Workflow;

/// A context value: either a single string or an ordered list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateValue {
    Scalar(String),
    List(Vec<String>),
}

impl TemplateValue {
    /// Text form substituted into the template. Lists join with single
    /// spaces, matching how shell commands take file arguments.
    pub fn as_text(&self) -> String {
        match self {
            TemplateValue::Scalar(s) => s.clone(),
            TemplateValue::List(items) => items.join(" "),
        }
    }
}

impl From<&str> for TemplateValue {
    fn from(s: &str) -> Self {
        TemplateValue::Scalar(s.to_string())
    }
}

impl From<String> for TemplateValue {
    fn from(s: String) -> Self {
        TemplateValue::Scalar(s)
    }
}

impl From<Vec<String>> for TemplateValue {
    fn from(items: Vec<String>) -> Self {
        TemplateValue::List(items)
    }
}

/// Build the substitution context for one job of `workflow`.
pub fn job_context(workflow: &Workflow, id: &str) -> Result<HashMap<String, TemplateValue>> {
    let (inputs, outputs) = workflow
        .job_io(id)
        .ok_or_else(|| SpillwayError::UnknownJob(id.to_string()))?;
    let inputs = inputs.to_vec();
    let outputs = outputs.to_vec();

    let mut context: HashMap<String, TemplateValue> = HashMap::new();

    // Workflow data first, job data on top, built-ins last; the path
    // placeholders always mean what they say, even against a data entry of
    // the same name.
    for (key, value) in workflow.data().iter() {
        context.insert(key.to_string(), value.as_text().into());
    }
    for (key, value) in workflow.job_data(id)?.iter() {
        context.insert(key.to_string(), value.as_text().into());
    }

    context.insert("INPUTS".into(), TemplateValue::List(inputs.clone()));
    context.insert("OUTPUTS".into(), TemplateValue::List(outputs.clone()));
    context.insert("INPUTN".into(), inputs.len().to_string().into());
    context.insert("OUTPUTN".into(), outputs.len().to_string().into());
    let first_input = inputs.first().map(String::as_str).unwrap_or_default();
    context.insert("INPUT".into(), first_input.into());
    let first_output = outputs.first().map(String::as_str).unwrap_or_default();
    context.insert("OUTPUT".into(), first_output.into());
    for (i, input) in inputs.iter().enumerate() {
        context.insert(format!("INPUT{i}"), input.as_str().into());
    }
    for (i, output) in outputs.iter().enumerate() {
        context.insert(format!("OUTPUT{i}"), output.as_str().into());
    }

    Ok(context)
}

/// Substitutes placeholders in a template string.
pub trait TemplateEngine {
    fn render(&self, template: &str, context: &HashMap<String, TemplateValue>) -> Result<String>;
}

/// Shell-style `$NAME` / `${NAME}` substitution, with `$$` as the escape.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellEngine;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$(?:(\$)|\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))")
            .unwrap_or_else(|err| panic!("placeholder pattern failed to compile: {err}"))
    })
}

impl TemplateEngine for ShellEngine {
    fn render(&self, template: &str, context: &HashMap<String, TemplateValue>) -> Result<String> {
        let mut missing: Option<String> = None;
        let rendered = placeholder_pattern().replace_all(template, |caps: &Captures<'_>| {
            if caps.get(1).is_some() {
                return "$".to_string();
            }
            let name = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str())
                .unwrap_or_default();
            match context.get(name) {
                Some(value) => value.as_text(),
                None => {
                    if missing.is_none() {
                        missing = Some(name.to_string());
                    }
                    String::new()
                }
            }
        });
        if let Some(name) = missing {
            return Err(SpillwayError::Render(format!(
                "unresolved placeholder '${name}'"
            )));
        }
        Ok(rendered.into_owned())
    }
}

/// Render the content of one job. Jobs without content render to the empty
/// string.
pub fn render_job(workflow: &Workflow, id: &str, engine: &dyn TemplateEngine) -> Result<String> {
    let Some(content) = workflow.job_content(id)? else {
        debug!(job = %id, "job has no content; rendering empty");
        return Ok(String::new());
    };
    let context = job_context(workflow, id)?;
    engine.render(&content, &context)
}
