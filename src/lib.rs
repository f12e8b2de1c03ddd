// src/lib.rs

//! Spillway builds and interrogates file-driven workflow graphs.
//!
//! A workflow is a bipartite directed acyclic graph of jobs and paths: each
//! job consumes input paths and produces output paths, and a path links the
//! job that produces it to the jobs that consume it. On top of the graph,
//! the planner compares filesystem modification times to decide which jobs
//! are outdated and in what order they should run.
//!
//! ```no_run
//! use spillway::{JobDef, PlanOptions, SystemOracle, Workflow};
//!
//! # fn main() -> spillway::Result<()> {
//! let mut workflow = Workflow::new("pipeline");
//! workflow.add_jobs([
//!     JobDef::new(["raw.csv"], ["clean.csv"])
//!         .id("clean")
//!         .content("scrub $INPUT > $OUTPUT"),
//!     JobDef::new(["clean.csv"], ["report.html"])
//!         .id("report")
//!         .content("report $INPUT > $OUTPUT"),
//! ])?;
//!
//! for job in workflow.plan(&SystemOracle, &PlanOptions::default()) {
//!     println!("{} is {:?}", job.id, job.status);
//! }
//! # Ok(())
//! # }
//! ```

pub mod data;
pub mod errors;
pub mod export;
pub mod fs;
pub mod io;
pub mod plan;
pub mod render;
pub mod workflow;

pub use crate::data::{DataMap, DataValue, PathList};
pub use crate::errors::{Result, SpillwayError};
pub use crate::fs::{PathKind, PathOracle, SystemOracle};
pub use crate::plan::{JobPlan, JobStatus, PathStatus, PlanOptions};
pub use crate::workflow::{JobDef, Workflow};
