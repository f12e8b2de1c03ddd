// src/workflow/validate.rs

//! Whole-graph checks run once per `add_jobs` batch: producer uniqueness and
//! acyclicity over the combined path -> job -> path graph.

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::SpillwayError;
use crate::workflow::{Workflow, quoted_list};

/// Graph node key. Jobs and paths live in separate tables but share one
/// graph here, so the key carries which table a name belongs to (a job and a
/// path may use the same string).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum NodeRef<'a> {
    Job(&'a str),
    Path(&'a str),
}

/// First path produced by more than one job, if any.
pub(crate) fn find_duplicate_producer(workflow: &Workflow) -> Option<SpillwayError> {
    for path in workflow.path_ids() {
        let producers = workflow.path_producers(path);
        if producers.len() > 1 {
            return Some(SpillwayError::MultipleProducers {
                path: path.to_string(),
                producers: quoted_list(producers),
            });
        }
    }
    None
}

/// Whether the combined job/path graph is a DAG.
///
/// Edge direction follows data flow: input path -> job -> output path.
/// A topological sort fails exactly when there is a cycle.
pub(crate) fn is_acyclic(workflow: &Workflow) -> bool {
    let mut graph: DiGraphMap<NodeRef<'_>, ()> = DiGraphMap::new();

    for id in workflow.job_ids() {
        graph.add_node(NodeRef::Job(id));
    }
    for path in workflow.path_ids() {
        graph.add_node(NodeRef::Path(path));
    }

    for id in workflow.job_ids() {
        let Some((inputs, outputs)) = workflow.job_io(id) else {
            continue;
        };
        for input in inputs {
            graph.add_edge(NodeRef::Path(input), NodeRef::Job(id), ());
        }
        for output in outputs {
            graph.add_edge(NodeRef::Job(id), NodeRef::Path(output), ());
        }
    }

    toposort(&graph, None).is_ok()
}
