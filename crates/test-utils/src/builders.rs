#![allow(dead_code)]

use spillway::{JobDef, Workflow};

/// Builder for common workflow shapes used across the test suites.
pub struct WorkflowBuilder {
    workflow: Workflow,
}

impl WorkflowBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            workflow: Workflow::new(name),
        }
    }

    /// Add a job named `id` with the given inputs and outputs and a trivial
    /// `touch`-style content line.
    pub fn job(mut self, id: &str, inputs: &[&str], outputs: &[&str]) -> Self {
        self.workflow
            .add_job(
                JobDef::new(inputs.to_vec(), outputs.to_vec())
                    .id(id)
                    .content("touch $OUTPUTS"),
            )
            .expect("builder produced an invalid job");
        self
    }

    /// Linear chain: `p0 -> job0 -> p1 -> job1 -> p2 -> ...` over `n` jobs.
    pub fn chain(mut self, n: usize) -> Self {
        for i in 0..n {
            let input = format!("p{i}");
            let output = format!("p{}", i + 1);
            self.workflow
                .add_job(
                    JobDef::new([input.as_str()], [output.as_str()])
                        .id(format!("job{i}"))
                        .content("touch $OUTPUT"),
                )
                .expect("chain job is always valid");
        }
        self
    }

    pub fn build(self) -> Workflow {
        self.workflow
    }
}
