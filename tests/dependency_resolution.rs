mod common;

use spillway::fs::mock::MockOracle;
use spillway::{JobDef, JobStatus, PathStatus, PlanOptions, Workflow};
use spillway_test_utils::builders::WorkflowBuilder;

use common::{ids, init_tracing};

fn chain() -> Workflow {
    // a -> make_b -> b -> make_c -> c
    WorkflowBuilder::new("chain")
        .job("make_b", &["a"], &["b"])
        .job("make_c", &["b"], &["c"])
        .build()
}

#[test]
fn everything_current_plans_nothing() {
    init_tracing();
    let workflow = chain();
    let oracle = MockOracle::new();
    oracle.add_file("a", 10);
    oracle.add_file("b", 20);
    oracle.add_file("c", 30);

    let plan = workflow.plan(&oracle, &PlanOptions::default());
    assert!(plan.is_empty());
}

#[test]
fn missing_output_marks_the_job_outdated() {
    init_tracing();
    let workflow = chain();
    let oracle = MockOracle::new();
    oracle.add_file("a", 10);
    oracle.add_file("b", 20);
    // c missing

    let plan = workflow.plan(&oracle, &PlanOptions::default());
    assert_eq!(ids(&plan), ["make_c"]);
    assert_eq!(plan[0].status, JobStatus::Outdated);
    assert_eq!(plan[0].outputs, [("c".to_string(), PathStatus::Missing)]);
    assert_eq!(plan[0].inputs, [("b".to_string(), PathStatus::Current)]);
}

#[test]
fn input_newer_than_output_marks_the_job_outdated() {
    init_tracing();
    let workflow = chain();
    let oracle = MockOracle::new();
    oracle.add_file("a", 50);
    oracle.add_file("b", 20);
    oracle.add_file("c", 30);

    let plan = workflow.plan(&oracle, &PlanOptions::default());
    // make_b regenerates b, which in turn invalidates make_c
    assert_eq!(ids(&plan), ["make_b", "make_c"]);
    assert_eq!(plan[0].outputs, [("b".to_string(), PathStatus::Outdated)]);
    assert_eq!(plan[1].inputs, [("b".to_string(), PathStatus::Outdated)]);
    assert_eq!(plan[1].outputs, [("c".to_string(), PathStatus::Outdated)]);
}

#[test]
fn staleness_propagates_through_missing_intermediates() {
    init_tracing();
    let workflow = chain();
    let oracle = MockOracle::new();
    oracle.add_file("a", 10);
    // b and c missing

    let plan = workflow.plan(&oracle, &PlanOptions::default());
    assert_eq!(ids(&plan), ["make_b", "make_c"]);

    // b is missing on disk, but an earlier job regenerates it, so the
    // downstream job sees it as outdated rather than missing
    assert_eq!(plan[0].outputs, [("b".to_string(), PathStatus::Missing)]);
    assert_eq!(plan[1].inputs, [("b".to_string(), PathStatus::Outdated)]);
}

#[test]
fn missing_input_without_producer_stays_missing() {
    init_tracing();
    let workflow = chain();
    let oracle = MockOracle::new();
    // a missing entirely, nothing produces it
    oracle.add_file("b", 20);
    oracle.add_file("c", 30);

    let plan = workflow.plan(&oracle, &PlanOptions::default());
    assert_eq!(ids(&plan), ["make_b", "make_c"]);
    assert_eq!(plan[0].inputs, [("a".to_string(), PathStatus::Missing)]);
}

#[test]
fn plan_is_idempotent() {
    init_tracing();
    let workflow = chain();
    let oracle = MockOracle::new();
    oracle.add_file("a", 50);
    oracle.add_file("b", 20);

    let first = workflow.plan(&oracle, &PlanOptions::default());
    let second = workflow.plan(&oracle, &PlanOptions::default());
    assert_eq!(first, second);
}

#[test]
fn touching_an_upstream_file_never_shrinks_the_plan() {
    init_tracing();
    let workflow = chain();
    let oracle = MockOracle::new();
    oracle.add_file("a", 10);
    oracle.add_file("b", 20);
    oracle.add_file("c", 15);

    let before = workflow.plan_ids(&oracle, &PlanOptions::default());
    assert_eq!(before, ["make_c"]);

    // making "a" newer can only add jobs to the plan
    oracle.touch("a", 100);
    let after = workflow.plan_ids(&oracle, &PlanOptions::default());
    assert_eq!(after, ["make_b", "make_c"]);
    for id in &before {
        assert!(after.contains(id));
    }
}

#[test]
fn execution_order_respects_dependencies() {
    init_tracing();
    // diamond: src -> split -> {left, right} -> merge -> out
    let mut workflow = Workflow::new("diamond");
    workflow
        .add_jobs([
            JobDef::new(["left", "right"], ["out"]).id("merge"),
            JobDef::new(["src"], ["left", "right"]).id("split"),
        ])
        .unwrap();
    let oracle = MockOracle::new();
    oracle.add_file("src", 10);

    let order = workflow.plan_ids(&oracle, &PlanOptions::default());
    assert_eq!(order, ["split", "merge"]);
}

#[test]
fn declaration_order_breaks_ties() {
    init_tracing();
    // two independent jobs, both outdated; declaration order decides
    let mut workflow = Workflow::new("independent");
    workflow
        .add_jobs([
            JobDef::new(["x1"], ["y1"]).id("second_alphabetically"),
            JobDef::new(["x2"], ["y2"]).id("a_first_alphabetically"),
        ])
        .unwrap();
    let oracle = MockOracle::new();
    oracle.add_file("x1", 10);
    oracle.add_file("x2", 10);

    let order = workflow.plan_ids(&oracle, &PlanOptions::default());
    assert_eq!(order, ["second_alphabetically", "a_first_alphabetically"]);
}

#[test]
fn all_jobs_are_reported_when_not_filtering() {
    init_tracing();
    let workflow = chain();
    let oracle = MockOracle::new();
    oracle.add_file("a", 10);
    oracle.add_file("b", 20);
    // c missing

    let options = PlanOptions {
        outdated_only: false,
        with_descendants: true,
    };
    let plan = workflow.plan(&oracle, &options);
    assert_eq!(ids(&plan), ["make_b", "make_c"]);
    assert_eq!(plan[0].status, JobStatus::Current);
    assert_eq!(plan[1].status, JobStatus::Outdated);
}

#[test]
fn without_descendants_only_root_outdated_jobs_remain() {
    init_tracing();
    let workflow = chain();
    let oracle = MockOracle::new();
    oracle.add_file("a", 50);
    oracle.add_file("b", 20);
    oracle.add_file("c", 30);

    let options = PlanOptions {
        outdated_only: true,
        with_descendants: false,
    };
    // make_c is only outdated because make_b runs first; it is filtered out
    assert_eq!(workflow.plan_ids(&oracle, &options), ["make_b"]);
}

#[test]
fn without_descendants_unfiltered_keeps_source_jobs_only() {
    init_tracing();
    let workflow = chain();
    let oracle = MockOracle::new();

    let options = PlanOptions {
        outdated_only: false,
        with_descendants: false,
    };
    // make_c consumes a produced path, so only make_b survives
    assert_eq!(workflow.plan_ids(&oracle, &options), ["make_b"]);
}

#[test]
fn dependent_job_is_dropped_even_with_its_own_missing_input() {
    init_tracing();
    // two roots: one stale, one depending on an unproduced missing file
    let mut workflow = Workflow::new("roots");
    workflow
        .add_jobs([
            JobDef::new(["a"], ["b"]).id("stale_root"),
            JobDef::new(["b", "external"], ["c"]).id("downstream"),
        ])
        .unwrap();
    let oracle = MockOracle::new();
    oracle.add_file("a", 10);

    let options = PlanOptions {
        outdated_only: true,
        with_descendants: false,
    };
    // downstream's "b" input is flagged outdated (stale_root regenerates it),
    // so downstream is dependent and dropped despite "external" being missing
    assert_eq!(workflow.plan_ids(&oracle, &options), ["stale_root"]);
}

#[test]
fn a_stale_head_invalidates_a_whole_generated_chain() {
    init_tracing();
    // p0 -> job0 -> p1 -> job1 -> p2 -> job2 -> p3
    let workflow = WorkflowBuilder::new("long-chain").chain(3).build();
    let oracle = MockOracle::new();
    oracle.add_file("p0", 100);
    oracle.add_file("p1", 20);
    oracle.add_file("p2", 30);
    oracle.add_file("p3", 40);

    let order = workflow.plan_ids(&oracle, &PlanOptions::default());
    assert_eq!(order, ["job0", "job1", "job2"]);
}

#[test]
fn directory_outputs_use_their_newest_file() {
    init_tracing();
    let mut workflow = Workflow::new("dirs");
    workflow
        .add_job(JobDef::new(["src.txt"], ["build"]).id("populate"))
        .unwrap();
    let oracle = MockOracle::new();
    oracle.add_file("src.txt", 50);
    oracle.add_file("build/artifact", 40);

    // newest file in the directory is older than the input
    let plan = workflow.plan(&oracle, &PlanOptions::default());
    assert_eq!(ids(&plan), ["populate"]);

    oracle.touch("build/artifact", 60);
    assert!(workflow.plan(&oracle, &PlanOptions::default()).is_empty());
}
