use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;
use std::rc::Rc;

use proptest::prelude::*;
use serde_json::json;
use tempfile::TempDir;

use super::{
    NOT_INTERESTING, REDUCTION_INCOMPLETE, ReductionDriver, ReductionError, StepOutcome,
    reduction_step_name,
};
use crate::judge::{FileJudge, JudgeError};
use crate::plan::{PlanError, ReductionPlan};
use crate::shader_job::{ShaderJob, ShaderKind, ShaderSource, UniformInfo, UniformsInfo};

// ============================================================================
// Scripted fixtures
// ============================================================================

/// Shared script for a [`ScriptedPlan`], inspectable after the driver has
/// consumed the plan.
#[derive(Default)]
struct PlanScript {
    steps: VecDeque<Result<ShaderJob, PlanError>>,
    feedback: Vec<bool>,
    saw_bound_current: bool,
}

#[derive(Clone, Default)]
struct ScriptedPlan(Rc<RefCell<PlanScript>>);

impl ScriptedPlan {
    fn new(steps: Vec<Result<ShaderJob, PlanError>>) -> (Self, Rc<RefCell<PlanScript>>) {
        let script = Rc::new(RefCell::new(PlanScript {
            steps: steps.into_iter().collect(),
            feedback: Vec::new(),
            saw_bound_current: false,
        }));
        (Self(Rc::clone(&script)), script)
    }
}

impl ReductionPlan for ScriptedPlan {
    fn next(&mut self, current: &ShaderJob) -> Result<ShaderJob, PlanError> {
        let mut script = self.0.borrow_mut();
        if current.has_uniform_bindings() {
            script.saw_bound_current = true;
        }
        script.steps.pop_front().unwrap_or(Err(PlanError::Exhausted))
    }

    fn feedback(&mut self, accepted: bool) {
        self.0.borrow_mut().feedback.push(accepted);
    }
}

/// Judge that replays a fixed verdict sequence and records what it was asked
/// to judge.
struct ScriptedJudge {
    verdicts: VecDeque<bool>,
    calls: Vec<String>,
}

impl ScriptedJudge {
    fn new(verdicts: impl IntoIterator<Item = bool>) -> Self {
        Self {
            verdicts: verdicts.into_iter().collect(),
            calls: Vec::new(),
        }
    }
}

impl FileJudge for ScriptedJudge {
    fn is_interesting(&mut self, shader_job: &Path, _result: &Path) -> Result<bool, JudgeError> {
        self.calls.push(
            shader_job
                .file_name()
                .expect("artifact has a file name")
                .to_string_lossy()
                .into_owned(),
        );
        Ok(self
            .verdicts
            .pop_front()
            .expect("judge invoked more often than scripted"))
    }
}

fn job(lines: &[&str]) -> ShaderJob {
    let mut source = lines.join("\n");
    source.push('\n');
    ShaderJob::new(
        None,
        UniformsInfo::new(),
        vec![ShaderSource {
            kind: ShaderKind::Fragment,
            source,
        }],
    )
}

fn frag_content(dir: &Path, name: &str) -> String {
    std::fs::read_to_string(dir.join(format!("{name}.frag"))).unwrap()
}

fn failed(reason: &str) -> Result<ShaderJob, PlanError> {
    Err(PlanError::ApplicationFailed {
        reason: reason.to_string(),
    })
}

// ============================================================================
// Step naming
// ============================================================================

#[test]
fn test_reduction_step_name_formats() {
    assert_eq!(reduction_step_name("variant", 3, None), "variant_reduced_0003");
    assert_eq!(
        reduction_step_name("variant", 3, Some(StepOutcome::Success)),
        "variant_reduced_0003_success"
    );
    assert_eq!(
        reduction_step_name("variant", 12345, Some(StepOutcome::Fail)),
        "variant_reduced_12345_fail"
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: step naming is a pure function, and the tagged form is the
    /// untagged form plus a deterministic suffix.
    #[test]
    fn prop_step_naming_is_pure(base in "[a-z_]{1,12}", attempt in 0u32..=9999) {
        let untagged = reduction_step_name(&base, attempt, None);
        prop_assert_eq!(&untagged, &reduction_step_name(&base, attempt, None));
        prop_assert_eq!(
            reduction_step_name(&base, attempt, Some(StepOutcome::Success)),
            format!("{untagged}_success")
        );
        prop_assert_eq!(
            reduction_step_name(&base, attempt, Some(StepOutcome::Fail)),
            format!("{untagged}_fail")
        );
    }
}

// ============================================================================
// Driver control loop
// ============================================================================

#[test]
fn test_monotonic_success_tracking() {
    let dir = TempDir::new().unwrap();
    let c1 = job(&["int a;", "int b;", "int c;"]);
    let c2 = job(&["int a;", "int b;"]);
    let c3 = job(&["int a;"]);
    let (plan, script) = ScriptedPlan::new(vec![Ok(c1), Ok(c2), Ok(c3.clone())]);
    let mut judge = ScriptedJudge::new([true, true, true, true, true]);

    let mut driver = ReductionDriver::new(plan);
    let result = driver
        .run(job(&["int a;", "int b;", "int c;", "int d;"]), "variant", 0, &mut judge, dir.path(), None)
        .unwrap();

    assert_eq!(result.as_deref(), Some("variant_reduced_final"));
    assert_eq!(driver.successful_reductions(), 3);
    assert_eq!(script.borrow().feedback, vec![true, true, true]);
    // The final artifact carries the last accepted candidate (its cleanup
    // pass was a no-op and was judged interesting).
    assert_eq!(
        frag_content(dir.path(), "variant_reduced_final"),
        c3.shaders()[0].source
    );
    for name in [
        "variant_reduced_0001_success",
        "variant_reduced_0002_success",
        "variant_reduced_0003_success",
    ] {
        assert!(dir.path().join(format!("{name}.json")).exists(), "{name} missing");
    }
}

#[test]
fn test_no_redundant_judging_of_known_failures() {
    let dir = TempDir::new().unwrap();
    let candidate = job(&["int a;"]);
    let (plan, script) = ScriptedPlan::new(vec![Ok(candidate.clone()), Ok(candidate)]);
    let mut judge = ScriptedJudge::new([true, false, true]);

    let mut driver = ReductionDriver::new(plan);
    let result = driver
        .run(job(&["int a;", "int b;"]), "variant", 0, &mut judge, dir.path(), None)
        .unwrap();

    assert!(result.is_some());
    // Initial verification, the first candidate, the final state. The second
    // candidate hit the failing set and never reached the judge.
    assert_eq!(
        judge.calls,
        vec![
            "variant.json".to_string(),
            "variant_reduced_0001.json".to_string(),
            "variant_reduced_final.json".to_string(),
        ]
    );
    // Both attempts are still on the trail, tagged as failures.
    assert!(dir.path().join("variant_reduced_0001_fail.json").exists());
    assert!(dir.path().join("variant_reduced_0002_fail.json").exists());
    assert_eq!(script.borrow().feedback, vec![false, false]);
}

#[test]
fn test_revisiting_accepted_state_is_fatal() {
    let dir = TempDir::new().unwrap();
    let candidate = job(&["int a;"]);
    let (plan, _script) = ScriptedPlan::new(vec![Ok(candidate.clone()), Ok(candidate)]);
    let mut judge = ScriptedJudge::new([true, true]);

    let mut driver = ReductionDriver::new(plan);
    let err = driver
        .run(job(&["int a;", "int b;"]), "variant", 0, &mut judge, dir.path(), None)
        .unwrap_err();

    assert!(matches!(err, ReductionError::Cache(_)));
    assert!(err.to_string().contains("reduction loop detected"));
}

#[test]
fn test_step_limit_marks_session_incomplete() {
    let dir = TempDir::new().unwrap();
    let (plan, _script) = ScriptedPlan::new(vec![
        Ok(job(&["int a;"])),
        Ok(job(&["int b;"])),
        Ok(job(&["int c;"])),
    ]);
    let mut judge = ScriptedJudge::new([true, false, false, true]);

    let mut driver = ReductionDriver::new(plan);
    let result = driver
        .run(job(&["int a;", "int b;"]), "variant", 0, &mut judge, dir.path(), Some(2))
        .unwrap();

    assert!(result.is_some());
    assert!(dir.path().join(REDUCTION_INCOMPLETE).exists());
    assert!(dir.path().join("variant_reduced_0001_fail.json").exists());
    assert!(dir.path().join("variant_reduced_0002_fail.json").exists());
    // The third scripted candidate was never requested.
    assert!(!dir.path().join("variant_reduced_0003_fail.json").exists());
    assert_eq!(judge.calls.len(), 4);
}

#[test]
fn test_exhaustion_leaves_no_incomplete_marker() {
    let dir = TempDir::new().unwrap();
    let (plan, _script) = ScriptedPlan::new(vec![Ok(job(&["int a;"]))]);
    let mut judge = ScriptedJudge::new([true, false, true]);

    let mut driver = ReductionDriver::new(plan);
    driver
        .run(job(&["int a;", "int b;"]), "variant", 0, &mut judge, dir.path(), None)
        .unwrap();

    assert!(!dir.path().join(REDUCTION_INCOMPLETE).exists());
}

#[test]
fn test_initial_retry_exhaustion() {
    let dir = TempDir::new().unwrap();
    let (plan, script) = ScriptedPlan::new(vec![Ok(job(&["int a;"]))]);
    let mut judge = ScriptedJudge::new([false, false, false, false, false]);

    let mut driver = ReductionDriver::new(plan);
    let result = driver
        .run(job(&["int a;", "int b;"]), "variant", 0, &mut judge, dir.path(), None)
        .unwrap();

    assert_eq!(result, None);
    assert!(dir.path().join(NOT_INTERESTING).exists());
    // Five initial attempts, zero shrink steps.
    assert_eq!(judge.calls.len(), 5);
    assert!(judge.calls.iter().all(|c| c == "variant.json"));
    assert_eq!(script.borrow().steps.len(), 1, "plan was never consulted");
    assert!(script.borrow().feedback.is_empty());
    assert!(!dir.path().join("variant_reduced_0001.json").exists());
}

#[test]
fn test_flaky_initial_judge_is_retried() {
    let dir = TempDir::new().unwrap();
    let (plan, _script) = ScriptedPlan::new(vec![]);
    let mut judge = ScriptedJudge::new([false, false, true, true]);

    let mut driver = ReductionDriver::new(plan);
    let result = driver
        .run(job(&["int a;"]), "variant", 0, &mut judge, dir.path(), None)
        .unwrap();

    assert!(result.is_some());
    assert!(!dir.path().join(NOT_INTERESTING).exists());
    // Two flaky refusals, one success, one final judgment.
    assert_eq!(judge.calls.len(), 4);
}

#[test]
fn test_resume_offset_skips_verification_and_numbers_from_offset() {
    let dir = TempDir::new().unwrap();
    let (plan, _script) = ScriptedPlan::new(vec![Ok(job(&["int a;"]))]);
    let mut judge = ScriptedJudge::new([true, true]);

    let mut driver = ReductionDriver::new(plan);
    let result = driver
        .run(job(&["int a;", "int b;"]), "variant", 7, &mut judge, dir.path(), None)
        .unwrap();

    assert!(result.is_some());
    // No initial verification: the first judged artifact is step 8.
    assert_eq!(judge.calls[0], "variant_reduced_0008.json");
    assert!(dir.path().join("variant_reduced_0008_success.json").exists());
}

#[test]
fn test_finalization_fallback_reverts_broken_cleanup() {
    let dir = TempDir::new().unwrap();
    let accepted_source = "#define UNUSED 1\nbug();\n";
    let candidate = job(&["#define UNUSED 1", "bug();"]);
    let (plan, _script) = ScriptedPlan::new(vec![Ok(candidate)]);
    // Initial interesting, candidate interesting, simplified final NOT
    // interesting: the cleanup broke the property.
    let mut judge = ScriptedJudge::new([true, true, false]);

    let mut driver = ReductionDriver::new(plan);
    let result = driver
        .run(
            job(&["#define UNUSED 1", "int a;", "bug();"]),
            "variant",
            0,
            &mut judge,
            dir.path(),
            None,
        )
        .unwrap();

    assert_eq!(result.as_deref(), Some("variant_reduced_final"));
    // The final artifact is the last accepted state, unmodified by cleanup.
    assert_eq!(frag_content(dir.path(), "variant_reduced_final"), accepted_source);
}

#[test]
fn test_transient_application_failure_is_retried() {
    let dir = TempDir::new().unwrap();
    let (plan, _script) = ScriptedPlan::new(vec![
        failed("inapplicable"),
        failed("inapplicable"),
        Ok(job(&["int a;"])),
    ]);
    let mut judge = ScriptedJudge::new([true, false, true]);

    let mut driver = ReductionDriver::new(plan);
    let result = driver
        .run(job(&["int a;", "int b;"]), "variant", 0, &mut judge, dir.path(), None)
        .unwrap();

    assert!(result.is_some());
    assert!(dir.path().join("variant_reduced_0001_fail.json").exists());
}

#[test]
fn test_persistent_application_failure_is_fatal() {
    let dir = TempDir::new().unwrap();
    let (plan, _script) = ScriptedPlan::new(vec![
        failed("broken"),
        failed("broken"),
        failed("broken"),
    ]);
    let mut judge = ScriptedJudge::new([true]);

    let mut driver = ReductionDriver::new(plan);
    let err = driver
        .run(job(&["int a;"]), "variant", 0, &mut judge, dir.path(), None)
        .unwrap_err();

    assert!(matches!(err, ReductionError::Plan(_)));
}

#[test]
fn test_bindings_stripped_in_memory_and_bound_on_disk() {
    let dir = TempDir::new().unwrap();
    let mut uniforms = UniformsInfo::new();
    uniforms.insert(
        "time",
        UniformInfo::new("glUniform1f".to_string(), vec![json!(0.0)]),
    );
    let mut initial = ShaderJob::new(
        None,
        uniforms,
        vec![ShaderSource {
            kind: ShaderKind::Fragment,
            source: "int a;\nint b;\n".to_string(),
        }],
    );
    initial.make_uniform_bindings();

    let candidate = ShaderJob::new(
        None,
        {
            let mut u = UniformsInfo::new();
            u.insert(
                "time",
                UniformInfo::new("glUniform1f".to_string(), vec![json!(0.0)]),
            );
            u
        },
        vec![ShaderSource {
            kind: ShaderKind::Fragment,
            source: "int a;\n".to_string(),
        }],
    );
    let (plan, script) = ScriptedPlan::new(vec![Ok(candidate)]);
    let mut judge = ScriptedJudge::new([true, true, true]);

    let mut driver = ReductionDriver::new(plan);
    driver
        .run(initial, "variant", 0, &mut judge, dir.path(), None)
        .unwrap();

    // The plan only ever saw binding-free states.
    assert!(!script.borrow().saw_bound_current);
    // Every materialized artifact carries bindings.
    for name in ["variant", "variant_reduced_0001_success", "variant_reduced_final"] {
        let text = std::fs::read_to_string(dir.path().join(format!("{name}.json"))).unwrap();
        assert!(text.contains("\"binding\""), "{name}.json lacks bindings");
    }
}
