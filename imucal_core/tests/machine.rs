//! End-to-end state machine runs against the scripted operator rig.
//!
//! With the deterministic test clock the full default-length sequence
//! executes in milliseconds while exercising the real capture timings.

use imucal_core::capture::NOTE_STOPPED_BY_TIMEOUT;
use imucal_core::error::CalError;
use imucal_core::machine::{CalStep, Calibrator, CaptureTiming, RunOutcome};
use imucal_core::mocks::rig::{RigReader, guided};
use imucal_core::mocks::{ScriptedChannel, ScriptedReader};
use imucal_core::types::{Axis, Pose, UnitId};
use imucal_core::Signal;
use imucal_traits::clock::test_clock::TestClock;
use imucal_traits::RawSample;
use std::sync::Arc;

fn calibrator(reader: RigReader, dir: &std::path::Path) -> Calibrator<RigReader> {
    Calibrator::with_clock(
        UnitId::Left,
        reader,
        CaptureTiming::default(),
        dir.to_path_buf(),
        Arc::new(TestClock::new()),
    )
}

#[test]
fn full_guided_run_produces_a_valid_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let (reader, mut chan) = guided(ScriptedChannel::new(UnitId::Left), false);

    let outcome = calibrator(reader, dir.path()).run(&mut chan).unwrap();
    let RunOutcome::Complete { result, path } = outcome else {
        panic!("expected completion");
    };

    assert!(path.exists());
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("left_"));
    assert!(name.ends_with("_inertial_calibration.json"));

    // gyro: exact static bias, ~3-count residual recovered per axis
    assert_eq!(
        result.gyro_bias_static,
        imucal_core::Vec3::new(2.0, -3.0, 1.0)
    );
    for axis in [Axis::X, Axis::Y, Axis::Z] {
        let d = result.gyro_bias_dynamic.axis(axis);
        assert!((d - 3.0).abs() < 0.7, "residual on {axis} was {d}");
    }
    let blended = result.gyro_bias_static * 0.75 + result.gyro_bias_dynamic * 0.25;
    assert!((result.gyro_bias_final - blended).abs().sum() < 1e-9);

    // accel: shared DC offset lands in bias, gravity in scale
    assert!((result.accel_bias.x - 10.0).abs() < 1e-9);
    assert!((result.accel_bias.y + 20.0).abs() < 1e-9);
    assert!((result.accel_bias.z - 5.0).abs() < 1e-9);
    assert!((result.accel_scale.x - 4096.0).abs() < 1e-9);

    // mag: hard-iron center and radius recovered
    assert!((result.mag_offset.x - 120.0).abs() < 3.0);
    assert!((result.mag_offset.y + 80.0).abs() < 3.0);
    assert!((result.mag_offset.z - 40.0).abs() < 3.0);
    assert!((result.mag_scale.x - 350.0).abs() < 5.0);

    // spins ran to their hard deadline and say so
    for phase in [
        &result.gyro_rotation_phases.x,
        &result.gyro_rotation_phases.y,
        &result.gyro_rotation_phases.z,
    ] {
        assert!(phase.notes.iter().any(|n| n == NOTE_STOPPED_BY_TIMEOUT));
        assert!(phase.duration_s >= 29.9);
    }

    assert_eq!(result.confidence.gyro_static, 1.0);
    assert!(result.confidence.overall > 0.9);
    result.validate().unwrap();

    // the artifact on disk is the same document
    let text = std::fs::read_to_string(&path).unwrap();
    let v: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(v["schema_version"], 1);
    assert_eq!(v["unit"], "left");
    assert_eq!(v["accel_poses"].as_array().unwrap().len(), 6);
}

#[test]
fn session_events_follow_the_step_table() {
    let dir = tempfile::tempdir().unwrap();
    let (reader, mut chan) = guided(ScriptedChannel::new(UnitId::Left), false);
    calibrator(reader, dir.path()).run(&mut chan).unwrap();

    let steps: Vec<String> = chan
        .inner
        .events
        .iter()
        .filter_map(|e| serde_json::from_str::<serde_json::Value>(e).ok())
        .filter(|v| v["type"] == "step")
        .map(|v| v["step"].as_str().unwrap().to_string())
        .collect();
    let expected: Vec<&str> = CalStep::SEQUENCE.iter().map(|s| s.id()).collect();
    assert_eq!(steps, expected);

    let types = chan.inner.event_types();
    assert_eq!(types.iter().filter(|t| *t == "phase").count(), 3);
    assert_eq!(types.iter().filter(|t| *t == "complete").count(), 1);
    assert!(types.iter().filter(|t| *t == "progress").count() > 100);
    assert_eq!(types.last().map(String::as_str), Some("complete"));

    // progress climbs to 100 by the end
    let last_progress = chan
        .inner
        .events
        .iter()
        .filter_map(|e| serde_json::from_str::<serde_json::Value>(e).ok())
        .filter(|v| v["type"] == "progress")
        .filter_map(|v| v["progress"].as_f64())
        .next_back()
        .unwrap();
    assert!((last_progress - 100.0).abs() < 1e-9);
}

#[test]
fn cancel_before_any_capture_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let (reader, mut chan) = guided(
        ScriptedChannel::new(UnitId::Left).cancel_at_await(0),
        false,
    );
    let outcome = calibrator(reader, dir.path()).run(&mut chan).unwrap();
    assert!(matches!(outcome, RunOutcome::Cancelled));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn cancel_midway_writes_nothing() {
    for cancel_at in [3, 7, 10] {
        let dir = tempfile::tempdir().unwrap();
        let (reader, mut chan) = guided(
            ScriptedChannel::new(UnitId::Left).cancel_at_await(cancel_at),
            false,
        );
        let outcome = calibrator(reader, dir.path()).run(&mut chan).unwrap();
        assert!(matches!(outcome, RunOutcome::Cancelled), "at {cancel_at}");
        assert_eq!(
            std::fs::read_dir(dir.path()).unwrap().count(),
            0,
            "artifact leaked when cancelling at await {cancel_at}"
        );
    }
}

#[test]
fn cancel_during_capture_is_observed_at_a_sample_boundary() {
    let dir = tempfile::tempdir().unwrap();
    let mut inner = ScriptedChannel::new(UnitId::Left);
    // quiet for 40 samples, then cancel mid-capture
    for _ in 0..40 {
        inner.polls.push_back(None);
    }
    inner.polls.push_back(Some(Signal::Cancel));
    let (reader, mut chan) = guided(inner, false);
    let outcome = calibrator(reader, dir.path()).run(&mut chan).unwrap();
    assert!(matches!(outcome, RunOutcome::Cancelled));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn sample_read_failure_is_fatal_and_reported() {
    let dir = tempfile::tempdir().unwrap();
    let mut s = RawSample::zeroed(UnitId::Left);
    s.az = 4096;
    let reader = ScriptedReader::failing_after(vec![s], 5);
    let mut chan = ScriptedChannel::new(UnitId::Left);

    let cal = Calibrator::with_clock(
        UnitId::Left,
        reader,
        CaptureTiming::default(),
        dir.path().to_path_buf(),
        Arc::new(TestClock::new()),
    );
    let err = cal.run(&mut chan).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CalError>(),
        Some(CalError::SampleRead(_))
    ));
    // the abort diagnostic carries the documented shape
    assert!(err.to_string().starts_with("capture_error:"));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    assert!(chan.event_types().iter().any(|t| t == "error"));
}

#[test]
fn flat_accelerometer_fails_with_gravity_separation() {
    let dir = tempfile::tempdir().unwrap();
    let (reader, mut chan) = guided(ScriptedChannel::new(UnitId::Left), true);
    let err = calibrator(reader, dir.path()).run(&mut chan).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CalError>(),
        Some(CalError::GravitySeparation(_))
    ));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    assert!(chan.inner.event_types().iter().any(|t| t == "error"));
}

#[test]
fn pose_order_in_artifact_matches_fixed_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let (reader, mut chan) = guided(ScriptedChannel::new(UnitId::Left), false);
    let RunOutcome::Complete { result, .. } =
        calibrator(reader, dir.path()).run(&mut chan).unwrap()
    else {
        panic!("expected completion");
    };
    let poses: Vec<Pose> = result.accel_poses.iter().map(|p| p.pose).collect();
    assert_eq!(poses, Pose::ALL);
}

#[test]
fn select_unit_semantics() {
    use imucal_core::select_unit;
    let mut chan = ScriptedChannel::new(UnitId::Right);

    // none attached: fatal
    let err = select_unit(&[], &mut chan).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CalError>(),
        Some(CalError::NoUnitAvailable)
    ));

    // single unit: picked automatically, no solicitation
    assert_eq!(select_unit(&[UnitId::Left], &mut chan).unwrap(), UnitId::Left);

    // both attached: the channel decides
    assert_eq!(
        select_unit(&[UnitId::Left, UnitId::Right], &mut chan).unwrap(),
        UnitId::Right
    );
}

// The in-phase fraction must never push a mid-run report past the final
// percentage (AdvancingChannel used only for its reader coupling here).
#[test]
fn progress_reports_are_bounded_and_nondecreasing_across_steps() {
    let dir = tempfile::tempdir().unwrap();
    let (reader, mut chan) = guided(ScriptedChannel::new(UnitId::Left), false);
    calibrator(reader, dir.path()).run(&mut chan).unwrap();

    let progresses: Vec<f64> = chan
        .inner
        .events
        .iter()
        .filter_map(|e| serde_json::from_str::<serde_json::Value>(e).ok())
        .filter(|v| v["type"] == "progress")
        .filter_map(|v| v["progress"].as_f64())
        .collect();
    assert!(progresses.iter().all(|p| (0.0..=100.0).contains(p)));
    for w in progresses.windows(2) {
        assert!(
            w[1] >= w[0] - 1e-9,
            "progress regressed: {} -> {}",
            w[0],
            w[1]
        );
    }
    assert!((progresses.last().unwrap() - 100.0).abs() < 1e-9);
}
