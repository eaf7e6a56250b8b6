use super::*;
use crate::state::{PhysioState, ProfileRegistry};

fn entry(words: usize) -> ScriptEntry {
    ScriptEntry {
        title: String::new(),
        narration: vec!["word"; words].join(" "),
        visual_prompt: "forest, morning light".to_string(),
        mood: "serene".to_string(),
    }
}

#[test]
fn empty_script_is_fatal() {
    let reg = ProfileRegistry::builtin().unwrap();
    let err = plan_scenes(&[], reg.profile(PhysioState::Calm)).unwrap_err();
    assert!(matches!(err, ReelError::EmptyScript));
}

#[test]
fn estimate_uses_fixed_rate_with_floor() {
    assert!((estimate_secs("one two three four five") - 2.0).abs() < 1e-12);
    assert_eq!(estimate_secs(""), MIN_SCENE_SECS);
}

#[test]
fn energized_overlong_script_rescales_to_max_preserving_shares() {
    let reg = ProfileRegistry::builtin().unwrap();
    let profile = reg.profile(PhysioState::Energized);
    // 50 + 50 + 75 words at 2.5 w/s = 20 + 20 + 30 = 70s.
    let entries = vec![entry(50), entry(50), entry(75)];
    let scenes = plan_scenes(&entries, profile).unwrap();

    let total: f64 = scenes.iter().map(|s| s.target_s).sum();
    assert!((total - 45.0).abs() < 1e-9);
    let share = |i: usize| scenes[i].target_s / total;
    assert!((share(0) - 20.0 / 70.0).abs() < 1e-9);
    assert!((share(1) - 20.0 / 70.0).abs() < 1e-9);
    assert!((share(2) - 30.0 / 70.0).abs() < 1e-9);
}

#[test]
fn short_script_is_stretched_to_min() {
    let reg = ProfileRegistry::builtin().unwrap();
    let profile = reg.profile(PhysioState::Calm);
    let scenes = plan_scenes(&[entry(10), entry(10), entry(10)], profile).unwrap();
    let total: f64 = scenes.iter().map(|s| s.target_s).sum();
    assert!((total - 30.0).abs() < 1e-9);
    assert_eq!(scenes.len(), 3);
}

#[test]
fn in_bounds_script_is_untouched() {
    let reg = ProfileRegistry::builtin().unwrap();
    let profile = reg.profile(PhysioState::Neutral);
    let scenes = plan_scenes(&[entry(40), entry(35)], profile).unwrap();
    assert!((scenes[0].target_s - 16.0).abs() < 1e-12);
    assert!((scenes[1].target_s - 14.0).abs() < 1e-12);
}

#[test]
fn motion_assignment_cycles_deterministically() {
    let reg = ProfileRegistry::builtin().unwrap();
    let profile = reg.profile(PhysioState::Calm);
    let entries: Vec<_> = (0..7).map(|_| entry(20)).collect();
    let a = plan_scenes(&entries, profile).unwrap();
    let b = plan_scenes(&entries, profile).unwrap();
    for (i, (x, y)) in a.iter().zip(&b).enumerate() {
        assert_eq!(x.motion, y.motion);
        assert_eq!(x.motion, profile.motion[i % profile.motion.len()]);
        assert_eq!(x.index, i);
    }
}

#[test]
fn reconcile_extends_for_long_narration_then_clamps() {
    let reg = ProfileRegistry::builtin().unwrap();
    let profile = reg.profile(PhysioState::Focus);
    let scenes = plan_scenes(&[entry(25), entry(25), entry(25)], profile).unwrap();
    // 3 x 10s = 30s planned; a 20s narration on scene 1 pushes to 40s, within [30, 55].
    let out = reconcile_narration(&scenes, &[5.0, 20.0, 10.0], profile).unwrap();
    assert!((out[1].target_s - 20.0).abs() < 1e-9);
    let total: f64 = out.iter().map(|s| s.target_s).sum();
    assert!((total - 40.0).abs() < 1e-9);

    // Very long narration is clamped back to the max.
    let out = reconcile_narration(&scenes, &[60.0, 60.0, 60.0], profile).unwrap();
    let total: f64 = out.iter().map(|s| s.target_s).sum();
    assert!((total - 55.0).abs() < 1e-9);
}

#[test]
fn reconcile_rejects_mismatched_lengths() {
    let reg = ProfileRegistry::builtin().unwrap();
    let profile = reg.profile(PhysioState::Focus);
    let scenes = plan_scenes(&[entry(25)], profile).unwrap();
    assert!(reconcile_narration(&scenes, &[], profile).is_err());
}
