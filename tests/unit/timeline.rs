use super::*;
use crate::{
    asset::{ClipAsset, ImageAsset, Provenance},
    card::{CardKind, TitleCards},
    gradient::GradientGenerator,
    planner::{Scene, plan_scenes},
    script::{FallbackScript, ScriptBrief, ScriptEntry},
    state::{ProfileRegistry, VoiceParams},
};

fn fps() -> Fps {
    Fps::new(24, 1).unwrap()
}

fn scene(index: usize, target_s: f64, profile: &StateProfile) -> Scene {
    Scene {
        index,
        title: format!("Scene {}", index + 1),
        narration: "A calm sea under a wide and quiet sky.".to_string(),
        visual_prompt: "sea".to_string(),
        mood: "serene".to_string(),
        target_s,
        motion: profile.motion_for(index),
    }
}

fn gradient_scene(s: Scene, profile: &StateProfile) -> ResolvedScene {
    let g = GradientGenerator::new(Resolution::HD).generate(&profile.palette, s.index);
    ResolvedScene {
        scene: s,
        asset: Asset::ProceduralGradient(g),
        tier: AssetTier::Gradient,
        attempts: vec![],
    }
}

fn silent(n: usize, voice: &VoiceParams) -> Vec<Narration> {
    (0..n).map(|_| Narration::silent("a few words here", voice)).collect()
}

fn provenance() -> Provenance {
    Provenance {
        provider: "test".to_string(),
        source_url: "https://example.invalid".to_string(),
        query: "sea".to_string(),
    }
}

fn cards_for(p: &StateProfile) -> TitleCards {
    TitleCards::for_script(&FallbackScript.script(&ScriptBrief::new("sea", p)), p)
}

fn plan_with_targets(state: PhysioState, targets: &[f64]) -> RenderPlan {
    let reg = ProfileRegistry::builtin().unwrap();
    let p = reg.profile(state);
    let resolved: Vec<ResolvedScene> = targets
        .iter()
        .enumerate()
        .map(|(i, &t)| gradient_scene(scene(i, t, p), p))
        .collect();
    assemble(&resolved, &silent(targets.len(), &p.voice), p, fps(), Resolution::HD, None).unwrap()
}

#[test]
fn segments_are_contiguous_and_sum_to_total() {
    let plan = plan_with_targets(PhysioState::Calm, &[10.3, 11.7, 12.01]);
    assert!(plan.is_contiguous());
    for w in plan.segments.windows(2) {
        assert_eq!(w[0].range.end, w[1].range.start);
        assert!((w[0].start_s + w[0].duration_s - w[1].start_s).abs() < 1e-9);
    }
    let sum: u64 = plan.segments.iter().map(|s| s.range.len_frames()).sum();
    assert_eq!(sum, plan.total_frames);
}

#[test]
fn tail_is_extended_up_to_min_bound() {
    // 9.9 s rounds to 238 frames, two short of 30 s at 24 fps.
    assert_eq!(fit_frames(&[10.0, 10.0, 9.9], fps(), (720, 1440)), vec![240, 240, 240]);
}

#[test]
fn tail_is_trimmed_down_to_max_bound() {
    assert_eq!(fit_frames(&[20.0, 20.0, 5.2], fps(), (360, 1080)), vec![480, 480, 120]);
}

#[test]
fn out_of_bounds_targets_are_scaled_proportionally() {
    let plan = plan_with_targets(PhysioState::Energized, &[30.0, 30.0, 30.0]);
    assert_eq!(plan.total_frames, 45 * 24);
    let lens: Vec<u64> = plan.segments.iter().map(|s| s.range.len_frames()).collect();
    assert_eq!(lens, vec![360, 360, 360]);
}

#[test]
fn trim_spills_backwards_when_tail_is_too_short() {
    let lengths = fit_frames(&[40.0, 10.0 / 24.0], fps(), (100, 900));
    assert_eq!(lengths, vec![899, 1]);
}

#[test]
fn every_state_lands_inside_its_bounds() {
    let reg = ProfileRegistry::builtin().unwrap();
    for p in reg.iter() {
        let cards = cards_for(p);
        for targets in [vec![1.0, 1.0], vec![200.0, 3.0, 4.0], vec![p.bounds.midpoint()]] {
            let resolved: Vec<ResolvedScene> = targets
                .iter()
                .enumerate()
                .map(|(i, &t)| gradient_scene(scene(i, t, p), p))
                .collect();
            let voices = silent(targets.len(), &p.voice);
            for with in [None, Some(&cards)] {
                let plan = assemble(&resolved, &voices, p, fps(), Resolution::HD, with).unwrap();
                let total = plan.total_s();
                assert!(
                    total >= p.bounds.min_s && total <= p.bounds.max_s,
                    "{}: {total}",
                    p.state
                );
                assert!(plan.is_contiguous());
            }
        }
    }
}

#[test]
fn energized_rescale_reaches_max_in_plan() {
    let reg = ProfileRegistry::builtin().unwrap();
    let p = reg.profile(PhysioState::Energized);
    let words = |n: usize| vec!["go"; n].join(" ");
    let entries: Vec<ScriptEntry> = [50, 50, 75]
        .iter()
        .map(|&n| ScriptEntry {
            title: String::new(),
            narration: words(n),
            visual_prompt: "runner on a track".to_string(),
            mood: "upbeat".to_string(),
        })
        .collect();
    let scenes = plan_scenes(&entries, p).unwrap();
    let resolved: Vec<ResolvedScene> = scenes.into_iter().map(|s| gradient_scene(s, p)).collect();
    let plan = assemble(&resolved, &silent(3, &p.voice), p, fps(), Resolution::HD, None).unwrap();
    assert_eq!(plan.total_s(), 45.0);
}

#[test]
fn more_scenes_than_frames_is_rejected() {
    let reg = ProfileRegistry::builtin().unwrap();
    let p = reg.profile(PhysioState::Energized);
    let entries: Vec<ScriptEntry> = (0..1100)
        .map(|_| ScriptEntry {
            title: String::new(),
            narration: "go go go".to_string(),
            visual_prompt: "runner".to_string(),
            mood: "upbeat".to_string(),
        })
        .collect();
    let scenes = plan_scenes(&entries, p).unwrap();
    let resolved: Vec<ResolvedScene> = scenes.into_iter().map(|s| gradient_scene(s, p)).collect();
    let voices = silent(resolved.len(), &p.voice);
    let err = assemble(&resolved, &voices, p, fps(), Resolution::HD, None).unwrap_err();
    assert!(matches!(err, ReelError::Validation(_)));
    assert!(check_capacity(1080, p, fps(), false).is_ok());
    assert!(check_capacity(1081, p, fps(), false).is_err());
    assert!(check_capacity(1080, p, fps(), true).is_err());
}

#[test]
fn cards_open_and_close_inside_bounds() {
    let reg = ProfileRegistry::builtin().unwrap();
    let p = reg.profile(PhysioState::Energized);
    let cards = cards_for(p);
    let resolved: Vec<ResolvedScene> = [15.0, 15.0, 15.0]
        .iter()
        .enumerate()
        .map(|(i, &t)| gradient_scene(scene(i, t, p), p))
        .collect();
    let plan =
        assemble(&resolved, &silent(3, &p.voice), p, fps(), Resolution::HD, Some(&cards)).unwrap();

    let intro = plan.intro.as_ref().unwrap();
    let outro = plan.outro.as_ref().unwrap();
    assert_eq!(intro.card.kind, CardKind::Intro);
    assert_eq!(outro.card.kind, CardKind::Outro);
    assert_eq!(intro.range.start, FrameIndex(0));
    assert_eq!(intro.range.len_frames(), 72);
    assert_eq!(plan.segments[0].range.start, intro.range.end);
    assert_eq!(outro.range.start, plan.segments[2].range.end);
    assert_eq!(outro.range.end.0, plan.total_frames);
    assert!(plan.is_contiguous());

    // 45 s of scenes shrink to leave room for both cards.
    assert_eq!(plan.total_s(), 45.0);
    let scene_frames: u64 = plan.segments.iter().map(|s| s.range.len_frames()).sum();
    assert_eq!(scene_frames, 45 * 24 - 2 * 72);
    assert_eq!(plan.segments[0].start_s, 3.0);
    assert!(intro.fade_in_frames > 0 && intro.fade_out_frames > 0);
}

#[test]
fn cards_shrink_for_short_bounds() {
    let reg = ProfileRegistry::builtin().unwrap();
    let p = reg.profile(PhysioState::Calm);
    assert_eq!(card_frames(p, fps()), 72);
    assert_eq!(scene_window(p, fps(), true), (720 - 144, 1440 - 144));

    let mut short = p.clone();
    short.bounds = DurationBounds {
        min_s: 10.0,
        max_s: 20.0,
    };
    // 20 s is 480 frames; each card gets at most a tenth.
    assert_eq!(card_frames(&short, fps()), 48);
    assert_eq!(scene_window(&short, fps(), true), (240 - 96, 480 - 96));
    assert_eq!(scene_window(&short, fps(), false), (240, 480));
}

#[test]
fn long_narration_keeps_subtitles_in_the_safe_area() {
    let reg = ProfileRegistry::builtin().unwrap();
    let p = reg.profile(PhysioState::Calm);
    let mut s = scene(0, 40.0, p);
    s.narration = vec!["drift"; 400].join(" ");
    let resolved = vec![gradient_scene(s, p)];
    let plan = assemble(&resolved, &silent(1, &p.voice), p, fps(), Resolution::HD, None).unwrap();

    let style = &plan.subtitle_style;
    let lines = &plan.segments[0].subtitle.lines;
    assert_eq!(lines.len(), style.max_lines);
    assert!(lines.last().unwrap().ends_with("..."));
    assert!(lines.iter().all(|l| l.chars().count() <= style.max_chars));
    let h = Resolution::HD.height;
    let top = style.block_top(h, lines.len());
    assert!(top + lines.len() as u32 * style.line_height() + style.bottom_margin <= h);
}

#[test]
fn transitions_follow_pacing_and_fit_segments() {
    let calm = plan_with_targets(PhysioState::Calm, &[10.0, 10.0, 10.0]);
    let hot = plan_with_targets(PhysioState::Energized, &[10.0, 10.0, 10.0]);
    assert_eq!(calm.transitions.len(), 2);
    assert!(calm.transitions[0].frames > hot.transitions[0].frames);

    let tiny = plan_with_targets(PhysioState::Calm, &[29.0, 0.1, 1.0]);
    for t in &tiny.transitions {
        let prev = tiny.segments[t.after].range.len_frames();
        let next = tiny.segments[t.after + 1].range.len_frames();
        assert!(t.frames <= prev.min(next));
    }
    for s in &tiny.segments {
        assert!(s.fade_in_frames + s.fade_out_frames <= s.range.len_frames());
    }
}

#[test]
fn fill_mode_follows_asset_variant() {
    let reg = ProfileRegistry::builtin().unwrap();
    let p = reg.profile(PhysioState::Calm);
    let clip = |secs: f64| {
        Asset::VideoClip(ClipAsset {
            path: PathBuf::from("c.mp4"),
            available_s: secs,
            resolution: Resolution::HD,
            tags: vec![],
            provenance: provenance(),
        })
    };
    let image = Asset::StaticImage(ImageAsset {
        path: PathBuf::from("i.jpg"),
        resolution: Resolution::HD,
        tags: vec![],
        provenance: provenance(),
    });
    let with = |i: usize, asset: Asset, tier: AssetTier| ResolvedScene {
        scene: scene(i, 10.0, p),
        asset,
        tier,
        attempts: vec![],
    };
    let resolved = vec![
        with(0, clip(5.0), AssetTier::Primary),
        with(1, clip(60.0), AssetTier::Secondary),
        with(2, image, AssetTier::Image),
        gradient_scene(scene(3, 10.0, p), p),
    ];
    let plan = assemble(&resolved, &silent(4, &p.voice), p, fps(), Resolution::HD, None).unwrap();
    let fills: Vec<FillMode> = plan.segments.iter().map(|s| s.fill).collect();
    assert_eq!(
        fills,
        vec![FillMode::Loop, FillMode::Trim, FillMode::Hold, FillMode::Render]
    );
    assert_eq!(plan.segments[0].speed, p.speed);
    assert_eq!(plan.segments[2].speed, 1.0);
    assert_eq!(plan.segments[1].tier, AssetTier::Secondary);
}

#[test]
fn subtitles_and_narration_are_carried() {
    let plan = plan_with_targets(PhysioState::PreSleep, &[20.0, 30.0]);
    let seg = &plan.segments[0];
    assert_eq!(seg.subtitle.lines.join(" "), "A calm sea under a wide and quiet sky.");
    assert_eq!(seg.subtitle.title_s, 2.5);
    assert_eq!(seg.narration.path, None);
    assert_eq!(seg.narration.pitch_semitones, -2.0);
}

#[test]
fn empty_and_mismatched_inputs_are_rejected() {
    let reg = ProfileRegistry::builtin().unwrap();
    let p = reg.profile(PhysioState::Neutral);
    assert!(matches!(
        assemble(&[], &[], p, fps(), Resolution::HD, None),
        Err(ReelError::EmptyScript)
    ));
    let one = vec![gradient_scene(scene(0, 25.0, p), p)];
    assert!(matches!(
        assemble(&one, &[], p, fps(), Resolution::HD, None),
        Err(ReelError::Validation(_))
    ));
}
