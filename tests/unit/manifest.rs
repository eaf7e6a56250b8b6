use super::*;
use crate::{
    asset::{Asset, ClipAsset, Provenance},
    gradient::GradientGenerator,
    narration::Narration,
    planner::plan_scenes,
    script::{FallbackScript, ScriptBrief},
    state::ProfileRegistry,
    timeline::assemble,
};

fn fixture() -> (Script, DurationBounds, RenderPlan, Vec<ResolvedScene>) {
    let reg = ProfileRegistry::builtin().unwrap();
    let p = reg.profile(PhysioState::Calm);
    let script = FallbackScript.script(&ScriptBrief::new("ocean waves", p));
    let scenes = plan_scenes(&script.entries, p).unwrap();
    let grad = GradientGenerator::new(Resolution::HD);
    let resolved: Vec<ResolvedScene> = scenes
        .into_iter()
        .map(|s| {
            let (asset, tier, attempts) = if s.index == 0 {
                (
                    Asset::VideoClip(ClipAsset {
                        path: PathBuf::from("/tmp/scene000_pexels.mp4"),
                        available_s: 60.0,
                        resolution: Resolution::HD,
                        tags: vec!["ocean".to_string()],
                        provenance: Provenance {
                            provider: "pexels".to_string(),
                            source_url: "https://example.invalid/v/1".to_string(),
                            query: "ocean".to_string(),
                        },
                    }),
                    AssetTier::Primary,
                    vec![TierAttempt {
                        tier: AssetTier::Primary,
                        provider: "pexels".to_string(),
                        tries: 1,
                        outcome: "ok".to_string(),
                        detail: None,
                    }],
                )
            } else {
                (
                    Asset::ProceduralGradient(grad.generate(&p.palette, s.index)),
                    AssetTier::Gradient,
                    vec![],
                )
            };
            ResolvedScene {
                scene: s,
                asset,
                tier,
                attempts,
            }
        })
        .collect();
    let narration: Vec<Narration> = resolved
        .iter()
        .map(|r| Narration::silent(&r.scene.narration, &p.voice))
        .collect();
    let fps = Fps::new(24, 1).unwrap();
    let plan = assemble(&resolved, &narration, p, fps, Resolution::HD, None).unwrap();
    (script, p.bounds, plan, resolved)
}

#[test]
fn scenes_mirror_plan_segments() {
    let (script, bounds, plan, resolved) = fixture();
    let m = Manifest::from_plan("abcd1234", &script, bounds, &plan, &resolved);

    assert_eq!(m.scenes.len(), plan.segments.len());
    assert_eq!(m.total_duration_s, plan.total_s());
    assert!(bounds.contains(m.total_duration_s));
    for (rec, seg) in m.scenes.iter().zip(&plan.segments) {
        assert_eq!(rec.start_s, seg.start_s);
        assert_eq!(rec.duration_s, seg.duration_s);
        assert_eq!(rec.tier, seg.tier);
        assert!(!rec.narration_audio);
    }

    assert_eq!(m.scenes[0].provider.as_deref(), Some("pexels"));
    assert_eq!(m.scenes[0].asset_kind, "video_clip");
    assert_eq!(m.scenes[0].attempts.len(), 1);
    assert_eq!(m.scenes[1].provider, None);
    assert!(m.scenes[1].gradient_seed.is_some());
    assert_eq!(m.scenes[1].fill, FillMode::Render);
}

#[test]
fn tier_counts_tally_every_scene() {
    let (script, bounds, plan, resolved) = fixture();
    let m = Manifest::from_plan("abcd1234", &script, bounds, &plan, &resolved);
    let counts = m.tier_counts();
    assert_eq!(counts.get(&AssetTier::Primary), Some(&1));
    assert_eq!(counts.get(&AssetTier::Gradient), Some(&(m.scenes.len() - 1)));
}

#[test]
fn failed_clears_output_and_records_reason() {
    let (script, bounds, plan, resolved) = fixture();
    let m = Manifest::from_plan("abcd1234", &script, bounds, &plan, &resolved)
        .succeeded(Path::new("/out/x.mp4"))
        .failed("ffmpeg exited 1");
    assert_eq!(m.status, RunStatus::Failed);
    assert_eq!(m.error.as_deref(), Some("ffmpeg exited 1"));
    assert_eq!(m.output, None);
}

#[test]
fn write_produces_readable_json() {
    let (script, bounds, plan, resolved) = fixture();
    let m = Manifest::from_plan("abcd1234", &script, bounds, &plan, &resolved)
        .succeeded(Path::new("/out/abcd1234_ocean_waves.mp4"));
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("m.json");
    m.write(&path).unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(v["status"], "ok");
    assert_eq!(v["state"], "calm");
    assert_eq!(v["scenes"][0]["tier"], "primary");
    assert!(v.get("error").is_none());

    let back: Manifest = serde_json::from_str(&raw).unwrap();
    assert_eq!(back, m);
}

#[test]
fn write_reports_a_failed_flush() {
    // Writes to /dev/full only fail once the buffer reaches the device.
    let full = Path::new("/dev/full");
    if !full.exists() {
        return;
    }
    let (script, bounds, plan, resolved) = fixture();
    let m = Manifest::from_plan("abcd1234", &script, bounds, &plan, &resolved);
    assert!(m.write(full).is_err());
}

#[test]
fn card_lengths_are_recorded() {
    let (script, bounds, _, resolved) = fixture();
    let reg = ProfileRegistry::builtin().unwrap();
    let p = reg.profile(PhysioState::Calm);
    let narration: Vec<Narration> = resolved
        .iter()
        .map(|r| Narration::silent(&r.scene.narration, &p.voice))
        .collect();
    let cards = crate::card::TitleCards::for_script(&script, p);
    let fps = Fps::new(24, 1).unwrap();
    let plan = assemble(&resolved, &narration, p, fps, Resolution::HD, Some(&cards)).unwrap();
    let m = Manifest::from_plan("abcd1234", &script, bounds, &plan, &resolved);

    assert_eq!(m.intro_s, Some(3.0));
    assert_eq!(m.outro_s, Some(3.0));
    assert_eq!(m.scenes[0].start_s, 3.0);
    assert!(bounds.contains(m.total_duration_s));
    let raw = serde_json::to_value(&m).unwrap();
    assert_eq!(raw["intro_s"], 3.0);

    let bare = fixture();
    let m = Manifest::from_plan("abcd1234", &bare.0, bare.1, &bare.2, &bare.3);
    assert!(serde_json::to_value(&m).unwrap().get("intro_s").is_none());
}
