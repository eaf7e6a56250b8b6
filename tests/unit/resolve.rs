use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use futures::future::{BoxFuture, FutureExt as _};

use super::*;
use crate::{
    asset::{ClipAsset, Provenance},
    foundation::core::Resolution,
    motion::MotionPattern,
    state::{PhysioState, ProfileRegistry},
};

#[derive(Clone)]
enum Outcome {
    Clip { secs: f64, tags: &'static [&'static str] },
    Fail(ProviderError),
    Hang,
}

struct Scripted {
    name: &'static str,
    configured: bool,
    queue: std::sync::Mutex<VecDeque<Outcome>>,
    fallback: Outcome,
    delay: Duration,
    calls: AtomicU32,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Scripted {
    fn new(name: &'static str, fallback: Outcome) -> Self {
        Self {
            name,
            configured: true,
            queue: std::sync::Mutex::new(VecDeque::new()),
            fallback,
            delay: Duration::ZERO,
            calls: AtomicU32::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    fn then(self, first: Outcome) -> Self {
        self.queue.lock().unwrap().push_back(first);
        self
    }
}

impl AssetProvider for Scripted {
    fn name(&self) -> &str {
        self.name
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    fn search<'a>(&'a self, req: &'a SearchRequest) -> BoxFuture<'a, Result<Asset, ProviderError>> {
        async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            let next = self
                .queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone());
            tokio::time::sleep(self.delay).await;
            let out = match next {
                Outcome::Clip { secs, tags } => Ok(Asset::VideoClip(ClipAsset {
                    path: req.download_path(self.name, "mp4"),
                    available_s: secs,
                    resolution: Resolution::HD,
                    tags: tags.iter().map(|t| t.to_string()).collect(),
                    provenance: Provenance {
                        provider: self.name.to_string(),
                        source_url: format!("https://{}/clip", self.name),
                        query: req.query.clone(),
                    },
                })),
                Outcome::Fail(e) => Err(e),
                Outcome::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Err(ProviderError::NoMatch(req.query.clone()))
                }
            };
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            out
        }
        .boxed()
    }
}

fn policy() -> ChainPolicy {
    ChainPolicy {
        attempt_timeout: Duration::from_millis(50),
        max_attempts: 2,
        retry_backoff: Duration::from_millis(1),
    }
}

fn open_budget() -> RateBudget {
    RateBudget::new(8, Duration::ZERO)
}

fn scene(index: usize) -> Scene {
    Scene {
        index,
        title: format!("Scene {}", index + 1),
        narration: "Breathe in slowly.".to_string(),
        visual_prompt: "ocean waves at dawn, soft light".to_string(),
        mood: "serene".to_string(),
        target_s: 10.0,
        motion: MotionPattern::GentleDrift,
    }
}

fn chain(slots: Vec<(AssetTier, Scripted)>) -> ResolutionChain {
    slots.into_iter().fold(
        ResolutionChain::new(GradientGenerator::new(Resolution::HD), policy()),
        |c, (tier, p)| c.with_tier(tier, Box::new(p), open_budget()),
    )
}

fn no_match() -> Outcome {
    Outcome::Fail(ProviderError::NoMatch("q".to_string()))
}

const OCEAN: &[&str] = &["ocean", "beach"];

#[tokio::test]
async fn all_failing_providers_fall_through_to_gradient() {
    let reg = ProfileRegistry::builtin().unwrap();
    let calm = reg.profile(PhysioState::Calm);
    let c = chain(vec![
        (AssetTier::Primary, Scripted::new("p", no_match())),
        (AssetTier::Secondary, Scripted::new("s", no_match())),
        (AssetTier::Image, Scripted::new("i", no_match())),
    ]);
    let r = c
        .resolve(&scene(0), calm, Path::new("/tmp"), &CancelToken::new())
        .await;
    assert_eq!(r.tier, AssetTier::Gradient);
    assert!(matches!(r.asset, Asset::ProceduralGradient(_)));
    let outcomes: Vec<&str> = r.attempts.iter().map(|a| a.outcome.as_str()).collect();
    assert_eq!(outcomes, vec!["no_match", "no_match", "no_match", "ok"]);
}

#[tokio::test]
async fn primary_timeout_falls_to_secondary() {
    let reg = ProfileRegistry::builtin().unwrap();
    let calm = reg.profile(PhysioState::Calm);
    let c = chain(vec![
        (AssetTier::Primary, Scripted::new("p", Outcome::Hang)),
        (
            AssetTier::Secondary,
            Scripted::new("s", Outcome::Clip { secs: 12.0, tags: OCEAN }),
        ),
    ]);
    let r = c
        .resolve(&scene(0), calm, Path::new("/tmp"), &CancelToken::new())
        .await;
    assert_eq!(r.tier, AssetTier::Secondary);
    assert_eq!(r.attempts[0].outcome, "timeout");
    assert_eq!(r.attempts[0].tries, 1);
    assert_eq!(r.attempts[1].outcome, "ok");
}

#[tokio::test]
async fn transient_failure_is_retried_once() {
    let reg = ProfileRegistry::builtin().unwrap();
    let calm = reg.profile(PhysioState::Calm);
    let p = Scripted::new("p", Outcome::Clip { secs: 12.0, tags: OCEAN })
        .then(Outcome::Fail(ProviderError::RateLimited));
    let c = chain(vec![(AssetTier::Primary, p)]);
    let r = c
        .resolve(&scene(0), calm, Path::new("/tmp"), &CancelToken::new())
        .await;
    assert_eq!(r.tier, AssetTier::Primary);
    assert_eq!(r.attempts[0].tries, 2);
}

#[tokio::test]
async fn retry_budget_is_bounded() {
    let reg = ProfileRegistry::builtin().unwrap();
    let calm = reg.profile(PhysioState::Calm);
    let c = chain(vec![(
        AssetTier::Primary,
        Scripted::new("p", Outcome::Fail(ProviderError::Network("reset".into()))),
    )]);
    let r = c
        .resolve(&scene(0), calm, Path::new("/tmp"), &CancelToken::new())
        .await;
    assert_eq!(r.tier, AssetTier::Gradient);
    assert_eq!(r.attempts[0].tries, 2);
    assert_eq!(r.attempts[0].outcome, "network");
}

#[tokio::test]
async fn short_or_off_topic_assets_are_rejected() {
    let reg = ProfileRegistry::builtin().unwrap();
    let calm = reg.profile(PhysioState::Calm);
    let c = chain(vec![
        (
            AssetTier::Primary,
            Scripted::new("p", Outcome::Clip { secs: 4.0, tags: OCEAN }),
        ),
        (
            AssetTier::Secondary,
            Scripted::new("s", Outcome::Clip { secs: 40.0, tags: &["city", "traffic"] }),
        ),
    ]);
    let r = c
        .resolve(&scene(0), calm, Path::new("/tmp"), &CancelToken::new())
        .await;
    assert_eq!(r.tier, AssetTier::Gradient);
    assert_eq!(r.attempts[0].outcome, "duration_insufficient");
    assert_eq!(r.attempts[1].outcome, "content_mismatch");
}

#[tokio::test]
async fn rejected_download_is_removed() {
    let dir = tempfile::tempdir().unwrap();
    let reg = ProfileRegistry::builtin().unwrap();
    let calm = reg.profile(PhysioState::Calm);
    let file = dir.path().join("scene000_p.mp4");
    std::fs::write(&file, b"x").unwrap();
    let c = chain(vec![(
        AssetTier::Primary,
        Scripted::new("p", Outcome::Clip { secs: 1.0, tags: OCEAN }),
    )]);
    c.resolve(&scene(0), calm, dir.path(), &CancelToken::new())
        .await;
    assert!(!file.exists());
}

#[tokio::test]
async fn unconfigured_provider_is_skipped() {
    let reg = ProfileRegistry::builtin().unwrap();
    let calm = reg.profile(PhysioState::Calm);
    let mut p = Scripted::new("p", Outcome::Clip { secs: 12.0, tags: OCEAN });
    p.configured = false;
    let c = chain(vec![(AssetTier::Primary, p)]);
    let r = c
        .resolve(&scene(0), calm, Path::new("/tmp"), &CancelToken::new())
        .await;
    assert_eq!(r.attempts[0].outcome, "not_configured");
    assert_eq!(r.attempts[0].tries, 0);
    assert_eq!(r.tier, AssetTier::Gradient);
}

#[tokio::test]
async fn cancellation_short_circuits_to_gradient() {
    let reg = ProfileRegistry::builtin().unwrap();
    let calm = reg.profile(PhysioState::Calm);
    let c = ResolutionChain::new(
        GradientGenerator::new(Resolution::HD),
        ChainPolicy {
            attempt_timeout: Duration::from_secs(60),
            ..policy()
        },
    )
    .with_tier(
        AssetTier::Primary,
        Box::new(Scripted::new("p", Outcome::Hang)),
        open_budget(),
    );
    let cancel = CancelToken::new();
    let trigger = {
        let cancel = cancel.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        }
    };
    let started = std::time::Instant::now();
    let sc = scene(0);
    let (r, ()) = tokio::join!(c.resolve(&sc, calm, Path::new("/tmp"), &cancel), trigger);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(r.attempts[0].outcome, "cancelled");
    assert_eq!(r.tier, AssetTier::Gradient);
}

#[tokio::test]
async fn resolve_all_keeps_order_and_is_deterministic() {
    let reg = ProfileRegistry::builtin().unwrap();
    let calm = reg.profile(PhysioState::Calm);
    let c = chain(vec![(AssetTier::Primary, Scripted::new("p", no_match()))]);
    let scenes: Vec<Scene> = (0..5).map(scene).collect();
    let cancel = CancelToken::new();
    let a = c.resolve_all(&scenes, calm, Path::new("/tmp"), 3, &cancel).await;
    let b = c.resolve_all(&scenes, calm, Path::new("/tmp"), 1, &cancel).await;
    assert_eq!(a.len(), 5);
    for (i, r) in a.iter().enumerate() {
        assert_eq!(r.scene.index, i);
    }
    let assets_a: Vec<&Asset> = a.iter().map(|r| &r.asset).collect();
    let assets_b: Vec<&Asset> = b.iter().map(|r| &r.asset).collect();
    assert_eq!(assets_a, assets_b);
}

#[tokio::test]
async fn shared_budget_caps_concurrency_across_scenes() {
    let reg = ProfileRegistry::builtin().unwrap();
    let calm = reg.profile(PhysioState::Calm);
    let mut p = Scripted::new("p", Outcome::Clip { secs: 12.0, tags: OCEAN });
    p.delay = Duration::from_millis(10);
    let p = std::sync::Arc::new(p);
    let c = ResolutionChain::new(GradientGenerator::new(Resolution::HD), policy()).with_tier(
        AssetTier::Primary,
        Box::new(Shared(p.clone())),
        RateBudget::new(1, Duration::ZERO),
    );
    let scenes: Vec<Scene> = (0..4).map(scene).collect();
    let out = c
        .resolve_all(&scenes, calm, Path::new("/tmp"), 4, &CancelToken::new())
        .await;
    assert!(out.iter().all(|r| r.tier == AssetTier::Primary));
    assert_eq!(p.calls.load(Ordering::SeqCst), 4);
    assert_eq!(p.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn budget_spaces_request_starts() {
    let budget = RateBudget::new(4, Duration::from_millis(30));
    let started = std::time::Instant::now();
    budget.run(async {}).await.unwrap();
    budget.run(async {}).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(30));
    assert_eq!(budget.available_permits(), 4);
}

#[test]
fn temp_dir_is_removed_on_drop() {
    let parent = tempfile::tempdir().unwrap();
    let dir = run_temp_dir(Some(parent.path())).unwrap();
    let path: PathBuf = dir.path().to_path_buf();
    std::fs::write(path.join("clip.mp4"), b"data").unwrap();
    drop(dir);
    assert!(!path.exists());
}

#[test]
fn tiers_end_with_gradient() {
    let c = chain(vec![(AssetTier::Primary, Scripted::new("p", no_match()))]);
    assert_eq!(
        c.tiers(),
        vec![(AssetTier::Primary, "p"), (AssetTier::Gradient, "gradient")]
    );
}

struct Shared(std::sync::Arc<Scripted>);

impl AssetProvider for Shared {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn search<'a>(&'a self, req: &'a SearchRequest) -> BoxFuture<'a, Result<Asset, ProviderError>> {
        self.0.search(req)
    }
}
