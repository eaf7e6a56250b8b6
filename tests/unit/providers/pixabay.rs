use super::*;

fn response() -> SearchResponse {
    serde_json::from_value(serde_json::json!({
        "total": 2,
        "hits": [
            {
                "pageURL": "https://pixabay.com/videos/id-1/",
                "tags": "forest, trees",
                "duration": 30,
                "videos": {
                    "large": {"url": "https://p/1-large.mp4", "width": 1920, "height": 1080},
                    "small": {"url": "https://p/1-small.mp4", "width": 960, "height": 540},
                    "tiny": {"url": "https://p/1-tiny.mp4", "width": 640, "height": 360}
                }
            }
        ]
    }))
    .unwrap()
}

#[test]
fn prefers_medium_then_small() {
    let p = pick(&response(), 12.0, "forest").unwrap();
    assert_eq!(p.url, "https://p/1-small.mp4");
    assert_eq!(p.page_url, "https://pixabay.com/videos/id-1/");
    assert_eq!(p.tags, vec!["forest", "trees"]);
    assert_eq!(p.duration_s, 30.0);
}

#[test]
fn too_short_is_duration_insufficient() {
    assert!(matches!(
        pick(&response(), 45.0, "forest"),
        Err(ProviderError::AssetDurationInsufficient { .. })
    ));
}

#[test]
fn hits_without_renditions_are_skipped() {
    let resp: SearchResponse =
        serde_json::from_str(r#"{"hits": [{"pageURL": "x", "tags": "a", "duration": 50}]}"#)
            .unwrap();
    assert!(matches!(pick(&resp, 1.0, "a"), Err(ProviderError::NoMatch(_))));
}
