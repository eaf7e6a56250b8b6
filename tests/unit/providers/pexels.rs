use super::*;

fn response() -> SearchResponse {
    serde_json::from_value(serde_json::json!({
        "page": 1,
        "videos": [
            {
                "id": 1,
                "url": "https://www.pexels.com/video/short-clip-of-rain-111/",
                "duration": 4,
                "width": 1920,
                "height": 1080,
                "video_files": [
                    {"quality": "hd", "file_type": "video/mp4", "width": 1280, "height": 720, "link": "https://v/1.mp4"}
                ]
            },
            {
                "id": 2,
                "url": "https://www.pexels.com/video/waves-crashing-on-shore-222/",
                "duration": 14,
                "width": 3840,
                "height": 2160,
                "video_files": [
                    {"quality": "uhd", "file_type": "video/mp4", "width": 3840, "height": 2160, "link": "https://v/2-uhd.mp4"},
                    {"quality": "sd", "file_type": "video/mp4", "width": 960, "height": 540, "link": "https://v/2-sd.mp4"}
                ]
            }
        ]
    }))
    .unwrap()
}

#[test]
fn picks_first_long_enough_hit_with_mp4() {
    let p = pick(&response(), 10.0, "waves").unwrap();
    assert_eq!(p.link, "https://v/2-sd.mp4");
    assert_eq!(p.duration_s, 14.0);
    assert_eq!(
        p.resolution,
        Resolution {
            width: 960,
            height: 540
        }
    );
    assert_eq!(p.tags, vec!["waves", "crashing", "on", "shore"]);
}

#[test]
fn short_hits_report_duration_insufficient() {
    let err = pick(&response(), 20.0, "waves").unwrap_err();
    assert_eq!(
        err,
        ProviderError::AssetDurationInsufficient {
            available_s: 14.0,
            required_s: 20.0
        }
    );
}

#[test]
fn empty_result_is_no_match() {
    let resp: SearchResponse = serde_json::from_str(r#"{"videos": []}"#).unwrap();
    assert_eq!(
        pick(&resp, 1.0, "q").unwrap_err(),
        ProviderError::NoMatch("q".to_string())
    );
}

#[test]
fn slug_tags_drop_numeric_ids() {
    assert_eq!(
        slug_tags("https://www.pexels.com/video/misty-forest-morning-9876"),
        vec!["misty", "forest", "morning"]
    );
    assert!(slug_tags("").is_empty());
}

#[test]
fn unconfigured_provider_reports_so() {
    let p = PexelsVideos::new(&ProviderSettings::default()).unwrap();
    assert!(!p.is_configured());
    assert_eq!(p.name(), "pexels");
}
