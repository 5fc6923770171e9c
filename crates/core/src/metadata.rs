// Video metadata extraction

use crate::engine::{AssetInfo, TrackKind};
use crate::error::{BridgeError, Result};
use serde::Serialize;

/// Metadata derived from an asset's primary video track
///
/// Serialized for the host as `{width, height, aspectRatio, durationMillis}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    /// Natural pixel width, truncated
    pub width: u32,
    /// Natural pixel height, truncated
    pub height: u32,
    /// width / height of the natural size
    pub aspect_ratio: f64,
    /// Asset duration in milliseconds, rounded down
    pub duration_millis: u64,
}

impl VideoMetadata {
    /// Extract metadata from an inspected asset.
    ///
    /// Uses the first video track only. Fails when the asset has no video
    /// track or the track reports a degenerate size.
    pub fn extract(asset: &AssetInfo) -> Result<Self> {
        let track = asset
            .tracks
            .iter()
            .find(|t| t.kind == TrackKind::Video)
            .ok_or_else(|| BridgeError::InitializationFailed("No video track found".to_string()))?;

        let width = track.natural_width.max(0.0);
        let height = track.natural_height.max(0.0);
        if height == 0.0 || width == 0.0 {
            return Err(BridgeError::InitializationFailed(format!(
                "Video track has no natural size ({}x{})",
                track.natural_width, track.natural_height
            )));
        }

        Ok(Self {
            width: width as u32,
            height: height as u32,
            aspect_ratio: width / height,
            duration_millis: millis_floor(asset.duration_secs),
        })
    }
}

/// Seconds to whole milliseconds; indefinite durations (live streams) report 0.
fn millis_floor(secs: f64) -> u64 {
    if !secs.is_finite() || secs <= 0.0 {
        return 0;
    }
    (secs * 1000.0).floor() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::TrackInfo;

    fn asset(tracks: Vec<TrackInfo>, duration_secs: f64) -> AssetInfo {
        AssetInfo {
            tracks,
            duration_secs,
        }
    }

    #[test]
    fn test_full_hd_metadata() {
        let info = asset(
            vec![
                TrackInfo::audio(),
                TrackInfo::video(1920.0, 1080.0),
            ],
            10.0,
        );
        let meta = VideoMetadata::extract(&info).unwrap();
        assert_eq!(meta.width, 1920);
        assert_eq!(meta.height, 1080);
        assert!((meta.aspect_ratio - 1920.0 / 1080.0).abs() < 1e-9);
        assert_eq!(meta.duration_millis, 10_000);
    }

    #[test]
    fn test_first_video_track_wins() {
        let info = asset(
            vec![TrackInfo::video(640.0, 480.0), TrackInfo::video(1280.0, 720.0)],
            1.0,
        );
        assert_eq!(VideoMetadata::extract(&info).unwrap().width, 640);
    }

    #[test]
    fn test_duration_rounds_down() {
        let info = asset(vec![TrackInfo::video(10.0, 10.0)], 2.9999);
        assert_eq!(VideoMetadata::extract(&info).unwrap().duration_millis, 2999);
    }

    #[test]
    fn test_audio_only_asset_fails() {
        let err = VideoMetadata::extract(&asset(vec![TrackInfo::audio()], 3.0)).unwrap_err();
        assert_eq!(err, BridgeError::InitializationFailed("No video track found".into()));
    }

    #[test]
    fn test_zero_height_fails() {
        let err = VideoMetadata::extract(&asset(vec![TrackInfo::video(100.0, 0.0)], 3.0));
        assert!(matches!(err, Err(BridgeError::InitializationFailed(_))));
    }

    #[test]
    fn test_indefinite_duration_is_zero() {
        let info = asset(vec![TrackInfo::video(16.0, 9.0)], f64::NAN);
        assert_eq!(VideoMetadata::extract(&info).unwrap().duration_millis, 0);
    }

    #[test]
    fn test_serialized_keys() {
        let meta = VideoMetadata {
            width: 4,
            height: 3,
            aspect_ratio: 4.0 / 3.0,
            duration_millis: 5,
        };
        let value = serde_json::to_value(meta).unwrap();
        assert_eq!(value["width"], 4);
        assert_eq!(value["durationMillis"], 5);
        assert!(value.get("aspectRatio").is_some());
    }
}
