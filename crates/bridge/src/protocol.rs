// Command protocol: method names, argument validation and result encoding
//
// Arguments arrive as a JSON object mirroring the host channel's map:
// `{"playerId": 1, "url": "https://..."}`. Validation happens here, before
// the command reaches the worker, so a malformed request never touches the
// registry.

use cinescope_core::{BridgeError, PlayerHandle, Result};
use serde_json::Value;
use url::Url;

pub const ARG_PLAYER_ID: &str = "playerId";
pub const ARG_URL: &str = "url";
pub const ARG_POSITION: &str = "position";
pub const ARG_POSITION_MILLIS: &str = "positionMillis";
pub const ARG_VOLUME: &str = "volume";
pub const ARG_IS_PLAYING: &str = "isPlaying";

/// Completion for one command, invoked exactly once
pub type Responder = Box<dyn FnOnce(Result<Value>) + Send + 'static>;

/// A validated command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Initialize { handle: PlayerHandle, url: Url },
    Preload { handle: PlayerHandle, url: Url },
    Play { handle: PlayerHandle },
    Pause { handle: PlayerHandle },
    SeekTo { handle: PlayerHandle, position_ms: u64 },
    SetVolume { handle: PlayerHandle, volume: f32 },
    GetPosition { handle: PlayerHandle },
    Dispose { handle: PlayerHandle },
}

impl Command {
    /// Validate a raw request.
    ///
    /// The handle is checked first for every method, then the method name,
    /// then the method-specific arguments.
    pub fn parse(method: &str, args: &Value) -> Result<Command> {
        let handle = args
            .get(ARG_PLAYER_ID)
            .and_then(Value::as_i64)
            .ok_or_else(|| missing(ARG_PLAYER_ID))?;

        let command = match method {
            "initialize" => Command::Initialize {
                handle,
                url: parse_url(args)?,
            },
            "preload" => Command::Preload {
                handle,
                url: parse_url(args)?,
            },
            "play" => Command::Play { handle },
            "pause" => Command::Pause { handle },
            "seekTo" => Command::SeekTo {
                handle,
                position_ms: parse_position(args)?,
            },
            "setVolume" => Command::SetVolume {
                handle,
                volume: parse_volume(args)?,
            },
            "getPosition" => Command::GetPosition { handle },
            "dispose" => Command::Dispose { handle },
            other => return Err(BridgeError::NotImplemented(other.to_string())),
        };

        Ok(command)
    }

    pub fn handle(&self) -> PlayerHandle {
        match self {
            Command::Initialize { handle, .. }
            | Command::Preload { handle, .. }
            | Command::Play { handle }
            | Command::Pause { handle }
            | Command::SeekTo { handle, .. }
            | Command::SetVolume { handle, .. }
            | Command::GetPosition { handle }
            | Command::Dispose { handle } => *handle,
        }
    }

    pub fn method(&self) -> &'static str {
        match self {
            Command::Initialize { .. } => "initialize",
            Command::Preload { .. } => "preload",
            Command::Play { .. } => "play",
            Command::Pause { .. } => "pause",
            Command::SeekTo { .. } => "seekTo",
            Command::SetVolume { .. } => "setVolume",
            Command::GetPosition { .. } => "getPosition",
            Command::Dispose { .. } => "dispose",
        }
    }
}

fn missing(field: &str) -> BridgeError {
    BridgeError::InvalidArgument(format!("Missing {}", field))
}

fn parse_url(args: &Value) -> Result<Url> {
    let raw = args
        .get(ARG_URL)
        .and_then(Value::as_str)
        .ok_or_else(|| missing(ARG_URL))?;

    // Url::parse only accepts absolute URIs
    Url::parse(raw).map_err(|e| BridgeError::InvalidUrl(format!("Invalid video URL '{}': {}", raw, e)))
}

fn parse_position(args: &Value) -> Result<u64> {
    let value = args
        .get(ARG_POSITION)
        .or_else(|| args.get(ARG_POSITION_MILLIS))
        .ok_or_else(|| missing(ARG_POSITION))?;

    let position = value.as_i64().ok_or_else(|| {
        BridgeError::InvalidArgument(format!("Malformed position: {}", value))
    })?;

    if position < 0 {
        return Err(BridgeError::InvalidArgument(format!(
            "Position must not be negative: {}",
            position
        )));
    }
    Ok(position as u64)
}

fn parse_volume(args: &Value) -> Result<f32> {
    let value = args.get(ARG_VOLUME).ok_or_else(|| missing(ARG_VOLUME))?;
    let volume = value
        .as_f64()
        .ok_or_else(|| BridgeError::InvalidArgument(format!("Malformed volume: {}", value)))?;

    validate_volume(volume)?;
    Ok(volume as f32)
}

/// Volume must lie in [0.0, 1.0]; out-of-range input is rejected, never clamped
pub fn validate_volume(volume: f64) -> Result<()> {
    if (0.0..=1.0).contains(&volume) {
        Ok(())
    } else {
        Err(BridgeError::InvalidArgument(format!("Volume out of range: {}", volume)))
    }
}

/// Creation arguments of a platform video view: `{playerId, isPlaying}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewArgs {
    pub handle: PlayerHandle,
    pub autoplay: bool,
}

impl ViewArgs {
    pub fn parse(args: &Value) -> Result<Self> {
        let handle = args
            .get(ARG_PLAYER_ID)
            .and_then(Value::as_i64)
            .ok_or_else(|| missing(ARG_PLAYER_ID))?;
        let autoplay = args
            .get(ARG_IS_PLAYING)
            .and_then(Value::as_bool)
            .unwrap_or(false);
        Ok(Self { handle, autoplay })
    }
}

/// Encode a command failure the way the host channel reports errors
pub fn error_payload(err: &BridgeError) -> Value {
    serde_json::json!({
        "code": err.code(),
        "message": err.message(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_player_id_wins_over_unknown_method() {
        let err = Command::parse("rewind", &json!({})).unwrap_err();
        assert_eq!(err, BridgeError::InvalidArgument("Missing playerId".into()));
    }

    #[test]
    fn test_unknown_method() {
        let err = Command::parse("rewind", &json!({"playerId": 1})).unwrap_err();
        assert_eq!(err, BridgeError::NotImplemented("rewind".into()));
    }

    #[test]
    fn test_initialize_requires_url() {
        let err = Command::parse("initialize", &json!({"playerId": 1})).unwrap_err();
        assert_eq!(err, BridgeError::InvalidArgument("Missing url".into()));
    }

    #[test]
    fn test_relative_url_rejected() {
        let err = Command::parse("preload", &json!({"playerId": 2, "url": "not a url"})).unwrap_err();
        assert_eq!(err.code(), "INVALID_URL");
    }

    #[test]
    fn test_initialize_parses() {
        let cmd = Command::parse(
            "initialize",
            &json!({"playerId": 1, "url": "https://example.com/a.mp4"}),
        )
        .unwrap();
        assert_eq!(cmd.handle(), 1);
        assert_eq!(cmd.method(), "initialize");
    }

    #[test]
    fn test_seek_position_keys() {
        let a = Command::parse("seekTo", &json!({"playerId": 3, "position": 5000})).unwrap();
        let b = Command::parse("seekTo", &json!({"playerId": 3, "positionMillis": 5000})).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            a,
            Command::SeekTo {
                handle: 3,
                position_ms: 5000
            }
        );
    }

    #[test]
    fn test_seek_rejects_bad_positions() {
        let err = Command::parse("seekTo", &json!({"playerId": 3})).unwrap_err();
        assert_eq!(err, BridgeError::InvalidArgument("Missing position".into()));
        assert!(Command::parse("seekTo", &json!({"playerId": 3, "position": -1})).is_err());
        assert!(Command::parse("seekTo", &json!({"playerId": 3, "position": "10"})).is_err());
    }

    #[test]
    fn test_volume_bounds() {
        for ok in [0.0, 0.25, 1.0] {
            assert!(Command::parse("setVolume", &json!({"playerId": 1, "volume": ok})).is_ok());
        }
        for bad in [-0.01, 1.01, 3.0] {
            let err = Command::parse("setVolume", &json!({"playerId": 1, "volume": bad})).unwrap_err();
            assert_eq!(err.code(), "INVALID_ARGS");
        }
        assert!(validate_volume(f64::NAN).is_err());
    }

    #[test]
    fn test_view_args() {
        let args = ViewArgs::parse(&json!({"playerId": 5, "isPlaying": true})).unwrap();
        assert_eq!(args, ViewArgs { handle: 5, autoplay: true });
        assert!(!ViewArgs::parse(&json!({"playerId": 5})).unwrap().autoplay);
    }

    #[test]
    fn test_error_payload() {
        let payload = error_payload(&BridgeError::InstanceNotFound(3));
        assert_eq!(payload["code"], "PLAYER_NOT_FOUND");
        assert_eq!(payload["message"], "Player 3 not found");
    }
}
