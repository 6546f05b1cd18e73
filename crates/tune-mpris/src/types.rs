//! Core types for tune-mpris

use std::collections::HashMap;
use zbus::zvariant::{ObjectPath, Value};

/// Object path prefix for known tracks.
const TRACK_PATH_PREFIX: &str = "/CurrentPlaylist/Track/";

/// Placeholder path used before any metadata event has arrived.
const UNKNOWN_TRACK_PATH: &str = "/CurrentPlaylist/UnknownTrack";

/// Playback status exposed on the player interface
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlaybackStatus {
    Playing,
    Paused,
    #[default]
    Stopped,
}

impl PlaybackStatus {
    pub fn from_str(s: &str) -> Self {
        match s {
            "Playing" => PlaybackStatus::Playing,
            "Paused" => PlaybackStatus::Paused,
            _ => PlaybackStatus::Stopped,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackStatus::Playing => "Playing",
            PlaybackStatus::Paused => "Paused",
            PlaybackStatus::Stopped => "Stopped",
        }
    }
}

/// Current track metadata as published on the bus
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackMetadata {
    /// Sanitized track id, [A-Za-z0-9] only.
    pub id: String,
    pub title: String,
    /// Track length in microseconds.
    pub length_us: i64,
}

impl TrackMetadata {
    pub fn new(raw_id: &str, title: &str, length_secs: f64) -> Self {
        Self {
            id: sanitize_track_id(raw_id),
            title: title.to_string(),
            length_us: (length_secs * 1e6) as i64,
        }
    }

    /// D-Bus object path identifying this track.
    pub fn track_path(&self) -> String {
        if self.id.is_empty() {
            UNKNOWN_TRACK_PATH.to_string()
        } else {
            format!("{TRACK_PATH_PREFIX}{}", self.id)
        }
    }

    /// The a{sv} metadata dictionary for the Metadata property.
    pub fn to_dict(&self) -> HashMap<String, Value<'static>> {
        let path = ObjectPath::try_from(self.track_path())
            .unwrap_or_else(|_| ObjectPath::from_static_str_unchecked(UNKNOWN_TRACK_PATH));
        let mut dict = HashMap::new();
        dict.insert("mpris:trackid".to_string(), Value::ObjectPath(path));
        dict.insert("mpris:length".to_string(), Value::I64(self.length_us));
        dict.insert(
            "xesam:title".to_string(),
            Value::Str(self.title.clone().into()),
        );
        dict
    }
}

/// Track ids may carry characters that are not valid in D-Bus paths.
fn sanitize_track_id(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_alphanumeric).collect()
}

/// Normalized backend state change consumed by the state store
#[derive(Clone, Debug, PartialEq)]
pub enum ChangeEvent {
    Pause(bool),
    Stop(bool),
    /// Backend volume on its native 0-100 scale.
    Volume(f64),
    /// Playback position in seconds.
    TimePos(f64),
    Metadata {
        id: String,
        title: String,
        length_secs: f64,
    },
}

impl ChangeEvent {
    /// Parse a tagged (name, value) pair from the player or the backend.
    /// Unrecognized tags and malformed values map to None.
    pub fn parse(name: &str, value: &serde_json::Value) -> Option<ChangeEvent> {
        match name {
            "pause" => value.as_bool().map(ChangeEvent::Pause),
            "stop" => value.as_bool().map(ChangeEvent::Stop),
            "volume" => value.as_f64().map(ChangeEvent::Volume),
            "time-pos" => value.as_f64().map(ChangeEvent::TimePos),
            "metadata" => {
                let items = value.as_array()?;
                let id = items.first()?.as_str()?;
                let title = items.get(1)?.as_str()?;
                let length_secs = items.get(2)?.as_f64()?;
                Some(ChangeEvent::Metadata {
                    id: id.to_string(),
                    title: title.to_string(),
                    length_secs,
                })
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_known_tags() {
        assert_eq!(
            ChangeEvent::parse("pause", &json!(true)),
            Some(ChangeEvent::Pause(true))
        );
        assert_eq!(
            ChangeEvent::parse("stop", &json!(false)),
            Some(ChangeEvent::Stop(false))
        );
        assert_eq!(
            ChangeEvent::parse("volume", &json!(62.5)),
            Some(ChangeEvent::Volume(62.5))
        );
        assert_eq!(
            ChangeEvent::parse("time-pos", &json!(12.25)),
            Some(ChangeEvent::TimePos(12.25))
        );
    }

    #[test]
    fn parses_metadata_triples() {
        let value = json!(["abc-123_X", "Some Title", 215.0]);
        assert_eq!(
            ChangeEvent::parse("metadata", &value),
            Some(ChangeEvent::Metadata {
                id: "abc-123_X".to_string(),
                title: "Some Title".to_string(),
                length_secs: 215.0,
            })
        );
    }

    #[test]
    fn unknown_tags_and_missing_values_are_dropped() {
        assert_eq!(ChangeEvent::parse("chapter", &json!(3)), None);
        assert_eq!(ChangeEvent::parse("volume", &serde_json::Value::Null), None);
        assert_eq!(ChangeEvent::parse("pause", &serde_json::Value::Null), None);
        assert_eq!(ChangeEvent::parse("metadata", &json!(["only-id"])), None);
    }

    #[test]
    fn track_paths_use_the_sanitized_id() {
        let meta = TrackMetadata::new("abc-123_X", "t", 1.0);
        assert_eq!(meta.id, "abc123X");
        assert_eq!(meta.track_path(), "/CurrentPlaylist/Track/abc123X");
        assert_eq!(
            TrackMetadata::default().track_path(),
            "/CurrentPlaylist/UnknownTrack"
        );
    }

    #[test]
    fn metadata_dict_carries_all_three_keys() {
        let dict = TrackMetadata::new("abc", "Title", 2.0).to_dict();
        assert_eq!(
            dict.get("mpris:trackid"),
            Some(&Value::ObjectPath(
                ObjectPath::from_static_str_unchecked("/CurrentPlaylist/Track/abc")
            ))
        );
        assert_eq!(dict.get("mpris:length"), Some(&Value::I64(2_000_000)));
        assert_eq!(
            dict.get("xesam:title"),
            Some(&Value::Str("Title".into()))
        );
    }
}
