//! Canonical property table for the exported interfaces.
//!
//! The table is mutated only through change-event application. Inbound
//! property writes produce outward commands instead; the table picks up
//! the new value when the backend reports it back as an event.

use crate::command::Command;
use crate::error::BridgeError;
use crate::types::{ChangeEvent, PlaybackStatus, TrackMetadata};
use crate::{PLAYER_INTERFACE, ROOT_INTERFACE};
use std::collections::HashMap;
use zbus::zvariant::{Array, Dict, Value};

/// Position jumps at or above this are announced with a Seeked signal.
const SEEK_NOTIFY_THRESHOLD_US: i64 = 4_000_000;

/// A property value as stored in the table
#[derive(Clone, Debug, PartialEq)]
pub enum PropValue {
    Bool(bool),
    F64(f64),
    I64(i64),
    Str(String),
    StrList(Vec<String>),
    Metadata(TrackMetadata),
}

impl PropValue {
    /// Convert to a D-Bus variant value.
    pub fn to_value(&self) -> Value<'static> {
        match self {
            PropValue::Bool(b) => Value::Bool(*b),
            PropValue::F64(f) => Value::F64(*f),
            PropValue::I64(i) => Value::I64(*i),
            PropValue::Str(s) => Value::Str(s.clone().into()),
            PropValue::StrList(items) => Value::Array(Array::from(items.clone())),
            PropValue::Metadata(meta) => Value::Dict(Dict::from(meta.to_dict())),
        }
    }
}

#[derive(Default)]
struct Partition {
    read_only: HashMap<&'static str, PropValue>,
    read_write: HashMap<&'static str, PropValue>,
}

/// Property table partitioned read-only/read-write per interface.
/// Each property lives in exactly one partition.
pub struct PropertyTable {
    interfaces: HashMap<&'static str, Partition>,
}

impl PropertyTable {
    fn new(identity: &str) -> Self {
        let mut root = Partition::default();
        root.read_only.insert("CanQuit", PropValue::Bool(false));
        root.read_only
            .insert("CanSetFullscreen", PropValue::Bool(false));
        root.read_only.insert("CanRaise", PropValue::Bool(false));
        root.read_only.insert("HasTrackList", PropValue::Bool(false));
        root.read_only
            .insert("Identity", PropValue::Str(identity.to_string()));
        root.read_only
            .insert("SupportedUriSchemes", PropValue::StrList(Vec::new()));
        root.read_only
            .insert("SupportedMimeTypes", PropValue::StrList(Vec::new()));
        root.read_write.insert("Fullscreen", PropValue::Bool(false));

        let mut player = Partition::default();
        player.read_only.insert(
            "PlaybackStatus",
            PropValue::Str(PlaybackStatus::Stopped.as_str().to_string()),
        );
        player
            .read_only
            .insert("Metadata", PropValue::Metadata(TrackMetadata::default()));
        player.read_only.insert("Position", PropValue::I64(0));
        player.read_only.insert("MinimumRate", PropValue::F64(1.0));
        player.read_only.insert("MaximumRate", PropValue::F64(1.0));
        player.read_only.insert("CanGoNext", PropValue::Bool(true));
        player
            .read_only
            .insert("CanGoPrevious", PropValue::Bool(true));
        player.read_only.insert("CanPlay", PropValue::Bool(true));
        player.read_only.insert("CanPause", PropValue::Bool(true));
        player.read_only.insert("CanSeek", PropValue::Bool(true));
        player.read_only.insert("CanControl", PropValue::Bool(true));
        player.read_write.insert("Rate", PropValue::F64(1.0));
        player.read_write.insert("Volume", PropValue::F64(1.0));

        let mut interfaces = HashMap::new();
        interfaces.insert(ROOT_INTERFACE, root);
        interfaces.insert(PLAYER_INTERFACE, player);
        Self { interfaces }
    }

    /// Read one property; the read-write partition wins on key collision.
    pub fn get(&self, interface: &str, name: &str) -> Option<&PropValue> {
        let partition = self.interfaces.get(interface)?;
        partition
            .read_write
            .get(name)
            .or_else(|| partition.read_only.get(name))
    }

    /// Merged read-only + read-write view of one interface.
    pub fn get_all(
        &self,
        interface: &str,
    ) -> Result<HashMap<&'static str, PropValue>, BridgeError> {
        let partition = self
            .interfaces
            .get(interface)
            .ok_or_else(|| BridgeError::UnknownInterface(interface.to_string()))?;
        let mut merged: HashMap<&'static str, PropValue> = partition
            .read_only
            .iter()
            .map(|(name, value)| (*name, value.clone()))
            .collect();
        for (name, value) in &partition.read_write {
            merged.insert(*name, value.clone());
        }
        Ok(merged)
    }

    pub fn is_read_write(&self, interface: &str, name: &str) -> Result<bool, BridgeError> {
        let partition = self
            .interfaces
            .get(interface)
            .ok_or_else(|| BridgeError::UnknownInterface(interface.to_string()))?;
        Ok(partition.read_write.contains_key(name))
    }

    fn set_read_only(&mut self, interface: &str, name: &'static str, value: PropValue) {
        if let Some(partition) = self.interfaces.get_mut(interface) {
            partition.read_only.insert(name, value);
        }
    }

    fn set_read_write(&mut self, interface: &str, name: &'static str, value: PropValue) {
        if let Some(partition) = self.interfaces.get_mut(interface) {
            partition.read_write.insert(name, value);
        }
    }
}

/// What an applied event requires the bus side to announce
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Applied {
    pub changed: Vec<&'static str>,
    pub invalidated: Vec<&'static str>,
    pub seeked: Option<i64>,
}

impl Applied {
    pub fn is_silent(&self) -> bool {
        self.changed.is_empty() && self.invalidated.is_empty() && self.seeked.is_none()
    }
}

/// State store applying normalized change events to the property table
pub struct StateStore {
    table: PropertyTable,
}

impl StateStore {
    pub fn new(identity: &str) -> Self {
        Self {
            table: PropertyTable::new(identity),
        }
    }

    /// Apply one change event and report what to announce on the bus.
    pub fn apply(&mut self, event: ChangeEvent) -> Applied {
        match event {
            ChangeEvent::Pause(paused) => {
                let status = if paused {
                    PlaybackStatus::Paused
                } else {
                    PlaybackStatus::Playing
                };
                self.transition(status, Vec::new())
            }
            ChangeEvent::Stop(stopped) => {
                let status = if stopped {
                    PlaybackStatus::Stopped
                } else {
                    PlaybackStatus::Playing
                };
                self.transition(status, vec!["Metadata", "Position"])
            }
            ChangeEvent::Volume(value) => {
                let volume = value / 100.0;
                if self.number(PLAYER_INTERFACE, "Volume") == volume {
                    return Applied::default();
                }
                self.table
                    .set_read_write(PLAYER_INTERFACE, "Volume", PropValue::F64(volume));
                Applied {
                    changed: vec!["Volume"],
                    ..Default::default()
                }
            }
            ChangeEvent::TimePos(secs) => {
                let new = (secs * 1e6).round() as i64;
                let old = self.position_us();
                if new != old {
                    self.table
                        .set_read_only(PLAYER_INTERFACE, "Position", PropValue::I64(new));
                }
                // Position advances continuously; only jumps are announced,
                // and never through PropertiesChanged.
                let seeked = ((new - old).abs() >= SEEK_NOTIFY_THRESHOLD_US).then_some(new);
                Applied {
                    seeked,
                    ..Default::default()
                }
            }
            ChangeEvent::Metadata {
                id,
                title,
                length_secs,
            } => {
                let meta = TrackMetadata::new(&id, &title, length_secs);
                if self.metadata() == meta {
                    return Applied::default();
                }
                self.table
                    .set_read_only(PLAYER_INTERFACE, "Metadata", PropValue::Metadata(meta));
                Applied {
                    changed: vec!["Metadata"],
                    ..Default::default()
                }
            }
        }
    }

    fn transition(&mut self, status: PlaybackStatus, invalidated: Vec<&'static str>) -> Applied {
        if self.playback_status() == status {
            return Applied::default();
        }
        self.table.set_read_only(
            PLAYER_INTERFACE,
            "PlaybackStatus",
            PropValue::Str(status.as_str().to_string()),
        );
        Applied {
            changed: vec!["PlaybackStatus"],
            invalidated,
            ..Default::default()
        }
    }

    /// Validate a property write and produce the command to issue, if any.
    /// The table itself is never touched here.
    pub fn set(
        &self,
        interface: &str,
        name: &str,
        value: &PropValue,
    ) -> Result<Option<Command>, BridgeError> {
        if !self.table.is_read_write(interface, name)? {
            return Ok(None);
        }
        match (name, value) {
            ("Volume", PropValue::F64(volume)) => Ok(Some(Command::set_volume(volume * 100.0))),
            _ => Ok(None),
        }
    }

    /// Full merged view of one interface.
    pub fn snapshot(
        &self,
        interface: &str,
    ) -> Result<HashMap<&'static str, PropValue>, BridgeError> {
        self.table.get_all(interface)
    }

    /// Current bus value of one property.
    pub fn snapshot_value(&self, interface: &str, name: &str) -> Option<Value<'static>> {
        self.table.get(interface, name).map(PropValue::to_value)
    }

    pub fn playback_status(&self) -> PlaybackStatus {
        PlaybackStatus::from_str(&self.text(PLAYER_INTERFACE, "PlaybackStatus"))
    }

    pub fn position_us(&self) -> i64 {
        match self.table.get(PLAYER_INTERFACE, "Position") {
            Some(PropValue::I64(position)) => *position,
            _ => 0,
        }
    }

    pub fn metadata(&self) -> TrackMetadata {
        match self.table.get(PLAYER_INTERFACE, "Metadata") {
            Some(PropValue::Metadata(meta)) => meta.clone(),
            _ => TrackMetadata::default(),
        }
    }

    pub fn flag(&self, interface: &str, name: &str) -> bool {
        matches!(self.table.get(interface, name), Some(PropValue::Bool(true)))
    }

    pub fn number(&self, interface: &str, name: &str) -> f64 {
        match self.table.get(interface, name) {
            Some(PropValue::F64(value)) => *value,
            _ => 0.0,
        }
    }

    pub fn text(&self, interface: &str, name: &str) -> String {
        match self.table.get(interface, name) {
            Some(PropValue::Str(value)) => value.clone(),
            _ => String::new(),
        }
    }

    pub fn string_list(&self, interface: &str, name: &str) -> Vec<String> {
        match self.table.get(interface, name) {
            Some(PropValue::StrList(items)) => items.clone(),
            _ => Vec::new(),
        }
    }
}
