//! MPRIS2 interface implementations served on the session bus.
//!
//! Property getters read through the bridge's property table, the single
//! canonical store. Methods and the Volume setter translate into backend
//! commands; the table only moves when the backend reports the change
//! back as an event.

use crate::bridge::Bridge;
use crate::store::PropValue;
use crate::{PLAYER_INTERFACE, ROOT_INTERFACE};
use std::collections::HashMap;
use std::sync::Arc;
use zbus::object_server::SignalContext;
use zbus::zvariant::{ObjectPath, Value};

/// org.mpris.MediaPlayer2
pub struct RootInterface {
    bridge: Arc<Bridge>,
}

impl RootInterface {
    pub fn new(bridge: Arc<Bridge>) -> Self {
        Self { bridge }
    }
}

#[zbus::interface(name = "org.mpris.MediaPlayer2")]
impl RootInterface {
    /// The bridge has no user interface to raise.
    fn raise(&self) {}

    /// Backend lifecycle belongs to the player, not the bridge.
    fn quit(&self) {}

    #[zbus(property)]
    fn can_quit(&self) -> bool {
        self.bridge.state().flag(ROOT_INTERFACE, "CanQuit")
    }

    #[zbus(property)]
    fn can_set_fullscreen(&self) -> bool {
        self.bridge.state().flag(ROOT_INTERFACE, "CanSetFullscreen")
    }

    #[zbus(property)]
    fn can_raise(&self) -> bool {
        self.bridge.state().flag(ROOT_INTERFACE, "CanRaise")
    }

    #[zbus(property)]
    fn has_track_list(&self) -> bool {
        self.bridge.state().flag(ROOT_INTERFACE, "HasTrackList")
    }

    #[zbus(property)]
    fn identity(&self) -> String {
        self.bridge.state().text(ROOT_INTERFACE, "Identity")
    }

    #[zbus(property)]
    fn supported_uri_schemes(&self) -> Vec<String> {
        self.bridge
            .state()
            .string_list(ROOT_INTERFACE, "SupportedUriSchemes")
    }

    #[zbus(property)]
    fn supported_mime_types(&self) -> Vec<String> {
        self.bridge
            .state()
            .string_list(ROOT_INTERFACE, "SupportedMimeTypes")
    }

    #[zbus(property)]
    fn fullscreen(&self) -> bool {
        self.bridge.state().flag(ROOT_INTERFACE, "Fullscreen")
    }

    /// Accepted but not forwarded; the backends run windowless here.
    #[zbus(property)]
    async fn set_fullscreen(&self, fullscreen: bool) {
        self.bridge
            .set_property(ROOT_INTERFACE, "Fullscreen", PropValue::Bool(fullscreen))
            .await;
    }
}

/// org.mpris.MediaPlayer2.Player
pub struct PlayerInterface {
    bridge: Arc<Bridge>,
}

impl PlayerInterface {
    pub fn new(bridge: Arc<Bridge>) -> Self {
        Self { bridge }
    }
}

#[zbus::interface(name = "org.mpris.MediaPlayer2.Player")]
impl PlayerInterface {
    async fn next(&self) {
        self.bridge.next().await;
    }

    async fn previous(&self) {
        self.bridge.previous().await;
    }

    async fn pause(&self) {
        self.bridge.pause().await;
    }

    async fn play_pause(&self) {
        self.bridge.play_pause().await;
    }

    async fn stop(&self) {
        self.bridge.stop().await;
    }

    async fn play(&self) {
        self.bridge.play().await;
    }

    /// Seek forward by offset microseconds.
    async fn seek(&self, offset: i64) {
        self.bridge.seek(offset).await;
    }

    /// Ignored as stale when track_id no longer names the current track.
    async fn set_position(&self, track_id: ObjectPath<'_>, position: i64) {
        self.bridge.set_position(track_id.as_str(), position).await;
    }

    /// Loading tracks is the player's job.
    fn open_uri(&self, _uri: &str) {}

    /// The position changed in a way inconsistent with normal playback.
    #[zbus(signal)]
    pub async fn seeked(ctxt: &SignalContext<'_>, position: i64) -> zbus::Result<()>;

    #[zbus(property)]
    fn playback_status(&self) -> String {
        self.bridge.state().playback_status().as_str().to_string()
    }

    #[zbus(property)]
    fn metadata(&self) -> HashMap<String, Value<'static>> {
        self.bridge.state().metadata().to_dict()
    }

    #[zbus(property(emits_changed_signal = "false"))]
    fn position(&self) -> i64 {
        self.bridge.state().position_us()
    }

    #[zbus(property)]
    fn minimum_rate(&self) -> f64 {
        self.bridge.state().number(PLAYER_INTERFACE, "MinimumRate")
    }

    #[zbus(property)]
    fn maximum_rate(&self) -> f64 {
        self.bridge.state().number(PLAYER_INTERFACE, "MaximumRate")
    }

    #[zbus(property)]
    fn can_go_next(&self) -> bool {
        self.bridge.state().flag(PLAYER_INTERFACE, "CanGoNext")
    }

    #[zbus(property)]
    fn can_go_previous(&self) -> bool {
        self.bridge.state().flag(PLAYER_INTERFACE, "CanGoPrevious")
    }

    #[zbus(property)]
    fn can_play(&self) -> bool {
        self.bridge.state().flag(PLAYER_INTERFACE, "CanPlay")
    }

    #[zbus(property)]
    fn can_pause(&self) -> bool {
        self.bridge.state().flag(PLAYER_INTERFACE, "CanPause")
    }

    #[zbus(property)]
    fn can_seek(&self) -> bool {
        self.bridge.state().flag(PLAYER_INTERFACE, "CanSeek")
    }

    #[zbus(property)]
    fn can_control(&self) -> bool {
        self.bridge.state().flag(PLAYER_INTERFACE, "CanControl")
    }

    #[zbus(property)]
    fn rate(&self) -> f64 {
        self.bridge.state().number(PLAYER_INTERFACE, "Rate")
    }

    /// Accepted but not forwarded; the backends play at fixed rate.
    #[zbus(property)]
    async fn set_rate(&self, rate: f64) {
        self.bridge
            .set_property(PLAYER_INTERFACE, "Rate", PropValue::F64(rate))
            .await;
    }

    #[zbus(property)]
    fn volume(&self) -> f64 {
        self.bridge.state().number(PLAYER_INTERFACE, "Volume")
    }

    /// Scaled to the backend's 0-100 range on the way out.
    #[zbus(property)]
    async fn set_volume(&self, volume: f64) {
        self.bridge
            .set_property(PLAYER_INTERFACE, "Volume", PropValue::F64(volume))
            .await;
    }
}
