//! Backend command atoms and their wire encodings.
//!
//! A command is an ordered atom sequence; how it hits the wire depends on
//! the transport: JSON `{"command":[...]}` lines for the socket dialect,
//! space-joined plain text for the pipe dialects.

use serde::{Serialize, Serializer};
use serde_json::json;

/// Boolean token flavor for pipe-bound backends
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipeDialect {
    /// mpv slave FIFO, booleans render as yes/no.
    Mpv,
    /// mplayer FIFO, booleans render as 1/0.
    Mplayer,
}

/// One element of a backend command
#[derive(Clone, Debug, PartialEq)]
pub enum Atom {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl From<&str> for Atom {
    fn from(value: &str) -> Self {
        Atom::Str(value.to_string())
    }
}

impl From<i64> for Atom {
    fn from(value: i64) -> Self {
        Atom::Int(value)
    }
}

impl From<f64> for Atom {
    fn from(value: f64) -> Self {
        Atom::Float(value)
    }
}

impl From<bool> for Atom {
    fn from(value: bool) -> Self {
        Atom::Bool(value)
    }
}

impl Serialize for Atom {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Atom::Str(s) => serializer.serialize_str(s),
            Atom::Int(i) => serializer.serialize_i64(*i),
            Atom::Float(f) => serializer.serialize_f64(*f),
            Atom::Bool(b) => serializer.serialize_bool(*b),
        }
    }
}

impl Atom {
    /// Plain-text token for the pipe dialects.
    fn pipe_token(&self, dialect: PipeDialect) -> String {
        match self {
            Atom::Str(s) => s.clone(),
            Atom::Int(i) => i.to_string(),
            Atom::Float(f) => f.to_string(),
            Atom::Bool(true) => match dialect {
                PipeDialect::Mpv => "yes".to_string(),
                PipeDialect::Mplayer => "1".to_string(),
            },
            Atom::Bool(false) => match dialect {
                PipeDialect::Mpv => "no".to_string(),
                PipeDialect::Mplayer => "0".to_string(),
            },
        }
    }
}

/// One backend instruction
#[derive(Clone, Debug, PartialEq)]
pub struct Command(Vec<Atom>);

impl Command {
    pub fn new(atoms: Vec<Atom>) -> Self {
        Self(atoms)
    }

    // The player wrapper drives the playlist through backend exit codes:
    // a plain quit advances, 42 steps back, 43 stops.
    pub fn next() -> Self {
        Self::new(vec!["quit".into()])
    }

    pub fn previous() -> Self {
        Self::new(vec!["quit".into(), 42.into()])
    }

    pub fn stop() -> Self {
        Self::new(vec!["quit".into(), 43.into()])
    }

    pub fn set_pause(paused: bool) -> Self {
        Self::new(vec!["set_property".into(), "pause".into(), paused.into()])
    }

    /// The single-token pause toggle understood by both pipe backends.
    pub fn toggle_pause() -> Self {
        Self::new(vec!["pause".into()])
    }

    pub fn cycle_pause() -> Self {
        Self::new(vec!["cycle".into(), "pause".into()])
    }

    /// Relative seek by a microsecond offset.
    pub fn seek(offset_us: i64) -> Self {
        Self::new(vec!["seek".into(), (offset_us as f64 / 1e6).into()])
    }

    /// Exact seek by a microsecond offset.
    pub fn seek_exact(offset_us: i64) -> Self {
        Self::new(vec!["seek".into(), (offset_us as f64 / 1e6).into(), 2.into()])
    }

    pub fn observe_property(id: i64, name: &str) -> Self {
        Self::new(vec!["observe_property".into(), id.into(), name.into()])
    }

    pub fn get_property(name: &str) -> Self {
        Self::new(vec!["get_property".into(), name.into()])
    }

    /// Volume on the backend's native 0-100 scale.
    pub fn set_volume(value: f64) -> Self {
        Self::new(vec!["set_property".into(), "volume".into(), value.into()])
    }

    /// Newline-terminated JSON line for the socket dialect.
    pub fn socket_line(&self) -> String {
        let mut line = json!({ "command": &self.0 }).to_string();
        line.push('\n');
        line
    }

    /// Newline-terminated plain-text line for the pipe dialects.
    pub fn pipe_line(&self, dialect: PipeDialect) -> String {
        let tokens: Vec<String> = self.0.iter().map(|atom| atom.pipe_token(dialect)).collect();
        let mut line = tokens.join(" ");
        line.push('\n');
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quit_family_socket_encoding() {
        assert_eq!(Command::next().socket_line(), "{\"command\":[\"quit\"]}\n");
        assert_eq!(
            Command::previous().socket_line(),
            "{\"command\":[\"quit\",42]}\n"
        );
        assert_eq!(Command::stop().socket_line(), "{\"command\":[\"quit\",43]}\n");
    }

    #[test]
    fn quit_family_pipe_encoding() {
        assert_eq!(Command::next().pipe_line(PipeDialect::Mpv), "quit\n");
        assert_eq!(
            Command::previous().pipe_line(PipeDialect::Mplayer),
            "quit 42\n"
        );
        assert_eq!(Command::stop().pipe_line(PipeDialect::Mpv), "quit 43\n");
    }

    #[test]
    fn booleans_pass_through_json_natively() {
        assert_eq!(
            Command::set_pause(true).socket_line(),
            "{\"command\":[\"set_property\",\"pause\",true]}\n"
        );
        assert_eq!(
            Command::set_pause(false).socket_line(),
            "{\"command\":[\"set_property\",\"pause\",false]}\n"
        );
    }

    #[test]
    fn boolean_tokens_follow_the_dialect() {
        assert_eq!(
            Command::set_pause(true).pipe_line(PipeDialect::Mpv),
            "set_property pause yes\n"
        );
        assert_eq!(
            Command::set_pause(false).pipe_line(PipeDialect::Mpv),
            "set_property pause no\n"
        );
        assert_eq!(
            Command::set_pause(true).pipe_line(PipeDialect::Mplayer),
            "set_property pause 1\n"
        );
        assert_eq!(
            Command::set_pause(false).pipe_line(PipeDialect::Mplayer),
            "set_property pause 0\n"
        );
    }

    #[test]
    fn seeks_convert_microseconds_to_seconds() {
        assert_eq!(
            Command::seek(5_000_000).socket_line(),
            "{\"command\":[\"seek\",5.0]}\n"
        );
        assert_eq!(
            Command::seek(-2_500_000).socket_line(),
            "{\"command\":[\"seek\",-2.5]}\n"
        );
        assert_eq!(
            Command::seek_exact(3_000_000).socket_line(),
            "{\"command\":[\"seek\",3.0,2]}\n"
        );
        assert_eq!(
            Command::seek(5_000_000).pipe_line(PipeDialect::Mplayer),
            "seek 5\n"
        );
    }

    #[test]
    fn observe_and_query_commands() {
        assert_eq!(
            Command::observe_property(1, "time-pos").socket_line(),
            "{\"command\":[\"observe_property\",1,\"time-pos\"]}\n"
        );
        assert_eq!(
            Command::get_property("volume").pipe_line(PipeDialect::Mplayer),
            "get_property volume\n"
        );
        assert_eq!(
            Command::set_volume(75.0).socket_line(),
            "{\"command\":[\"set_property\",\"volume\",75.0]}\n"
        );
    }
}
