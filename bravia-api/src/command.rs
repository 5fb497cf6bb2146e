//! Command codes and the named-action lookup table
//!
//! The concrete IRCC codes differ between models and are supplied by the
//! host as a table of `name -> code` pairs. This module only knows the
//! action names; the codes stay opaque.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};

/// An opaque IRCC command code
///
/// Sent verbatim inside the `<IRCCCode>` element and used as the log label
/// for the send.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandCode(String);

impl CommandCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CommandCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CommandCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<String> for CommandCode {
    fn from(code: String) -> Self {
        Self(code)
    }
}

/// Remote-control actions exposed to automations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteAction {
    Netflix,
    ChannelUp,
    ChannelDown,
    VolumeUp,
    VolumeDown,
    ToggleMute,
    SetInput,
    Epg,
    Enter,
    Num0,
    Num1,
    Num2,
    Num3,
    Num4,
    Num5,
    Num6,
    Num7,
    Num8,
    Num9,
    Num10,
    Num11,
    Num12,
    PowerOff,
    Up,
    Down,
    Left,
    Right,
}

impl RemoteAction {
    /// Every known action, in table order
    pub const ALL: [RemoteAction; 27] = [
        RemoteAction::Netflix,
        RemoteAction::ChannelUp,
        RemoteAction::ChannelDown,
        RemoteAction::VolumeUp,
        RemoteAction::VolumeDown,
        RemoteAction::ToggleMute,
        RemoteAction::SetInput,
        RemoteAction::Epg,
        RemoteAction::Enter,
        RemoteAction::Num0,
        RemoteAction::Num1,
        RemoteAction::Num2,
        RemoteAction::Num3,
        RemoteAction::Num4,
        RemoteAction::Num5,
        RemoteAction::Num6,
        RemoteAction::Num7,
        RemoteAction::Num8,
        RemoteAction::Num9,
        RemoteAction::Num10,
        RemoteAction::Num11,
        RemoteAction::Num12,
        RemoteAction::PowerOff,
        RemoteAction::Up,
        RemoteAction::Down,
        RemoteAction::Left,
        RemoteAction::Right,
    ];

    /// Table key of this action
    pub fn name(&self) -> &'static str {
        match self {
            RemoteAction::Netflix => "Netflix",
            RemoteAction::ChannelUp => "ChannelUp",
            RemoteAction::ChannelDown => "ChannelDown",
            RemoteAction::VolumeUp => "VolumeUp",
            RemoteAction::VolumeDown => "VolumeDown",
            RemoteAction::ToggleMute => "ToggleMute",
            RemoteAction::SetInput => "SetInput",
            RemoteAction::Epg => "EPG",
            RemoteAction::Enter => "Enter",
            RemoteAction::Num0 => "Num0",
            RemoteAction::Num1 => "Num1",
            RemoteAction::Num2 => "Num2",
            RemoteAction::Num3 => "Num3",
            RemoteAction::Num4 => "Num4",
            RemoteAction::Num5 => "Num5",
            RemoteAction::Num6 => "Num6",
            RemoteAction::Num7 => "Num7",
            RemoteAction::Num8 => "Num8",
            RemoteAction::Num9 => "Num9",
            RemoteAction::Num10 => "Num10",
            RemoteAction::Num11 => "Num11",
            RemoteAction::Num12 => "Num12",
            RemoteAction::PowerOff => "PowerOff",
            RemoteAction::Up => "Up",
            RemoteAction::Down => "Down",
            RemoteAction::Left => "Left",
            RemoteAction::Right => "Right",
        }
    }

    /// Look an action up by its table key
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|action| action.name() == name)
    }

    /// Map a device capability identifier to the action it triggers
    pub fn from_capability(capability: &str) -> Option<Self> {
        match capability {
            "volume_up" => Some(RemoteAction::VolumeUp),
            "volume_down" => Some(RemoteAction::VolumeDown),
            "volume_mute" => Some(RemoteAction::ToggleMute),
            "channel_up" => Some(RemoteAction::ChannelUp),
            "channel_down" => Some(RemoteAction::ChannelDown),
            _ => None,
        }
    }
}

impl std::fmt::Display for RemoteAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Lookup table from action names to command codes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandTable {
    codes: HashMap<String, CommandCode>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a table from a JSON object of `"Name": "code"` pairs
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ApiError::ParseError(e.to_string()))
    }

    /// Read and parse a JSON table from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            ApiError::InvalidParameter(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// Insert or replace the code for a name
    pub fn insert(&mut self, name: impl Into<String>, code: impl Into<CommandCode>) {
        self.codes.insert(name.into(), code.into());
    }

    /// Code registered under `name`, if any
    pub fn get(&self, name: &str) -> Option<&CommandCode> {
        self.codes.get(name)
    }

    /// Code for a named action
    pub fn code_for(&self, action: RemoteAction) -> Result<&CommandCode> {
        self.get(action.name()).ok_or_else(|| {
            ApiError::InvalidParameter(format!("no command code for action '{}'", action))
        })
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}
