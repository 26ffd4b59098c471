use std::{fmt, time::Duration};

/// Identifies one voice session. Discord allows a single voice connection
/// per guild, so the guild id is the session id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<serenity::model::id::GuildId> for SessionId {
    fn from(guild_id: serenity::model::id::GuildId) -> Self {
        Self(guild_id.get())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceChannelId(pub u64);

impl From<serenity::model::id::ChannelId> for VoiceChannelId {
    fn from(channel_id: serenity::model::id::ChannelId) -> Self {
        Self(channel_id.get())
    }
}

/// A playable piece of media plus what we show about it.
///
/// `source_ref` is opaque to everything except the audio node, which
/// resolves it back to something it can stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub title: String,
    pub source_ref: String,
    pub requested_by: Option<u64>,
    pub uri: Option<String>,
    pub length: Option<Duration>,
}

impl Track {
    pub fn new(title: impl Into<String>, source_ref: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            source_ref: source_ref.into(),
            requested_by: None,
            uri: None,
            length: None,
        }
    }

    pub fn requested_by(mut self, user_id: u64) -> Self {
        self.requested_by = Some(user_id);
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn with_length(mut self, length: Duration) -> Self {
        self.length = Some(length);
        self
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
