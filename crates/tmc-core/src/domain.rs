use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};

/// Telegram channel id (numeric, without the `-100` peer prefix).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub i64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What kind of peer a dialog points at. Only broadcast channels are crawled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DialogKind {
    Channel,
    Group,
    User,
}

/// One entry of the account's dialog list, as enumerated by the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dialog {
    pub id: i64,
    pub name: String,
    pub kind: DialogKind,
}

/// A resolved, searchable channel reference.
///
/// `access_hash` is opaque to the core; transports that need it carry it through.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelHandle {
    pub id: ChannelId,
    pub access_hash: Option<i64>,
    pub title: Option<String>,
}

/// Full channel metadata. Telegram may hide the participant count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FullChannel {
    pub participants_count: Option<u64>,
}

/// A channel that passed discovery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Channel {
    pub handle: ChannelHandle,
    pub participant_count: u64,
}

impl Channel {
    pub fn id(&self) -> ChannelId {
        self.handle.id
    }

    /// Strict: a channel sitting exactly on the threshold is not eligible.
    pub fn is_eligible(participant_count: u64, threshold: u64) -> bool {
        participant_count > threshold
    }
}

/// A tracked entity and the literal aliases it is searched by.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityTerms {
    pub key: String,
    pub aliases: Vec<String>,
}

impl EntityTerms {
    /// Builds the entry, lowercasing every alias.
    pub fn new(key: impl Into<String>, aliases: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        Self {
            key: key.into(),
            aliases: aliases
                .into_iter()
                .map(|a| a.as_ref().to_lowercase())
                .collect(),
        }
    }

    pub fn owns_alias(&self, alias: &str) -> bool {
        self.aliases.iter().any(|a| a == alias)
    }
}

/// Reply information attached to a message.
///
/// Telegram sends a structured reply thread for discussion-enabled channels; some payloads only
/// carry a bare integer placeholder, which says nothing about the actual reply count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Replies {
    Thread { replies: u64 },
    Placeholder(i64),
}

/// One message delivered by a search stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    pub channel_id: Option<ChannelId>,
    pub text: Option<String>,
    pub views: Option<u64>,
    pub forwards: Option<u64>,
    pub replies: Option<Replies>,
    pub timestamp: DateTime<Utc>,
}

/// Engagement counters of a message with missing fields already defaulted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Engagement {
    pub views: u64,
    pub forwards: u64,
    pub replies: u64,
}

impl MessageEvent {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            channel_id: None,
            text: None,
            views: None,
            forwards: None,
            replies: None,
            timestamp,
        }
    }

    pub fn engagement(&self) -> Engagement {
        let replies = match self.replies {
            Some(Replies::Thread { replies }) => replies,
            Some(Replies::Placeholder(_)) | None => 0,
        };
        Engagement {
            views: self.views.unwrap_or(0),
            forwards: self.forwards.unwrap_or(0),
            replies,
        }
    }

    /// Calendar day (UTC) the message was posted on.
    pub fn day(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}
