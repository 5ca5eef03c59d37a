//! JSON shapes shared by the bridge API and snapshot files.
//!
//! Field names follow Telegram's own naming (`peer_id.channel_id`, `message`, `replies`) so
//! dumps produced by common MTProto tooling load without remapping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tmc_core::domain::{ChannelHandle, ChannelId, Dialog, DialogKind, MessageEvent, Replies};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireDialogKind {
    Channel,
    Group,
    User,
}

impl From<WireDialogKind> for DialogKind {
    fn from(k: WireDialogKind) -> Self {
        match k {
            WireDialogKind::Channel => DialogKind::Channel,
            WireDialogKind::Group => DialogKind::Group,
            WireDialogKind::User => DialogKind::User,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WireDialog {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    pub kind: WireDialogKind,
}

impl From<WireDialog> for Dialog {
    fn from(d: WireDialog) -> Self {
        Dialog {
            id: d.id,
            name: d.name,
            kind: d.kind.into(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WireHandle {
    pub id: i64,
    #[serde(default)]
    pub access_hash: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
}

impl From<WireHandle> for ChannelHandle {
    fn from(h: WireHandle) -> Self {
        ChannelHandle {
            id: ChannelId(h.id),
            access_hash: h.access_hash,
            title: h.title,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WirePeer {
    #[serde(default)]
    pub channel_id: Option<i64>,
}

/// Telegram sends either a `MessageReplies` object or a bare integer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireReplies {
    Thread { replies: u64 },
    Bare(i64),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WireMessage {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub peer_id: Option<WirePeer>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub views: Option<u64>,
    #[serde(default)]
    pub forwards: Option<u64>,
    #[serde(default)]
    pub replies: Option<WireReplies>,
    pub date: DateTime<Utc>,
}

impl WireMessage {
    pub fn into_event(self) -> MessageEvent {
        MessageEvent {
            channel_id: self
                .peer_id
                .and_then(|p| p.channel_id)
                .map(ChannelId),
            text: self.message,
            views: self.views,
            forwards: self.forwards,
            replies: self.replies.map(|r| match r {
                WireReplies::Thread { replies } => Replies::Thread { replies },
                WireReplies::Bare(n) => Replies::Placeholder(n),
            }),
            timestamp: self.date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_with_all_fields() {
        let m: WireMessage = serde_json::from_value(json!({
            "id": 42,
            "peer_id": {"channel_id": 123},
            "message": "СПбГУ открыл набор",
            "views": 100,
            "forwards": 10,
            "replies": {"replies": 5, "comments": true},
            "date": "2023-01-01T10:00:00Z"
        }))
        .unwrap();

        let ev = m.into_event();
        assert_eq!(ev.channel_id, Some(ChannelId(123)));
        assert_eq!(ev.text.as_deref(), Some("СПбГУ открыл набор"));
        assert_eq!(ev.replies, Some(Replies::Thread { replies: 5 }));
        assert_eq!(ev.engagement().views, 100);
    }

    #[test]
    fn sparse_message_defaults() {
        let m: WireMessage = serde_json::from_value(json!({
            "replies": 0,
            "views": null,
            "date": "2023-01-02T23:59:59+03:00"
        }))
        .unwrap();

        let ev = m.into_event();
        assert_eq!(ev.channel_id, None);
        assert_eq!(ev.text, None);
        assert_eq!(ev.replies, Some(Replies::Placeholder(0)));
        assert_eq!(ev.engagement().replies, 0);
        assert_eq!(ev.day().to_string(), "2023-01-02");
    }
}
