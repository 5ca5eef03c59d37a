//! Offline transport backed by a JSON snapshot of dialogs and their history.
//!
//! Search emulates Telegram's server-side behaviour closely enough for replays: a message
//! matches when its text contains the term, case-insensitively.

use std::path::Path;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde::Deserialize;

use tmc_core::{
    domain::{ChannelHandle, ChannelId, Dialog, FullChannel, MessageEvent},
    errors::Error,
    ports::{SearchQuery, TransportPort},
    Result,
};

use crate::wire::{WireDialogKind, WireMessage};

#[derive(Clone, Debug, Deserialize)]
struct SnapshotFile {
    dialogs: Vec<SnapshotDialog>,
}

#[derive(Clone, Debug, Deserialize)]
struct SnapshotDialog {
    id: i64,
    #[serde(default)]
    name: String,
    kind: WireDialogKind,
    #[serde(default)]
    access_hash: Option<i64>,
    #[serde(default)]
    participants_count: Option<u64>,
    /// Entities that cannot be resolved (left, banned, private) are marked here.
    #[serde(default)]
    inaccessible: bool,
    #[serde(default)]
    messages: Vec<WireMessage>,
}

#[derive(Clone, Debug)]
pub struct SnapshotTransport {
    dialogs: Vec<SnapshotDialog>,
}

impl SnapshotTransport {
    pub fn from_json(json: &str) -> Result<Self> {
        let file: SnapshotFile = serde_json::from_str(json)?;
        Ok(Self {
            dialogs: file.dialogs,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let txt = std::fs::read_to_string(path)?;
        let transport = Self::from_json(&txt)?;
        tracing::info!(
            path = %path.display(),
            dialogs = transport.dialogs.len(),
            "loaded snapshot"
        );
        Ok(transport)
    }

    fn dialog(&self, id: i64) -> Result<&SnapshotDialog> {
        self.dialogs
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| Error::Transport(format!("no dialog with id {id} in snapshot")))
    }
}

#[async_trait]
impl TransportPort for SnapshotTransport {
    async fn connect(&self) -> Result<()> {
        Ok(())
    }

    fn stream_dialogs(&self) -> BoxStream<'_, Result<Dialog>> {
        stream::iter(self.dialogs.iter().map(|d| {
            Ok(Dialog {
                id: d.id,
                name: d.name.clone(),
                kind: d.kind.into(),
            })
        }))
        .boxed()
    }

    async fn resolve_entity(&self, dialog: &Dialog) -> Result<ChannelHandle> {
        let d = self.dialog(dialog.id)?;
        if d.inaccessible {
            return Err(Error::Transport(format!("CHANNEL_PRIVATE: {}", d.name)));
        }
        Ok(ChannelHandle {
            id: ChannelId(d.id),
            access_hash: d.access_hash,
            title: Some(d.name.clone()).filter(|n| !n.is_empty()),
        })
    }

    async fn fetch_full_channel(&self, handle: &ChannelHandle) -> Result<FullChannel> {
        let d = self.dialog(handle.id.0)?;
        Ok(FullChannel {
            participants_count: d.participants_count,
        })
    }

    fn stream_messages(
        &self,
        channel: ChannelHandle,
        query: SearchQuery,
    ) -> BoxStream<'_, Result<MessageEvent>> {
        let d = match self.dialog(channel.id.0) {
            Ok(d) => d,
            Err(e) => return stream::once(async move { Err(e) }).boxed(),
        };
        let term = query.term.to_lowercase();

        stream::iter(
            d.messages
                .iter()
                .filter(move |m| {
                    m.message
                        .as_deref()
                        .is_some_and(|t| t.to_lowercase().contains(&term))
                })
                .take(query.limit)
                .map(|m| Ok(m.clone().into_event())),
        )
        .boxed()
    }
}
