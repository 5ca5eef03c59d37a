//! In-memory transport used by the core's unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use futures::stream::{self, BoxStream, StreamExt};

use crate::{
    domain::*,
    errors::Error,
    ports::{SearchQuery, TransportPort},
    Result,
};

#[derive(Default)]
pub struct FakeTransport {
    pub dialogs: Vec<Dialog>,
    pub participants: HashMap<i64, Option<u64>>,
    pub messages: HashMap<i64, Vec<MessageEvent>>,
    /// Every search yields the channel's whole history regardless of the term.
    pub match_everything: bool,
    pub fail_resolve: HashSet<i64>,
    pub fail_full: HashSet<i64>,
    /// Channel whose message stream errors after yielding its first message.
    pub fail_stream: Option<i64>,
    pub fail_dialogs: bool,

    pub connects: Mutex<u32>,
    pub searches: Mutex<Vec<(i64, String, usize)>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(mut self, id: i64, participants: Option<u64>) -> Self {
        self.dialogs.push(Dialog {
            id,
            name: format!("channel-{id}"),
            kind: DialogKind::Channel,
        });
        self.participants.insert(id, participants);
        self
    }

    pub fn with_dialog(mut self, id: i64, kind: DialogKind) -> Self {
        self.dialogs.push(Dialog {
            id,
            name: format!("dialog-{id}"),
            kind,
        });
        self
    }

    pub fn with_message(mut self, channel: i64, text: &str) -> Self {
        let mut ev = MessageEvent::new(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());
        ev.channel_id = Some(ChannelId(channel));
        ev.text = Some(text.to_string());
        ev.views = Some(100);
        ev.forwards = Some(10);
        ev.replies = Some(Replies::Thread { replies: 5 });
        self.messages.entry(channel).or_default().push(ev);
        self
    }

    pub fn search_log(&self) -> Vec<(i64, String, usize)> {
        self.searches.lock().unwrap().clone()
    }

    pub fn connect_calls(&self) -> u32 {
        *self.connects.lock().unwrap()
    }
}

#[async_trait]
impl TransportPort for FakeTransport {
    async fn connect(&self) -> Result<()> {
        *self.connects.lock().unwrap() += 1;
        Ok(())
    }

    fn stream_dialogs(&self) -> BoxStream<'_, Result<Dialog>> {
        let mut items: Vec<Result<Dialog>> = self.dialogs.iter().cloned().map(Ok).collect();
        if self.fail_dialogs {
            items.push(Err(Error::Transport("dialogs page failed".to_string())));
        }
        stream::iter(items).boxed()
    }

    async fn resolve_entity(&self, dialog: &Dialog) -> Result<ChannelHandle> {
        if self.fail_resolve.contains(&dialog.id) {
            return Err(Error::Transport(format!("cannot resolve {}", dialog.id)));
        }
        Ok(ChannelHandle {
            id: ChannelId(dialog.id),
            access_hash: Some(dialog.id * 7),
            title: Some(dialog.name.clone()),
        })
    }

    async fn fetch_full_channel(&self, handle: &ChannelHandle) -> Result<FullChannel> {
        if self.fail_full.contains(&handle.id.0) {
            return Err(Error::Transport("CHANNEL_PRIVATE".to_string()));
        }
        Ok(FullChannel {
            participants_count: self.participants.get(&handle.id.0).copied().flatten(),
        })
    }

    fn stream_messages(
        &self,
        channel: ChannelHandle,
        query: SearchQuery,
    ) -> BoxStream<'_, Result<MessageEvent>> {
        self.searches
            .lock()
            .unwrap()
            .push((channel.id.0, query.term.clone(), query.limit));

        let history = self.messages.get(&channel.id.0).cloned().unwrap_or_default();
        let mut items: Vec<Result<MessageEvent>> = history
            .into_iter()
            .filter(|m| {
                self.match_everything
                    || m.text
                        .as_deref()
                        .is_some_and(|t| t.to_lowercase().contains(&query.term))
            })
            .take(query.limit)
            .map(Ok)
            .collect();

        if self.fail_stream == Some(channel.id.0) {
            items.truncate(1);
            items.push(Err(Error::Transport("FLOOD_WAIT_30".to_string())));
        }
        stream::iter(items).boxed()
    }
}
