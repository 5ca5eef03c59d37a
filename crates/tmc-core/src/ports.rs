use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::{domain::*, Result};

/// Server-side media filter applied to a search. The crawler only ever asks for plain search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MessageFilter {
    #[default]
    Empty,
}

/// One remote search request: literal term, result cap and filter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchQuery {
    pub term: String,
    pub limit: usize,
    pub filter: MessageFilter,
}

/// Hexagonal port for the message transport (MTProto bridge, offline snapshot, test fakes).
///
/// Streams are pull-based: the crawler suspends on each `next()` and never has more than one
/// request in flight.
#[async_trait]
pub trait TransportPort: Send + Sync {
    /// Establish (or verify) the authorized session.
    async fn connect(&self) -> Result<()>;

    /// Lazily enumerate the account's dialogs.
    fn stream_dialogs(&self) -> BoxStream<'_, Result<Dialog>>;

    async fn resolve_entity(&self, dialog: &Dialog) -> Result<ChannelHandle>;

    async fn fetch_full_channel(&self, handle: &ChannelHandle) -> Result<FullChannel>;

    /// Lazily stream messages of `channel` matching `query`, at most `query.limit` of them.
    fn stream_messages(
        &self,
        channel: ChannelHandle,
        query: SearchQuery,
    ) -> BoxStream<'_, Result<MessageEvent>>;
}
