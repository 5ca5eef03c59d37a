use crate::{
    domain::{EntityTerms, MessageEvent},
    stats::{AggregateStats, RawMessageLog},
};

/// Single writer of the crawl state.
///
/// Every delivered `(event, alias)` pair is one observation: the same message found by two
/// aliases is counted twice and credited to both owning entities.
#[derive(Debug, Default)]
pub struct Aggregator {
    stats: AggregateStats,
    log: RawMessageLog,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(
        &mut self,
        event: &MessageEvent,
        matched_alias: &str,
        entities: &[EntityTerms],
    ) {
        let stats = &mut self.stats;
        stats.total_posts += 1;

        if let Some(channel) = event.channel_id {
            stats.unique_channels.insert(channel);
        }

        let engagement = event.engagement();
        stats.total_views += engagement.views;
        stats.total_forwards += engagement.forwards;
        stats.total_replies += engagement.replies;

        *stats.posts_by_day.entry(event.day()).or_insert(0) += 1;

        for entity in entities.iter().filter(|e| e.owns_alias(matched_alias)) {
            *stats
                .mentions_by_entity
                .entry(entity.key.clone())
                .or_insert(0) += 1;
        }
    }

    /// Appends the message body to the raw log. Events without text are skipped.
    pub fn collect(&mut self, event: &MessageEvent) {
        if let Some(text) = &event.text {
            self.log.push(text.clone());
        }
    }

    pub fn stats(&self) -> &AggregateStats {
        &self.stats
    }

    pub fn raw_messages(&self) -> &RawMessageLog {
        &self.log
    }

    pub fn into_parts(self) -> (AggregateStats, RawMessageLog) {
        (self.stats, self.log)
    }
}
