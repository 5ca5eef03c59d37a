//! Term search traversal: entity × alias × channel, strictly sequential.

use futures::StreamExt;

use crate::{
    aggregator::Aggregator,
    domain::{Channel, EntityTerms},
    errors::Error,
    ports::{MessageFilter, SearchQuery, TransportPort},
    Result,
};

/// One remote search to issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchStep<'a> {
    pub entity: &'a EntityTerms,
    pub alias: &'a str,
    pub channel: &'a Channel,
}

/// Iterator over every `(entity, alias, channel)` triple: entity-major, then alias, then
/// channel.
pub struct SearchPlan<'a> {
    entities: &'a [EntityTerms],
    channels: &'a [Channel],
    entity: usize,
    alias: usize,
    channel: usize,
}

impl<'a> SearchPlan<'a> {
    pub fn new(entities: &'a [EntityTerms], channels: &'a [Channel]) -> Self {
        Self {
            entities,
            channels,
            entity: 0,
            alias: 0,
            channel: 0,
        }
    }

    /// Number of requests the full traversal issues.
    pub fn request_count(&self) -> usize {
        self.entities.iter().map(|e| e.aliases.len()).sum::<usize>() * self.channels.len()
    }
}

impl<'a> Iterator for SearchPlan<'a> {
    type Item = SearchStep<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (entities, channels) = (self.entities, self.channels);
        if channels.is_empty() {
            return None;
        }
        loop {
            let entity = entities.get(self.entity)?;
            let Some(alias) = entity.aliases.get(self.alias) else {
                self.entity += 1;
                self.alias = 0;
                continue;
            };

            let channel = &channels[self.channel];
            self.channel += 1;
            if self.channel == channels.len() {
                self.channel = 0;
                self.alias += 1;
            }
            return Some(SearchStep {
                entity,
                alias,
                channel,
            });
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub requests: usize,
    pub events: u64,
}

/// Drives the searches and feeds every yielded message to the aggregator.
pub struct TermSearchOrchestrator<'a> {
    transport: &'a dyn TransportPort,
    limit: usize,
}

impl<'a> TermSearchOrchestrator<'a> {
    pub fn new(transport: &'a dyn TransportPort, limit: usize) -> Self {
        Self { transport, limit }
    }

    /// Run the full traversal. A failing message stream aborts the run; whatever was
    /// aggregated before the failure stays in `aggregator`.
    pub async fn run(
        &self,
        entities: &[EntityTerms],
        channels: &[Channel],
        aggregator: &mut Aggregator,
    ) -> Result<CrawlReport> {
        let mut report = CrawlReport::default();
        let mut current_entity: Option<&str> = None;
        let mut current_alias: Option<(&str, &str)> = None;

        for step in SearchPlan::new(entities, channels) {
            if current_entity != Some(step.entity.key.as_str()) {
                current_entity = Some(step.entity.key.as_str());
                tracing::info!(
                    entity = %step.entity.key,
                    "searching mentions of {}",
                    step.entity.key
                );
            }
            if current_alias != Some((step.entity.key.as_str(), step.alias)) {
                current_alias = Some((step.entity.key.as_str(), step.alias));
                tracing::info!(term = %step.alias, "searching term in messages");
            }

            report.requests += 1;
            report.events += self.search(step, entities, aggregator).await?;
        }

        tracing::info!(
            requests = report.requests,
            events = report.events,
            "term search finished"
        );
        Ok(report)
    }

    async fn search(
        &self,
        step: SearchStep<'_>,
        entities: &[EntityTerms],
        aggregator: &mut Aggregator,
    ) -> Result<u64> {
        let query = SearchQuery {
            term: step.alias.to_string(),
            limit: self.limit,
            filter: MessageFilter::Empty,
        };
        let mut messages = self
            .transport
            .stream_messages(step.channel.handle.clone(), query);

        let mut seen = 0u64;
        while let Some(message) = messages.next().await {
            let message = message.map_err(|e| Error::Stream {
                term: step.alias.to_string(),
                channel: step.channel.id(),
                reason: e.to_string(),
            })?;
            aggregator.process(&message, step.alias, entities);
            aggregator.collect(&message);
            seen += 1;
        }

        tracing::debug!(
            term = %step.alias,
            channel = %step.channel.id(),
            messages = seen,
            "search done"
        );
        Ok(seen)
    }
}
