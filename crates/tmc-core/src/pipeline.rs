//! End-to-end run: `Idle -> Discovering -> Crawling -> Exported`.
//!
//! Transitions only move forward. A failed crawl leaves the pipeline in `Crawling`; exporting
//! from there is allowed but is the caller's explicit choice to publish partial results.

use std::sync::Arc;

use crate::{
    aggregator::Aggregator,
    discovery::{discover, DiscoveryReport},
    domain::{Channel, EntityTerms},
    errors::Error,
    export::{export_all, ExportPaths, StatRow},
    orchestrator::{CrawlReport, TermSearchOrchestrator},
    ports::TransportPort,
    stats::{AggregateStats, RawMessageLog},
    Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Discovering,
    Crawling,
    Exported,
}

impl PipelineState {
    fn can_advance_to(self, next: PipelineState) -> bool {
        matches!(
            (self, next),
            (PipelineState::Idle, PipelineState::Discovering)
                | (PipelineState::Discovering, PipelineState::Crawling)
                | (PipelineState::Crawling, PipelineState::Exported)
        )
    }
}

#[derive(Clone, Debug)]
pub struct PipelineSettings {
    pub entities: Vec<EntityTerms>,
    pub limit: usize,
    pub participant_threshold: u64,
}

#[derive(Clone, Debug)]
pub struct RunSummary {
    pub channels: usize,
    pub crawl: CrawlReport,
    pub rows: Vec<StatRow>,
}

pub struct Pipeline {
    transport: Arc<dyn TransportPort>,
    settings: PipelineSettings,
    state: PipelineState,
    channels: Vec<Channel>,
    aggregator: Aggregator,
    crawl_complete: bool,
}

impl Pipeline {
    pub fn new(transport: Arc<dyn TransportPort>, settings: PipelineSettings) -> Self {
        Self {
            transport,
            settings,
            state: PipelineState::Idle,
            channels: Vec::new(),
            aggregator: Aggregator::new(),
            crawl_complete: false,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn stats(&self) -> &AggregateStats {
        self.aggregator.stats()
    }

    pub fn raw_messages(&self) -> &RawMessageLog {
        self.aggregator.raw_messages()
    }

    fn advance(&mut self, next: PipelineState) -> Result<()> {
        if !self.state.can_advance_to(next) {
            return Err(Error::InvalidState {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!(from = ?self.state, to = ?next, "pipeline transition");
        self.state = next;
        Ok(())
    }

    /// Connect the transport and materialise the eligible channel list once.
    pub async fn discover(&mut self) -> Result<DiscoveryReport> {
        self.advance(PipelineState::Discovering)?;
        self.transport.connect().await?;

        let report = discover(&*self.transport, self.settings.participant_threshold).await?;
        self.channels = report.channels.clone();
        Ok(report)
    }

    pub async fn crawl(&mut self) -> Result<CrawlReport> {
        self.advance(PipelineState::Crawling)?;

        let orchestrator = TermSearchOrchestrator::new(&*self.transport, self.settings.limit);
        let report = orchestrator
            .run(&self.settings.entities, &self.channels, &mut self.aggregator)
            .await?;
        self.crawl_complete = true;
        Ok(report)
    }

    pub fn export(&mut self, paths: &ExportPaths) -> Result<Vec<StatRow>> {
        if self.state == PipelineState::Crawling && !self.crawl_complete {
            tracing::warn!(
                posts = self.stats().total_posts,
                "exporting partial results of an aborted crawl"
            );
        }
        if !self.state.can_advance_to(PipelineState::Exported) {
            return Err(Error::InvalidState {
                from: self.state,
                to: PipelineState::Exported,
            });
        }

        let rows = export_all(self.aggregator.stats(), self.aggregator.raw_messages(), paths)?;
        self.advance(PipelineState::Exported)?;
        Ok(rows)
    }

    /// Discover, crawl and export. Any error stops the run where it happened.
    pub async fn run(&mut self, paths: &ExportPaths) -> Result<RunSummary> {
        let discovery = self.discover().await?;
        let crawl = self.crawl().await?;
        let rows = self.export(paths)?;
        Ok(RunSummary {
            channels: discovery.channels.len(),
            crawl,
            rows,
        })
    }
}
