//! Channel discovery: enumerate dialogs, look up participant counts, keep popular channels.

use futures::StreamExt;

use crate::{
    domain::{Channel, Dialog, DialogKind},
    ports::TransportPort,
    Result,
};

pub const DEFAULT_PARTICIPANT_THRESHOLD: u64 = 100;

/// Outcome of one discovery pass.
#[derive(Clone, Debug, Default)]
pub struct DiscoveryReport {
    pub channels: Vec<Channel>,
    pub scanned: usize,
    pub not_channels: usize,
    pub failed: usize,
    pub below_threshold: usize,
}

/// Walk the dialog list and return the channels with more than `threshold` participants.
///
/// A candidate whose handle or metadata cannot be fetched is logged and skipped. A failure of
/// the dialog enumeration itself aborts discovery.
pub async fn discover(transport: &dyn TransportPort, threshold: u64) -> Result<DiscoveryReport> {
    let mut report = DiscoveryReport::default();
    let mut dialogs = transport.stream_dialogs();

    while let Some(dialog) = dialogs.next().await {
        let dialog = dialog?;
        report.scanned += 1;

        if dialog.kind != DialogKind::Channel {
            report.not_channels += 1;
            continue;
        }

        match inspect(transport, &dialog).await {
            Ok(Some(channel)) if Channel::is_eligible(channel.participant_count, threshold) => {
                report.channels.push(channel);
            }
            Ok(_) => report.below_threshold += 1,
            Err(e) => {
                tracing::warn!(
                    dialog = %dialog.name,
                    error = %e,
                    "failed to inspect channel, skipping"
                );
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        found = report.channels.len(),
        scanned = report.scanned,
        failed = report.failed,
        "found {} channels to search",
        report.channels.len()
    );
    Ok(report)
}

/// `None` when Telegram hides the participant count.
async fn inspect(transport: &dyn TransportPort, dialog: &Dialog) -> Result<Option<Channel>> {
    let handle = transport.resolve_entity(dialog).await?;
    let full = transport.fetch_full_channel(&handle).await?;
    Ok(full.participants_count.map(|participant_count| Channel {
        handle,
        participant_count,
    }))
}
