//! Running aggregate state of a crawl.
//!
//! Plain data with named counters. Reads of absent keys return zero and never insert.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use indexmap::IndexMap;

use crate::domain::ChannelId;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AggregateStats {
    pub total_posts: u64,
    pub unique_channels: HashSet<ChannelId>,
    pub total_views: u64,
    pub total_forwards: u64,
    pub total_replies: u64,
    /// Ascending by date.
    pub posts_by_day: BTreeMap<NaiveDate, u64>,
    /// Ordered by the first mention of each entity.
    pub mentions_by_entity: IndexMap<String, u64>,
}

impl AggregateStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unique_channel_count(&self) -> usize {
        self.unique_channels.len()
    }

    pub fn mentions_of(&self, entity: &str) -> u64 {
        self.mentions_by_entity.get(entity).copied().unwrap_or(0)
    }

    pub fn posts_on(&self, day: NaiveDate) -> u64 {
        self.posts_by_day.get(&day).copied().unwrap_or(0)
    }
}

/// Append-only log of collected message bodies, in collection order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawMessageLog {
    messages: Vec<String>,
}

impl RawMessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, text: impl Into<String>) {
        self.messages.push(text.into());
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for RawMessageLog {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            messages: iter.into_iter().map(Into::into).collect(),
        }
    }
}
