//! Slush resolution
//!
//! Decides, for every file in the activity log, which name it held before the
//! renames that happened since the cutoff.
//!
//! For each path the event sequence is scanned in order and every event at or
//! after the cutoff overwrites the path's resolved name, so the *last
//! qualifying event in sequence order* wins. With [`EventOrder::Recorded`] the
//! sequence is taken as the activities document lists it; with
//! [`EventOrder::Chronological`] it is stable-sorted by timestamp first.
//!
//! ```rust
//! use deslusher::slush::SlushResolver;
//! use deslusher::types::{ActivityLog, EventOrder, RenameEvent};
//! use deslusher::utils::parse_timestamp;
//!
//! # fn main() -> deslusher::Result<()> {
//! let mut log = ActivityLog::new();
//! log.push("/B/y.txt", RenameEvent::new(parse_timestamp("2024-01-01T00:00:00Z")?, "x.txt"));
//!
//! let resolver = SlushResolver::new(parse_timestamp("2023-12-01T00:00:00Z")?, EventOrder::Recorded);
//! let slush = resolver.resolve(&log);
//! assert_eq!(slush.original_name("/B/y.txt"), Some("x.txt"));
//! # Ok(())
//! # }
//! ```

use crate::types::{ActivityLog, EventOrder, RenameEvent};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Resolved pre-rename names, keyed by current file path
///
/// A path absent from the map was not renamed since the cutoff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlushMap {
    names: BTreeMap<String, String>,
}

impl SlushMap {
    /// Resolved original name of `path`, if it was renamed
    pub fn original_name(&self, path: &str) -> Option<&str> {
        self.names.get(path).map(String::as_str)
    }

    /// Check whether `path` was renamed since the cutoff
    pub fn is_renamed(&self, path: &str) -> bool {
        self.names.contains_key(path)
    }

    /// Number of renamed paths
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check whether no path was renamed
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate over `(current path, original name)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names.iter().map(|(p, n)| (p.as_str(), n.as_str()))
    }
}

/// Applies a cutoff and an event ordering to an activity log
#[derive(Debug, Clone, Copy)]
pub struct SlushResolver {
    cutoff: DateTime<Utc>,
    order: EventOrder,
}

impl SlushResolver {
    /// Create a resolver considering renames at or after `cutoff`
    pub fn new(cutoff: DateTime<Utc>, order: EventOrder) -> Self {
        Self { cutoff, order }
    }

    /// Resolve every path in `log`
    pub fn resolve(&self, log: &ActivityLog) -> SlushMap {
        let mut names = BTreeMap::new();
        for (path, events) in log.iter() {
            if let Some(name) = self.resolve_events(events) {
                trace!("Resolved {} -> {}", path, name);
                names.insert(path.to_string(), name.to_string());
            }
        }
        debug!(
            "Resolved {} renamed paths out of {} logged (cutoff {})",
            names.len(),
            log.len(),
            self.cutoff
        );
        SlushMap { names }
    }

    /// Resolve a single event sequence
    pub fn resolve_events<'a>(&self, events: &'a [RenameEvent]) -> Option<&'a str> {
        match self.order {
            EventOrder::Recorded => self.last_qualifying(events.iter()),
            EventOrder::Chronological => {
                let mut sorted: Vec<&RenameEvent> = events.iter().collect();
                sorted.sort_by_key(|e| e.timestamp);
                self.last_qualifying(sorted.into_iter())
            }
        }
    }

    fn last_qualifying<'a>(&self, events: impl Iterator<Item = &'a RenameEvent>) -> Option<&'a str> {
        let mut resolved = None;
        for event in events {
            if event.timestamp >= self.cutoff {
                resolved = Some(event.prior_name.as_str());
            }
        }
        resolved
    }
}
