//! Structured event logging for the scheduling pass.
//!
//! Scheduling decisions that are interesting after the fact (barriers the
//! builder had to insert, the heuristic switching into panic mode, math-unit
//! stalls) are recorded here instead of being printed. Callers can inspect
//! the log for debugging or tuning, or ignore it entirely.
//!
//! # Architecture
//!
//! - [`Event`] - A single recorded event
//! - [`EventLog`] - Append-only collection with query and summary helpers
//! - [`EventBuilder`] - Fluent API; the event is committed when dropped
//!
//! The log is backed by `boxcar::Vec`, so blocks scheduled in parallel can
//! append to one shared log through `&self`.
//!
//! # Example
//!
//! ```rust
//! use gensched::schedule::{EventKind, EventLog};
//! use gensched::utils::graph::NodeId;
//!
//! let log = EventLog::new();
//! log.record(EventKind::BarrierInserted)
//!     .at(0, NodeId::new(3))
//!     .message("fb_write serializes block");
//!
//! assert_eq!(log.count_kind(EventKind::BarrierInserted), 1);
//! assert_eq!(log.summary(), "1 barrier inserted");
//! ```

use std::{collections::HashMap, fmt};

use crate::utils::graph::NodeId;

/// Categories of events that can be logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A block was scheduled; the message carries the cycle estimate.
    BlockScheduled,
    /// A node was serialized against its neighbours (side effects, shader
    /// exit, control flow at a block boundary).
    BarrierInserted,
    /// An operand without a dependency model forced a full barrier.
    UnmodeledOperand,
    /// Register pressure crossed the panic threshold.
    PanicModeEntered,
    /// Register pressure dropped back below the panic threshold.
    PanicModeLeft,
    /// A math instruction pushed back other math instructions competing for
    /// the shared unit.
    MathUnitStall,
    /// Scheduling a block failed.
    Error,
}

impl EventKind {
    /// Returns a human-readable description of this event kind.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::BlockScheduled => "block scheduled",
            Self::BarrierInserted => "barrier inserted",
            Self::UnmodeledOperand => "unmodeled operand",
            Self::PanicModeEntered => "panic mode entered",
            Self::PanicModeLeft => "panic mode left",
            Self::MathUnitStall => "math unit stall",
            Self::Error => "error",
        }
    }

    /// Returns true for failure reports, which the summary leaves out.
    #[must_use]
    pub fn is_diagnostic(&self) -> bool {
        matches!(self, Self::Error)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A single logged event.
#[derive(Debug, Clone)]
pub struct Event {
    /// The type of event.
    pub kind: EventKind,
    /// Index of the basic block the event belongs to, if any.
    pub block: Option<usize>,
    /// Node within the block, if the event concerns a single instruction.
    pub node: Option<NodeId>,
    /// Human-readable description.
    pub message: String,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.kind)?;
        if let Some(block) = self.block {
            write!(f, " block {block}")?;
        }
        if let Some(node) = self.node {
            write!(f, " {node}")?;
        }
        write!(f, " {}", self.message)
    }
}

/// Builder for creating events with a fluent API.
///
/// Created by [`EventLog::record`]. The event is added to the log when the
/// builder is dropped.
pub struct EventBuilder<'a> {
    log: &'a EventLog,
    kind: EventKind,
    block: Option<usize>,
    node: Option<NodeId>,
    message: Option<String>,
}

impl<'a> EventBuilder<'a> {
    fn new(log: &'a EventLog, kind: EventKind) -> Self {
        Self {
            log,
            kind,
            block: None,
            node: None,
            message: None,
        }
    }

    /// Sets the block and node the event concerns.
    pub fn at(mut self, block: usize, node: NodeId) -> Self {
        self.block = Some(block);
        self.node = Some(node);
        self
    }

    /// Sets only the block, for block-level events.
    pub fn block(mut self, block: usize) -> Self {
        self.block = Some(block);
        self
    }

    /// Sets a custom message describing the event.
    pub fn message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }
}

impl Drop for EventBuilder<'_> {
    fn drop(&mut self) {
        let message = self
            .message
            .take()
            .unwrap_or_else(|| self.kind.description().to_string());

        self.log.events.push(Event {
            kind: self.kind,
            block: self.block.take(),
            node: self.node.take(),
            message,
        });
    }
}

/// Collection of events recorded while scheduling.
///
/// This type is thread-safe: events can be appended concurrently from
/// multiple threads using shared references (`&self`).
#[derive(Debug)]
pub struct EventLog {
    events: boxcar::Vec<Event>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventLog {
    fn clone(&self) -> Self {
        let events = boxcar::Vec::new();
        for (_, event) in &self.events {
            events.push(event.clone());
        }
        Self { events }
    }
}

impl EventLog {
    /// Creates an empty event log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: boxcar::Vec::new(),
        }
    }

    /// Returns true if no events have been logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.count() == 0
    }

    /// Returns the total number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.count()
    }

    /// Starts building a new event of the given kind.
    ///
    /// The event is added when the builder is dropped.
    pub fn record(&self, kind: EventKind) -> EventBuilder<'_> {
        EventBuilder::new(self, kind)
    }

    /// Returns true if any event of the given kind exists.
    #[must_use]
    pub fn has(&self, kind: EventKind) -> bool {
        self.events.iter().any(|(_, e)| e.kind == kind)
    }

    /// Counts events of the given kind.
    #[must_use]
    pub fn count_kind(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|(_, e)| e.kind == kind).count()
    }

    /// Returns an iterator over all events.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().map(|(_, e)| e)
    }

    /// Returns an iterator over events of a specific kind.
    pub fn filter_kind(&self, kind: EventKind) -> impl Iterator<Item = &Event> + '_ {
        self.iter().filter(move |e| e.kind == kind)
    }

    /// Returns an iterator over events of a specific block.
    pub fn filter_block(&self, block: usize) -> impl Iterator<Item = &Event> + '_ {
        self.iter().filter(move |e| e.block == Some(block))
    }

    /// Returns an iterator over error events.
    pub fn errors(&self) -> impl Iterator<Item = &Event> + '_ {
        self.filter_kind(EventKind::Error)
    }

    /// Counts events grouped by kind.
    #[must_use]
    pub fn count_by_kind(&self) -> HashMap<EventKind, usize> {
        let mut counts = HashMap::new();
        for (_, event) in &self.events {
            *counts.entry(event.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Generates a human-readable summary of the non-diagnostic events.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.is_empty() {
            return "no events".to_string();
        }

        let mut parts: Vec<String> = self
            .count_by_kind()
            .iter()
            .filter(|(k, _)| !k.is_diagnostic())
            .map(|(kind, count)| format!("{} {}", count, kind.description()))
            .collect();

        if parts.is_empty() {
            return format!("{} events", self.len());
        }

        parts.sort();
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_log() {
        let log = EventLog::new();
        assert!(log.is_empty());
        assert_eq!(log.len(), 0);
        assert_eq!(log.summary(), "no events");
    }

    #[test]
    fn test_record_event() {
        let log = EventLog::new();

        log.record(EventKind::BarrierInserted)
            .at(2, NodeId::new(5))
            .message("untyped_atomic");

        assert_eq!(log.len(), 1);
        let event = log.iter().next().unwrap();
        assert_eq!(event.block, Some(2));
        assert_eq!(event.node, Some(NodeId::new(5)));
        assert_eq!(event.message, "untyped_atomic");
        assert_eq!(event.to_string(), "[barrier inserted] block 2 n5 untyped_atomic");
    }

    #[test]
    fn test_default_message() {
        let log = EventLog::new();
        log.record(EventKind::PanicModeEntered).block(0);

        let event = log.iter().next().unwrap();
        assert_eq!(event.message, "panic mode entered");
    }

    #[test]
    fn test_errors_are_left_out_of_summary() {
        let log = EventLog::new();
        log.record(EventKind::Error).block(3).message("m16 out of range");
        log.record(EventKind::Error).block(4);

        assert_eq!(log.errors().count(), 2);
        assert_eq!(log.summary(), "2 events");

        log.record(EventKind::BlockScheduled).block(5);
        assert_eq!(log.summary(), "1 block scheduled");
    }

    #[test]
    fn test_filter_block_and_summary() {
        let log = EventLog::new();
        log.record(EventKind::BlockScheduled).block(0);
        log.record(EventKind::BlockScheduled).block(1);
        log.record(EventKind::MathUnitStall).at(1, NodeId::new(0));

        assert_eq!(log.filter_block(1).count(), 2);
        assert_eq!(log.summary(), "1 math unit stall, 2 block scheduled");
    }

    #[test]
    fn test_clone_is_independent() {
        let a = EventLog::new();
        a.record(EventKind::UnmodeledOperand).block(0);
        a.record(EventKind::BarrierInserted).block(0);

        let b = a.clone();
        b.record(EventKind::BlockScheduled).block(0);
        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 3);
        assert!(b.has(EventKind::BarrierInserted));
    }

    #[test]
    fn test_thread_safe_append() {
        use std::sync::Arc;
        use std::thread;

        let log = Arc::new(EventLog::new());
        let mut handles = vec![];

        for i in 0..4 {
            let log_clone = Arc::clone(&log);
            handles.push(thread::spawn(move || {
                for j in 0..100 {
                    log_clone
                        .record(EventKind::BlockScheduled)
                        .block(i * 100 + j)
                        .message(format!("thread {i} block {j}"));
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(log.len(), 400);
    }
}
