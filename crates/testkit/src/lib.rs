#![warn(missing_docs)]
//! Deterministic testing surfaces: event streams, recorded notifications and metrics.

mod metrics;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use stowaway_core::{ContainerId, Item, ItemSnapshot, SimTick};
use stowaway_world::{ContainerListener, PickupListener, PickupReport};

pub use metrics::*;

/// Primary event record captured by headless tests.
#[derive(Debug, Serialize)]
pub struct EventRecord<'a> {
    /// Simulation tick when the event occurred.
    pub tick: SimTick,
    /// Human-readable kind label.
    pub kind: &'a str,
    /// Free-form payload for smoke tests.
    pub payload: &'a str,
}

/// A sink that writes newline-delimited JSON to disk.
pub struct JsonlSink {
    file: File,
}

impl JsonlSink {
    /// Create a new sink at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self { file })
    }

    /// Append an event to the log.
    pub fn write(&mut self, event: &EventRecord<'_>) -> Result<()> {
        let line = serde_json::to_string(event)?;
        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        Ok(())
    }
}

/// One notification captured by [`RecordingListener`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RecordedEvent {
    /// An item entered a slot.
    Added {
        /// Container that changed.
        container: ContainerId,
        /// Affected slot.
        slot: usize,
        /// Item after the change.
        item: ItemSnapshot,
    },
    /// A stack changed in place.
    Changed {
        /// Container that changed.
        container: ContainerId,
        /// Affected slot.
        slot: usize,
        /// Item after the change.
        item: ItemSnapshot,
    },
    /// An item left a slot.
    Removed {
        /// Container that changed.
        container: ContainerId,
        /// Affected slot.
        slot: usize,
        /// Item as it left.
        item: ItemSnapshot,
    },
    /// A drop was picked from.
    PickedUp(PickupReport),
}

impl RecordedEvent {
    /// Short label used in logs and assertions.
    pub fn kind(&self) -> &'static str {
        match self {
            RecordedEvent::Added { .. } => "added",
            RecordedEvent::Changed { .. } => "changed",
            RecordedEvent::Removed { .. } => "removed",
            RecordedEvent::PickedUp(_) => "picked_up",
        }
    }
}

/// Listener that keeps every notification it sees, in order.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: RefCell<Vec<RecordedEvent>>,
}

impl RecordingListener {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.borrow().clone()
    }

    /// Labels of everything recorded so far.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events.borrow().iter().map(RecordedEvent::kind).collect()
    }

    /// Number of recorded notifications.
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    /// Take everything recorded so far, leaving the recorder empty.
    pub fn take(&self) -> Vec<RecordedEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    /// Move every recorded notification into `sink` as JSONL at `tick`.
    pub fn drain_into(&self, sink: &mut JsonlSink, tick: SimTick) -> Result<usize> {
        let events = self.take();
        for event in &events {
            let payload = serde_json::to_string(event)?;
            sink.write(&EventRecord {
                tick,
                kind: event.kind(),
                payload: &payload,
            })?;
        }
        Ok(events.len())
    }

    fn push(&self, event: RecordedEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl ContainerListener for RecordingListener {
    fn on_item_added(&self, container: ContainerId, slot: usize, item: &Item) {
        self.push(RecordedEvent::Added {
            container,
            slot,
            item: item.snapshot(),
        });
    }

    fn on_item_changed(&self, container: ContainerId, slot: usize, item: &Item) {
        self.push(RecordedEvent::Changed {
            container,
            slot,
            item: item.snapshot(),
        });
    }

    fn on_item_removed(&self, container: ContainerId, slot: usize, item: &Item) {
        self.push(RecordedEvent::Removed {
            container,
            slot,
            item: item.snapshot(),
        });
    }
}

impl PickupListener for RecordingListener {
    fn on_item_picked_up(&self, report: &PickupReport) {
        self.push(RecordedEvent::PickedUp(report.clone()));
    }
}
