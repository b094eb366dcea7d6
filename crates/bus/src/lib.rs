//! Presentation surface bus
//!
//! Outbound events from the agent core to whatever displays the run: the
//! transcript as it grows, generated files as they are written, and the final
//! status. Publishing never blocks; a surface that went away is ignored.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Event kinds a dispatcher can route on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Line,
    FileUpsert,
    Finished,
}

/// One event for the presentation surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SurfaceEvent {
    /// A transcript line was appended
    Line {
        text: String,
        timestamp: DateTime<Local>,
    },
    /// A generated file was created or replaced
    FileUpsert { path: String, content: String },
    /// The task left the running state
    Finished { status: String, iterations: u32 },
}

impl SurfaceEvent {
    pub fn line(text: impl Into<String>) -> Self {
        SurfaceEvent::Line {
            text: text.into(),
            timestamp: Local::now(),
        }
    }

    pub fn file_upsert(path: impl Into<String>, content: impl Into<String>) -> Self {
        SurfaceEvent::FileUpsert {
            path: path.into(),
            content: content.into(),
        }
    }

    pub fn finished(status: impl Into<String>, iterations: u32) -> Self {
        SurfaceEvent::Finished {
            status: status.into(),
            iterations,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            SurfaceEvent::Line { .. } => EventKind::Line,
            SurfaceEvent::FileUpsert { .. } => EventKind::FileUpsert,
            SurfaceEvent::Finished { .. } => EventKind::Finished,
        }
    }
}

pub type SurfaceSender = mpsc::UnboundedSender<SurfaceEvent>;
pub type SurfaceReceiver = mpsc::UnboundedReceiver<SurfaceEvent>;

/// Sending half held by the agent core
#[derive(Debug, Clone, Default)]
pub struct SurfaceBus {
    sender: Option<SurfaceSender>,
}

impl SurfaceBus {
    pub fn new(sender: SurfaceSender) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    /// Bus plus the receiving end for a surface
    pub fn channel() -> (Self, SurfaceReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// A bus with no surface attached; every event is dropped
    pub fn detached() -> Self {
        Self { sender: None }
    }

    pub fn is_attached(&self) -> bool {
        self.sender.as_ref().is_some_and(|s| !s.is_closed())
    }

    /// Publish an event without waiting on the surface
    pub fn publish(&self, event: SurfaceEvent) {
        let Some(sender) = &self.sender else {
            return;
        };
        trace!("◆ surface <- {:?}", event.kind());
        if sender.send(event).is_err() {
            trace!("◆ surface closed, event dropped");
        }
    }

    pub fn line(&self, text: impl Into<String>) {
        self.publish(SurfaceEvent::line(text));
    }

    pub fn file_upsert(&self, path: impl Into<String>, content: impl Into<String>) {
        self.publish(SurfaceEvent::file_upsert(path, content));
    }

    pub fn finished(&self, status: impl Into<String>, iterations: u32) {
        self.publish(SurfaceEvent::finished(status, iterations));
    }
}

type Handler = Box<dyn Fn(SurfaceEvent) + Send + Sync>;

/// Routes surface events to per-kind handlers
pub struct SurfaceDispatcher {
    receiver: SurfaceReceiver,
    handlers: HashMap<EventKind, Handler>,
}

impl SurfaceDispatcher {
    pub fn new(receiver: SurfaceReceiver) -> Self {
        Self {
            receiver,
            handlers: HashMap::new(),
        }
    }

    /// Register the handler for one event kind, replacing any previous one
    pub fn on<F>(&mut self, kind: EventKind, handler: F)
    where
        F: Fn(SurfaceEvent) + Send + Sync + 'static,
    {
        self.handlers.insert(kind, Box::new(handler));
    }

    /// Dispatch until every bus clone is dropped
    pub async fn run(mut self) {
        debug!("◆ surface dispatcher started");

        while let Some(event) = self.receiver.recv().await {
            match self.handlers.get(&event.kind()) {
                Some(handler) => handler(event),
                None => trace!("◆ no handler for {:?}", event.kind()),
            }
        }

        debug!("◆ surface dispatcher stopped");
    }
}
