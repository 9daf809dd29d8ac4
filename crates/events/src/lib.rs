#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for keg
//!
//! Library crates never print. They emit [`AppEvent`]s on an unbounded
//! channel and the CLI decides how to render them.

pub mod events;
pub use events::{AppEvent, BuildEvent, DownloadEvent, FailureContext, GeneralEvent, StageEvent};

use keg_types::Stage;
use tokio::sync::mpsc::UnboundedSender;

/// Type alias for event sender
pub type EventSender = UnboundedSender<AppEvent>;

/// Type alias for event receiver
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<AppEvent>;

/// Create a new event channel
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// The unified trait for emitting events
///
/// Implemented for a raw `EventSender` and for any struct that may hold one.
pub trait EventEmitter {
    /// Get the event sender for this emitter
    fn event_sender(&self) -> Option<&EventSender>;

    /// Emit an event through this emitter
    fn emit(&self, event: AppEvent) {
        if let Some(sender) = self.event_sender() {
            // Ignore send errors - if receiver is dropped, we just continue
            let _ = sender.send(event);
        }
    }

    /// Emit a debug log event
    fn emit_debug(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::debug(message)));
    }

    /// Emit a warning event
    fn emit_warning(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning(message)));
    }

    /// Emit a warning event with context
    fn emit_warning_with_context(&self, message: impl Into<String>, context: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning_with_context(
            message, context,
        )));
    }

    fn emit_stage_started(&self, stage: Stage, package: impl Into<String>) {
        self.emit(AppEvent::Stage(StageEvent::Started {
            stage,
            package: package.into(),
        }));
    }

    fn emit_stage_completed(&self, stage: Stage, package: impl Into<String>, duration_ms: u64) {
        self.emit(AppEvent::Stage(StageEvent::Completed {
            stage,
            package: package.into(),
            duration_ms,
        }));
    }

    fn emit_stage_failed(&self, stage: Stage, package: impl Into<String>, failure: FailureContext) {
        self.emit(AppEvent::Stage(StageEvent::Failed {
            stage,
            package: package.into(),
            failure,
        }));
    }
}

impl EventEmitter for EventSender {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(self)
    }
}

impl EventEmitter for Option<EventSender> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.as_ref()
    }
}
