//! Progress reporting shared by persistence and the flag pipeline.
//!
//! Producers push [`ProgressEvent`] values into an unbounded channel so the
//! presentation layer can render at its own pace. Each producer tags its
//! events with a [`ProgressSource`]; percentages from different sources are
//! independent sequences and must not be merged into a single figure.

use std::fmt;
use std::sync::Arc;

use log::debug;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::Country;

/// Operation that emitted a progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgressSource {
    /// Writing countries to the local store.
    Persist,
    /// Downloading vector flag assets.
    FetchFlags,
    /// Rasterising downloaded flags.
    ConvertFlags,
}

impl fmt::Display for ProgressSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Persist => "persist",
            Self::FetchFlags => "fetch",
            Self::ConvertFlags => "convert",
        })
    }
}

/// A single step of a long-running operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    /// Producer of the event.
    pub source: ProgressSource,
    /// `100 * processed.len() / total`, rounded down.
    pub percent_complete: u8,
    /// Human-readable description of the step just finished.
    pub status_message: String,
    /// Every record the producer has finished so far, in processing order.
    ///
    /// Records are shared between events; each is cloned once when recorded.
    pub processed: Vec<Arc<Country>>,
}

/// Compute the completion percentage using integer division.
///
/// An empty batch reports zero; the result never exceeds 100.
///
/// # Examples
///
/// ```
/// use paises_core::percent_complete;
///
/// assert_eq!(percent_complete(1, 3), 33);
/// assert_eq!(percent_complete(2, 3), 66);
/// assert_eq!(percent_complete(3, 3), 100);
/// assert_eq!(percent_complete(0, 0), 0);
/// ```
#[must_use]
pub fn percent_complete(processed: usize, total: usize) -> u8 {
    let percent = processed
        .saturating_mul(100)
        .checked_div(total)
        .unwrap_or(0)
        .min(100);
    u8::try_from(percent).unwrap_or(100)
}

/// Cloneable handle producers use to publish events.
///
/// A discarding sink drops every event, which keeps call sites free of
/// `Option` juggling when nobody is listening.
#[derive(Debug, Clone, Default)]
pub struct ProgressSink {
    sender: Option<UnboundedSender<ProgressEvent>>,
}

impl ProgressSink {
    /// Create a sink together with the receiver the consumer drains.
    #[must_use]
    pub fn channel() -> (Self, UnboundedReceiver<ProgressEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }

    /// A sink that drops every event.
    #[must_use]
    pub fn discard() -> Self {
        Self::default()
    }

    fn publish(&self, event: ProgressEvent) {
        let Some(sender) = &self.sender else {
            return;
        };
        if sender.send(event).is_err() {
            debug!("progress receiver dropped; event discarded");
        }
    }
}

/// Tracks one producer's progress over a batch of known size.
#[derive(Debug)]
pub struct ProgressReporter {
    source: ProgressSource,
    total: usize,
    processed: Vec<Arc<Country>>,
    sink: ProgressSink,
}

impl ProgressReporter {
    /// Start tracking a batch of `total` records.
    #[must_use]
    pub fn new(source: ProgressSource, total: usize, sink: ProgressSink) -> Self {
        Self {
            source,
            total,
            processed: Vec::with_capacity(total),
            sink,
        }
    }

    /// Record a finished record and publish the resulting event.
    ///
    /// Returns the percentage carried by the published event.
    pub fn record(&mut self, country: &Country, status_message: impl Into<String>) -> u8 {
        self.processed.push(Arc::new(country.clone()));
        let percent = percent_complete(self.processed.len(), self.total);
        self.sink.publish(ProgressEvent {
            source: self.source,
            percent_complete: percent,
            status_message: status_message.into(),
            processed: self.processed.clone(),
        });
        percent
    }

    /// Number of records recorded so far.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.processed.len()
    }
}
