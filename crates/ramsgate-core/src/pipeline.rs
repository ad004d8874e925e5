//! End-to-end wiring: source events in, state and reports out.

use std::path::Path;
use std::sync::Arc;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::dispatch::{Dispatcher, Event, SubscriberError, SubscriberId};
use crate::message::Message;
use crate::protocol::codec::{CodecTable, RegistryConflict, default_table};
use crate::protocol::frame::{ParseError, parse_frame};
use crate::source::{FrameEvent, FrameSource, LogFileSource, SourceError};
use crate::tracker::{Applied, StateTracker};
use crate::{DEFAULT_GENERATED_AT, InputInfo, Report, ToolInfo, TrafficSummary};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Registry(#[from] RegistryConflict),
}

/// Running tallies over everything a pipeline has consumed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TrafficStats {
    pub frames_total: u64,
    pub malformed_frames: u64,
    pub checksum_failures: u64,
    pub length_mismatches: u64,
    pub unknown_verbs: u64,
    pub undecoded_payloads: u64,
    pub stale_writes: u64,
    pub state_changes: u64,
    pub idle_timeouts: u64,
}

/// Ties a codec table, tracker and dispatcher into one consumer of
/// [`FrameEvent`]s.
///
/// Rejected lines only bump counters; nothing a source can produce
/// aborts the run.
pub struct Pipeline {
    table: Arc<CodecTable>,
    tracker: StateTracker,
    dispatcher: Dispatcher,
    stats: TrafficStats,
    first_ts: Option<OffsetDateTime>,
    last_ts: Option<OffsetDateTime>,
}

impl Pipeline {
    pub fn new(table: Arc<CodecTable>) -> Self {
        Self {
            table,
            tracker: StateTracker::new(),
            dispatcher: Dispatcher::new(),
            stats: TrafficStats::default(),
            first_ts: None,
            last_ts: None,
        }
    }

    pub fn stats(&self) -> &TrafficStats {
        &self.stats
    }

    pub fn tracker(&self) -> &StateTracker {
        &self.tracker
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriberId
    where
        F: FnMut(&Event) -> Result<(), SubscriberError> + Send + 'static,
    {
        self.dispatcher.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        self.dispatcher.unsubscribe(id)
    }

    /// Drive a source to exhaustion.
    pub fn run<S: FrameSource + ?Sized>(&mut self, source: &mut S) -> Result<(), PipelineError> {
        while let Some(event) = source.next_event()? {
            self.handle_event(event);
        }
        Ok(())
    }

    pub fn handle_event(&mut self, event: FrameEvent) {
        match event {
            FrameEvent::Candidate { ts, text } => self.handle_candidate(ts, &text),
            FrameEvent::Malformed { text, reason } => {
                self.stats.frames_total += 1;
                self.stats.malformed_frames += 1;
                tracing::debug!(%reason, line = %text, "unusable input line");
            }
            FrameEvent::IdleTimeout => self.stats.idle_timeouts += 1,
        }
    }

    pub fn handle_candidate(&mut self, ts: OffsetDateTime, text: &str) {
        self.stats.frames_total += 1;
        let frame = match parse_frame(text) {
            Ok(frame) => frame,
            Err(err) => {
                self.note_rejection(&err);
                tracing::debug!(%err, line = %text, "frame rejected");
                return;
            }
        };
        let msg = match Message::from_frame(frame, ts, &self.table) {
            Ok(msg) => msg,
            Err(err) => {
                self.note_rejection(&err);
                tracing::debug!(%err, line = %text, "frame rejected");
                return;
            }
        };
        if !msg.payload.is_decoded() {
            self.stats.undecoded_payloads += 1;
        }
        self.first_ts = Some(self.first_ts.map_or(ts, |t| t.min(ts)));
        self.last_ts = Some(self.last_ts.map_or(ts, |t| t.max(ts)));

        let applied = self.tracker.apply(&msg);
        self.dispatcher.dispatch(&Event::Message(msg));
        match applied {
            Applied::Changed(change) => {
                self.stats.state_changes += 1;
                self.dispatcher.dispatch(&Event::StateChange(change));
            }
            Applied::Stale => self.stats.stale_writes += 1,
            Applied::Unchanged => {}
        }
    }

    fn note_rejection(&mut self, err: &ParseError) {
        match err {
            ParseError::Malformed { .. } | ParseError::BadAddress { .. } => {
                self.stats.malformed_frames += 1;
            }
            ParseError::UnknownVerb { .. } => self.stats.unknown_verbs += 1,
            ParseError::LengthMismatch { .. } => self.stats.length_mismatches += 1,
            ParseError::ChecksumFailed { .. } => self.stats.checksum_failures += 1,
        }
    }

    /// Snapshot everything consumed so far as a serializable report.
    pub fn report(&self, input: InputInfo) -> Report {
        let stats = &self.stats;
        Report {
            report_version: crate::REPORT_VERSION,
            tool: ToolInfo {
                name: "ramsgate".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            generated_at: ts_to_rfc3339(Some(OffsetDateTime::now_utc()))
                .unwrap_or_else(|| DEFAULT_GENERATED_AT.to_string()),
            input,
            traffic: TrafficSummary {
                frames_total: stats.frames_total,
                malformed_frames: stats.malformed_frames,
                checksum_failures: stats.checksum_failures,
                length_mismatches: stats.length_mismatches,
                unknown_verbs: stats.unknown_verbs,
                undecoded_payloads: stats.undecoded_payloads,
                stale_writes: stats.stale_writes,
                state_changes: stats.state_changes,
                idle_timeouts: stats.idle_timeouts,
                first_seen: ts_to_rfc3339(self.first_ts),
                last_seen: ts_to_rfc3339(self.last_ts),
            },
            devices: self.tracker.registry().summaries(),
        }
    }
}

pub(crate) fn ts_to_rfc3339(ts: Option<OffsetDateTime>) -> Option<String> {
    ts.and_then(|t| t.format(&Rfc3339).ok())
}

/// Replay a packet log and summarize what it contained.
pub fn analyze_log_file(path: &Path) -> Result<Report, PipelineError> {
    let table = Arc::new(default_table()?);
    let mut pipeline = Pipeline::new(table);
    let mut source = LogFileSource::open(path)?;
    pipeline.run(&mut source)?;
    Ok(pipeline.report(InputInfo {
        path: path.display().to_string(),
    }))
}
