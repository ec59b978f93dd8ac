//! Frame assembly: turns the unbounded line stream into one record per meter
//! reporting cycle.
//!
//! A frame starts at the `ADCO` line and ends at the `MOTDETAT` line. Lines seen
//! before the start are skipped, malformed lines are skipped without ending the
//! frame, and a repeated `ADCO` before the end restarts the frame. Each call to
//! [`FrameAssembler::process_cycle`] opens the line source, reads exactly one
//! frame, validates it, hands it to the sink and resets, whatever the outcome.

use crate::data_models::LinkyMetrics;
use crate::db::Sink;
use crate::errors::{PersistError, ReadError, ValidationError};
use crate::parser::{parse_line, ParsedLine};
use crate::serial::{LineSource, OpenSource};
use crate::validation::validate_record;
use log::{debug, error, info, trace, warn};

/// First field of every cycle (meter address).
pub const START_SENTINEL: &str = "ADCO";
/// Last field of every cycle (meter status word).
pub const END_SENTINEL: &str = "MOTDETAT";

pub const DEFAULT_MAX_CONSECUTIVE_INVALID_LINES: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    SeekingStart,
    Accumulating,
}

/// Result of one `process_cycle` call.
#[derive(Debug)]
pub enum CycleOutcome {
    Persisted,
    /// End sentinel reached without these required codes; nothing was stored.
    Dropped(Vec<&'static str>),
    PersistFailed(PersistError),
    ReadFailure(ReadError),
}

impl CycleOutcome {
    pub fn is_read_failure(&self) -> bool {
        matches!(self, CycleOutcome::ReadFailure(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            CycleOutcome::Persisted => "persisted",
            CycleOutcome::Dropped(_) => "dropped",
            CycleOutcome::PersistFailed(_) => "persist_failed",
            CycleOutcome::ReadFailure(_) => "read_failure",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblerConfig {
    /// Consecutive malformed lines tolerated before the device is reported
    /// stalled. 0 disables the guard.
    pub max_consecutive_invalid_lines: usize,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            max_consecutive_invalid_lines: DEFAULT_MAX_CONSECUTIVE_INVALID_LINES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Complete,
}

/// The I/O-free half of the assembler: state, accumulator and malformed-line
/// streak.
#[derive(Debug)]
pub struct FrameBuilder {
    config: AssemblerConfig,
    state: AssemblerState,
    record: LinkyMetrics,
    invalid_streak: usize,
}

impl FrameBuilder {
    pub fn new(config: AssemblerConfig) -> Self {
        Self {
            config,
            state: AssemblerState::SeekingStart,
            record: LinkyMetrics::default(),
            invalid_streak: 0,
        }
    }

    pub fn state(&self) -> AssemblerState {
        self.state
    }

    pub fn record(&self) -> &LinkyMetrics {
        &self.record
    }

    pub fn reset(&mut self) {
        self.state = AssemblerState::SeekingStart;
        self.record.reset();
        self.invalid_streak = 0;
    }

    /// Consumes one parsed line. `Complete` means the end sentinel was just
    /// stored and the record is ready for validation.
    pub fn feed(&mut self, line: ParsedLine) -> Result<Step, ReadError> {
        let is_start = line.code_is(START_SENTINEL);
        let is_end = line.code_is(END_SENTINEL);

        let (code, value) = match line {
            ParsedLine::Valid { code, value } => (code, value),
            ParsedLine::Invalid => {
                self.invalid_streak += 1;
                let limit = self.config.max_consecutive_invalid_lines;
                if limit > 0 && self.invalid_streak >= limit {
                    return Err(ReadError::StalledDevice {
                        count: self.invalid_streak,
                    });
                }
                return Ok(Step::Continue);
            }
        };
        self.invalid_streak = 0;

        match self.state {
            AssemblerState::SeekingStart => {
                if is_start {
                    self.record.reset();
                    self.record.set(&code, value);
                    self.state = AssemblerState::Accumulating;
                    debug!("Start of frame detected");
                } else {
                    trace!("Skipping '{}' while waiting for {}", code, START_SENTINEL);
                }
                Ok(Step::Continue)
            }
            AssemblerState::Accumulating => {
                if is_start {
                    warn!(
                        "{} seen again before {}, restarting frame ({} fields discarded)",
                        START_SENTINEL,
                        END_SENTINEL,
                        self.record.field_count()
                    );
                    self.record.reset();
                    self.record.set(&code, value);
                    return Ok(Step::Continue);
                }

                self.record.set(&code, value);
                if is_end {
                    debug!("End of frame, {} fields", self.record.field_count());
                    Ok(Step::Complete)
                } else {
                    Ok(Step::Continue)
                }
            }
        }
    }
}

/// Reads frames from `S` and hands complete ones to `K`.
pub struct FrameAssembler<S, K> {
    source: S,
    sink: K,
    builder: FrameBuilder,
}

impl<S: LineSource, K: Sink> FrameAssembler<S, K> {
    pub fn new(source: S, sink: K, config: AssemblerConfig) -> Self {
        Self {
            source,
            sink,
            builder: FrameBuilder::new(config),
        }
    }

    pub fn state(&self) -> AssemblerState {
        self.builder.state()
    }

    pub fn current(&self) -> &LinkyMetrics {
        self.builder.record()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// One full `SeekingStart -> Accumulating -> complete` traversal. Blocks on
    /// the line source until a frame ends or the source fails.
    pub fn process_cycle(&mut self) -> CycleOutcome {
        self.builder.reset();
        let outcome = match self.read_frame() {
            Ok(()) => self.flush(),
            Err(err) => {
                error!(
                    "Something went wrong while reading from {}: {}",
                    self.source.describe(),
                    err
                );
                CycleOutcome::ReadFailure(err)
            }
        };
        self.builder.reset();
        outcome
    }

    fn read_frame(&mut self) -> Result<(), ReadError> {
        let mut open = OpenSource::open(&mut self.source)?;
        loop {
            let line = open.read_line()?;
            if self.builder.feed(parse_line(&line))? == Step::Complete {
                return Ok(());
            }
        }
    }

    fn flush(&mut self) -> CycleOutcome {
        let record = self.builder.record();
        match validate_record(record) {
            Err(ValidationError::MissingRequired { codes }) => {
                warn!("Not enough data to write, missing {:?}; frame dropped", codes);
                CycleOutcome::Dropped(codes)
            }
            Ok(()) => match self.sink.persist(record) {
                Ok(()) => {
                    info!(
                        "Frame for meter {} persisted to {}",
                        record.adco.as_deref().unwrap_or("?"),
                        self.sink.sink_type()
                    );
                    CycleOutcome::Persisted
                }
                Err(err) => {
                    error!("Failed to persist frame to {}: {}", self.sink.sink_type(), err);
                    CycleOutcome::PersistFailed(err)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(builder: &mut FrameBuilder, lines: &[&str]) -> Result<Vec<Step>, ReadError> {
        lines.iter().map(|l| builder.feed(parse_line(l))).collect()
    }

    #[test]
    fn seeks_start_before_accumulating() {
        let mut builder = FrameBuilder::new(AssemblerConfig::default());
        feed_all(&mut builder, &["PAPP 100 X", "MOTDETAT 000000 B", "garbage"]).unwrap();
        assert_eq!(builder.state(), AssemblerState::SeekingStart);
        assert!(builder.record().is_empty());

        feed_all(&mut builder, &["adco 031234567890 X"]).unwrap();
        assert_eq!(builder.state(), AssemblerState::Accumulating);
        assert_eq!(builder.record().adco.as_deref(), Some("031234567890"));
    }

    #[test]
    fn end_sentinel_completes_frame() {
        let mut builder = FrameBuilder::new(AssemblerConfig::default());
        let steps = feed_all(&mut builder, &["ADCO 1 X", "PAPP 2 X", "motdetat 000000 B"]).unwrap();
        assert_eq!(steps, vec![Step::Continue, Step::Continue, Step::Complete]);
        assert_eq!(builder.record().motdetat.as_deref(), Some("000000"));
    }

    #[test]
    fn malformed_line_does_not_end_frame() {
        let mut builder = FrameBuilder::new(AssemblerConfig::default());
        feed_all(&mut builder, &["ADCO 1 X", "BROKEN", "IINST 5 X"]).unwrap();
        assert_eq!(builder.state(), AssemblerState::Accumulating);
        assert_eq!(builder.record().iinst.as_deref(), Some("5"));
    }

    #[test]
    fn repeated_start_restarts_frame() {
        let mut builder = FrameBuilder::new(AssemblerConfig::default());
        feed_all(&mut builder, &["ADCO 1 X", "PAPP 2 X", "XYZ 3", "ADCO 4 X"]).unwrap();
        assert_eq!(builder.state(), AssemblerState::Accumulating);
        assert_eq!(builder.record().adco.as_deref(), Some("4"));
        assert_eq!(builder.record().papp, None);
        assert!(builder.record().extra.is_empty());
    }

    #[test]
    fn consecutive_invalid_lines_report_stall() {
        let mut builder = FrameBuilder::new(AssemblerConfig {
            max_consecutive_invalid_lines: 3,
        });
        feed_all(&mut builder, &["x", "y", "ADCO 1 X", "z", "w"]).unwrap();
        let err = feed_all(&mut builder, &["v"]).unwrap_err();
        assert!(matches!(err, ReadError::StalledDevice { count: 3 }));
    }

    #[test]
    fn zero_limit_disables_stall_guard() {
        let mut builder = FrameBuilder::new(AssemblerConfig {
            max_consecutive_invalid_lines: 0,
        });
        let garbage = vec!["?"; 500];
        assert!(feed_all(&mut builder, &garbage).is_ok());
    }

    #[test]
    fn outcome_labels() {
        assert_eq!(CycleOutcome::Persisted.label(), "persisted");
        assert!(CycleOutcome::ReadFailure(ReadError::Disconnected).is_read_failure());
        assert!(!CycleOutcome::Dropped(vec!["IMAX"]).is_read_failure());
    }
}
