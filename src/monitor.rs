use crate::assembler::{CycleOutcome, FrameAssembler};
use crate::db::Sink;
use crate::errors::MonitorError;
use crate::metrics::Metrics;
use crate::pacing::Pacer;
use crate::serial::LineSource;
use log::{debug, info};
use std::time::{Duration, Instant};

/// Cycles between two metrics summaries in the log.
const SUMMARY_EVERY: u64 = 60;

#[derive(Debug, Clone)]
pub struct LoopOptions {
    pub interval: Duration,
    /// Consecutive read failures that end the loop; 0 never gives up.
    pub max_consecutive_read_failures: u32,
    /// Stop after this many cycles (`--once` uses 1).
    pub max_cycles: Option<u64>,
}

/// Polls frames until `max_cycles` is reached or the line source keeps
/// failing. Dropped frames and sink failures never end the loop.
pub fn run<S: LineSource, K: Sink>(
    assembler: &mut FrameAssembler<S, K>,
    options: &LoopOptions,
) -> Result<Metrics, MonitorError> {
    let mut metrics = Metrics::new();
    let mut pacer = Pacer::new(options.interval, Instant::now());
    info!(
        "Polling {} every {:?}, persisting to {}",
        assembler.source().describe(),
        options.interval,
        assembler.sink().sink_type()
    );

    loop {
        let started = Instant::now();
        let outcome = assembler.process_cycle();
        metrics.record_cycle(&outcome, started.elapsed());
        debug!("Cycle {} {} in {:.2?}", metrics.cycles, outcome.label(), started.elapsed());

        if let CycleOutcome::ReadFailure(err) = outcome {
            let limit = options.max_consecutive_read_failures;
            if limit > 0 && metrics.consecutive_read_failures >= limit {
                metrics.log_summary();
                return Err(MonitorError::ReadFailures {
                    attempts: metrics.consecutive_read_failures,
                    last: err,
                });
            }
        }

        if metrics.cycles % SUMMARY_EVERY == 0 {
            metrics.log_summary();
        }
        if options.max_cycles.map_or(false, |max| metrics.cycles >= max) {
            break;
        }
        pacer.wait();
    }

    metrics.log_summary();
    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::AssemblerConfig;
    use crate::db::LogSink;
    use crate::errors::ReadError;
    use crate::serial::fake::FakeLineSource;

    const FRAME: [&str; 7] = [
        "ADCO 031234567890 X",
        "OPTARIF BASE 0",
        "ISOUSC 30 9",
        "IINST 005 Y",
        "IMAX 040 H",
        "PAPP 02000 #",
        "MOTDETAT 000000 B",
    ];

    fn options(max_cycles: Option<u64>, max_failures: u32) -> LoopOptions {
        LoopOptions {
            interval: Duration::ZERO,
            max_consecutive_read_failures: max_failures,
            max_cycles,
        }
    }

    #[test]
    fn stops_after_max_cycles() {
        let mut source = FakeLineSource::from_lines(&FRAME);
        source.push_lines(&FRAME);
        let mut assembler = FrameAssembler::new(source, LogSink::new(), AssemblerConfig::default());

        let metrics = run(&mut assembler, &options(Some(2), 3)).unwrap();
        assert_eq!(metrics.persisted, 2);
        assert_eq!(assembler.sink().written(), 2);
        assert_eq!(assembler.source().closes(), 2);
    }

    #[test]
    fn gives_up_after_consecutive_read_failures() {
        let mut source = FakeLineSource::from_lines(&FRAME);
        source.push_error(ReadError::Disconnected);
        source.push_error(ReadError::Disconnected);
        let mut assembler = FrameAssembler::new(source, LogSink::new(), AssemblerConfig::default());

        let err = run(&mut assembler, &options(None, 2)).unwrap_err();
        assert!(matches!(err, MonitorError::ReadFailures { attempts: 2, .. }));
        assert_eq!(err.exit_code(), 6);
        assert_eq!(assembler.sink().written(), 1);
    }

    #[test]
    fn single_failing_cycle_with_limit_one_is_an_error() {
        let source = FakeLineSource::from_lines(&FRAME[..3]);
        let mut assembler = FrameAssembler::new(source, LogSink::new(), AssemblerConfig::default());
        assert!(run(&mut assembler, &options(Some(1), 1)).is_err());
    }
}
