//! Per-iteration body of the relay loop
//!
//! Decodes one frame per source, routes it, calibrates pedal axes and writes
//! the result to the virtual device. All faults in here are absorbed.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, trace, warn};

use super::router::{AxisRouter, SourceRole};
use crate::calibration::Calibrator;
use crate::device::{OutputEvent, VirtualOutput};
use crate::joystick::codec::{decode, EventKind, RawAxisEvent, JS_EVENT_SIZE};
use crate::joystick::source::FrameSource;

/// Running counters of one relay
#[derive(Debug, Default)]
pub struct RelayStats {
    frames: AtomicU64,
    emitted: AtomicU64,
    dropped: AtomicU64,
    write_failures: AtomicU64,
}

/// Point-in-time copy of [`RelayStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Complete frames decoded from all sources
    pub frames: u64,
    /// Events written to the virtual device
    pub emitted: u64,
    /// Frames with no route on the output device
    pub dropped: u64,
    /// Writes rejected by the virtual device
    pub write_failures: u64,
}

impl RelayStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames: self.frames.load(Ordering::Relaxed),
            emitted: self.emitted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn reset(&self) {
        self.frames.store(0, Ordering::Relaxed);
        self.emitted.store(0, Ordering::Relaxed);
        self.dropped.store(0, Ordering::Relaxed);
        self.write_failures.store(0, Ordering::Relaxed);
    }
}

/// Converts a decoded frame into an output update
///
/// Pedal axes go through the calibrator; steering and wheelbase buttons pass
/// through untouched. Pedal-set buttons are not forwarded, so they cannot
/// release a wheel button sharing the same code. Returns `None` for unrouted
/// axes, pedal and undeclared buttons and unknown event types.
#[must_use]
pub fn translate(
    event: &RawAxisEvent,
    router: &AxisRouter,
    calibrator: &Calibrator,
    buttons: u16,
) -> Option<OutputEvent> {
    match event.kind {
        EventKind::Axis => {
            let axis = router.route(event.index)?;
            let value = match axis.pedal() {
                Some(pedal) => calibrator.transform(event.value, pedal),
                None => event.value,
            };
            Some(OutputEvent::Axis(axis, i32::from(value)))
        }
        EventKind::Button
            if router.role() == SourceRole::Wheelbase && u16::from(event.index) < buttons =>
        {
            Some(OutputEvent::Button(event.index, event.value != 0))
        }
        EventKind::Button | EventKind::Other(_) => None,
    }
}

/// One source device with its routing table
pub(crate) struct SourceSlot {
    source: Box<dyn FrameSource>,
    router: AxisRouter,
    connected: bool,
}

impl SourceSlot {
    pub(crate) fn new(source: Box<dyn FrameSource>, role: SourceRole) -> Self {
        Self {
            source,
            router: AxisRouter::new(role),
            connected: true,
        }
    }
}

/// Resources owned by the running relay task
pub(crate) struct Worker {
    sources: Vec<SourceSlot>,
    output: Box<dyn VirtualOutput>,
    calibrator: Arc<Calibrator>,
    stats: Arc<RelayStats>,
    buttons: u16,
    write_warned: bool,
}

impl Worker {
    pub(crate) fn new(
        sources: Vec<SourceSlot>,
        output: Box<dyn VirtualOutput>,
        calibrator: Arc<Calibrator>,
        stats: Arc<RelayStats>,
        buttons: u16,
    ) -> Self {
        Self {
            sources,
            output,
            calibrator,
            stats,
            buttons,
            write_warned: false,
        }
    }

    /// Reads at most one frame from each source, in fixed order.
    pub(crate) fn poll_once(&mut self) {
        let mut buf = [0u8; JS_EVENT_SIZE];

        for slot in self.sources.iter_mut().filter(|slot| slot.connected) {
            let n = match slot.source.poll_frame(&mut buf) {
                Ok(n) => n,
                Err(e) => {
                    Self::disconnect(slot, &e);
                    continue;
                }
            };

            // Short or empty read: nothing complete yet
            let Ok(event) = decode(&buf[..n]) else {
                continue;
            };
            self.stats.frames.fetch_add(1, Ordering::Relaxed);
            trace!("{} {:?}", slot.router.role(), event);

            let Some(output) = translate(&event, &slot.router, &self.calibrator, self.buttons)
            else {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                continue;
            };

            match self.output.emit(output) {
                Ok(()) => {
                    self.stats.emitted.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    self.stats.write_failures.fetch_add(1, Ordering::Relaxed);
                    if self.write_warned {
                        debug!("Dropped {:?}: {}", output, e);
                    } else {
                        warn!("Virtual device write failed, dropping event: {}", e);
                        self.write_warned = true;
                    }
                }
            }
        }
    }

    fn disconnect(slot: &mut SourceSlot, error: &io::Error) {
        warn!(
            "Source {} ({}) failed, no longer polled: {}",
            slot.source.describe(),
            slot.router.role(),
            error
        );
        slot.connected = false;
    }

    /// Number of sources still being polled
    pub(crate) fn connected_sources(&self) -> usize {
        self.sources.iter().filter(|slot| slot.connected).count()
    }

    /// Releases the virtual device and the source handles.
    pub(crate) fn close(&mut self) {
        self.output.close();
        self.sources.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::Pedal;
    use crate::device::backend::mocks::{RecordingOutput, ScriptedSource};
    use crate::device::OutputAxis;

    fn worker_with(
        sources: Vec<(ScriptedSource, SourceRole)>,
        output: &RecordingOutput,
        calibrator: Arc<Calibrator>,
    ) -> (Worker, Arc<RelayStats>) {
        let stats = Arc::new(RelayStats::default());
        let slots = sources
            .into_iter()
            .map(|(source, role)| SourceSlot::new(Box::new(source), role))
            .collect();
        let worker = Worker::new(
            slots,
            Box::new(output.clone()),
            calibrator,
            Arc::clone(&stats),
            16,
        );
        (worker, stats)
    }

    // ==================== translate Tests ====================

    #[test]
    fn test_translate_pedal_axis_uses_calibration() {
        let calibrator = Calibrator::new();
        calibrator.set_enabled(true);
        calibrator.set_invert(Pedal::Gas, true);
        let router = AxisRouter::new(SourceRole::Pedals);

        let out = translate(&RawAxisEvent::axis(0, 32767), &router, &calibrator, 16);
        assert_eq!(out, Some(OutputEvent::Axis(OutputAxis::Gas, -32767)));
    }

    #[test]
    fn test_translate_steering_bypasses_calibration() {
        let calibrator = Calibrator::new();
        calibrator.set_enabled(true);
        for pedal in Pedal::ALL {
            calibrator.set_invert(pedal, true);
        }
        let router = AxisRouter::new(SourceRole::Wheelbase);

        let out = translate(&RawAxisEvent::axis(0, 12000), &router, &calibrator, 16);
        assert_eq!(out, Some(OutputEvent::Axis(OutputAxis::Steering, 12000)));
    }

    #[test]
    fn test_translate_buttons() {
        let calibrator = Calibrator::new();
        let router = AxisRouter::new(SourceRole::Wheelbase);

        assert_eq!(
            translate(&RawAxisEvent::button(3, true), &router, &calibrator, 16),
            Some(OutputEvent::Button(3, true))
        );
        assert_eq!(
            translate(&RawAxisEvent::button(15, false), &router, &calibrator, 16),
            Some(OutputEvent::Button(15, false))
        );
        assert_eq!(translate(&RawAxisEvent::button(16, true), &router, &calibrator, 16), None);
    }

    #[test]
    fn test_translate_ignores_pedal_buttons() {
        let calibrator = Calibrator::new();
        let router = AxisRouter::new(SourceRole::Pedals);

        assert_eq!(translate(&RawAxisEvent::button(0, true), &router, &calibrator, 16), None);
        assert_eq!(translate(&RawAxisEvent::button(3, false), &router, &calibrator, 4), None);
    }

    #[test]
    fn test_translate_drops_unrouted() {
        let calibrator = Calibrator::new();
        let router = AxisRouter::new(SourceRole::Pedals);
        assert_eq!(translate(&RawAxisEvent::axis(5, 100), &router, &calibrator, 16), None);

        let other = RawAxisEvent {
            kind: EventKind::Other(0x04),
            ..RawAxisEvent::axis(0, 0)
        };
        assert_eq!(translate(&other, &router, &calibrator, 16), None);
    }

    #[test]
    fn test_translate_init_events_are_forwarded() {
        let calibrator = Calibrator::new();
        let router = AxisRouter::new(SourceRole::Pedals);
        let event = RawAxisEvent {
            init: true,
            ..RawAxisEvent::axis(2, -32767)
        };
        assert_eq!(
            translate(&event, &router, &calibrator, 16),
            Some(OutputEvent::Axis(OutputAxis::Clutch, -32767))
        );
    }

    // ==================== Worker Tests ====================

    #[test]
    fn test_poll_once_reads_one_frame_per_source_in_order() {
        let wheel = ScriptedSource::new();
        let pedals = ScriptedSource::new();
        wheel.push_event(RawAxisEvent::axis(0, 500));
        wheel.push_event(RawAxisEvent::axis(0, 600));
        pedals.push_event(RawAxisEvent::axis(1, -100));

        let output = RecordingOutput::new();
        let (mut worker, stats) = worker_with(
            vec![(wheel.clone(), SourceRole::Wheelbase), (pedals, SourceRole::Pedals)],
            &output,
            Arc::new(Calibrator::new()),
        );

        worker.poll_once();
        assert_eq!(
            output.events(),
            vec![
                OutputEvent::Axis(OutputAxis::Steering, 500),
                OutputEvent::Axis(OutputAxis::Brake, -100),
            ]
        );
        assert_eq!(wheel.pending(), 1);

        worker.poll_once();
        assert_eq!(output.events().len(), 3);
        assert_eq!(stats.snapshot().emitted, 3);
    }

    #[test]
    fn test_pedal_button_does_not_release_wheel_button() {
        let wheel = ScriptedSource::new();
        let pedals = ScriptedSource::new();
        wheel.push_event(RawAxisEvent::button(0, true));
        pedals.push_event(RawAxisEvent::button(0, false));

        let output = RecordingOutput::new();
        let (mut worker, stats) = worker_with(
            vec![(wheel, SourceRole::Wheelbase), (pedals, SourceRole::Pedals)],
            &output,
            Arc::new(Calibrator::new()),
        );
        worker.poll_once();

        assert_eq!(output.events(), vec![OutputEvent::Button(0, true)]);
        assert_eq!(stats.snapshot().dropped, 1);
    }

    #[test]
    fn test_short_reads_are_skipped() {
        let pedals = ScriptedSource::new();
        pedals.push_bytes(&[1, 2, 3]);
        pedals.push_event(RawAxisEvent::axis(0, 42));

        let output = RecordingOutput::new();
        let (mut worker, stats) =
            worker_with(vec![(pedals, SourceRole::Pedals)], &output, Arc::new(Calibrator::new()));

        worker.poll_once();
        assert!(output.events().is_empty());
        assert_eq!(stats.snapshot().frames, 0);

        worker.poll_once();
        assert_eq!(output.events(), vec![OutputEvent::Axis(OutputAxis::Gas, 42)]);
    }

    #[test]
    fn test_write_failures_do_not_stop_polling() {
        let pedals = ScriptedSource::new();
        for value in [1, 2, 3] {
            pedals.push_event(RawAxisEvent::axis(0, value));
        }

        let output = RecordingOutput::new();
        output.set_fail_writes(true);
        let (mut worker, stats) =
            worker_with(vec![(pedals, SourceRole::Pedals)], &output, Arc::new(Calibrator::new()));

        worker.poll_once();
        worker.poll_once();
        output.set_fail_writes(false);
        worker.poll_once();

        assert_eq!(output.events(), vec![OutputEvent::Axis(OutputAxis::Gas, 3)]);
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.write_failures, 2);
        assert_eq!(snapshot.emitted, 1);
    }

    #[test]
    fn test_unrouted_frames_are_counted() {
        let pedals = ScriptedSource::new();
        pedals.push_event(RawAxisEvent::axis(7, 0));

        let output = RecordingOutput::new();
        let (mut worker, stats) =
            worker_with(vec![(pedals, SourceRole::Pedals)], &output, Arc::new(Calibrator::new()));
        worker.poll_once();

        assert!(output.events().is_empty());
        assert_eq!(stats.snapshot().dropped, 1);
    }

    #[test]
    fn test_failed_source_is_disconnected() {
        let wheel = ScriptedSource::new();
        let pedals = ScriptedSource::new();
        wheel.push_error(io::ErrorKind::Other);
        pedals.push_event(RawAxisEvent::axis(0, 10));
        pedals.push_event(RawAxisEvent::axis(0, 20));

        let output = RecordingOutput::new();
        let (mut worker, _) = worker_with(
            vec![(wheel.clone(), SourceRole::Wheelbase), (pedals, SourceRole::Pedals)],
            &output,
            Arc::new(Calibrator::new()),
        );

        worker.poll_once();
        assert_eq!(worker.connected_sources(), 1);

        worker.poll_once();
        assert_eq!(wheel.poll_count(), 1);
        assert_eq!(output.events().len(), 2);
    }

    #[test]
    fn test_close_releases_device_once() {
        let output = RecordingOutput::new();
        let (mut worker, _) = worker_with(vec![], &output, Arc::new(Calibrator::new()));

        worker.close();
        worker.close();
        assert_eq!(output.close_count(), 1);
        assert_eq!(worker.connected_sources(), 0);
    }
}
