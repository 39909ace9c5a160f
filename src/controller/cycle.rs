use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use anyhow::Result;
use crossbeam_channel::Sender;

use super::ControllerEvent;
use crate::{
    error::DetectError,
    inference::{Detector, Upload},
    source::{LiveCapture, normalize},
    types::DetectionResult,
};

pub(crate) struct CycleContext {
    pub detector: Arc<dyn Detector>,
    pub capture: Arc<dyn LiveCapture>,
    pub active: Arc<AtomicBool>,
    /// Shared by every webcam session of one controller. Held for a whole
    /// cycle, so a restarted loop waits for the previous session's request.
    pub request_gate: Arc<Mutex<()>>,
    pub token: u64,
    pub events: Sender<ControllerEvent>,
    pub delay: Duration,
    pub frame_size: u32,
    pub jpeg_quality: u8,
}

impl CycleContext {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

pub(crate) fn spawn_cycle_loop(ctx: CycleContext) -> thread::JoinHandle<()> {
    thread::spawn(move || run_cycle_loop(ctx))
}

/// Strictly serial: the next capture is not taken until the previous
/// request has resolved, and the delay is counted from completion.
fn run_cycle_loop(ctx: CycleContext) {
    log::info!("webcam detection loop {} started", ctx.token);
    let mut cycles: u64 = 0;

    while ctx.is_active() {
        let started = Instant::now();
        match run_cycle(&ctx) {
            Ok(true) => {}
            Ok(false) => break,
            Err(err) => log::warn!("webcam detection cycle failed: {err:#}"),
        }
        cycles += 1;
        log::trace!("cycle {cycles} took {:?}", started.elapsed());

        if !ctx.is_active() {
            break;
        }
        thread::sleep(ctx.delay);
    }

    log::info!(
        "webcam detection loop {} stopped after {cycles} cycles",
        ctx.token
    );
}

/// Returns `Ok(false)` when the owner is gone and the loop should end.
fn run_cycle(ctx: &CycleContext) -> Result<bool> {
    let _gate = match ctx.request_gate.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    if !ctx.is_active() {
        return Ok(true);
    }

    let frame = ctx.capture.snapshot()?;
    if !ctx.is_active() {
        return Ok(true);
    }
    log::trace!("frame captured {:?} ago", frame.age());

    let frame = normalize::square_frame(&frame, ctx.frame_size)?;
    let upload = Upload::jpeg_frame(&frame, ctx.jpeg_quality)?;
    let result = ctx.detector.detect(&upload)?;

    // Stopped while the request was in flight: drop the reply unrendered.
    if !ctx.is_active() {
        log::debug!("discarding result for stopped webcam session {}", ctx.token);
        return Ok(true);
    }

    match result {
        DetectionResult::Failure { error } => {
            Err(DetectError::ServiceReportedFailure(error).into())
        }
        success => {
            let event = ControllerEvent::CycleResult {
                token: ctx.token,
                result: success,
            };
            Ok(ctx.events.send(event).is_ok())
        }
    }
}
