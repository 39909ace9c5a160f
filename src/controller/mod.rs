//! Mode state and the detection cycle state machine.
//!
//! The controller is owned by a single thread (the UI thread). Requests run
//! on worker threads and report back over a channel; every result is checked
//! against the session that is active *now* before it reaches the presenter.

mod cycle;
mod session;

use std::{
    path::Path,
    sync::{Arc, Mutex, atomic::AtomicBool},
    thread,
    time::Duration,
};

use crossbeam_channel::{Receiver, Sender, unbounded};

use self::{
    cycle::{CycleContext, spawn_cycle_loop},
    session::{ImageSession, RunningCapture, Session, WebcamSession},
};
use crate::{
    config::Config,
    error::DetectError,
    inference::{Detector, Upload},
    presenter::Presenter,
    source::{CameraProvider, LiveCapture, SelectedImage},
    types::{DetectionResult, Mode},
};

/// Single-shot request state. Terminal outcomes fold back to `Idle`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CycleState {
    #[default]
    Idle,
    AwaitingResult,
}

pub(crate) enum ControllerEvent {
    SingleShot {
        token: u64,
        outcome: Result<DetectionResult, DetectError>,
    },
    CycleResult {
        token: u64,
        result: DetectionResult,
    },
}

pub struct Controller {
    config: Config,
    detector: Arc<dyn Detector>,
    camera: Box<dyn CameraProvider>,
    session: Session,
    single_shot: CycleState,
    presenter: Presenter,
    events_tx: Sender<ControllerEvent>,
    events_rx: Receiver<ControllerEvent>,
    request_gate: Arc<Mutex<()>>,
    next_token: u64,
}

impl Controller {
    pub fn new(
        config: Config,
        detector: Arc<dyn Detector>,
        camera: Box<dyn CameraProvider>,
    ) -> Self {
        let (events_tx, events_rx) = unbounded();
        let presenter = Presenter::new(config.frame_size);
        Self {
            config,
            detector,
            camera,
            session: Session::Image(ImageSession::default()),
            single_shot: CycleState::Idle,
            presenter,
            events_tx,
            events_rx,
            request_gate: Arc::new(Mutex::new(())),
            next_token: 0,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn detector(&self) -> Arc<dyn Detector> {
        self.detector.clone()
    }

    pub fn presenter(&self) -> &Presenter {
        &self.presenter
    }

    pub fn mode(&self) -> Mode {
        match self.session {
            Session::Image(_) => Mode::Image,
            Session::Webcam(_) => Mode::Webcam,
        }
    }

    pub fn cycle_state(&self) -> CycleState {
        self.single_shot
    }

    fn next_token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }

    /// Switch modes. Leaving webcam mode stops the camera before returning.
    /// Setting the current mode is a no-op.
    pub fn set_mode(&mut self, target: Mode) {
        let current = self.mode();
        if current == target {
            return;
        }

        if let Session::Webcam(webcam) = &mut self.session {
            webcam.stop();
        }
        log::info!("mode {} -> {}", current.label(), target.label());

        self.session = match target {
            Mode::Image => Session::Image(ImageSession::default()),
            Mode::Webcam => Session::Webcam(WebcamSession::default()),
        };
        self.presenter.reset(target);
    }

    // ---- image mode ----

    pub fn selected_image_name(&self) -> Option<&str> {
        match &self.session {
            Session::Image(session) => session
                .selection
                .as_ref()
                .map(|(_, selected)| selected.name.as_str()),
            Session::Webcam(_) => None,
        }
    }

    /// Only honored in image mode. A rejected file leaves the previous
    /// selection in place.
    pub fn select_image(&mut self, path: &Path) -> Result<(), DetectError> {
        if self.mode() != Mode::Image {
            log::debug!("ignoring file selection outside image mode");
            return Ok(());
        }
        let selected = SelectedImage::from_path(path);
        self.accept_selection(selected)
    }

    pub fn select_image_bytes(
        &mut self,
        name: &str,
        declared_mime: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<(), DetectError> {
        if self.mode() != Mode::Image {
            log::debug!("ignoring file selection outside image mode");
            return Ok(());
        }
        let selected = SelectedImage::from_bytes(name, declared_mime, bytes);
        self.accept_selection(selected)
    }

    fn accept_selection(
        &mut self,
        selected: Result<SelectedImage, DetectError>,
    ) -> Result<(), DetectError> {
        let mut selected = match selected {
            Ok(selected) => selected,
            Err(err) => {
                log::warn!("rejected selection: {err}");
                self.presenter.present_error(Mode::Image, &err);
                return Err(err);
            }
        };

        let token = self.next_token();
        let preview = selected.preview.take();
        let message = format!("File selected: {}", selected.name);
        log::info!(
            "selected {} ({}, {} bytes)",
            selected.name,
            selected.mime,
            selected.bytes.len()
        );

        if let Session::Image(session) = &mut self.session {
            session.selection = Some((token, selected));
        }
        self.presenter.show_preview(preview);
        self.presenter.show_message(Mode::Image, message);
        Ok(())
    }

    pub fn clear_image(&mut self) {
        if let Session::Image(session) = &mut self.session {
            session.selection = None;
            self.presenter.reset(Mode::Image);
        }
    }

    /// Whether the detect control should be enabled.
    pub fn can_trigger(&self) -> bool {
        self.single_shot == CycleState::Idle && self.selected_image_name().is_some()
    }

    /// Send the current selection. Returns `false` when nothing was sent
    /// (no selection, wrong mode, or a request already in flight).
    pub fn trigger_detection(&mut self) -> bool {
        if self.single_shot == CycleState::AwaitingResult {
            return false;
        }
        let Session::Image(session) = &self.session else {
            return false;
        };
        let Some((token, selected)) = &session.selection else {
            return false;
        };

        let token = *token;
        let upload = Upload {
            file_name: selected.name.clone(),
            mime: selected.mime.clone(),
            bytes: selected.bytes.clone(),
        };
        self.single_shot = CycleState::AwaitingResult;

        let detector = self.detector.clone();
        let events = self.events_tx.clone();
        thread::spawn(move || {
            let outcome = detector.detect(&upload);
            let _ = events.send(ControllerEvent::SingleShot { token, outcome });
        });
        true
    }

    // ---- webcam mode ----

    pub fn is_webcam_running(&self) -> bool {
        matches!(&self.session, Session::Webcam(session) if session.running.is_some())
    }

    /// Open the camera and start the continuous loop. A second call while
    /// running is a no-op. After a quick stop/start the new loop does not
    /// capture until the previous session's request has resolved.
    pub fn start_webcam(&mut self) -> Result<(), DetectError> {
        if self.mode() != Mode::Webcam || self.is_webcam_running() {
            return Ok(());
        }

        let capture: Arc<dyn LiveCapture> = match self.camera.open() {
            Ok(capture) => Arc::from(capture),
            Err(err) => {
                log::error!("webcam unavailable: {err}");
                self.presenter.present_error(Mode::Webcam, &err);
                return Err(err);
            }
        };

        let token = self.next_token();
        let active = Arc::new(AtomicBool::new(true));
        let worker = spawn_cycle_loop(CycleContext {
            detector: self.detector.clone(),
            capture: capture.clone(),
            active: active.clone(),
            request_gate: self.request_gate.clone(),
            token,
            events: self.events_tx.clone(),
            delay: self.config.cycle_delay,
            frame_size: self.config.frame_size,
            jpeg_quality: self.config.jpeg_quality,
        });

        if let Session::Webcam(session) = &mut self.session {
            session.running = Some(RunningCapture {
                token,
                capture,
                active,
                worker: Some(worker),
            });
        }
        self.presenter.show_message(Mode::Webcam, "Webcam started");
        Ok(())
    }

    pub fn stop_webcam(&mut self) {
        if let Session::Webcam(session) = &mut self.session {
            if session.stop() {
                self.presenter.show_placeholder(Mode::Webcam);
            }
        }
    }

    // ---- results ----

    /// Apply every result that has arrived. Returns how many were handled.
    pub fn poll(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Wait up to `timeout` for the next result, then drain the rest.
    pub fn poll_timeout(&mut self, timeout: Duration) -> usize {
        match self.events_rx.recv_timeout(timeout) {
            Ok(event) => {
                self.handle_event(event);
                1 + self.poll()
            }
            Err(_) => 0,
        }
    }

    fn handle_event(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::SingleShot { token, outcome } => {
                self.single_shot = CycleState::Idle;
                let current = match &self.session {
                    Session::Image(session) => session.token(),
                    Session::Webcam(_) => None,
                };
                if current != Some(token) {
                    log::debug!("dropping result for replaced selection {token}");
                    return;
                }
                match outcome {
                    Ok(result) => self.presenter.present(Mode::Image, &result),
                    Err(err) => {
                        log::warn!("detection request failed: {err}");
                        self.presenter.present_error(Mode::Image, &err);
                    }
                }
            }
            ControllerEvent::CycleResult { token, result } => {
                let current = match &self.session {
                    Session::Webcam(session) => session.token(),
                    Session::Image(_) => None,
                };
                if current != Some(token) {
                    log::debug!("dropping late result from webcam session {token}");
                    return;
                }
                self.presenter.present(Mode::Webcam, &result);
            }
        }
    }
}
