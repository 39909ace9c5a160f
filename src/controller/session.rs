use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
};

use crate::source::{LiveCapture, SelectedImage};

#[derive(Debug, Default)]
pub(crate) struct ImageSession {
    /// Selection plus the token its requests are tagged with.
    pub selection: Option<(u64, SelectedImage)>,
}

impl ImageSession {
    pub fn token(&self) -> Option<u64> {
        self.selection.as_ref().map(|(token, _)| *token)
    }
}

pub(crate) struct RunningCapture {
    pub token: u64,
    pub capture: Arc<dyn LiveCapture>,
    pub active: Arc<AtomicBool>,
    pub worker: Option<thread::JoinHandle<()>>,
}

#[derive(Default)]
pub(crate) struct WebcamSession {
    pub running: Option<RunningCapture>,
}

impl WebcamSession {
    pub fn token(&self) -> Option<u64> {
        self.running.as_ref().map(|r| r.token)
    }

    /// Clears the active flag and releases the device before returning.
    /// The worker is not joined: a request in flight finishes on its own
    /// thread and its reply is discarded.
    pub fn stop(&mut self) -> bool {
        let Some(mut running) = self.running.take() else {
            return false;
        };
        running.active.store(false, Ordering::SeqCst);
        running.capture.release();
        drop(running.worker.take());
        log::info!("webcam session {} stopped", running.token);
        true
    }
}

impl Drop for WebcamSession {
    fn drop(&mut self) {
        self.stop();
    }
}

pub(crate) enum Session {
    Image(ImageSession),
    Webcam(WebcamSession),
}
