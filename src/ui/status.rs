use std::{sync::Arc, thread};

use crossbeam_channel::Sender;

use super::AppView;
use crate::inference::{Detector, ModelInfo};

#[derive(Clone, Debug)]
pub(super) enum ServiceStatus {
    Probing,
    Ready(Option<ModelInfo>),
    Unreachable(String),
}

impl ServiceStatus {
    pub(super) fn badge(&self) -> (bool, String) {
        match self {
            ServiceStatus::Probing => (false, "… checking service".to_string()),
            ServiceStatus::Ready(Some(info)) => (true, format!("● {}", info.summary())),
            ServiceStatus::Ready(None) => (true, "● service online".to_string()),
            ServiceStatus::Unreachable(_) => (false, "○ service unreachable".to_string()),
        }
    }
}

/// Probe health first; model info is best effort once the service answers.
pub(super) fn spawn_service_probe(
    detector: Arc<dyn Detector>,
    tx: Sender<ServiceStatus>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let status = match detector.health() {
            Ok(()) => match detector.model_info() {
                Ok(info) => ServiceStatus::Ready(info),
                Err(err) => {
                    log::warn!("model info unavailable: {err}");
                    ServiceStatus::Ready(None)
                }
            },
            Err(err) => {
                log::warn!("detection service unreachable: {err}");
                ServiceStatus::Unreachable(err.to_string())
            }
        };
        let _ = tx.send(status);
    })
}

impl AppView {
    pub(super) fn poll_service_status(&mut self) {
        while let Ok(status) = self.status_rx.try_recv() {
            self.service_status = status;
        }
    }
}
