#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use std::sync::Arc;

use anyhow::Result;
use gpui::Application;
use gpui_component;
use handpose_client::{Config, Controller, HttpDetector, source, ui};

fn main() -> Result<()> {
    env_logger::init();

    let config = Config::from_env();
    log::info!("detection service at {}", config.api_base);
    let detector = Arc::new(HttpDetector::new(&config)?);
    let controller = Controller::new(config, detector, source::default_camera_provider());

    Application::new()
        .with_assets(gpui_component_assets::Assets)
        .run(move |app| {
            gpui_component::init(app);

            if let Err(err) = ui::launch_ui(app, controller) {
                eprintln!("failed to launch ui: {err:?}");
            }
        });

    Ok(())
}
