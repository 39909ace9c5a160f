use std::{sync::Arc, thread};

use crossbeam_channel::{Receiver, unbounded};
use gpui::{
    AnyElement, App, AppContext, Context, ExternalPaths, InteractiveElement, IntoElement,
    ObjectFit, ParentElement, PathPromptOptions, Render, RenderImage, SharedString, Styled,
    StyledImage, TitlebarOptions, Window, WindowOptions, div, img, px,
};
use gpui_component::{
    ActiveTheme, Disableable, Root, Selectable, StyledExt,
    button::{Button, ButtonVariants},
    h_flex, v_flex,
};
use image::{Frame as ImageFrame, ImageBuffer, Rgba};

use crate::{
    controller::{Controller, CycleState},
    presenter::PanelState,
    types::Mode,
};

mod image_view;
mod render_util;
mod status;
mod titlebar;
mod webcam_view;

use render_util::TextureSlot;
use status::ServiceStatus;

const PANEL_WIDTH: f32 = 420.0;
const PANEL_IMAGE_HEIGHT: f32 = 360.0;

pub fn launch_ui(app: &mut App, controller: Controller) -> gpui::Result<()> {
    let window_options = WindowOptions {
        titlebar: Some(TitlebarOptions {
            title: Some("Handpose Client".into()),
            ..Default::default()
        }),
        ..Default::default()
    };

    app.open_window(window_options, move |window, app| {
        let view = app.new(|_| AppView::new(controller));
        app.new(|cx| Root::new(view, window, cx))
    })?;

    Ok(())
}

struct AppView {
    controller: Controller,
    service_status: ServiceStatus,
    status_rx: Receiver<ServiceStatus>,
    _status_handle: thread::JoinHandle<()>,
    preview_texture: TextureSlot,
    result_texture: TextureSlot,
    overlay_texture: TextureSlot,
}

impl AppView {
    fn new(controller: Controller) -> Self {
        let (status_tx, status_rx) = unbounded();
        let status_handle = status::spawn_service_probe(controller.detector(), status_tx);

        Self {
            controller,
            service_status: ServiceStatus::Probing,
            status_rx,
            _status_handle: status_handle,
            preview_texture: TextureSlot::default(),
            result_texture: TextureSlot::default(),
            overlay_texture: TextureSlot::default(),
        }
    }

    fn render_mode_tabs(&mut self, cx: &mut Context<'_, Self>) -> AnyElement {
        let current = self.controller.mode();
        [Mode::Image, Mode::Webcam]
            .into_iter()
            .fold(h_flex().gap_2().px_4().pt_3(), |row, mode| {
                row.child(
                    Button::new(SharedString::from(format!("mode-{}", mode.label())))
                        .label(format!("{} Mode", mode.label()))
                        .outline()
                        .selected(current == mode)
                        .on_click(cx.listener(move |this, _, _, cx| {
                            this.controller.set_mode(mode);
                            cx.notify();
                        })),
                )
            })
            .into_any_element()
    }

    fn render_info(&self, panel: &PanelState, cx: &mut Context<'_, Self>) -> AnyElement {
        let theme = cx.theme();
        let color = if panel.info.is_error() {
            gpui::rgb(0xfca5a5)
        } else {
            gpui::rgb(0xcbd5e1)
        };

        panel
            .info_lines()
            .into_iter()
            .enumerate()
            .fold(
                v_flex()
                    .gap_1()
                    .p_3()
                    .rounded_lg()
                    .border_1()
                    .border_color(theme.border)
                    .bg(gpui::rgb(0x0f1419)),
                |list, (idx, line)| {
                    let row = div().text_sm().text_color(color).child(line);
                    list.child(if idx == 0 { row.font_semibold() } else { row })
                },
            )
            .into_any_element()
    }
}

fn image_frame(texture: Option<Arc<RenderImage>>, empty_label: &'static str) -> AnyElement {
    let inner: AnyElement = match texture {
        Some(image) => img(image)
            .size_full()
            .object_fit(ObjectFit::Contain)
            .into_any_element(),
        None => div()
            .size_full()
            .flex()
            .items_center()
            .justify_center()
            .text_sm()
            .text_color(gpui::rgb(0x8b95a5))
            .child(empty_label)
            .into_any_element(),
    };

    div()
        .w(px(PANEL_WIDTH))
        .h(px(PANEL_IMAGE_HEIGHT))
        .overflow_hidden()
        .rounded_lg()
        .bg(gpui::rgb(0x000000))
        .child(inner)
        .into_any_element()
}

impl Render for AppView {
    fn render(
        &mut self,
        window: &mut Window,
        cx: &mut Context<'_, Self>,
    ) -> impl gpui::IntoElement {
        // Keep repainting so worker results are picked up without input events.
        cx.defer_in(window, |_, _, cx| {
            cx.notify();
        });

        self.poll_service_status();
        self.controller.poll();

        let titlebar = self.render_titlebar(cx);
        let tabs = self.render_mode_tabs(cx);
        let body = match self.controller.mode() {
            Mode::Image => self.render_image_mode(window, cx),
            Mode::Webcam => self.render_webcam_mode(window, cx),
        };

        v_flex()
            .size_full()
            .bg(gpui::rgb(0x1a2332))
            .child(titlebar)
            .child(tabs)
            .child(div().flex_1().p_4().child(body))
    }
}
