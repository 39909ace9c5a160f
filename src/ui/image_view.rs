use std::path::PathBuf;

use super::{
    AnyElement, AppView, Context, CycleState, Disableable, ExternalPaths, InteractiveElement,
    IntoElement, Mode, ParentElement, PathPromptOptions, SharedString, Styled, Window, div,
    h_flex, image_frame, v_flex,
};
use gpui_component::button::{Button, ButtonVariants};

impl AppView {
    pub(super) fn render_image_mode(
        &mut self,
        window: &mut Window,
        cx: &mut Context<'_, Self>,
    ) -> AnyElement {
        let panel = self.controller.presenter().panel(Mode::Image);
        let revision = panel.revision();
        let preview = self
            .preview_texture
            .sync(revision, panel.preview.as_ref(), window, cx);
        let result = self
            .result_texture
            .sync(revision, panel.image.as_ref(), window, cx);
        let info = self.render_info(panel, cx);

        let awaiting = self.controller.cycle_state() == CycleState::AwaitingResult;
        let can_trigger = self.controller.can_trigger();
        let has_selection = self.controller.selected_image_name().is_some();

        let drop_zone = div()
            .id("image-drop-zone")
            .w_full()
            .p_4()
            .rounded_lg()
            .border_1()
            .border_dashed()
            .border_color(gpui::rgb(0x3b4a5e))
            .text_sm()
            .text_color(gpui::rgb(0x8b95a5))
            .child("Drop an image here or choose one")
            .on_drop(cx.listener(|this, paths: &ExternalPaths, _, cx| {
                if let Some(path) = paths.paths().first() {
                    let _ = this.controller.select_image(path);
                }
                cx.notify();
            }));

        let controls = h_flex()
            .gap_2()
            .child(
                Button::new(SharedString::from("choose-image"))
                    .outline()
                    .label("Choose image…")
                    .disabled(awaiting)
                    .on_click(cx.listener(|this, _, _, cx| this.prompt_for_image(cx))),
            )
            .child(
                Button::new(SharedString::from("detect-image"))
                    .primary()
                    .label("Detect Hands")
                    .loading(awaiting)
                    .disabled(!can_trigger)
                    .on_click(cx.listener(|this, _, _, cx| {
                        this.controller.trigger_detection();
                        cx.notify();
                    })),
            )
            .child(
                Button::new(SharedString::from("clear-image"))
                    .ghost()
                    .label("Clear")
                    .disabled(!has_selection || awaiting)
                    .on_click(cx.listener(|this, _, _, cx| {
                        this.controller.clear_image();
                        cx.notify();
                    })),
            );

        v_flex()
            .gap_3()
            .child(drop_zone)
            .child(controls)
            .child(
                h_flex()
                    .gap_4()
                    .items_start()
                    .child(image_frame(preview, "No image selected"))
                    .child(image_frame(result, "Detection result appears here")),
            )
            .child(info)
            .into_any_element()
    }

    fn prompt_for_image(&mut self, cx: &mut Context<'_, Self>) {
        let paths = cx.prompt_for_paths(PathPromptOptions {
            files: true,
            directories: false,
            multiple: false,
            prompt: None,
        });

        cx.spawn(async move |this, cx| {
            let picked: Option<PathBuf> = match paths.await {
                Ok(Ok(Some(paths))) => paths.into_iter().next(),
                Ok(Ok(None)) => None,
                Ok(Err(err)) => {
                    log::warn!("file picker failed: {err:#}");
                    None
                }
                Err(_) => None,
            };
            let Some(path) = picked else {
                return;
            };
            let _ = this.update(cx, |this, cx| {
                let _ = this.controller.select_image(&path);
                cx.notify();
            });
        })
        .detach();
    }
}
