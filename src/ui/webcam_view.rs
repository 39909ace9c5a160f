use super::{
    AnyElement, AppView, Context, Disableable, IntoElement, Mode, ParentElement, SharedString,
    Styled, Window, h_flex, image_frame, v_flex,
};
use gpui_component::button::{Button, ButtonVariants};

impl AppView {
    pub(super) fn render_webcam_mode(
        &mut self,
        window: &mut Window,
        cx: &mut Context<'_, Self>,
    ) -> AnyElement {
        let panel = self.controller.presenter().panel(Mode::Webcam);
        let overlay = self
            .overlay_texture
            .sync(panel.revision(), panel.image.as_ref(), window, cx);
        let info = self.render_info(panel, cx);
        let running = self.controller.is_webcam_running();

        let controls = h_flex()
            .gap_2()
            .child(
                Button::new(SharedString::from("start-webcam"))
                    .primary()
                    .label("Start Webcam")
                    .disabled(running)
                    .on_click(cx.listener(|this, _, _, cx| {
                        // Failures are already on the panel.
                        let _ = this.controller.start_webcam();
                        cx.notify();
                    })),
            )
            .child(
                Button::new(SharedString::from("stop-webcam"))
                    .outline()
                    .label("Stop Webcam")
                    .disabled(!running)
                    .on_click(cx.listener(|this, _, _, cx| {
                        this.controller.stop_webcam();
                        cx.notify();
                    })),
            );

        v_flex()
            .gap_3()
            .child(controls)
            .child(image_frame(overlay, "Detection overlay appears here"))
            .child(info)
            .into_any_element()
    }
}
