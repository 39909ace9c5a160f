use super::{
    ActiveTheme, AnyElement, AppView, Context, IntoElement, ParentElement, Styled, div, h_flex, px,
};

impl AppView {
    pub(super) fn render_titlebar(&self, cx: &mut Context<'_, Self>) -> AnyElement {
        let theme = cx.theme();
        let (online, service_text) = self.service_status.badge();
        let service_color = if online {
            theme.success
        } else {
            theme.muted_foreground
        };

        let (camera_color, camera_text) = if self.controller.is_webcam_running() {
            (theme.success, "● webcam live")
        } else {
            (theme.muted_foreground, "○ webcam off")
        };

        h_flex()
            .h(px(36.0))
            .w_full()
            .px_4()
            .items_center()
            .justify_between()
            .bg(gpui::rgb(0x111827))
            .child(
                div()
                    .text_sm()
                    .text_color(theme.foreground)
                    .child("Hand Pose Detection"),
            )
            .child(
                h_flex()
                    .gap_3()
                    .items_center()
                    .child(badge(service_color, service_text))
                    .child(badge(camera_color, camera_text.to_string())),
            )
            .into_any_element()
    }
}

fn badge(color: gpui::Hsla, text: String) -> AnyElement {
    div()
        .px_2()
        .py_0p5()
        .rounded_md()
        .bg(gpui::rgba(0x00000033))
        .text_xs()
        .text_color(color)
        .child(text)
        .into_any_element()
}
