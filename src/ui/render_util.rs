use super::{Arc, Context, ImageBuffer, ImageFrame, RenderImage, Rgba, Window};
use crate::presenter::DisplayImage;

pub(super) fn display_to_image(image: &DisplayImage) -> Option<Arc<RenderImage>> {
    let mut rgba = image.rgba.clone();

    // GPUI expects BGRA; convert in place to avoid the async asset pipeline and flicker.
    for px in rgba.chunks_exact_mut(4) {
        px.swap(0, 2);
    }

    let buffer = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(image.width, image.height, rgba)?;
    Some(Arc::new(RenderImage::new(vec![ImageFrame::new(buffer)])))
}

/// One GPU texture per panel image, rebuilt only when the panel revision moves.
#[derive(Default)]
pub(super) struct TextureSlot {
    revision: Option<u64>,
    texture: Option<Arc<RenderImage>>,
}

impl TextureSlot {
    pub(super) fn sync<V: 'static>(
        &mut self,
        revision: u64,
        source: Option<&DisplayImage>,
        window: &mut Window,
        cx: &mut Context<'_, V>,
    ) -> Option<Arc<RenderImage>> {
        if self.revision != Some(revision) {
            self.revision = Some(revision);
            let next = source.and_then(display_to_image);
            if let Some(old_image) = std::mem::replace(&mut self.texture, next) {
                // Release the previous texture; the sprite atlas keeps every frame otherwise.
                cx.drop_image(old_image, Some(window));
            }
        }
        self.texture.clone()
    }
}
