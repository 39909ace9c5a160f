use anyhow::{Context, Result, anyhow};
use fast_image_resize as fir;

use crate::types::Frame;

/// Stretch a frame onto a `size`×`size` canvas.
///
/// The aspect ratio reported by the device is ignored on purpose: the
/// detector expects a fixed square input, the same way a video element is
/// drawn into a fixed canvas.
pub fn square_frame(frame: &Frame, size: u32) -> Result<Frame> {
    if size == 0 {
        return Err(anyhow!("target frame size must be non-zero"));
    }
    let expected_len = frame.expected_len();
    if frame.rgba.len() != expected_len {
        return Err(anyhow!(
            "frame buffer size mismatch: got {}, expected {}",
            frame.rgba.len(),
            expected_len
        ));
    }
    if frame.width == size && frame.height == size {
        return Ok(frame.clone());
    }

    let src_image = fir::images::Image::from_vec_u8(
        frame.width,
        frame.height,
        frame.rgba.clone(),
        fir::PixelType::U8x4,
    )?;
    let mut dst_image = fir::images::Image::new(size, size, fir::PixelType::U8x4);
    let mut resizer = fir::Resizer::new();
    let resize_options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Interpolation(fir::FilterType::Bilinear));
    resizer
        .resize(&src_image, &mut dst_image, Some(&resize_options))
        .context("fast resize failed")?;

    Ok(Frame {
        rgba: dst_image.into_vec(),
        width: size,
        height: size,
        timestamp: frame.timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_frame_becomes_square() {
        let frame = Frame::new(vec![255u8; 640 * 480 * 4], 640, 480);
        let squared = square_frame(&frame, 512).unwrap();
        assert_eq!((squared.width, squared.height), (512, 512));
        assert_eq!(squared.rgba.len(), 512 * 512 * 4);
        assert!(squared.rgba.iter().all(|&v| v == 255));
        assert_eq!(squared.timestamp, frame.timestamp);
    }

    #[test]
    fn already_square_is_passed_through() {
        let frame = Frame::new(vec![7u8; 8 * 8 * 4], 8, 8);
        let squared = square_frame(&frame, 8).unwrap();
        assert_eq!(squared.rgba, frame.rgba);
    }

    #[test]
    fn mismatched_buffer_is_an_error() {
        let frame = Frame::new(vec![0u8; 12], 4, 4);
        assert!(square_frame(&frame, 512).is_err());
    }
}
