use anyhow::{Result, anyhow};
use nokhwa::{Buffer, utils::FrameFormat};
use rayon::prelude::*;
use yuv::{
    YuvBiPlanarImage, YuvConversionMode, YuvPackedImage, YuvRange, YuvStandardMatrix,
    yuv_nv12_to_rgba, yuyv422_to_rgba,
};

use crate::{codec, types::Frame};

pub fn convert_camera_frame(buffer: &Buffer) -> Result<Frame> {
    let resolution = buffer.resolution();
    let (width, height) = (resolution.width_x, resolution.height_y);
    let data = buffer.buffer();

    let rgba = match buffer.source_frame_format() {
        FrameFormat::NV12 => nv12_to_rgba(data, width, height)?,
        FrameFormat::YUYV => yuyv_to_rgba(data, width, height)?,
        FrameFormat::MJPEG => {
            // Some drivers report a stale resolution for MJPEG; trust the bitstream.
            let decoded = codec::decode_jpeg_rgba(data)?;
            return Ok(Frame::new(decoded.rgba, decoded.width, decoded.height));
        }
        FrameFormat::RAWRGB => packed_to_rgba(data, width, height, Layout::Rgb)?,
        FrameFormat::RAWBGR => packed_to_rgba(data, width, height, Layout::Bgr)?,
        FrameFormat::GRAY => packed_to_rgba(data, width, height, Layout::Gray)?,
    };

    Ok(Frame::new(rgba, width, height))
}

fn ensure_len(label: &str, data: &[u8], expected: usize) -> Result<()> {
    if data.len() < expected {
        return Err(anyhow!(
            "{label} buffer too small: got {}, expected {expected}",
            data.len()
        ));
    }
    Ok(())
}

fn nv12_to_rgba(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let y_len = width as usize * height as usize;
    let uv_len = y_len / 2;
    ensure_len("NV12", data, y_len + uv_len)?;

    let mut rgba = vec![0u8; y_len * 4];
    let image = YuvBiPlanarImage {
        y_plane: &data[..y_len],
        y_stride: width,
        uv_plane: &data[y_len..y_len + uv_len],
        uv_stride: width,
        width,
        height,
    };
    yuv_nv12_to_rgba(
        &image,
        &mut rgba,
        width * 4,
        YuvRange::Full,
        YuvStandardMatrix::Bt709,
        YuvConversionMode::Balanced,
    )
    .map_err(|err| anyhow!("NV12→RGBA failed: {err:?}"))?;
    Ok(rgba)
}

fn yuyv_to_rgba(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let pixels = width as usize * height as usize;
    ensure_len("YUYV", data, pixels * 2)?;

    let mut rgba = vec![0u8; pixels * 4];
    let packed = YuvPackedImage {
        yuy: data,
        yuy_stride: width * 2,
        width,
        height,
    };
    yuyv422_to_rgba(
        &packed,
        &mut rgba,
        width * 4,
        YuvRange::Full,
        YuvStandardMatrix::Bt709,
    )
    .map_err(|err| anyhow!("YUYV422→RGBA failed: {err:?}"))?;
    Ok(rgba)
}

#[derive(Clone, Copy)]
enum Layout {
    Rgb,
    Bgr,
    Gray,
}

impl Layout {
    fn channels(self) -> usize {
        match self {
            Layout::Rgb | Layout::Bgr => 3,
            Layout::Gray => 1,
        }
    }
}

fn packed_to_rgba(data: &[u8], width: u32, height: u32, layout: Layout) -> Result<Vec<u8>> {
    let pixels = width as usize * height as usize;
    let channels = layout.channels();
    ensure_len("raw", data, pixels * channels)?;

    let mut rgba = vec![0u8; pixels * 4];
    rgba.par_chunks_mut(4)
        .zip(data.par_chunks_exact(channels))
        .for_each(|(dst, src)| {
            let [r, g, b] = match layout {
                Layout::Rgb => [src[0], src[1], src[2]],
                Layout::Bgr => [src[2], src[1], src[0]],
                Layout::Gray => [src[0]; 3],
            };
            dst.copy_from_slice(&[r, g, b, 255]);
        });
    Ok(rgba)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bgr_swaps_red_and_blue() {
        let rgba = packed_to_rgba(&[1, 2, 3, 4, 5, 6], 2, 1, Layout::Bgr).unwrap();
        assert_eq!(rgba, vec![3, 2, 1, 255, 6, 5, 4, 255]);
    }

    #[test]
    fn gray_fans_out_to_three_channels() {
        let rgba = packed_to_rgba(&[9, 200], 2, 1, Layout::Gray).unwrap();
        assert_eq!(rgba, vec![9, 9, 9, 255, 200, 200, 200, 255]);
    }

    #[test]
    fn short_nv12_buffer_is_rejected() {
        assert!(nv12_to_rgba(&[0u8; 10], 4, 4).is_err());
    }
}
