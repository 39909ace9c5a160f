use std::convert::TryFrom;

use anyhow::{Context, Result, anyhow};
use image::{ExtendedColorType, codecs::jpeg::JpegEncoder};
use rayon::prelude::*;
use zune_jpeg::{
    JpegDecoder,
    zune_core::{bytestream::ZCursor, colorspace::ColorSpace, options::DecoderOptions},
};

use crate::types::Frame;

#[derive(Debug)]
pub struct RgbaImage {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

pub fn decode_jpeg_rgba(data: &[u8]) -> Result<RgbaImage> {
    let options = DecoderOptions::default().jpeg_set_out_colorspace(ColorSpace::RGBA);
    let mut decoder = JpegDecoder::new_with_options(ZCursor::new(data), options);
    let rgba = decoder
        .decode()
        .map_err(|err| anyhow!("JPEG decode failed: {err:?}"))?;

    let info = decoder
        .info()
        .ok_or_else(|| anyhow!("JPEG decoder reported no image info"))?;
    let width = u32::try_from(info.width).map_err(|_| anyhow!("JPEG width does not fit u32"))?;
    let height =
        u32::try_from(info.height).map_err(|_| anyhow!("JPEG height does not fit u32"))?;

    let expected_len = width as usize * height as usize * 4;
    if rgba.len() < expected_len {
        return Err(anyhow!(
            "JPEG decode produced too few bytes: got {}, expected {}",
            rgba.len(),
            expected_len
        ));
    }

    Ok(RgbaImage {
        rgba,
        width,
        height,
    })
}

/// Encode an RGBA frame as baseline JPEG. Alpha is dropped.
pub fn encode_jpeg(frame: &Frame, quality: u8) -> Result<Vec<u8>> {
    let expected_len = frame.expected_len();
    if frame.rgba.len() != expected_len {
        return Err(anyhow!(
            "frame buffer size mismatch: got {}, expected {}",
            frame.rgba.len(),
            expected_len
        ));
    }

    let rgb: Vec<u8> = frame
        .rgba
        .par_chunks_exact(4)
        .flat_map_iter(|px| [px[0], px[1], px[2]])
        .collect();

    let mut out = Vec::with_capacity(rgb.len() / 8);
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
        .encode(&rgb, frame.width, frame.height, ExtendedColorType::Rgb8)
        .context("JPEG encode failed")?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_frame_decodes_to_same_dimensions() {
        let frame = Frame::new(vec![200u8; 32 * 16 * 4], 32, 16);
        let jpeg = encode_jpeg(&frame, 80).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);

        let decoded = decode_jpeg_rgba(&jpeg).unwrap();
        assert_eq!((decoded.width, decoded.height), (32, 16));
        assert_eq!(decoded.rgba.len(), 32 * 16 * 4);
    }

    #[test]
    fn short_buffer_is_rejected() {
        let frame = Frame::new(vec![0u8; 10], 4, 4);
        assert!(encode_jpeg(&frame, 80).is_err());
    }

    #[test]
    fn garbage_is_not_a_jpeg() {
        assert!(decode_jpeg_rgba(b"definitely not a jpeg").is_err());
    }
}
