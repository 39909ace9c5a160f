use std::{fs, path::Path};

use image::ImageFormat;

use crate::{codec::RgbaImage, error::DetectError};

/// A user-selected still image: the exact bytes to upload plus a decoded
/// preview for immediate display.
#[derive(Debug)]
pub struct SelectedImage {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
    pub preview: Option<RgbaImage>,
}

impl SelectedImage {
    pub fn from_path(path: &Path) -> Result<Self, DetectError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        // Reject by extension first so a non-image never gets read.
        if let Some(kind) = non_image_extension(path) {
            return Err(DetectError::InvalidInputKind { name, kind });
        }

        let bytes = fs::read(path).map_err(|err| DetectError::InvalidInputKind {
            name: name.clone(),
            kind: format!("unreadable: {err}"),
        })?;
        Self::from_bytes(name, None, bytes)
    }

    /// `declared_mime` is the type reported by the drop source, if any.
    pub fn from_bytes(
        name: impl Into<String>,
        declared_mime: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<Self, DetectError> {
        let name = name.into();
        let mime = match declared_mime.map(str::trim).filter(|m| !m.is_empty()) {
            Some(declared) => declared.to_ascii_lowercase(),
            None => mime_from_name(&name)
                .or_else(|| {
                    image::guess_format(&bytes)
                        .ok()
                        .map(|f| f.to_mime_type().to_string())
                })
                .unwrap_or_else(|| "application/octet-stream".to_string()),
        };

        if !mime.starts_with("image/") {
            return Err(DetectError::InvalidInputKind { name, kind: mime });
        }

        let preview = match image::load_from_memory(&bytes) {
            Ok(decoded) => {
                let rgba = decoded.to_rgba8();
                let (width, height) = rgba.dimensions();
                Some(RgbaImage {
                    rgba: rgba.into_raw(),
                    width,
                    height,
                })
            }
            Err(err) => {
                log::warn!("no preview for {name}: {err}");
                None
            }
        };

        Ok(Self {
            name,
            mime,
            bytes,
            preview,
        })
    }
}

fn mime_from_name(name: &str) -> Option<String> {
    ImageFormat::from_path(name)
        .ok()
        .map(|format| format.to_mime_type().to_string())
}

fn non_image_extension(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if ImageFormat::from_extension(&ext).is_some() {
        return None;
    }
    Some(format!(".{ext}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn png_by_extension_gets_preview() {
        let selected = SelectedImage::from_bytes("hand.png", None, png_bytes()).unwrap();
        assert_eq!(selected.mime, "image/png");
        let preview = selected.preview.unwrap();
        assert_eq!((preview.width, preview.height), (3, 2));
    }

    #[test]
    fn declared_type_wins() {
        let err = SelectedImage::from_bytes("hand.png", Some("text/plain"), png_bytes())
            .unwrap_err();
        assert!(matches!(err, DetectError::InvalidInputKind { .. }));
    }

    #[test]
    fn extensionless_file_is_sniffed() {
        let selected = SelectedImage::from_bytes("capture", None, png_bytes()).unwrap();
        assert_eq!(selected.mime, "image/png");
    }

    #[test]
    fn text_is_rejected() {
        let err = SelectedImage::from_bytes("notes", None, b"hello".to_vec()).unwrap_err();
        assert_eq!(
            err,
            DetectError::InvalidInputKind {
                name: "notes".to_string(),
                kind: "application/octet-stream".to_string(),
            }
        );
    }

    #[test]
    fn undecodable_image_still_selectable() {
        let selected =
            SelectedImage::from_bytes("broken.jpg", None, b"not really".to_vec()).unwrap();
        assert_eq!(selected.mime, "image/jpeg");
        assert!(selected.preview.is_none());
    }
}
