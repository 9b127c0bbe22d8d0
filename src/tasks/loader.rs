use std::ffi::OsStr;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use image::RgbImage;
use tracing::{debug, warn};

use crate::processing::pixel_buffer::PixelBuffer;

/// Decode `path` into a tightly packed RGB8 buffer.
///
/// HEIC/HEIF files go through libheif (cargo feature `heic`); everything else
/// through the `image` crate with EXIF orientation applied. Any failure is
/// logged and reported as the empty sentinel so the caller can skip the file.
pub fn decode(path: &Path) -> PixelBuffer {
    let result = if is_heif(path) {
        decode_heif(path)
    } else {
        decode_rgb8_apply_exif(path)
    };
    match result.and_then(|(pixels, w, h)| Ok(PixelBuffer::from_raw(pixels, w, h, 3)?)) {
        Ok(buf) => {
            debug!(
                path = %path.display(),
                width = buf.width(),
                height = buf.height(),
                "decoded"
            );
            buf
        }
        Err(err) => {
            warn!(path = %path.display(), error = %format!("{err:#}"), "decode failed; skipping");
            PixelBuffer::empty()
        }
    }
}

fn is_heif(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(OsStr::to_str)
            .map(str::to_ascii_lowercase)
            .as_deref(),
        Some("heic" | "heif")
    )
}

// Common-format path. Orientation is best-effort: missing or unreadable
// metadata leaves the pixels as stored.
fn decode_rgb8_apply_exif(path: &Path) -> Result<(Vec<u8>, u32, u32)> {
    let img = image::ImageReader::open(path)
        .with_context(|| format!("open {}", path.display()))?
        .with_guessed_format()?
        .decode()
        .with_context(|| format!("decode {}", path.display()))?;
    let img = apply_orientation(img.to_rgb8(), read_orientation(path).unwrap_or(1));
    let (w, h) = img.dimensions();
    Ok((img.into_raw(), w, h))
}

fn apply_orientation(img: RgbImage, orientation: u16) -> RgbImage {
    use image::imageops::{flip_horizontal, flip_vertical, rotate90, rotate180, rotate270};
    match orientation {
        2 => flip_horizontal(&img),
        3 => rotate180(&img),
        4 => flip_vertical(&img),
        // transpose
        5 => flip_horizontal(&rotate90(&img)),
        6 => rotate90(&img),
        // transverse
        7 => flip_horizontal(&rotate270(&img)),
        8 => rotate270(&img),
        _ => img,
    }
}

fn read_orientation(path: &Path) -> Option<u16> {
    let file = File::open(path).ok()?;
    let mut buf = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut buf).ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    let o = u16::try_from(field.value.get_uint(0)?).ok()?;
    debug!(orientation = o, path = %path.display(), "exif orientation");
    Some(o)
}

#[cfg(feature = "heic")]
fn decode_heif(path: &Path) -> Result<(Vec<u8>, u32, u32)> {
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    let lib = LibHeif::new();
    let name = path
        .to_str()
        .with_context(|| format!("non-UTF-8 path {}", path.display()))?;
    let ctx = HeifContext::read_from_file(name).context("open heif context")?;
    let handle = ctx.primary_image_handle().context("primary image handle")?;
    let image = lib
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
        .context("decode heif image")?;
    let plane = image
        .planes()
        .interleaved
        .context("heif image has no interleaved plane")?;

    // Rows may be padded out to `stride`; copy them out tightly.
    let (w, h) = (plane.width, plane.height);
    let row = w as usize * 3;
    let mut pixels = Vec::with_capacity(row * h as usize);
    for y in 0..h as usize {
        let start = y * plane.stride;
        pixels.extend_from_slice(&plane.data[start..start + row]);
    }
    Ok((pixels, w, h))
}

#[cfg(not(feature = "heic"))]
fn decode_heif(path: &Path) -> Result<(Vec<u8>, u32, u32)> {
    anyhow::bail!(
        "{} is HEIC but this build lacks the `heic` feature",
        path.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    // JPEG 2x1 with EXIF orientation 6 (rotate 90 CW), base64 encoded
    const ORIENT6_JPEG: &str = concat!(
        "/9j/4AAQSkZJRgABAQAAAQABAAD/4QAiRXhpZgAATU0AKgAAAAgAAQESAAMAAAABAAYAAAAAAAD/2wBDAAgGBgcGBQgHBwcJCQgKDBQNDAsLDBkSEw8UHRofHh0aHBwgJC4nICIsIxwcKDcpLDAxNDQ0Hyc5PTgyPC4zNDL/",
        "2wBDAQkJCQwLDBgNDRgyIRwhMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjL/wAARCAABAAIDASIAAhEBAxEB/8QAHwAAAQUBAQEBAQEAAAAAAAAAAAECAwQFBgcICQoL/8QAtRAAAgEDAwIEAwUFBAQAAAF9AQIDAAQRBRIhMUEGE1FhByJxFDKBkaEII0KxwRVS0fAkM2JyggkKFhcYGRolJicoKSo0NTY3ODk6Q0RFRkdISUpTVFVWV1hZWmNkZWZnaGlqc3R1dnd4eXqDhIWGh4iJipKTlJWWl5iZmqKjpKWmp6ipqrKztLW2t7i5usLDxMXGx8jJytLT1NXW19jZ2uHi4+Tl5ufo6erx8vP09fb3+Pn6/8QAHwEAAwEBAQEBAQEBAQAAAAAAAAECAwQFBgcICQoL/8QAtREAAgECBAQDBAcFBAQAAQJ3AAECAxEEBSExBhJBUQdhcRMiMoEIFEKRobHBCSMzUvAVYnLRChYkNOEl8RcYGRomJygpKjU2Nzg5OkNERUZHSElKU1RVVldYWVpjZGVmZ2hpanN0dXZ3eHl6goOEhYaHiImKkpOUlZaXmJmaoqOkpaanqKmqsrO0tba3uLm6wsPExcbHyMnK0tPU1dbX2Nna4uPk5ebn6Onq8vP09fb3+Pn6/9oADAMBAAIRAxEAPwDi6KKK+ZP3E//Z"
    );

    #[test]
    fn applies_orientation_six() {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(ORIENT6_JPEG)
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orient6.jpg");
        std::fs::write(&path, &bytes).unwrap();
        let buf = decode(&path);
        assert_eq!(buf.dimensions(), (1, 2));
        assert_eq!(buf.channels(), 3);
    }

    #[test]
    fn orientation_table_matches_exif() {
        // 2x1: left red, right blue.
        let img = RgbImage::from_raw(2, 1, vec![255, 0, 0, 0, 0, 255]).unwrap();
        assert_eq!(apply_orientation(img.clone(), 1), img);
        assert_eq!(
            apply_orientation(img.clone(), 2).into_raw(),
            vec![0, 0, 255, 255, 0, 0]
        );
        assert_eq!(apply_orientation(img.clone(), 6).dimensions(), (1, 2));
        assert_eq!(apply_orientation(img.clone(), 8).dimensions(), (1, 2));
        // 6 turns clockwise, so the left pixel ends up on top.
        assert_eq!(
            apply_orientation(img.clone(), 6).into_raw(),
            vec![255, 0, 0, 0, 0, 255]
        );
        assert_eq!(
            apply_orientation(img, 8).into_raw(),
            vec![0, 0, 255, 255, 0, 0]
        );
    }

    #[test]
    fn heif_dispatch_is_by_extension() {
        assert!(is_heif(Path::new("x/IMG_0001.HEIC")));
        assert!(is_heif(Path::new("a.heif")));
        assert!(!is_heif(Path::new("a.jpg")));
        assert!(!is_heif(Path::new("heic")));
    }

    #[cfg(not(feature = "heic"))]
    #[test]
    fn heic_without_feature_is_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.heic");
        std::fs::write(&path, b"not really heic").unwrap();
        assert!(decode(&path).is_empty());
    }
}
