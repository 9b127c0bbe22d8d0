use fast_image_resize as fir;
use tracing::debug;

use crate::error::{Error, Result};
use crate::processing::pixel_buffer::PixelBuffer;

/// Resample `source` to exactly `target_w` x `target_h`, keeping its channel count.
///
/// # Errors
/// [`Error::Resize`] for zero target dimensions, an empty source, or a
/// failure inside the resampler.
pub fn resize_exact(source: &PixelBuffer, target_w: u32, target_h: u32) -> Result<PixelBuffer> {
    if target_w == 0 || target_h == 0 {
        return Err(Error::Resize("resize dimensions must be positive".into()));
    }
    if source.is_empty() {
        return Err(Error::Resize("cannot resize an empty image".into()));
    }
    if source.dimensions() == (target_w, target_h) {
        return Ok(source.clone());
    }

    let pixel_type = match source.channels() {
        3 => fir::PixelType::U8x3,
        4 => fir::PixelType::U8x4,
        other => {
            return Err(Error::Resize(format!("unsupported channel count {other}")));
        }
    };
    let src_view = fir::images::ImageRef::new(
        source.width(),
        source.height(),
        source.as_bytes(),
        pixel_type,
    )
    .map_err(|e| Error::Resize(format!("source view: {e}")))?;
    let mut dst_image = fir::images::Image::new(target_w, target_h, pixel_type);
    let options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::CatmullRom));
    let mut resizer = fir::Resizer::new();
    resizer
        .resize(&src_view, &mut dst_image, Some(&options))
        .map_err(|e| Error::Resize(e.to_string()))?;
    debug!(
        from_w = source.width(),
        from_h = source.height(),
        to_w = target_w,
        to_h = target_h,
        "resized"
    );
    PixelBuffer::from_raw(dst_image.into_vec(), target_w, target_h, source.channels())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resizes_to_requested_shape() {
        let mut src = PixelBuffer::new(40, 20, 3).unwrap();
        src.fill(&[200, 100, 50]);
        let out = resize_exact(&src, 10, 5).unwrap();
        assert_eq!(out.dimensions(), (10, 5));
        assert_eq!(out.channels(), 3);
        let px = out.pixel(4, 2).unwrap();
        for (got, want) in px.iter().zip([200u8, 100, 50]) {
            assert!(got.abs_diff(want) <= 1, "{px:?}");
        }
    }

    #[test]
    fn same_size_is_a_copy() {
        let src = PixelBuffer::new(3, 3, 4).unwrap();
        assert_eq!(resize_exact(&src, 3, 3).unwrap(), src);
    }

    #[test]
    fn rejects_empty_source_and_zero_target() {
        assert!(resize_exact(&PixelBuffer::empty(), 4, 4).is_err());
        let src = PixelBuffer::new(3, 3, 3).unwrap();
        assert!(resize_exact(&src, 0, 4).is_err());
    }
}
