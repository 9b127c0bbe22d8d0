use tracing::{debug, warn};

use crate::config::BlurAlgorithm;
use crate::processing::pixel_buffer::PixelBuffer;

/// Number of box passes used to approximate a Gaussian.
const GAUSSIAN_PASSES: usize = 3;

/// Widest box `box_radii_for_sigma` hands out; images never get this large.
const MAX_BOX_WIDTH: i64 = u32::MAX as i64;

/// Blur `image`, returning a new buffer with the same shape.
///
/// For [`BlurAlgorithm::Gaussian`] `radius` is the Gaussian sigma; for
/// [`BlurAlgorithm::Box`] it is the window half-width (truncated). A radius
/// below 1 or an empty input is logged and the input is returned unchanged.
pub fn apply_blur(image: &PixelBuffer, radius: f32, algorithm: BlurAlgorithm) -> PixelBuffer {
    let mut out = image.clone();
    blur_in_place(&mut out, radius, algorithm);
    out
}

/// In-place variant of [`apply_blur`].
pub fn blur_in_place(image: &mut PixelBuffer, radius: f32, algorithm: BlurAlgorithm) {
    if image.is_empty() {
        warn!("blur skipped: input image is empty");
        return;
    }
    if !(radius >= 1.0) || !radius.is_finite() {
        warn!(radius, "blur skipped: radius must be finite and at least 1");
        return;
    }
    debug!(
        width = image.width(),
        height = image.height(),
        channels = image.channels(),
        radius,
        ?algorithm,
        "blurring"
    );
    match algorithm {
        BlurAlgorithm::Gaussian => fast_gaussian_blur(image, radius),
        BlurAlgorithm::Box => {
            // Past the longest side the window already covers the whole image.
            let half_width = (radius as usize).min(longest_side(image));
            let blurred = reference_box_blur(image, half_width);
            *image = blurred;
        }
    }
}

/// Half-widths of the `passes` box filters whose repeated application
/// approximates a Gaussian of standard deviation `sigma`.
pub fn box_radii_for_sigma(sigma: f32, passes: usize) -> Vec<usize> {
    let n = passes.max(1) as f32;
    let variance12 = 12.0 * sigma * sigma;
    let ideal = (variance12 / n + 1.0).sqrt();
    let mut lower = (ideal.floor() as i64).clamp(1, MAX_BOX_WIDTH);
    if lower % 2 == 0 {
        lower -= 1;
    }
    let upper = lower.saturating_add(2);
    let lw = lower as f32;
    let m = ((variance12 - n * lw * lw - 4.0 * n * lw - 3.0 * n) / (-4.0 * lw - 4.0)).round();
    let m = m.max(0.0) as usize;
    (0..passes)
        .map(|i| {
            let width = if i < m { lower } else { upper };
            ((width - 1) / 2) as usize
        })
        .collect()
}

fn fast_gaussian_blur(image: &mut PixelBuffer, sigma: f32) {
    let width = image.width() as usize;
    let height = image.height() as usize;
    let channels = usize::from(image.channels());
    // Clamped reads make any wider window a weighted edge average, and the
    // running sums stay within u32.
    let cap = longest_side(image);
    let radii = box_radii_for_sigma(sigma, GAUSSIAN_PASSES);

    // Ping-pong between the image and one scratch buffer.
    let mut scratch = vec![0u8; image.as_bytes().len()];
    for radius in radii.into_iter().filter(|&r| r > 0).map(|r| r.min(cap)) {
        let data = image.as_bytes_mut();
        horizontal_pass(data, &mut scratch, width, height, channels, radius);
        vertical_pass(&scratch, data, width, height, channels, radius);
    }
}

/// Sliding-window box average along each row, clamping reads to the row ends.
fn horizontal_pass(
    src: &[u8],
    dst: &mut [u8],
    width: usize,
    height: usize,
    channels: usize,
    radius: usize,
) {
    let window = (2 * radius + 1) as u32;
    let last = width - 1;
    for y in 0..height {
        let row = y * width * channels;
        for c in 0..channels {
            let at = |x: usize| u32::from(src[row + x * channels + c]);
            let mut sum: u32 = (0..=2 * radius)
                .map(|k| at((k as isize - radius as isize).clamp(0, last as isize) as usize))
                .sum();
            dst[row + c] = rounded_mean(sum, window);
            for x in 1..width {
                let incoming = (x + radius).min(last);
                let outgoing = x.saturating_sub(radius + 1);
                sum = sum + at(incoming) - at(outgoing);
                dst[row + x * channels + c] = rounded_mean(sum, window);
            }
        }
    }
}

/// Column counterpart of [`horizontal_pass`].
fn vertical_pass(
    src: &[u8],
    dst: &mut [u8],
    width: usize,
    height: usize,
    channels: usize,
    radius: usize,
) {
    let window = (2 * radius + 1) as u32;
    let last = height - 1;
    let stride = width * channels;
    for x in 0..width {
        for c in 0..channels {
            let col = x * channels + c;
            let at = |y: usize| u32::from(src[y * stride + col]);
            let mut sum: u32 = (0..=2 * radius)
                .map(|k| at((k as isize - radius as isize).clamp(0, last as isize) as usize))
                .sum();
            dst[col] = rounded_mean(sum, window);
            for y in 1..height {
                let incoming = (y + radius).min(last);
                let outgoing = y.saturating_sub(radius + 1);
                sum = sum + at(incoming) - at(outgoing);
                dst[y * stride + col] = rounded_mean(sum, window);
            }
        }
    }
}

/// Brute-force box blur: averages the in-bounds part of the
/// `(2r+1)x(2r+1)` window around every pixel. O(r²) per pixel.
fn reference_box_blur(image: &PixelBuffer, radius: usize) -> PixelBuffer {
    let width = image.width() as usize;
    let height = image.height() as usize;
    let channels = usize::from(image.channels());
    let src = image.as_bytes();
    let mut out = image.clone();
    let dst = out.as_bytes_mut();

    for y in 0..height {
        let y0 = y.saturating_sub(radius);
        let y1 = (y + radius).min(height - 1);
        for x in 0..width {
            let x0 = x.saturating_sub(radius);
            let x1 = (x + radius).min(width - 1);
            let count = ((y1 - y0 + 1) * (x1 - x0 + 1)) as u32;
            for c in 0..channels {
                let mut sum = 0u32;
                for sy in y0..=y1 {
                    let row = sy * width * channels;
                    for sx in x0..=x1 {
                        sum += u32::from(src[row + sx * channels + c]);
                    }
                }
                dst[(y * width + x) * channels + c] = rounded_mean(sum, count);
            }
        }
    }
    out
}

fn longest_side(image: &PixelBuffer) -> usize {
    image.width().max(image.height()) as usize
}

#[inline]
fn rounded_mean(sum: u32, count: u32) -> u8 {
    ((sum + count / 2) / count).min(255) as u8
}
