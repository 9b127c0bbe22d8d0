use crate::config::FitMode;

/// Largest size with the source aspect ratio that fits inside the canvas.
pub fn resize_to_contain(
    canvas_w: u32,
    canvas_h: u32,
    src_w: u32,
    src_h: u32,
    max_dim: u32,
) -> (u32, u32) {
    let iw = src_w.max(1) as f32;
    let ih = src_h.max(1) as f32;
    let cw = canvas_w.max(1) as f32;
    let ch = canvas_h.max(1) as f32;
    let scale = (cw / iw).min(ch / ih);
    scaled(iw, ih, scale, max_dim)
}

/// Smallest size with the source aspect ratio that covers the whole canvas.
pub fn resize_to_cover(
    canvas_w: u32,
    canvas_h: u32,
    src_w: u32,
    src_h: u32,
    max_dim: u32,
) -> (u32, u32) {
    let iw = src_w.max(1) as f32;
    let ih = src_h.max(1) as f32;
    let cw = canvas_w.max(1) as f32;
    let ch = canvas_h.max(1) as f32;
    let scale = (cw / iw).max(ch / ih);
    scaled(iw, ih, scale, max_dim)
}

pub fn fit_size(
    mode: FitMode,
    canvas: (u32, u32),
    src: (u32, u32),
    max_dim: u32,
) -> (u32, u32) {
    match mode {
        FitMode::Contain => resize_to_contain(canvas.0, canvas.1, src.0, src.1, max_dim),
        FitMode::Cover => resize_to_cover(canvas.0, canvas.1, src.0, src.1, max_dim),
    }
}

/// Uniform factor that stretches `inner` until it covers `outer`.
pub fn cover_scale(inner_w: u32, inner_h: u32, outer_w: u32, outer_h: u32) -> f32 {
    let sx = outer_w as f32 / inner_w.max(1) as f32;
    let sy = outer_h as f32 / inner_h.max(1) as f32;
    sx.max(sy)
}

/// Top-left offset (may be negative) that centers `inner` on `outer`.
pub fn center_offset(inner_w: f32, inner_h: f32, outer_w: f32, outer_h: f32) -> (f32, f32) {
    ((outer_w - inner_w) / 2.0, (outer_h - inner_h) / 2.0)
}

fn scaled(iw: f32, ih: f32, scale: f32, max_dim: u32) -> (u32, u32) {
    let mut scale = if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    };
    // Shrink uniformly so the longer side respects the cap.
    let max_dim = max_dim.max(1) as f32;
    let longest = iw.max(ih) * scale;
    if longest > max_dim {
        scale *= max_dim / longest;
    }
    let w = (iw * scale).round().clamp(1.0, max_dim);
    let h = (ih * scale).round().clamp(1.0, max_dim);
    (w as u32, h as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contain_keeps_aspect() {
        assert_eq!(resize_to_contain(16, 16, 8, 4, 64), (16, 8));
        assert_eq!(resize_to_contain(100, 50, 10, 10, 1000), (50, 50));
    }

    #[test]
    fn max_dimension_caps_longest_side_uniformly() {
        assert_eq!(resize_to_contain(4000, 4000, 100, 50, 1000), (1000, 500));
    }

    #[test]
    fn degenerate_sizes_do_not_divide_by_zero() {
        let (w, h) = resize_to_cover(0, 0, 0, 0, 10);
        assert!(w >= 1 && h >= 1);
    }

    #[test]
    fn offsets_center_and_may_go_negative() {
        assert_eq!(center_offset(10.0, 10.0, 20.0, 30.0), (5.0, 10.0));
        assert_eq!(center_offset(40.0, 10.0, 20.0, 10.0), (-10.0, 0.0));
    }
}
