use ndarray::{Array4, ArrayView4};

/// Index and value of the largest score. Ties resolve to the lowest index;
/// NaN scores never win. Returns `None` when no score is comparable.
pub(crate) fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, current)) if score <= current => {}
            _ => best = Some((i, score)),
        }
    }
    best
}

/// Bilinear resize of the spatial axes of an NHWC tensor, using half-pixel
/// centers so that an unchanged size maps every sample onto itself.
pub(crate) fn resize_bilinear(
    input: ArrayView4<'_, f32>,
    height: usize,
    width: usize,
) -> Array4<f32> {
    let (batch, in_h, in_w, channels) = input.dim();
    if in_h == 0 || in_w == 0 {
        return Array4::zeros((batch, height, width, channels));
    }

    let ys: Vec<(usize, usize, f32)> =
        (0..height).map(|y| sample_points(y, in_h, height)).collect();
    let xs: Vec<(usize, usize, f32)> = (0..width).map(|x| sample_points(x, in_w, width)).collect();

    Array4::from_shape_fn((batch, height, width, channels), |(n, y, x, c)| {
        let (y0, y1, wy) = ys[y];
        let (x0, x1, wx) = xs[x];
        let top = input[[n, y0, x0, c]] * (1.0 - wx) + input[[n, y0, x1, c]] * wx;
        let bottom = input[[n, y1, x0, c]] * (1.0 - wx) + input[[n, y1, x1, c]] * wx;
        top * (1.0 - wy) + bottom * wy
    })
}

fn sample_points(out: usize, in_len: usize, out_len: usize) -> (usize, usize, f32) {
    let scale = in_len as f32 / out_len as f32;
    let src = ((out as f32 + 0.5) * scale - 0.5).clamp(0.0, (in_len - 1) as f32);
    let lo = src.floor() as usize;
    let hi = (lo + 1).min(in_len - 1);
    (lo, hi, src - lo as f32)
}
