//! Image filters used by matching and refinement.
//!
//! Borders are handled by reflection without repeating the edge sample
//! (`gfedcb|abcdefgh|gfedcba`) except for the median filter, which
//! replicates the edge sample. Smoothing uses binomial kernels whose weight
//! sums are powers of two, so blurred 8-bit data stays exact in `f32` and
//! gradient ties resolve identically on both sides of a symmetric step.

use crate::depth_pipeline::common::raster::Raster;

/// Binary edge map, `true` where an edge was detected.
pub type EdgeMask = Raster<bool>;

#[inline]
fn reflect101(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let n = n as isize;
    let period = 2 * (n - 1);
    let mut i = i.rem_euclid(period);
    if i >= n {
        i = period - i;
    }
    i as usize
}

fn binomial_kernel(ksize: usize) -> Option<&'static [f32]> {
    match ksize {
        1 => Some(&[1.0][..]),
        3 => Some(&[1.0, 2.0, 1.0][..]),
        5 => Some(&[1.0, 4.0, 6.0, 4.0, 1.0][..]),
        7 => Some(&[1.0, 6.0, 15.0, 20.0, 15.0, 6.0, 1.0][..]),
        _ => None,
    }
}

/// Separable binomial (Gaussian-like) blur of a single-channel image.
/// Unsupported kernel sizes fall back to the nearest smaller odd size.
pub fn binomial_blur(src: &Raster<u8>, ksize: usize) -> Raster<f32> {
    let kernel = (1..=ksize.min(7))
        .rev()
        .find_map(binomial_kernel)
        .unwrap_or(&[1.0][..]);
    let norm: f32 = kernel.iter().sum();
    let half = (kernel.len() / 2) as isize;
    let (w, h) = src.dimensions();

    let mut horizontal = Raster::<f32>::new(w, h, 1);
    for y in 0..h {
        let row = src.row(y);
        let out = horizontal.row_mut(y);
        for x in 0..w {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sx = reflect101(x as isize + k as isize - half, w);
                acc += weight * row[sx] as f32;
            }
            out[x] = acc / norm;
        }
    }

    let mut out = Raster::<f32>::new(w, h, 1);
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sy = reflect101(y as isize + k as isize - half, h);
                acc += weight * horizontal.get(x, sy);
            }
            out.set(x, y, acc / norm);
        }
    }
    out
}

/// 3x3 Sobel derivatives `(gx, gy)`.
pub fn sobel(src: &Raster<f32>) -> (Raster<f32>, Raster<f32>) {
    let (w, h) = src.dimensions();
    let mut gx = Raster::<f32>::new(w, h, 1);
    let mut gy = Raster::<f32>::new(w, h, 1);
    if w == 0 || h == 0 {
        return (gx, gy);
    }
    for y in 0..h {
        let ym = reflect101(y as isize - 1, h);
        let yp = reflect101(y as isize + 1, h);
        for x in 0..w {
            let xm = reflect101(x as isize - 1, w);
            let xp = reflect101(x as isize + 1, w);
            let at = |xx: usize, yy: usize| src.get(xx, yy);

            let dx = (at(xp, ym) - at(xm, ym))
                + 2.0 * (at(xp, y) - at(xm, y))
                + (at(xp, yp) - at(xm, yp));
            let dy = (at(xm, yp) - at(xm, ym))
                + 2.0 * (at(x, yp) - at(x, ym))
                + (at(xp, yp) - at(xp, ym));
            gx.set(x, y, dx);
            gy.set(x, y, dy);
        }
    }
    (gx, gy)
}

/// Canny edge detector on an already smoothed image. Gradient magnitude is
/// the L1 norm `|gx| + |gy|`; a pixel survives non-maximum suppression when
/// it is strictly above its predecessor and not below its successor along
/// the gradient direction, so a symmetric step yields a single-pixel edge on
/// its lower-index side.
pub fn canny(smoothed: &Raster<f32>, low: f32, high: f32) -> EdgeMask {
    let (w, h) = smoothed.dimensions();
    let mut edges = EdgeMask::new(w, h, 1);
    if w == 0 || h == 0 {
        return edges;
    }
    let (gx, gy) = sobel(smoothed);
    let magnitude = |x: isize, y: isize| -> f32 {
        if x < 0 || y < 0 || x >= w as isize || y >= h as isize {
            0.0
        } else {
            let (x, y) = (x as usize, y as usize);
            gx.get(x, y).abs() + gy.get(x, y).abs()
        }
    };

    // tan(22.5deg) and tan(67.5deg)
    const TAN_22_5: f32 = 0.414_213_56;
    const TAN_67_5: f32 = 2.414_213_6;

    // 0 = suppressed, 1 = weak candidate, 2 = strong
    let mut class = Raster::<u8>::new(w, h, 1);
    let mut stack = Vec::new();
    for y in 0..h {
        for x in 0..w {
            let (xi, yi) = (x as isize, y as isize);
            let m = magnitude(xi, yi);
            if m <= low {
                continue;
            }
            let (dx, dy) = (gx.get(x, y), gy.get(x, y));
            let (ax, ay) = (dx.abs(), dy.abs());
            let ((px, py), (nx, ny)) = if ay <= ax * TAN_22_5 {
                ((xi - 1, yi), (xi + 1, yi))
            } else if ay > ax * TAN_67_5 {
                ((xi, yi - 1), (xi, yi + 1))
            } else if (dx > 0.0) == (dy > 0.0) {
                ((xi - 1, yi - 1), (xi + 1, yi + 1))
            } else {
                ((xi + 1, yi - 1), (xi - 1, yi + 1))
            };
            if m > magnitude(px, py) && m >= magnitude(nx, ny) {
                if m > high {
                    class.set(x, y, 2);
                    stack.push((x, y));
                } else {
                    class.set(x, y, 1);
                }
            }
        }
    }

    // Hysteresis: grow strong edges through 8-connected weak candidates.
    while let Some((x, y)) = stack.pop() {
        edges.set(x, y, true);
        for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
            for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                if class.get(nx, ny) == 1 {
                    class.set(nx, ny, 2);
                    stack.push((nx, ny));
                }
            }
        }
    }
    edges
}

/// Separable median: a `window`-tap median along every row, then along
/// every column of the result. Samples outside the image repeat the nearest
/// edge sample. Runs at least `window / 2 + 1` long pass through a 1-D
/// median unchanged, so axis-aligned regions that wide keep their corners,
/// which a square window would round off.
pub fn median_filter(src: &Raster<i16>, window: usize) -> Raster<i16> {
    let (w, h) = src.dimensions();
    if window <= 1 || w == 0 || h == 0 {
        return src.clone();
    }
    let half = window / 2;

    let mut rows = Raster::<i16>::new(w, h, 1);
    let mut samples = Vec::with_capacity(2 * half + 1);
    for y in 0..h {
        median_1d(src.row(y), rows.row_mut(y), half, &mut samples);
    }

    let mut out = Raster::<i16>::new(w, h, 1);
    let mut column = vec![0i16; h];
    let mut filtered = vec![0i16; h];
    for x in 0..w {
        for (y, v) in column.iter_mut().enumerate() {
            *v = rows.get(x, y);
        }
        median_1d(&column, &mut filtered, half, &mut samples);
        for (y, &v) in filtered.iter().enumerate() {
            out.set(x, y, v);
        }
    }
    out
}

fn median_1d(src: &[i16], dst: &mut [i16], half: usize, samples: &mut Vec<i16>) {
    let last = src.len() as isize - 1;
    let half = half as isize;
    for (i, out) in dst.iter_mut().enumerate() {
        let i = i as isize;
        samples.clear();
        samples.extend((i - half..=i + half).map(|k| src[k.clamp(0, last) as usize]));
        let mid = samples.len() / 2;
        let (_, median, _) = samples.select_nth_unstable(mid);
        *out = *median;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertical_step(width: usize, height: usize, split: usize, lo: u8, hi: u8) -> Raster<u8> {
        let mut r = Raster::<u8>::new(width, height, 1);
        for y in 0..height {
            for x in split..width {
                r.set(x, y, hi);
            }
            for x in 0..split {
                r.set(x, y, lo);
            }
        }
        r
    }

    #[test]
    fn reflect101_mirrors_without_repeating_edge() {
        assert_eq!(reflect101(-1, 5), 1);
        assert_eq!(reflect101(-2, 5), 2);
        assert_eq!(reflect101(5, 5), 3);
        assert_eq!(reflect101(2, 5), 2);
        assert_eq!(reflect101(-3, 1), 0);
    }

    #[test]
    fn blur_preserves_flat_regions() {
        let flat = Raster::filled(6, 4, 1, 90u8);
        let blurred = binomial_blur(&flat, 5);
        assert!(blurred.data().iter().all(|&v| v == 90.0));
    }

    #[test]
    fn canny_marks_step_on_its_lower_side() {
        // Step between columns 7 and 8.
        let img = vertical_step(16, 6, 8, 40, 200);
        let edges = canny(&binomial_blur(&img, 5), 20.0, 60.0);
        for y in 0..6 {
            let cols: Vec<usize> = (0..16).filter(|&x| edges.get(x, y)).collect();
            assert_eq!(cols, vec![7], "row {}", y);
        }
    }

    #[test]
    fn canny_ignores_steps_below_threshold() {
        let img = vertical_step(16, 6, 8, 100, 104);
        let edges = canny(&binomial_blur(&img, 5), 20.0, 60.0);
        assert!(edges.data().iter().all(|&e| !e));
    }

    #[test]
    fn median_removes_single_column_outlier() {
        let mut r = Raster::filled(9, 7, 1, 500i16);
        for y in 0..7 {
            r.set(4, y, 900);
        }
        let out = median_filter(&r, 5);
        assert!(out.data().iter().all(|&v| v == 500));
    }

    #[test]
    fn median_keeps_stripe_as_wide_as_window() {
        let mut r = Raster::filled(15, 7, 1, 500i16);
        for y in 0..7 {
            for x in 5..10 {
                r.set(x, y, 900);
            }
        }
        assert_eq!(median_filter(&r, 5), r);
    }

    #[test]
    fn median_keeps_rectangle_corners() {
        let mut r = Raster::filled(16, 12, 1, 500i16);
        for y in 3..9 {
            for x in 4..12 {
                r.set(x, y, 900);
            }
        }
        assert_eq!(median_filter(&r, 5), r);
    }

    #[test]
    fn median_removes_short_run_in_both_directions() {
        let mut r = Raster::filled(9, 9, 1, 500i16);
        r.set(4, 4, 900);
        r.set(5, 4, 900);
        r.set(4, 5, 900);
        assert!(median_filter(&r, 5).data().iter().all(|&v| v == 500));
    }
}
