//! Binary morphology on 8-bit masks with rectangular structuring elements.
//!
//! Rectangular kernels are separable, so erosion and dilation run as one
//! horizontal and one vertical min/max pass. Samples outside the image are
//! skipped: they never erode a pixel and never dilate one.

use crate::config::Kernel;
use image::{GrayImage, Luma};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Erode,
    Dilate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Horizontal,
    Vertical,
}

/// Inverse binary threshold: `value <= thresh` → 255, otherwise 0.
///
/// Dark ink on a light page becomes white foreground.
#[must_use = "returns a new GrayImage; the input is not modified"]
pub fn threshold_binary_inv(gray: &GrayImage, thresh: u8) -> GrayImage {
    let mut out = GrayImage::new(gray.width(), gray.height());
    for (x, y, p) in gray.enumerate_pixels() {
        out.put_pixel(x, y, Luma([if p.0[0] > thresh { 0 } else { 255 }]));
    }
    out
}

/// Erode with a `kernel.width × kernel.height` rectangle anchored at its centre.
#[must_use]
pub fn erode_rect(img: &GrayImage, kernel: Kernel) -> GrayImage {
    let tmp = filter_axis(img, kernel.width, Axis::Horizontal, Op::Erode);
    filter_axis(&tmp, kernel.height, Axis::Vertical, Op::Erode)
}

/// Dilate with a `kernel.width × kernel.height` rectangle anchored at its centre.
#[must_use]
pub fn dilate_rect(img: &GrayImage, kernel: Kernel) -> GrayImage {
    let tmp = filter_axis(img, kernel.width, Axis::Horizontal, Op::Dilate);
    filter_axis(&tmp, kernel.height, Axis::Vertical, Op::Dilate)
}

/// Morphological opening: `iterations` erosions followed by `iterations`
/// dilations.
///
/// With a 1×15 kernel only vertical runs of at least 15 pixels survive; with
/// 15×1 only horizontal runs do.
#[must_use]
pub fn open_rect(img: &GrayImage, kernel: Kernel, iterations: u32) -> GrayImage {
    let mut out = img.clone();
    for _ in 0..iterations {
        out = erode_rect(&out, kernel);
    }
    for _ in 0..iterations {
        out = dilate_rect(&out, kernel);
    }
    out
}

/// Blend two masks with weight 0.5 each, rounding half up.
///
/// # Panics
/// If the two images differ in size.
#[must_use]
pub fn blend_equal(a: &GrayImage, b: &GrayImage) -> GrayImage {
    assert_eq!(a.dimensions(), b.dimensions(), "blend_equal: size mismatch");
    let mut out = GrayImage::new(a.width(), a.height());
    for (x, y, p) in out.enumerate_pixels_mut() {
        let sum = u16::from(a.get_pixel(x, y).0[0]) + u16::from(b.get_pixel(x, y).0[0]);
        *p = Luma([((sum + 1) / 2) as u8]);
    }
    out
}

fn filter_axis(img: &GrayImage, len: u32, axis: Axis, op: Op) -> GrayImage {
    if len <= 1 {
        return img.clone();
    }
    let (w, h) = img.dimensions();
    let len = i64::from(len);
    let anchor = len / 2;
    // Dilation uses the reflected kernel; identical for odd lengths.
    let (lo, hi) = match op {
        Op::Erode => (-anchor, len - 1 - anchor),
        Op::Dilate => (-(len - 1 - anchor), anchor),
    };

    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let mut acc = match op {
                Op::Erode => u8::MAX,
                Op::Dilate => u8::MIN,
            };
            for d in lo..=hi {
                let (sx, sy) = match axis {
                    Axis::Horizontal => (i64::from(x) + d, i64::from(y)),
                    Axis::Vertical => (i64::from(x), i64::from(y) + d),
                };
                if sx < 0 || sy < 0 || sx >= i64::from(w) || sy >= i64::from(h) {
                    continue;
                }
                let v = img.get_pixel(sx as u32, sy as u32).0[0];
                acc = match op {
                    Op::Erode => acc.min(v),
                    Op::Dilate => acc.max(v),
                };
            }
            out.put_pixel(x, y, Luma([acc]));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas(w: u32, h: u32) -> GrayImage {
        GrayImage::new(w, h)
    }

    fn fill(img: &mut GrayImage, x0: u32, y0: u32, x1: u32, y1: u32) {
        for y in y0..=y1 {
            for x in x0..=x1 {
                img.put_pixel(x, y, Luma([255]));
            }
        }
    }

    fn count_fg(img: &GrayImage) -> usize {
        img.pixels().filter(|p| p.0[0] > 0).count()
    }

    #[test]
    fn threshold_is_inclusive_at_150() {
        let mut g = GrayImage::new(3, 1);
        g.put_pixel(0, 0, Luma([150]));
        g.put_pixel(1, 0, Luma([151]));
        g.put_pixel(2, 0, Luma([0]));
        let b = threshold_binary_inv(&g, 150);
        assert_eq!(b.get_pixel(0, 0).0[0], 255);
        assert_eq!(b.get_pixel(1, 0).0[0], 0);
        assert_eq!(b.get_pixel(2, 0).0[0], 255);
    }

    #[test]
    fn vertical_opening_keeps_long_lines() {
        let mut img = canvas(20, 60);
        fill(&mut img, 5, 5, 5, 44); // 40 px tall
        let opened = open_rect(&img, Kernel::new(1, 15), 2);
        assert_eq!(opened, img);
    }

    #[test]
    fn vertical_opening_drops_short_segments() {
        let mut img = canvas(20, 60);
        fill(&mut img, 5, 5, 5, 14); // 10 px tall
        let opened = open_rect(&img, Kernel::new(1, 15), 2);
        assert_eq!(count_fg(&opened), 0);
    }

    #[test]
    fn opening_removes_text_sized_blobs() {
        let mut img = canvas(40, 40);
        fill(&mut img, 10, 10, 16, 18); // a glyph-sized blob
        assert_eq!(count_fg(&open_rect(&img, Kernel::new(1, 15), 2)), 0);
        assert_eq!(count_fg(&open_rect(&img, Kernel::new(15, 1), 2)), 0);
    }

    #[test]
    fn horizontal_opening_keeps_rules_touching_the_border() {
        let mut img = canvas(30, 5);
        fill(&mut img, 0, 2, 29, 2);
        let opened = open_rect(&img, Kernel::new(15, 1), 2);
        assert_eq!(opened, img);
    }

    #[test]
    fn blend_rounds_half_up() {
        let mut a = canvas(3, 1);
        let mut b = canvas(3, 1);
        a.put_pixel(0, 0, Luma([255]));
        a.put_pixel(1, 0, Luma([255]));
        b.put_pixel(1, 0, Luma([255]));
        let m = blend_equal(&a, &b);
        assert_eq!(m.get_pixel(0, 0).0[0], 128);
        assert_eq!(m.get_pixel(1, 0).0[0], 255);
        assert_eq!(m.get_pixel(2, 0).0[0], 0);
    }

    #[test]
    fn unit_kernel_is_identity() {
        let mut img = canvas(8, 8);
        fill(&mut img, 2, 2, 3, 5);
        assert_eq!(erode_rect(&img, Kernel::new(1, 1)), img);
        assert_eq!(dilate_rect(&img, Kernel::new(1, 1)), img);
    }
}
