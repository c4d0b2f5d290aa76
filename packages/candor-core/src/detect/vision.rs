//! Shared pixel-statistics helpers for the visual detectors.
//!
//! These scans are the heuristic analogue of the cascade/contour stages in
//! model-backed pipelines: cheap, deterministic, and good enough to separate
//! "face present and steady" from "empty chair".

use crate::media::VideoFrame;

/// A rectangular sub-region of a frame in pixel coordinates (half-open).
#[derive(Debug, Clone, Copy)]
pub struct Region {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl Region {
    /// The full frame.
    pub fn full(frame: &VideoFrame) -> Self {
        Self {
            x0: 0,
            y0: 0,
            x1: frame.width,
            y1: frame.height,
        }
    }

    /// A fractional sub-region of the frame (fractions in [0, 1]).
    pub fn fraction(frame: &VideoFrame, fx0: f32, fy0: f32, fx1: f32, fy1: f32) -> Self {
        let w = frame.width as f32;
        let h = frame.height as f32;
        Self {
            x0: (fx0 * w) as u32,
            y0: (fy0 * h) as u32,
            x1: ((fx1 * w) as u32).min(frame.width),
            y1: ((fy1 * h) as u32).min(frame.height),
        }
    }

    pub fn pixel_count(&self) -> u64 {
        let w = self.x1.saturating_sub(self.x0) as u64;
        let h = self.y1.saturating_sub(self.y0) as u64;
        w * h
    }
}

/// Mean and standard deviation of luminance over a region.
#[derive(Debug, Clone, Copy)]
pub struct LuminanceStats {
    pub mean: f32,
    pub std_dev: f32,
}

/// Rec. 601 luma from an RGB triplet.
#[inline]
fn luma(r: u8, g: u8, b: u8) -> f32 {
    0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32
}

/// Computes luminance statistics over a region.
///
/// Returns zeroed stats for a degenerate region.
pub fn luminance_stats(frame: &VideoFrame, region: Region) -> LuminanceStats {
    let count = region.pixel_count();
    if count == 0 {
        return LuminanceStats {
            mean: 0.0,
            std_dev: 0.0,
        };
    }
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    for y in region.y0..region.y1 {
        for x in region.x0..region.x1 {
            let (r, g, b) = frame.pixel(x, y);
            let l = luma(r, g, b) as f64;
            sum += l;
            sum_sq += l * l;
        }
    }
    let mean = sum / count as f64;
    let variance = (sum_sq / count as f64 - mean * mean).max(0.0);
    LuminanceStats {
        mean: mean as f32,
        std_dev: variance.sqrt() as f32,
    }
}

/// Whether an RGB pixel falls in the skin-tone band.
///
/// RGB-space approximation of the HSV skin mask used in cascade-free hand
/// detection: dominant red channel, moderate green, red/green separation.
#[inline]
pub fn is_skin(r: u8, g: u8, b: u8) -> bool {
    let (r, g, b) = (r as i32, g as i32, b as i32);
    r > 95 && g > 40 && b > 20 && r > g && r > b && (r - g) > 15
}

/// Fraction of skin-tone pixels in a region (0 when the region is empty).
pub fn skin_ratio(frame: &VideoFrame, region: Region) -> f32 {
    let count = region.pixel_count();
    if count == 0 {
        return 0.0;
    }
    let mut skin = 0u64;
    for y in region.y0..region.y1 {
        for x in region.x0..region.x1 {
            let (r, g, b) = frame.pixel(x, y);
            if is_skin(r, g, b) {
                skin += 1;
            }
        }
    }
    skin as f32 / count as f32
}

/// Mean absolute horizontal luminance gradient over a region.
///
/// A proxy for texture/edge density: flat walls score near zero, facial
/// features and fingers score high.
pub fn edge_energy(frame: &VideoFrame, region: Region) -> f32 {
    if region.x1.saturating_sub(region.x0) < 2 || region.pixel_count() == 0 {
        return 0.0;
    }
    let mut sum = 0.0f64;
    let mut count = 0u64;
    for y in region.y0..region.y1 {
        for x in region.x0..region.x1 - 1 {
            let (r0, g0, b0) = frame.pixel(x, y);
            let (r1, g1, b1) = frame.pixel(x + 1, y);
            sum += (luma(r0, g0, b0) - luma(r1, g1, b1)).abs() as f64;
            count += 1;
        }
    }
    (sum / count as f64) as f32
}
