//! Unit conversion utilities.
//!
//! RTF measures lengths in twips (1/20 point) and font sizes in half-points.
//! Document models usually work in device pixels and points; the conversions
//! here are shared by the parser and the writer so both directions agree.

pub const TWIPS_PER_INCH: i32 = 1440;
pub const POINTS_PER_INCH: u32 = 72;

const MILLIPOINTS_PER_POINT: f64 = 1000.0;

/// Resolution at which one pixel equals one point.
pub const DEFAULT_DPI: u32 = POINTS_PER_INCH;

/// Convert twips to pixels at `dpi`, truncating toward zero.
#[inline]
pub fn twips_to_pixels(twips: i32, dpi: u32) -> i32 {
    ((twips as i64 * dpi as i64) / TWIPS_PER_INCH as i64) as i32
}

#[inline]
pub fn pixels_to_twips(pixels: i32, dpi: u32) -> i32 {
    if dpi == 0 {
        return 0;
    }
    ((pixels as i64 * TWIPS_PER_INCH as i64) / dpi as i64) as i32
}

#[inline]
pub fn half_points_to_points(half_points: i32) -> f64 {
    half_points as f64 / 2.0
}

/// Convert points to whole half-points, truncating any remainder.
#[inline]
pub fn points_to_half_points(points: f64) -> i32 {
    (points * 2.0) as i32
}

#[inline]
pub fn points_to_millipoints(points: f64) -> i32 {
    (points * MILLIPOINTS_PER_POINT).round() as i32
}

#[inline]
pub fn millipoints_to_points(millipoints: i32) -> f64 {
    millipoints as f64 / MILLIPOINTS_PER_POINT
}
