//! Report paginator.
//!
//! A rendered report is one tall bitmap. Printing it on A4 means cutting it
//! into page-sized horizontal slices, and a naive fixed-height cut goes
//! straight through cards and table rows. The rasteriser therefore also
//! reports "safe breaks": the bottom edges of blocks that must not be split.
//! [`paginate`] prefers the lowest safe break that still fits on the page and
//! only cuts mid-block when no break is reachable.
//!
//! The core is a pure function of `(height, breaks, budget, policy)` and knows
//! nothing about how the breaks were measured.

use serde::{Deserialize, Serialize};

/// A4 portrait dimensions in millimetres.
pub const A4_WIDTH_MM: f64 = 210.0;
pub const A4_HEIGHT_MM: f64 = 297.0;

pub const MIN_MARGIN_MM: f64 = 5.0;
pub const MAX_MARGIN_MM: f64 = 20.0;

/// Minimum CSS-pixel distance between two kept break candidates.
pub const MIN_BREAK_GAP_CSS: f64 = 24.0;

/// One horizontal band of the source bitmap, in bitmap pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slice {
    pub y: u32,
    pub height: u32,
}

impl Slice {
    pub fn end(&self) -> u32 {
        self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlicePolicy {
    /// A break closer than this to the slice start is ignored.
    pub min_slice: u32,
    /// Pixels left above a chosen break so the block border is not clipped.
    pub safe_padding: u32,
}

impl Default for SlicePolicy {
    fn default() -> Self {
        Self {
            min_slice: 240,
            safe_padding: 20,
        }
    }
}

/// Cut `[0, bitmap_height)` into consecutive slices no taller than
/// `usable_height_px`.
///
/// The slices cover the bitmap exactly, with no gap or overlap, whatever the
/// breakpoints are. Every slice is non-empty, so `y` strictly increases and
/// the loop terminates. An empty break set gives fixed-height slicing.
pub fn paginate(
    bitmap_height: u32,
    breakpoints: &[u32],
    usable_height_px: u32,
    policy: &SlicePolicy,
) -> Vec<Slice> {
    let usable = usable_height_px.max(1);
    let mut breaks = breakpoints.to_vec();
    breaks.sort_unstable();
    breaks.dedup();

    let mut slices = Vec::new();
    let mut y = 0u32;
    while y < bitmap_height {
        let target = y.saturating_add(usable);
        let floor = y.saturating_add(policy.min_slice);

        let candidate = breaks
            .iter()
            .rev()
            .find(|&&b| b <= target && b >= floor)
            .copied();

        let mut end = match candidate {
            Some(b) => b.saturating_sub(policy.safe_padding),
            None => target,
        };
        end = end.min(bitmap_height);
        if end <= y {
            end = target.min(bitmap_height);
        }

        slices.push(Slice {
            y,
            height: end - y,
        });
        y = end;
    }
    slices
}

/// Turn measured CSS-pixel block bottoms into bitmap-pixel breakpoints.
///
/// Non-positive offsets are dropped. Candidates are sorted and one is kept
/// only when it lies more than `min_gap_css` below the previously kept one.
/// `scale` is bitmap width over the container's CSS width.
pub fn safe_breaks(css_bottoms: &[f64], min_gap_css: f64, scale: f64) -> Vec<u32> {
    let mut candidates: Vec<f64> = css_bottoms
        .iter()
        .copied()
        .filter(|y| y.is_finite() && *y > 0.0)
        .collect();
    candidates.sort_by(|a, b| a.total_cmp(b));

    let mut kept: Vec<f64> = Vec::new();
    for y in candidates {
        match kept.last() {
            Some(last) if (y - last).abs() <= min_gap_css => {}
            _ => kept.push(y.round()),
        }
    }

    let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
    kept.into_iter()
        .map(|y| (y * scale).round().clamp(0.0, u32::MAX as f64) as u32)
        .collect()
}

/// Scale between bitmap pixels and CSS pixels. Falls back to `1.0` when the
/// container width is unknown.
pub fn scale_factor(bitmap_width: u32, container_css_width: Option<f64>) -> f64 {
    match container_css_width {
        Some(w) if w.is_finite() && w > 0.0 => bitmap_width as f64 / w,
        _ => 1.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// Physical page geometry for one export, in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub orientation: Orientation,
    pub page_width_mm: f64,
    pub page_height_mm: f64,
    pub margin_mm: f64,
}

impl PageLayout {
    /// A4, landscape when the bitmap is at least as wide as it is tall.
    /// The margin is clamped to 5–20 mm.
    pub fn a4_for(bitmap_width: u32, bitmap_height: u32, margin_mm: f64) -> Self {
        let orientation = if bitmap_width >= bitmap_height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        };
        let (page_width_mm, page_height_mm) = match orientation {
            Orientation::Portrait => (A4_WIDTH_MM, A4_HEIGHT_MM),
            Orientation::Landscape => (A4_HEIGHT_MM, A4_WIDTH_MM),
        };
        Self {
            orientation,
            page_width_mm,
            page_height_mm,
            margin_mm: clamp_margin(margin_mm),
        }
    }

    /// Width of the placed image: the page minus both side margins.
    pub fn image_width_mm(&self) -> f64 {
        self.page_width_mm - 2.0 * self.margin_mm
    }

    pub fn printable_height_mm(&self) -> f64 {
        self.page_height_mm - 2.0 * self.margin_mm
    }

    /// Bitmap pixels per millimetre once the bitmap is fit to the image width.
    pub fn px_per_mm(&self, bitmap_width: u32) -> f64 {
        bitmap_width as f64 / self.image_width_mm()
    }

    /// Printable page height expressed in bitmap pixels.
    pub fn usable_height_px(&self, bitmap_width: u32) -> u32 {
        let px = self.printable_height_mm() * self.px_per_mm(bitmap_width);
        px.floor().max(1.0) as u32
    }
}

pub fn clamp_margin(margin_mm: f64) -> f64 {
    if margin_mm.is_finite() {
        margin_mm.clamp(MIN_MARGIN_MM, MAX_MARGIN_MM)
    } else {
        MAX_MARGIN_MM
    }
}
