//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.
//!
//! Rounding is `f64::round` (half away from zero) everywhere, and every
//! computed edge is clamped to at least one pixel so a degenerate ratio
//! never produces an empty surface.

/// Height that keeps the `original` aspect ratio at the given width.
///
/// # Examples
/// ```
/// # use imgconv::imaging::height_for_width;
/// // 1000x750 scaled to 400 wide → 300 high
/// assert_eq!(height_for_width((1000, 750), 400), 300);
/// ```
pub fn height_for_width(original: (u32, u32), width: u32) -> u32 {
    let (orig_w, orig_h) = original;
    scale_edge(width, orig_h, orig_w)
}

/// Width that keeps the `original` aspect ratio at the given height.
///
/// # Examples
/// ```
/// # use imgconv::imaging::width_for_height;
/// // 1000x750 scaled to 300 high → 400 wide
/// assert_eq!(width_for_height((1000, 750), 300), 400);
/// ```
pub fn width_for_height(original: (u32, u32), height: u32) -> u32 {
    let (orig_w, orig_h) = original;
    scale_edge(height, orig_w, orig_h)
}

fn scale_edge(edge: u32, numerator: u32, denominator: u32) -> u32 {
    let scaled = (edge as f64 * numerator as f64 / denominator as f64).round();
    scaled.clamp(1.0, u32::MAX as f64) as u32
}

/// Resolve the output size for a conversion.
///
/// - No target → original size.
/// - Both targets → used verbatim; the aspect ratio is not enforced here.
/// - One target → the other edge follows the original aspect ratio.
///
/// Callers guarantee `original` has non-zero edges.
///
/// # Examples
/// ```
/// # use imgconv::imaging::resolve_dimensions;
/// assert_eq!(resolve_dimensions((800, 600), None, None), (800, 600));
/// assert_eq!(resolve_dimensions((800, 600), Some(400), None), (400, 300));
/// assert_eq!(resolve_dimensions((800, 600), Some(50), Some(50)), (50, 50));
/// ```
pub fn resolve_dimensions(
    original: (u32, u32),
    target_width: Option<u32>,
    target_height: Option<u32>,
) -> (u32, u32) {
    match (target_width, target_height) {
        (None, None) => original,
        (Some(w), Some(h)) => (w.max(1), h.max(1)),
        (Some(w), None) => {
            let w = w.max(1);
            (w, height_for_width(original, w))
        }
        (None, Some(h)) => {
            let h = h.max(1);
            (width_for_height(original, h), h)
        }
    }
}
