//! Correlation-based matching of templates against captured frames

use super::template::{Template, TemplateSet};
use crate::adb::Frame;
use image::GrayImage;
use imageproc::template_matching::{MatchTemplateMethod, match_template};

/// Center coordinate of a successful match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

/// Find the best match of `template` in `frame`.
///
/// Computes the full correlation surface at the template's native scale and
/// returns the center point of the global maximum if its score reaches the
/// template's threshold. A frame smaller than the template yields `None`,
/// not an error. Stateless: repeated calls on the same inputs return the
/// same result.
pub fn find(frame: &Frame, template: &Template) -> Option<Point> {
    let tmpl = template.load()?;
    find_in(&frame.gray, &tmpl, template.threshold)
}

/// True iff the maximum correlation score reaches the template's threshold.
pub fn exists(frame: &Frame, template: &Template) -> bool {
    find(frame, template).is_some()
}

/// First-hit match over a template set, in alphabetical file-name order.
pub fn find_any(frame: &Frame, set: &TemplateSet) -> Option<Point> {
    set.templates()
        .iter()
        .find_map(|template| find(frame, template))
}

/// True iff any template in the set matches the frame.
pub fn exists_any(frame: &Frame, set: &TemplateSet) -> bool {
    find_any(frame, set).is_some()
}

fn find_in(haystack: &GrayImage, needle: &GrayImage, threshold: f32) -> Option<Point> {
    if needle.width() == 0
        || needle.height() == 0
        || haystack.width() < needle.width()
        || haystack.height() < needle.height()
    {
        return None;
    }

    let surface = match_template(
        haystack,
        needle,
        MatchTemplateMethod::CrossCorrelationNormalized,
    );

    // Global maximum across the whole correlation surface; ties resolve to
    // the first maximal score encountered.
    let mut best_score = f32::MIN;
    let mut best = (0u32, 0u32);
    for (x, y, pixel) in surface.enumerate_pixels() {
        let score = pixel[0];
        if score > best_score {
            best_score = score;
            best = (x, y);
        }
    }

    if best_score >= threshold {
        Some(Point {
            x: best.0 + needle.width() / 2,
            y: best.1 + needle.height() / 2,
        })
    } else {
        None
    }
}
