use crate::geom::point::Point;

/// Axis-aligned bounding box of all points `pts`.
///
/// Returns `None` for an empty slice.
pub fn bounding_box(pts: &[Point]) -> Option<(Point, Point)> {
    let first = *pts.first()?;
    Some(
        pts.iter()
            .fold((first, first), |(pmin, pmax), &p| (pmin.min(p), pmax.max(p))),
    )
}

/// Bounding box grown by `padding_fraction` of its size on every side.
pub fn padded_bounding_box(pts: &[Point], padding_fraction: f64) -> Option<(Point, Point)> {
    let (pmin, pmax) = bounding_box(pts)?;
    let pad = (pmax - pmin) * padding_fraction;
    Some((pmin + (-pad), pmax + pad))
}

/// All 8 corners of the box `(pmin, pmax)`.
pub fn corners(pmin: Point, pmax: Point) -> [Point; 8] {
    [
        pmin,
        Point::new(pmax.x, pmin.y, pmin.z),
        Point::new(pmin.x, pmax.y, pmin.z),
        Point::new(pmax.x, pmax.y, pmin.z),
        Point::new(pmin.x, pmin.y, pmax.z),
        Point::new(pmax.x, pmin.y, pmax.z),
        Point::new(pmin.x, pmax.y, pmax.z),
        pmax,
    ]
}
