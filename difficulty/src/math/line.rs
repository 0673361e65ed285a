//! Planar linear referencing along polylines.

use geo::{
    algorithm::{ClosestPoint, EuclideanLength, LineInterpolatePoint, LineLocatePoint},
    geometry::{Coord, Line, LineString, Point},
    Closest,
};

/// Returns the point on `line` closest to `coord`.
pub fn closest_point(line: &Line<f64>, coord: Coord<f64>) -> Coord<f64> {
    match line.closest_point(&Point::from(coord)) {
        Closest::Intersection(p) | Closest::SinglePoint(p) => p.0,
        // Degenerate line
        Closest::Indeterminate => line.start,
    }
}

/// Returns the distance along `line_string` of the point closest to
/// `coord`.
///
/// Ties resolve to the earliest position along the line.
pub fn project(line_string: &LineString<f64>, coord: Coord<f64>) -> f64 {
    line_string
        .line_locate_point(&Point::from(coord))
        .map_or(0.0, |fraction| fraction * line_string.euclidean_length())
}

/// Returns the point `distance` units along `line_string`.
///
/// Distances are clamped to the line's extent.
pub fn interpolate(line_string: &LineString<f64>, distance: f64) -> Coord<f64> {
    let first = line_string.0.first().copied().unwrap_or(Coord { x: 0.0, y: 0.0 });
    let length = line_string.euclidean_length();
    if length <= 0.0 {
        return first;
    }
    line_string
        .line_interpolate_point(distance / length)
        .map_or(first, |p| p.0)
}

#[cfg(test)]
mod tests {
    use super::{closest_point, interpolate, project};
    use approx::assert_relative_eq;
    use geo::{coord, line_string, Line};

    #[test]
    fn test_project_onto_polyline() {
        let ls = line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0)];
        assert_relative_eq!(project(&ls, coord! { x: 4.0, y: 3.0 }), 4.0, epsilon = 1e-9);
        assert_relative_eq!(project(&ls, coord! { x: 12.0, y: 6.0 }), 16.0, epsilon = 1e-9);
        assert_relative_eq!(project(&ls, coord! { x: -5.0, y: 0.0 }), 0.0);
        assert_relative_eq!(project(&ls, coord! { x: 10.0, y: 20.0 }), 20.0, epsilon = 1e-9);
    }

    #[test]
    fn test_project_tie_takes_earliest() {
        // Equidistant from both legs of the hairpin.
        let ls = line_string![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 2.0),
            (x: 0.0, y: 2.0)
        ];
        assert_relative_eq!(project(&ls, coord! { x: 5.0, y: 1.0 }), 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_interpolate_clamps() {
        let ls = line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0)];
        let mid = interpolate(&ls, 15.0);
        assert_relative_eq!(mid.x, 10.0, epsilon = 1e-9);
        assert_relative_eq!(mid.y, 5.0, epsilon = 1e-9);
        assert_eq!(interpolate(&ls, -1.0), coord! { x: 0.0, y: 0.0 });
        assert_eq!(interpolate(&ls, 99.0), coord! { x: 10.0, y: 10.0 });
    }

    #[test]
    fn test_interpolate_degenerate() {
        let ls = line_string![(x: 3.0, y: 4.0), (x: 3.0, y: 4.0)];
        assert_eq!(interpolate(&ls, 1.0), coord! { x: 3.0, y: 4.0 });
    }

    #[test]
    fn test_project_interpolate_agree() {
        let ls = line_string![(x: 0.0, y: 0.0), (x: 3.0, y: 4.0), (x: 6.0, y: 0.0)];
        let p = interpolate(&ls, 7.5);
        assert_relative_eq!(project(&ls, p), 7.5, epsilon = 1e-9);
    }

    #[test]
    fn test_closest_point() {
        let line = Line::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 10.0, y: 0.0 });
        let on_line = closest_point(&line, coord! { x: 5.0, y: 7.0 });
        assert_relative_eq!(on_line.x, 5.0, epsilon = 1e-9);
        assert_relative_eq!(on_line.y, 0.0, epsilon = 1e-9);
        assert_eq!(closest_point(&line, coord! { x: 15.0, y: 1.0 }), coord! { x: 10.0, y: 0.0 });
        assert_eq!(closest_point(&line, coord! { x: 2.0, y: 0.0 }), coord! { x: 2.0, y: 0.0 });
    }

    #[test]
    fn test_closest_point_degenerate_line() {
        let line = Line::new(coord! { x: 1.0, y: 1.0 }, coord! { x: 1.0, y: 1.0 });
        assert_eq!(closest_point(&line, coord! { x: 5.0, y: 5.0 }), coord! { x: 1.0, y: 1.0 });
    }
}
