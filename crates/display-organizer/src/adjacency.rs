//! Snapping two display boxes together along their shared edge.

use display_organizer_core::Aabb;
use nalgebra::Vector2;

/// Translation to apply to `b` so it touches `a`.
///
/// Boxes that already overlap or touch (inclusive on both axes, including
/// full containment) yield a zero translation. Otherwise each axis closes
/// its separating gap; when only a diagonal corner gap exists both axes move.
/// If neither axis reports a positive gap the axis with the strictly smaller
/// overlap is used (y on a tie), pushed in the direction of whichever box
/// starts first.
pub fn resolve_adjacency(a: &Aabb, b: &Aabb) -> Vector2<f64> {
    if a.touches_or_overlaps(b) {
        return Vector2::zeros();
    }

    let dx = axis_push(a.min.x, a.max.x, b.min.x, b.max.x);
    let dy = axis_push(a.min.y, a.max.y, b.min.y, b.max.y);
    if dx != 0.0 || dy != 0.0 {
        return Vector2::new(dx, dy);
    }

    let overlap_x = (a.max.x.min(b.max.x) - a.min.x.max(b.min.x)).max(0.0);
    let overlap_y = (a.max.y.min(b.max.y) - a.min.y.max(b.min.y)).max(0.0);
    if overlap_x < overlap_y {
        Vector2::new(fallback_push(a.min.x, a.max.x, b.min.x, b.max.x), 0.0)
    } else {
        Vector2::new(0.0, fallback_push(a.min.y, a.max.y, b.min.y, b.max.y))
    }
}

fn axis_push(a_min: f64, a_max: f64, b_min: f64, b_max: f64) -> f64 {
    if (a_max - b_min).abs() < (b_max - a_min).abs() {
        // b lies after a
        let gap = b_min - a_max;
        if gap > 0.0 {
            -gap
        } else {
            0.0
        }
    } else {
        let gap = a_min - b_max;
        if gap > 0.0 {
            gap
        } else {
            0.0
        }
    }
}

fn fallback_push(a_min: f64, a_max: f64, b_min: f64, b_max: f64) -> f64 {
    if a_min < b_min {
        a_max - b_min
    } else {
        a_min - b_max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point2;

    fn bx(x0: f64, y0: f64, x1: f64, y1: f64) -> Aabb {
        Aabb::new(Point2::new(x0, y0), Point2::new(x1, y1))
    }

    #[test]
    fn closes_horizontal_gap() {
        let a = bx(0.0, 0.0, 1000.0, 600.0);
        let b = bx(1050.0, 0.0, 2050.0, 600.0);
        assert_eq!(resolve_adjacency(&a, &b), Vector2::new(-50.0, 0.0));
    }

    #[test]
    fn second_application_is_a_no_op() {
        let a = bx(0.0, 0.0, 1000.0, 600.0);
        let b = bx(1050.0, 20.0, 2050.0, 620.0);
        let t = resolve_adjacency(&a, &b);
        let moved = b.translated(t);
        assert_eq!(moved.min.x, 1000.0);
        assert_eq!(resolve_adjacency(&a, &moved), Vector2::zeros());
    }

    #[test]
    fn box_before_a_is_pushed_forward() {
        let a = bx(0.0, 0.0, 100.0, 100.0);
        let above = bx(10.0, -180.0, 90.0, -30.0);
        assert_eq!(resolve_adjacency(&a, &above), Vector2::new(0.0, 30.0));
        let left = bx(-300.0, 0.0, -40.0, 100.0);
        assert_eq!(resolve_adjacency(&a, &left), Vector2::new(40.0, 0.0));
    }

    #[test]
    fn diagonal_gap_moves_both_axes() {
        let a = bx(0.0, 0.0, 100.0, 100.0);
        let b = bx(120.0, 130.0, 200.0, 200.0);
        let t = resolve_adjacency(&a, &b);
        assert_eq!(t, Vector2::new(-20.0, -30.0));
        assert!(a.touches_or_overlaps(&b.translated(t)));
    }

    #[test]
    fn overlap_and_containment_return_zero() {
        let a = bx(0.0, 0.0, 100.0, 100.0);
        assert_eq!(resolve_adjacency(&a, &bx(10.0, 10.0, 20.0, 20.0)), Vector2::zeros());
        assert_eq!(resolve_adjacency(&a, &bx(50.0, 50.0, 150.0, 150.0)), Vector2::zeros());
        assert_eq!(resolve_adjacency(&a, &bx(100.0, 0.0, 200.0, 100.0)), Vector2::zeros());
    }

    #[test]
    fn degenerate_boxes_fall_back_to_y_on_equal_overlap() {
        let a = bx(0.0, 0.0, 0.0, 0.0);
        let b = bx(5.0, 5.0, 5.0, 5.0);
        assert_eq!(resolve_adjacency(&a, &b), Vector2::new(0.0, -5.0));
        assert_eq!(resolve_adjacency(&b, &a), Vector2::new(0.0, 5.0));
    }

    #[test]
    fn degenerate_boxes_fall_back_to_smaller_overlap_axis() {
        // Zero-height strips sharing x: y has the smaller overlap.
        let a = bx(0.0, 0.0, 10.0, 0.0);
        let b = bx(4.0, 3.0, 10.0, 3.0);
        assert_eq!(resolve_adjacency(&a, &b), Vector2::new(0.0, -3.0));

        // Zero-width strips sharing y: x has the smaller overlap.
        let a = bx(0.0, 0.0, 0.0, 10.0);
        let b = bx(3.0, 4.0, 3.0, 10.0);
        assert_eq!(resolve_adjacency(&a, &b), Vector2::new(-3.0, 0.0));
    }

    #[test]
    fn inputs_are_untouched() {
        let a = bx(0.0, 0.0, 10.0, 10.0);
        let b = bx(20.0, 0.0, 30.0, 10.0);
        let (a0, b0) = (a, b);
        let _ = resolve_adjacency(&a, &b);
        assert_eq!((a, b), (a0, b0));
    }
}
