mod bounding_box;
mod contour;
mod forest;

pub use bounding_box::*;
pub use contour::*;
pub use forest::*;

use crate::spacial::Position;

pub enum Winding {
    /// Aka 'Positive' in Geometry
    Clockwise,
    /// Aka 'Negative' in Geometry
    CounterClockwise,
}

impl Winding {
    pub fn from_vertices(vertices: &[Position]) -> Winding {
        let mut sum = 0.0;
        for i in 0..vertices.len() {
            let j = (i + 1) % vertices.len();
            sum += vertices[i].x * vertices[j].y - vertices[j].x * vertices[i].y;
        }
        if sum > 0.0 {
            Winding::CounterClockwise
        } else {
            Winding::Clockwise
        }
    }
}

/// Even-odd point-in-polygon test over straight vertices.
///
/// Points exactly on an edge are not reliably classified; callers use this on
/// strictly nested loops where that never matters.
pub fn point_in_polygon(point: Position, vertices: &[Position]) -> bool {
    let mut inside = false;
    let n = vertices.len();
    if n < 3 {
        return false;
    }

    let mut j = n - 1;
    for i in 0..n {
        let a = vertices[i];
        let b = vertices[j];
        if (a.y > point.y) != (b.y > point.y) {
            let intersect_x = (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x;
            if point.x < intersect_x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod winding_tests {
    use super::*;

    #[test]
    fn test_ccw_square() {
        let vertices = vec![
            Position::new(0.0, 0.0),
            Position::new(1.0, 0.0),
            Position::new(1.0, 1.0),
            Position::new(0.0, 1.0),
        ];
        assert!(matches!(Winding::from_vertices(&vertices), Winding::CounterClockwise));
    }

    #[test]
    fn test_cw_square() {
        let vertices = vec![
            Position::new(0.0, 0.0),
            Position::new(0.0, 1.0),
            Position::new(1.0, 1.0),
            Position::new(1.0, 0.0),
        ];
        assert!(matches!(Winding::from_vertices(&vertices), Winding::Clockwise));
    }
}

#[cfg(test)]
mod containment_tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Position::new(0.5, 0.5), true)]
    #[case(Position::new(1.5, 0.5), false)]
    #[case(Position::new(-0.1, 0.5), false)]
    #[case(Position::new(0.9, 0.9), true)]
    fn test_point_in_unit_square(#[case] point: Position, #[case] expected: bool) {
        let vertices = vec![
            Position::new(0.0, 0.0),
            Position::new(1.0, 0.0),
            Position::new(1.0, 1.0),
            Position::new(0.0, 1.0),
        ];
        assert_eq!(point_in_polygon(point, &vertices), expected);
    }
}
