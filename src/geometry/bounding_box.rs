use log::trace;

use crate::spacial::{Position, Vector};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Mirroring {
    pub x: bool,
    pub y: bool,
}

impl core::ops::BitXor for Mirroring {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x ^ rhs.x,
            y: self.y ^ rhs.y,
        }
    }
}

impl Default for Mirroring {
    fn default() -> Self {
        Self {
            x: false,
            y: false,
        }
    }
}

impl From<[bool; 2]> for Mirroring {
    fn from(value: [bool; 2]) -> Self {
        Self {
            x: value[0],
            y: value[1],
        }
    }
}

/// Placement transform: mirror about the origin, rotate, then translate.
#[derive(Debug, Copy, Clone)]
pub struct Transform2D {
    pub rotation_radians: f64,
    pub mirroring: Mirroring,
    // offset, in board coordinates
    pub offset: Vector,
}

impl Default for Transform2D {
    fn default() -> Self {
        Self {
            rotation_radians: 0.0,
            mirroring: Mirroring::default(),
            offset: Vector::new(0.0, 0.0),
        }
    }
}

impl Transform2D {
    pub fn apply_to_position(&self, pos: Position) -> Position {
        let mut x = pos.x;
        let mut y = pos.y;

        if self.mirroring.x {
            x = -x;
        }
        if self.mirroring.y {
            y = -y;
        }

        let (sin_theta, cos_theta) = self.rotation_radians.sin_cos();
        let rotated_x = x * cos_theta - y * sin_theta;
        let rotated_y = x * sin_theta + y * cos_theta;

        Position::new(rotated_x + self.offset.x, rotated_y + self.offset.y)
    }

    /// True when the transform flips handedness, which reverses arc sweeps
    /// and polygon winding.
    pub fn flips_winding(&self) -> bool {
        self.mirroring.x ^ self.mirroring.y
    }
}

#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub struct BoundingBox {
    pub min: Position,
    pub max: Position,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self {
            min: Position::new(f64::MAX, f64::MAX),
            max: Position::new(f64::MIN, f64::MIN),
        }
    }
}

impl BoundingBox {
    /// Note that a bounding box of 0,0 -> 0,0 is NOT empty
    /// e.g., you could have a shape that defines a rectangle with an origin of 0,0 and a width + height of 0,0.
    ///
    /// Only a bounding box which is the same as the one returned by `default` counts as empty.
    pub fn is_empty(&self) -> bool {
        self.eq(&BoundingBox::default())
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn expand(&mut self, other: &BoundingBox) {
        self.min.x = self.min.x.min(other.min.x);
        self.min.y = self.min.y.min(other.min.y);
        self.max.x = self.max.x.max(other.max.x);
        self.max.y = self.max.y.max(other.max.y);
    }

    /// Returns a new bounding box grown by `margin` on every side.
    pub fn inflated(&self, margin: f64) -> Self {
        let result = Self {
            min: Position::new(self.min.x - margin, self.min.y - margin),
            max: Position::new(self.max.x + margin, self.max.y + margin),
        };
        trace!("inflated bbox by {}: {:?}", margin, result);
        result
    }

    /// Axis-aligned overlap test, touching edges count as intersecting.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    pub fn contains(&self, point: Position) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    /// Returns the geometric center of the bounding box as a Position
    pub fn center(&self) -> Position {
        nalgebra::center(&self.min, &self.max)
    }

    /// Returns 4 corner points of the bounding box such that the result is useable as a closed path.
    /// ```plaintext
    /// (min_x, min_y) 1 ┌────────────┐ 2 (max_x, min_y)
    ///                  │            │
    /// (min_x, max_y) 4 └────────────┘ 3 (max_x, max_y)
    /// ```
    pub fn vertices(&self) -> Vec<Position> {
        vec![
            Position::new(self.min.x, self.min.y),
            Position::new(self.max.x, self.min.y),
            Position::new(self.max.x, self.max.y),
            Position::new(self.min.x, self.max.y),
        ]
    }

    /// Constructs a bounding box from a list of points
    pub fn from_points(points: &[Position]) -> Self {
        let mut min = Position::new(f64::MAX, f64::MAX);
        let mut max = Position::new(f64::MIN, f64::MIN);

        for point in points {
            min.x = min.x.min(point.x);
            min.y = min.y.min(point.y);
            max.x = max.x.max(point.x);
            max.y = max.y.max(point.y);
        }

        Self {
            min,
            max,
        }
    }
}

#[cfg(test)]
mod bbox_tests {
    use rstest::rstest;

    use super::BoundingBox;
    use crate::spacial::Position;

    #[rstest]
    #[case(BoundingBox::default(), true)]
    #[case(BoundingBox { min: Position::new(0.0, 0.0), max: Position::new(0.0, 0.0) }, false)]
    #[case(BoundingBox { min: Position::new(-10.0, -10.0), max: Position::new(10.0, 10.0) }, false)]
    pub fn test_is_empty(#[case] input: BoundingBox, #[case] expected: bool) {
        assert_eq!(input.is_empty(), expected);
    }

    #[rstest]
    #[case((0.0, 0.0), (10.0, 10.0), (5.0, 5.0))] // Case 1: Origin 0, 10x10
    #[case((10.0, 10.0), (10.0, 10.0), (15.0, 15.0))] // Case 2: Origin 10, 10x10
    #[case((0.0, 0.0), (5.0, 10.0), (2.5, 5.0))] // Case 3: Origin 0, 5x10
    #[case((10.0, 10.0), (10.0, 5.0), (15.0, 12.5))] // Case 4: Origin 10, 10x5
    fn test_geometric_center(#[case] origin: (f64, f64), #[case] size: (f64, f64), #[case] expected: (f64, f64)) {
        let bbox = BoundingBox {
            min: Position::new(origin.0, origin.1),
            max: Position::new(origin.0 + size.0, origin.1 + size.1),
        };

        let center = bbox.center();

        let epsilon = 1e-9;
        assert!(
            (center.x - expected.0).abs() < epsilon,
            "X mismatch: expected {}, got {}",
            expected.0,
            center.x
        );
        assert!(
            (center.y - expected.1).abs() < epsilon,
            "Y mismatch: expected {}, got {}",
            expected.1,
            center.y
        );
    }

    #[rstest]
    #[case((0.0, 0.0, 2.0, 2.0), (1.0, 1.0, 3.0, 3.0), true)] // overlapping
    #[case((0.0, 0.0, 2.0, 2.0), (2.0, 0.0, 4.0, 2.0), true)] // touching edge
    #[case((0.0, 0.0, 2.0, 2.0), (2.1, 0.0, 4.0, 2.0), false)] // separated in x
    #[case((0.0, 0.0, 2.0, 2.0), (0.0, 5.0, 2.0, 7.0), false)] // separated in y
    fn test_intersects(#[case] a: (f64, f64, f64, f64), #[case] b: (f64, f64, f64, f64), #[case] expected: bool) {
        let a = BoundingBox {
            min: Position::new(a.0, a.1),
            max: Position::new(a.2, a.3),
        };
        let b = BoundingBox {
            min: Position::new(b.0, b.1),
            max: Position::new(b.2, b.3),
        };

        assert_eq!(a.intersects(&b), expected);
        assert_eq!(b.intersects(&a), expected);
    }

    #[test]
    fn test_inflated() {
        let bbox = BoundingBox {
            min: Position::new(1.0, 2.0),
            max: Position::new(3.0, 4.0),
        };

        let inflated = bbox.inflated(0.5);

        assert_eq!(inflated.min, Position::new(0.5, 1.5));
        assert_eq!(inflated.max, Position::new(3.5, 4.5));
    }
}

#[cfg(test)]
mod transform_tests {
    use std::f64::consts::FRAC_PI_2;

    use super::{Mirroring, Transform2D};
    use crate::spacial::{Position, Vector};

    #[test]
    fn test_rotate_then_translate() {
        let transform = Transform2D {
            rotation_radians: FRAC_PI_2,
            mirroring: Mirroring::default(),
            offset: Vector::new(10.0, 0.0),
        };

        let result = transform.apply_to_position(Position::new(1.0, 0.0));

        assert!((result.x - 10.0).abs() < 1e-9);
        assert!((result.y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_mirror_x_flips_winding() {
        let transform = Transform2D {
            rotation_radians: 0.0,
            mirroring: Mirroring::from([true, false]),
            offset: Vector::new(0.0, 0.0),
        };

        assert!(transform.flips_winding());
        assert_eq!(transform.apply_to_position(Position::new(2.0, 1.0)), Position::new(-2.0, 1.0));
    }

    #[test]
    fn test_mirror_both_preserves_winding() {
        let transform = Transform2D {
            rotation_radians: 0.0,
            mirroring: Mirroring::from([true, true]),
            offset: Vector::new(0.0, 0.0),
        };

        assert!(!transform.flips_winding());
    }
}
