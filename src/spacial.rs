pub trait ToVector {
    fn to_vector(self) -> Vector;
}

impl ToVector for Position {
    fn to_vector(self) -> Vector {
        Vector::new(self.x, self.y)
    }
}

pub trait ToPosition {
    fn to_position(self) -> Position;
}

impl ToPosition for Vector {
    fn to_position(self) -> Position {
        Position::new(self.x, self.y)
    }
}

pub type Vector = nalgebra::Vector2<f64>;
pub type Position = nalgebra::Point2<f64>;
pub type Size = nalgebra::Vector2<f64>;
