//! Board fixtures shared by unit tests and benchmarks.

use crate::board::{
    Board, CircleElement, ElementId, ElementKind, Layer, LineElement, Net, PadElement, PadShape, PadStack, PourRegion,
};
use crate::geometry::Contour;
use crate::spacial::Position;

/// A plain top-side circular pad with no drill.
pub fn circular_pad(position: Position, diameter: f64) -> PadElement {
    PadElement {
        position,
        shape: PadShape::Circle {
            diameter,
        },
        rotation: 0.0,
        stack: PadStack::Top,
        drill: None,
    }
}

/// A square pour of the given size, clearance 0.2mm, stroke 0.2mm.
pub fn pour_region(center: Position, size: f64, layers: Vec<Layer>) -> PourRegion {
    PourRegion {
        contour: Contour::rectangle(center, size, size, 0.0),
        layers,
        clearance: 0.2,
        stroke_thickness: 0.2,
    }
}

/// Convenience wrapper around [`Board`] for building test scenarios; the
/// default net-class clearance is 0.2mm.
pub struct BoardBuilder {
    board: Board,
}

impl Default for BoardBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardBuilder {
    pub fn new() -> Self {
        Self {
            board: Board::new(0.2),
        }
    }

    pub fn add_region(&mut self, net: Option<Net>, region: PourRegion) -> ElementId {
        self.board.add(net, ElementKind::Region(region))
    }

    pub fn add_pad(&mut self, net: Option<Net>, pad: PadElement) -> ElementId {
        self.board.add(net, ElementKind::Pad(pad))
    }

    pub fn add_line(&mut self, net: Option<Net>, start: Position, end: Position, width: f64, layer: Layer) -> ElementId {
        self.board.add(
            net,
            ElementKind::Line(LineElement {
                start,
                end,
                width,
                layer,
            }),
        )
    }

    pub fn add_circle(&mut self, net: Option<Net>, center: Position, diameter: f64, layer: Layer) -> ElementId {
        self.board.add(
            net,
            ElementKind::Circle(CircleElement {
                center,
                diameter,
                layer,
            }),
        )
    }

    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub fn build(self) -> Board {
        self.board
    }
}
