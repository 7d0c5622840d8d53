use std::collections::HashMap;

use log::trace;

use crate::aperture::OCTAGON_PHASE_DEGREES;
use crate::geometry::{Contour, Mirroring, Transform2D};
use crate::spacial::{Position, Vector};

/// Board side, viewed from the top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Side {
    Top,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Layer {
    TopCopper,
    BottomCopper,
    InnerCopper(u8),
    TopMask,
    BottomMask,
    TopSilk,
    BottomSilk,
    TopPaste,
    BottomPaste,
    /// Keep-out for copper pours, per side.
    TopRestrict,
    BottomRestrict,
    /// Non-plated drills; universal, no side.
    NonPlatedHoles,
    /// The board profile.
    Outline,
}

impl Layer {
    pub fn is_copper(&self) -> bool {
        matches!(self, Layer::TopCopper | Layer::BottomCopper | Layer::InnerCopper(_))
    }

    pub fn side(&self) -> Option<Side> {
        match self {
            Layer::TopCopper | Layer::TopMask | Layer::TopSilk | Layer::TopPaste | Layer::TopRestrict => {
                Some(Side::Top)
            }
            Layer::BottomCopper
            | Layer::BottomMask
            | Layer::BottomSilk
            | Layer::BottomPaste
            | Layer::BottomRestrict => Some(Side::Bottom),
            Layer::InnerCopper(_) | Layer::NonPlatedHoles | Layer::Outline => None,
        }
    }

    /// The copper-restriction layer that applies to elements on this layer,
    /// if it has a side. Inner copper layers have no restriction layer.
    pub fn restrict_layer(&self) -> Option<Layer> {
        match self.side() {
            Some(Side::Top) => Some(Layer::TopRestrict),
            Some(Side::Bottom) => Some(Layer::BottomRestrict),
            None => None,
        }
    }

    /// Top/bottom mirror of the layer; side-less layers map to themselves.
    pub fn flipped(&self) -> Layer {
        match self {
            Layer::TopCopper => Layer::BottomCopper,
            Layer::BottomCopper => Layer::TopCopper,
            Layer::TopMask => Layer::BottomMask,
            Layer::BottomMask => Layer::TopMask,
            Layer::TopSilk => Layer::BottomSilk,
            Layer::BottomSilk => Layer::TopSilk,
            Layer::TopPaste => Layer::BottomPaste,
            Layer::BottomPaste => Layer::TopPaste,
            Layer::TopRestrict => Layer::BottomRestrict,
            Layer::BottomRestrict => Layer::TopRestrict,
            Layer::InnerCopper(n) => Layer::InnerCopper(*n),
            Layer::NonPlatedHoles => Layer::NonPlatedHoles,
            Layer::Outline => Layer::Outline,
        }
    }
}

/// Electrical net identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Net(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(u32);

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PadShape {
    Circle { diameter: f64 },
    Rectangle { width: f64, height: f64 },
    RoundRectangle { width: f64, height: f64, corner_radius: f64 },
    Octagon { size: f64 },
    Obround { width: f64, height: f64 },
}

impl PadShape {
    /// The pad outline, inflated by `inflate` on every side.
    ///
    /// Inflation of cornered shapes is the Minkowski sum with a disc, so
    /// rectangles grow rounded corners; the octagon keeps sharp corners,
    /// which over-covers slightly and is therefore safe for clearance.
    pub fn contour(&self, center: Position, rotation_radians: f64, inflate: f64) -> Contour {
        match *self {
            PadShape::Circle {
                diameter,
            } => Contour::circle(center, diameter + 2.0 * inflate),
            PadShape::Rectangle {
                width,
                height,
            } => {
                if inflate > 0.0 {
                    Contour::rounded_rectangle(
                        center,
                        width + 2.0 * inflate,
                        height + 2.0 * inflate,
                        inflate,
                        rotation_radians,
                    )
                } else {
                    Contour::rectangle(center, width, height, rotation_radians)
                }
            }
            PadShape::RoundRectangle {
                width,
                height,
                corner_radius,
            } => Contour::rounded_rectangle(
                center,
                width + 2.0 * inflate,
                height + 2.0 * inflate,
                corner_radius + inflate,
                rotation_radians,
            ),
            PadShape::Octagon {
                size,
            } => Contour::octagon(
                center,
                size + 2.0 * inflate,
                rotation_radians + OCTAGON_PHASE_DEGREES.to_radians(),
            ),
            PadShape::Obround {
                width,
                height,
            } => Contour::stadium(center, width + 2.0 * inflate, height + 2.0 * inflate, rotation_radians),
        }
    }
}

/// Which copper/mask layers a pad participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PadStack {
    Top,
    Bottom,
    Through,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PadElement {
    pub position: Position,
    pub shape: PadShape,
    /// degrees, counter-clockwise
    pub rotation: f64,
    pub stack: PadStack,
    pub drill: Option<f64>,
}

impl PadElement {
    pub fn is_on(&self, layer: Layer) -> bool {
        match self.stack {
            PadStack::Through => {
                layer.is_copper() || matches!(layer, Layer::TopMask | Layer::BottomMask)
            }
            PadStack::Top => matches!(layer, Layer::TopCopper | Layer::TopMask | Layer::TopPaste),
            PadStack::Bottom => matches!(layer, Layer::BottomCopper | Layer::BottomMask | Layer::BottomPaste),
        }
    }

    pub fn outline(&self, inflate: f64) -> Contour {
        self.shape
            .contour(self.position, self.rotation.to_radians(), inflate)
    }

    /// The two bars of a thermal-relief cross, aligned with the pad's axes.
    /// `reach` is the bar length and must exceed the relief ring in every
    /// direction.
    pub fn thermal_cross(&self, bridge_width: f64, reach: f64) -> [Contour; 2] {
        let rotation = self.rotation.to_radians();
        [
            Contour::rectangle(self.position, reach, bridge_width, rotation),
            Contour::rectangle(self.position, bridge_width, reach, rotation),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineElement {
    pub start: Position,
    pub end: Position,
    pub width: f64,
    pub layer: Layer,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArcElement {
    pub center: Position,
    pub radius: f64,
    /// radians
    pub start_angle: f64,
    /// radians, positive counter-clockwise
    pub sweep: f64,
    pub width: f64,
    pub layer: Layer,
}

impl ArcElement {
    pub fn start_point(&self) -> Position {
        let (sin, cos) = self.start_angle.sin_cos();
        self.center + Vector::new(cos, sin) * self.radius
    }

    pub fn end_point(&self) -> Position {
        let angle = self.start_angle + self.sweep;
        let (sin, cos) = angle.sin_cos();
        self.center + Vector::new(cos, sin) * self.radius
    }
}

/// A filled disc (via annulus, test point, fiducial).
#[derive(Debug, Clone, PartialEq)]
pub struct CircleElement {
    pub center: Position,
    pub diameter: f64,
    pub layer: Layer,
}

#[derive(Debug, Clone)]
pub struct PolygonElement {
    pub contour: Contour,
    /// stroke width of the boundary; zero for a bare outline
    pub width: f64,
    pub layer: Layer,
}

#[derive(Debug, Clone)]
pub struct TextElement {
    pub position: Position,
    pub content: String,
    pub layer: Layer,
}

/// A copper pour. The outline is drawn with `stroke_thickness` and filled;
/// on copper layers the fill is isolated from foreign geometry by at least
/// `clearance`.
#[derive(Debug, Clone)]
pub struct PourRegion {
    pub contour: Contour,
    pub layers: Vec<Layer>,
    pub clearance: f64,
    pub stroke_thickness: f64,
}

#[derive(Debug, Clone)]
pub enum ElementKind {
    Line(LineElement),
    Arc(ArcElement),
    Circle(CircleElement),
    Polygon(PolygonElement),
    Pad(PadElement),
    Region(PourRegion),
    Text(TextElement),
}

#[derive(Debug, Clone)]
pub struct Element {
    id: ElementId,
    pub net: Option<Net>,
    pub kind: ElementKind,
}

impl Element {
    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn is_on(&self, layer: Layer) -> bool {
        match &self.kind {
            ElementKind::Line(line) => line.layer == layer,
            ElementKind::Arc(arc) => arc.layer == layer,
            ElementKind::Circle(circle) => circle.layer == layer,
            ElementKind::Polygon(polygon) => polygon.layer == layer,
            ElementKind::Pad(pad) => pad.is_on(layer),
            ElementKind::Region(region) => region.layers.contains(&layer),
            ElementKind::Text(text) => text.layer == layer,
        }
    }

    /// The element's outline(s) inflated by `inflate`, for use as hole
    /// candidates. Text never occludes a pour.
    pub fn hole_outlines(&self, inflate: f64) -> Vec<Contour> {
        match &self.kind {
            ElementKind::Line(line) => {
                vec![Contour::thick_segment(line.start, line.end, line.width / 2.0 + inflate)]
            }
            ElementKind::Arc(arc) => vec![Contour::thick_arc(
                arc.center,
                arc.radius,
                arc.start_angle,
                arc.sweep,
                arc.width / 2.0 + inflate,
            )],
            ElementKind::Circle(circle) => {
                vec![Contour::circle(circle.center, circle.diameter + 2.0 * inflate)]
            }
            ElementKind::Polygon(polygon) => polygon
                .contour
                .inflated(polygon.width / 2.0 + inflate),
            ElementKind::Pad(pad) => vec![pad.outline(inflate)],
            ElementKind::Region(region) => region.contour.inflated(inflate),
            ElementKind::Text(_) => Vec::new(),
        }
    }
}

/// Placement of a part on the board: rotate, flip to the bottom if required,
/// then translate.
#[derive(Debug, Clone, Copy)]
pub struct Placement {
    pub position: Vector,
    /// degrees, counter-clockwise
    pub rotation: f64,
    pub side: Side,
}

impl Placement {
    pub fn transform(&self) -> Transform2D {
        Transform2D {
            rotation_radians: self.rotation.to_radians(),
            mirroring: Mirroring::from([self.side == Side::Bottom, false]),
            offset: self.position,
        }
    }

    /// Maps a part-local layer to the board layer it lands on.
    pub fn map_layer(&self, layer: Layer) -> Layer {
        match self.side {
            Side::Top => layer,
            Side::Bottom => layer.flipped(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Part {
    pub name: String,
    pub placement: Placement,
    pub elements: Vec<Element>,
}

/// One element together with its owning part (if any); geometry queries
/// answer in board coordinates.
#[derive(Debug, Clone, Copy)]
pub struct PlacedElement<'a> {
    pub part: Option<&'a Part>,
    pub element: &'a Element,
}

impl<'a> PlacedElement<'a> {
    pub fn id(&self) -> ElementId {
        self.element.id
    }

    pub fn net(&self) -> Option<Net> {
        self.element.net
    }

    pub fn is_on(&self, layer: Layer) -> bool {
        match self.part {
            // membership is checked in part-local space
            Some(part) => self.element.is_on(part.placement.map_layer(layer)),
            None => self.element.is_on(layer),
        }
    }

    pub fn hole_outlines(&self, inflate: f64) -> Vec<Contour> {
        let outlines = self.element.hole_outlines(inflate);
        match self.part {
            Some(part) => {
                let transform = part.placement.transform();
                outlines
                    .into_iter()
                    .map(|contour| contour.transformed(&transform))
                    .collect()
            }
            None => outlines,
        }
    }

    pub fn pad(&self) -> Option<&'a PadElement> {
        match &self.element.kind {
            ElementKind::Pad(pad) => Some(pad),
            _ => None,
        }
    }

    /// Transforms a contour built in the element's local space into board
    /// coordinates.
    pub fn lift(&self, contour: Contour) -> Contour {
        match self.part {
            Some(part) => contour.transformed(&part.placement.transform()),
            None => contour,
        }
    }

    pub fn transform_point(&self, point: Position) -> Position {
        match self.part {
            Some(part) => part.placement.transform().apply_to_position(point),
            None => point,
        }
    }

    /// True when the owning part's placement mirrors geometry, reversing arc
    /// directions and shape rotations.
    pub fn flips_winding(&self) -> bool {
        self.part
            .map_or(false, |part| part.placement.transform().flips_winding())
    }

    /// The rotation to bake into flashed shapes for this element, in
    /// degrees: the element's own rotation composed with the part placement.
    pub fn effective_rotation(&self, local_degrees: f64) -> f64 {
        match self.part {
            Some(part) => {
                if self.flips_winding() {
                    -(local_degrees + part.placement.rotation)
                } else {
                    local_degrees + part.placement.rotation
                }
            }
            None => local_degrees,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct Board {
    elements: Vec<Element>,
    parts: Vec<Part>,
    net_clearances: HashMap<Net, f64>,
    default_clearance: f64,
    next_id: u32,
}

impl Board {
    pub fn new(default_clearance: f64) -> Self {
        Self {
            default_clearance,
            ..Default::default()
        }
    }

    pub fn add(&mut self, net: Option<Net>, kind: ElementKind) -> ElementId {
        let id = self.allocate_id();
        trace!("board element {:?} added: net {:?}", id, net);
        self.elements.push(Element {
            id,
            net,
            kind,
        });
        id
    }

    pub fn add_part(&mut self, name: &str, placement: Placement, elements: Vec<(Option<Net>, ElementKind)>) {
        let elements = elements
            .into_iter()
            .map(|(net, kind)| Element {
                id: self.allocate_id(),
                net,
                kind,
            })
            .collect();
        self.parts.push(Part {
            name: name.to_string(),
            placement,
            elements,
        });
    }

    fn allocate_id(&mut self) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn set_net_clearance(&mut self, net: Net, clearance: f64) {
        self.net_clearances.insert(net, clearance);
    }

    /// The minimum copper clearance required around elements of `net`.
    pub fn net_clearance(&self, net: Option<Net>) -> f64 {
        net.and_then(|net| self.net_clearances.get(&net).copied())
            .unwrap_or(self.default_clearance)
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.placed().find(|placed| placed.id() == id).map(|placed| placed.element)
    }

    /// Every element on the board, direct or inside a placed part.
    pub fn placed(&self) -> impl Iterator<Item = PlacedElement<'_>> {
        let direct = self.elements.iter().map(|element| PlacedElement {
            part: None,
            element,
        });
        let from_parts = self.parts.iter().flat_map(|part| {
            part.elements.iter().map(move |element| PlacedElement {
                part: Some(part),
                element,
            })
        });
        direct.chain(from_parts)
    }
}


#[cfg(test)]
mod pad_tests {
    use std::f64::consts::PI;

    use rstest::rstest;

    use super::*;

    fn through_pad(diameter: f64) -> PadElement {
        PadElement {
            position: Position::new(0.0, 0.0),
            shape: PadShape::Circle {
                diameter,
            },
            rotation: 0.0,
            stack: PadStack::Through,
            drill: Some(0.8),
        }
    }

    #[rstest]
    #[case(PadStack::Through, Layer::TopCopper, true)]
    #[case(PadStack::Through, Layer::InnerCopper(1), true)]
    #[case(PadStack::Through, Layer::BottomMask, true)]
    #[case(PadStack::Through, Layer::TopPaste, false)]
    #[case(PadStack::Top, Layer::TopCopper, true)]
    #[case(PadStack::Top, Layer::BottomCopper, false)]
    #[case(PadStack::Bottom, Layer::BottomPaste, true)]
    fn test_pad_membership(#[case] stack: PadStack, #[case] layer: Layer, #[case] expected: bool) {
        let pad = PadElement {
            stack,
            ..through_pad(1.6)
        };
        assert_eq!(pad.is_on(layer), expected);
    }

    #[test]
    fn test_circle_pad_outline_inflation() {
        let pad = through_pad(1.6);

        let outline = pad.outline(0.2);

        assert!((outline.area() - PI).abs() < 1e-9); // (1.6 + 0.4) / 2 = 1.0 radius
    }

    #[test]
    fn test_thermal_cross_is_axis_aligned_pair() {
        let pad = through_pad(1.6);

        let [horizontal, vertical] = pad.thermal_cross(0.3, 4.0);

        assert!(horizontal.contains(Position::new(1.9, 0.0)));
        assert!(!horizontal.contains(Position::new(0.0, 1.9)));
        assert!(vertical.contains(Position::new(0.0, 1.9)));
    }
}

#[cfg(test)]
mod placement_tests {
    use super::*;

    #[test]
    fn test_bottom_placement_flips_layers() {
        let placement = Placement {
            position: Vector::new(0.0, 0.0),
            rotation: 0.0,
            side: Side::Bottom,
        };

        assert_eq!(placement.map_layer(Layer::TopCopper), Layer::BottomCopper);
        assert_eq!(placement.map_layer(Layer::Outline), Layer::Outline);
    }

    #[test]
    fn test_part_pad_lands_on_flipped_layer() {
        let mut board = Board::new(0.2);
        board.add_part(
            "R1",
            Placement {
                position: Vector::new(10.0, 0.0),
                rotation: 0.0,
                side: Side::Bottom,
            },
            vec![(
                Some(Net(1)),
                ElementKind::Pad(PadElement {
                    position: Position::new(1.0, 0.0),
                    shape: PadShape::Circle {
                        diameter: 1.0,
                    },
                    rotation: 0.0,
                    stack: PadStack::Top,
                    drill: None,
                }),
            )],
        );

        let placed = board.placed().next().unwrap();
        assert!(placed.is_on(Layer::BottomCopper));
        assert!(!placed.is_on(Layer::TopCopper));

        // pad at local (1, 0) on a bottom part at (10, 0) lands at (9, 0)
        let outlines = placed.hole_outlines(0.0);
        let bbox = outlines[0].bounding_box();
        assert!((bbox.center().x - 9.0).abs() < 1e-6);
    }

    #[test]
    fn test_net_clearance_lookup() {
        let mut board = Board::new(0.2);
        board.set_net_clearance(Net(7), 0.4);

        assert_eq!(board.net_clearance(Some(Net(7))), 0.4);
        assert_eq!(board.net_clearance(Some(Net(8))), 0.2);
        assert_eq!(board.net_clearance(None), 0.2);
    }
}
