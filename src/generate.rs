use std::fmt::Write;

use log::{debug, trace, warn};
use thiserror::Error;

use crate::aperture::{ApertureError, ApertureId, ApertureRegistry, DeclaredApertures};
use crate::board::{Board, ElementKind, Layer, PadElement, PadShape, PlacedElement};
use crate::gerber::{GerberSettings, GerberWriteError, GerberWriter};
use crate::geometry::Polarity;
use crate::region::{synthesize, SynthesisError};

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Aperture(#[from] ApertureError),

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error(transparent)]
    Write(#[from] GerberWriteError),
}

/// Plots one board layer into a Gerber document.
///
/// Runs the two-pass discipline the registry requires: a declare pass over
/// every element on the layer, then a draw pass against the finished
/// [`DeclaredApertures`] token. Pour regions are drawn first, because their
/// Clear-polarity holes erase everything beneath them.
pub struct LayerPlotter<'a> {
    board: &'a Board,
    layer: Layer,
}

impl<'a> LayerPlotter<'a> {
    pub fn new(board: &'a Board, layer: Layer) -> Self {
        Self {
            board,
            layer,
        }
    }

    #[profiling::function]
    pub fn plot<W: Write>(&self, settings: GerberSettings, sink: W) -> Result<W, GenerateError> {
        // pass 1: declare
        let mut registry = ApertureRegistry::new();
        for placed in self.on_layer() {
            declare_element(&mut registry, &placed);
        }
        let declared = registry.finish();
        debug!("declare pass for {:?}: {} aperture(s)", self.layer, declared.apertures().len());

        let mut writer = GerberWriter::new(sink, settings)?;
        writer.header()?;
        writer.write_declarations(&declared)?;
        writer.set_polarity(Polarity::Dark)?;

        // pass 2a: pours
        for placed in self.on_layer() {
            let ElementKind::Region(region) = &placed.element.kind else {
                continue;
            };
            if placed.part.is_some() {
                // part-local pours are not supported by this driver
                warn!("skipping pour region {:?} inside a part", placed.id());
                continue;
            }
            let Some(forest) = synthesize(placed.element, self.layer, self.board)? else {
                continue;
            };
            trace!("pour {:?}: {} polygon(s)", placed.id(), forest.node_count());
            let stroke = declared.get_circle(region.stroke_thickness, None)?;
            writer.region_forest(&forest, stroke)?;
            writer.set_polarity(Polarity::Dark)?;
        }

        // pass 2b: everything else on top
        for placed in self.on_layer() {
            draw_element(&mut writer, &declared, &placed)?;
        }

        Ok(writer.finish()?)
    }

    fn on_layer(&self) -> impl Iterator<Item = PlacedElement<'a>> + '_ {
        let layer = self.layer;
        self.board.placed().filter(move |placed| placed.is_on(layer))
    }
}

fn declare_element(registry: &mut ApertureRegistry, placed: &PlacedElement<'_>) {
    match &placed.element.kind {
        ElementKind::Line(line) => {
            registry.declare_circle(line.width, None);
        }
        ElementKind::Arc(arc) => {
            registry.declare_circle(arc.width, None);
        }
        ElementKind::Circle(circle) => {
            registry.declare_circle(circle.diameter, None);
        }
        ElementKind::Polygon(polygon) => {
            if polygon.width > 0.0 {
                registry.declare_circle(polygon.width, None);
            }
        }
        ElementKind::Pad(pad) => {
            declare_pad(registry, placed, pad);
        }
        ElementKind::Region(region) => {
            registry.declare_circle(region.stroke_thickness, None);
        }
        ElementKind::Text(_) => {
            // text rendering belongs to the legend pipeline, not this driver
        }
    }
}

fn declare_pad(registry: &mut ApertureRegistry, placed: &PlacedElement<'_>, pad: &PadElement) {
    let rotation = placed.effective_rotation(pad.rotation);
    match pad.shape {
        PadShape::Circle {
            diameter,
        } => {
            registry.declare_circle(diameter, None);
        }
        PadShape::Rectangle {
            width,
            height,
        } => {
            registry.declare_rectangle(width, height, rotation, None);
        }
        PadShape::RoundRectangle {
            width,
            height,
            corner_radius,
        } => {
            registry.declare_round_rectangle(width, height, corner_radius, rotation, None);
        }
        PadShape::Octagon {
            size,
        } => {
            registry.declare_octagon(size, rotation, None);
        }
        PadShape::Obround {
            width,
            height,
        } => {
            registry.declare_obround(width, height, rotation, None);
        }
    }
}

fn pad_aperture(
    declared: &DeclaredApertures,
    placed: &PlacedElement<'_>,
    pad: &PadElement,
) -> Result<ApertureId, ApertureError> {
    let rotation = placed.effective_rotation(pad.rotation);
    match pad.shape {
        PadShape::Circle {
            diameter,
        } => declared.get_circle(diameter, None),
        PadShape::Rectangle {
            width,
            height,
        } => declared.get_rectangle(width, height, rotation, None),
        PadShape::RoundRectangle {
            width,
            height,
            corner_radius,
        } => declared.get_round_rectangle(width, height, corner_radius, rotation, None),
        PadShape::Octagon {
            size,
        } => declared.get_octagon(size, rotation, None),
        PadShape::Obround {
            width,
            height,
        } => declared.get_obround(width, height, rotation, None),
    }
}

fn draw_element<W: Write>(
    writer: &mut GerberWriter<W>,
    declared: &DeclaredApertures,
    placed: &PlacedElement<'_>,
) -> Result<(), GenerateError> {
    match &placed.element.kind {
        ElementKind::Line(line) => {
            writer.select_aperture(declared.get_circle(line.width, None)?)?;
            writer.move_to(placed.transform_point(line.start))?;
            writer.line_to(placed.transform_point(line.end))?;
        }
        ElementKind::Arc(arc) => {
            writer.select_aperture(declared.get_circle(arc.width, None)?)?;
            writer.move_to(placed.transform_point(arc.start_point()))?;
            let ccw = (arc.sweep > 0.0) ^ placed.flips_winding();
            writer.arc_to(
                placed.transform_point(arc.end_point()),
                placed.transform_point(arc.center),
                ccw,
            )?;
        }
        ElementKind::Circle(circle) => {
            writer.select_aperture(declared.get_circle(circle.diameter, None)?)?;
            writer.flash(placed.transform_point(circle.center))?;
        }
        ElementKind::Polygon(polygon) => {
            let contour = placed.lift(polygon.contour.clone());
            writer.begin_region()?;
            writer.contour_path(&contour)?;
            writer.end_region()?;
            if polygon.width > 0.0 {
                writer.select_aperture(declared.get_circle(polygon.width, None)?)?;
                writer.contour_path(&contour)?;
            }
        }
        ElementKind::Pad(pad) => {
            writer.select_aperture(pad_aperture(declared, placed, pad)?)?;
            writer.flash(placed.transform_point(pad.position))?;
        }
        ElementKind::Region(_) => {
            // already drawn in the pour pass
        }
        ElementKind::Text(_) => {}
    }
    Ok(())
}

#[cfg(test)]
mod plotter_tests {
    use super::*;
    use crate::board::{Net, PadShape, PadStack, Placement, Side};
    use crate::gerber::{CoordinateFormat, FileFunction, FilePart, FilePolarity, Unit};
    use crate::spacial::{Position, Vector};
    use crate::testing::{circular_pad, pour_region, BoardBuilder};

    fn settings() -> GerberSettings {
        GerberSettings {
            unit: Unit::Millimeters,
            coordinate_format: CoordinateFormat::new(3, 5),
            function: FileFunction::Copper {
                layer: 1,
                side: Side::Top,
            },
            file_polarity: FilePolarity::Positive,
            part: FilePart::Single,
            comment: None,
        }
    }

    /// End-to-end scenario: a single circular pad, alone on a copper layer.
    #[test]
    fn test_single_pad_end_to_end() {
        let mut builder = BoardBuilder::new();
        builder.add_pad(Some(Net(1)), circular_pad(Position::new(2.0, 1.0), 1.6));
        let board = builder.build();

        let output = LayerPlotter::new(&board, Layer::TopCopper)
            .plot(settings(), String::new())
            .unwrap();

        assert_eq!(output.matches("%ADD10C,1.6*%").count(), 1);
        assert_eq!(output.matches("%ADD").count(), 1);
        assert_eq!(output.matches("D10*\n").count(), 1);
        assert_eq!(output.matches("D03*").count(), 1);
        assert!(output.contains("X00200000Y00100000D03*"));
        assert!(output.ends_with("M02*\n"));
    }

    #[test]
    fn test_pours_are_drawn_before_flashes() {
        let mut builder = BoardBuilder::new();
        builder.add_region(Some(Net(1)), pour_region(Position::new(0.0, 0.0), 20.0, vec![Layer::TopCopper]));
        builder.add_pad(Some(Net(2)), circular_pad(Position::new(3.0, 0.0), 1.6));
        let board = builder.build();

        let output = LayerPlotter::new(&board, Layer::TopCopper)
            .plot(settings(), String::new())
            .unwrap();

        // the foreign pad punches a Clear hole, then is flashed on top
        let last_region_close = output.rfind("G37*").unwrap();
        let flash = output.rfind("D03*").unwrap();
        assert!(last_region_close < flash);
        assert!(output.contains("%LPC*%"));
    }

    #[test]
    fn test_macro_apertures_for_rotated_rectangle_pad() {
        let mut builder = BoardBuilder::new();
        builder.add_pad(
            Some(Net(1)),
            PadElement {
                position: Position::new(0.0, 0.0),
                shape: PadShape::Rectangle {
                    width: 1.5,
                    height: 0.8,
                },
                rotation: 45.0,
                stack: PadStack::Top,
                drill: None,
            },
        );
        let board = builder.build();

        let output = LayerPlotter::new(&board, Layer::TopCopper)
            .plot(settings(), String::new())
            .unwrap();

        assert!(output.contains("%AMRECTANGLE*"));
        assert!(output.contains("%ADD10RECTANGLE,1.5X0.8X45*%"));
        let macro_pos = output.find("%AMRECTANGLE*").unwrap();
        let aperture_pos = output.find("%ADD10").unwrap();
        assert!(macro_pos < aperture_pos);
    }

    #[test]
    fn test_bottom_part_pad_mirrors_position_and_rotation() {
        let mut builder = BoardBuilder::new();
        builder.board_mut().add_part(
            "U1",
            Placement {
                position: Vector::new(10.0, 0.0),
                rotation: 0.0,
                side: Side::Bottom,
            },
            vec![(
                Some(Net(1)),
                ElementKind::Pad(PadElement {
                    position: Position::new(2.0, 0.0),
                    shape: PadShape::Rectangle {
                        width: 1.0,
                        height: 0.5,
                    },
                    rotation: 30.0,
                    stack: PadStack::Top,
                    drill: None,
                }),
            )],
        );
        let board = builder.build();

        let output = LayerPlotter::new(&board, Layer::BottomCopper)
            .plot(settings(), String::new())
            .unwrap();

        // local (2, 0) mirrored then offset by (10, 0) lands at (8, 0);
        // mirroring negates the pad rotation
        assert!(output.contains("X00800000Y00000000D03*"));
        assert!(output.contains("%ADD10RECTANGLE,1X0.5X330*%"));
    }

    #[test]
    fn test_track_stroke_emission() {
        let mut builder = BoardBuilder::new();
        builder.add_line(
            Some(Net(1)),
            Position::new(0.0, 0.0),
            Position::new(5.0, 0.0),
            0.25,
            Layer::TopCopper,
        );
        let board = builder.build();

        let output = LayerPlotter::new(&board, Layer::TopCopper)
            .plot(settings(), String::new())
            .unwrap();

        assert!(output.contains("%ADD10C,0.25*%"));
        assert!(output.contains("X00000000Y00000000D02*"));
        assert!(output.contains("G01*"));
        assert!(output.contains("X00500000Y00000000D01*"));
    }

    #[test]
    fn test_mask_layer_pour_has_no_holes() {
        let mut builder = BoardBuilder::new();
        builder.add_region(
            Some(Net(1)),
            pour_region(Position::new(0.0, 0.0), 20.0, vec![Layer::TopCopper, Layer::TopMask]),
        );
        builder.add_pad(Some(Net(2)), circular_pad(Position::new(0.0, 0.0), 1.6));
        let board = builder.build();

        let mut mask_settings = settings();
        mask_settings.function = FileFunction::SolderMask {
            side: Side::Top,
        };
        let output = LayerPlotter::new(&board, Layer::TopMask)
            .plot(mask_settings, String::new())
            .unwrap();

        assert!(output.contains("%TF.FileFunction,Soldermask,Top*%"));
        assert_eq!(output.matches("G36*").count(), 1);
        assert!(!output.contains("%LPC*%"));
    }
}
