use std::fmt::{self, Write};

use log::{debug, trace};
use thiserror::Error;

use crate::aperture::{
    Aperture, ApertureId, ApertureMacro, ApertureShape, DeclaredApertures, MacroDecimal, MacroId, MacroPrimitive,
    FIRST_APERTURE_CODE,
};
use crate::board::Side;
use crate::geometry::{Contour, ForestNode, Polarity, PolygonForest, MAX_NESTING_DEPTH};
use crate::spacial::Position;

/// The model's fixed-point unit: 10⁻⁶ mm.
pub const FIXED_UNITS_PER_MM: i64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Unit {
    Millimeters,
    Inches,
}

/// The `%FS` coordinate format: every coordinate is emitted as a fixed-point
/// integer with exactly `integer_digits + decimal_digits` digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CoordinateFormat {
    pub integer_digits: u8,
    pub decimal_digits: u8,
}

impl CoordinateFormat {
    pub const fn new(integer_digits: u8, decimal_digits: u8) -> Self {
        Self {
            integer_digits,
            decimal_digits,
        }
    }

    pub fn digits(&self) -> u32 {
        self.integer_digits as u32 + self.decimal_digits as u32
    }

    /// Renders a fixed-point model value (10⁻⁶ mm) with no separator, sign
    /// preserved, left-padded (or truncated by the scaling division) to
    /// exactly `digits()` digits.
    fn format_fixed(&self, value: i64) -> Result<String, GerberWriteError> {
        let scale = 10i64.pow(6 - self.decimal_digits as u32);
        let scaled = value / scale;

        let width = self.digits();
        if scaled.abs() >= 10i64.pow(width) {
            return Err(GerberWriteError::CoordinateOverflow {
                value,
                digits: width,
            });
        }

        let sign = if scaled < 0 { "-" } else { "" };
        Ok(format!("{}{:0width$}", sign, scaled.abs(), width = width as usize))
    }
}

/// The `%TF.FileFunction` attribute value; must reflect the generator's
/// configured role exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FileFunction {
    /// Copper layer, 1-based from the top.
    Copper { layer: u8, side: Side },
    SolderMask { side: Side },
    Legend { side: Side },
    Paste { side: Side },
    Profile,
}

impl fmt::Display for FileFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = |side: &Side| match side {
            Side::Top => "Top",
            Side::Bottom => "Bot",
        };
        match self {
            FileFunction::Copper {
                layer,
                side: s,
            } => write!(f, "Copper,L{},{}", layer, side(s)),
            FileFunction::SolderMask {
                side: s,
            } => write!(f, "Soldermask,{}", side(s)),
            FileFunction::Legend {
                side: s,
            } => write!(f, "Legend,{}", side(s)),
            FileFunction::Paste {
                side: s,
            } => write!(f, "Paste,{}", side(s)),
            FileFunction::Profile => write!(f, "Profile,NP"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FilePolarity {
    Positive,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FilePart {
    Single,
    Array,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GerberSettings {
    pub unit: Unit,
    pub coordinate_format: CoordinateFormat,
    pub function: FileFunction,
    pub file_polarity: FilePolarity,
    pub part: FilePart,
    /// Free-text `G04` banner emitted at the top of the file.
    pub comment: Option<String>,
}

impl GerberSettings {
    pub fn copper(layer: u8, side: Side) -> Self {
        Self {
            unit: Unit::Millimeters,
            coordinate_format: CoordinateFormat::new(4, 6),
            function: FileFunction::Copper {
                layer,
                side,
            },
            file_polarity: FilePolarity::Positive,
            part: FilePart::Single,
            comment: None,
        }
    }
}

/// Document phases, strictly forward:
/// `Created → Header → Macros → Apertures → Body → Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Created,
    Header,
    Macros,
    Apertures,
    Body,
    Finished,
}

#[derive(Debug, Error)]
pub enum GerberWriteError {
    #[error("output sink error: {0}")]
    Sink(#[from] fmt::Error),

    #[error("{operation} called during {phase:?}")]
    OutOfOrder { operation: &'static str, phase: Phase },

    #[error("unsupported coordinate format {integer_digits}.{decimal_digits}")]
    UnsupportedFormat { integer_digits: u8, decimal_digits: u8 },

    #[error("aperture references macro {0} before its definition")]
    MacroNotDefined(&'static str),

    #[error("aperture code D{0} is reserved, codes start at D10")]
    ReservedApertureCode(u32),

    #[error("aperture codes must ascend: got D{code} after D{previous}")]
    ApertureOrder { code: u32, previous: u32 },

    #[error("aperture D{0} was never defined in this document")]
    UnknownAperture(u32),

    #[error("no aperture selected")]
    ApertureNotSelected,

    #[error("polarity was never set")]
    PolarityNotSet,

    #[error("region body already open")]
    RegionAlreadyOpen,

    #[error("no region body open")]
    RegionNotOpen,

    #[error("region body still open")]
    RegionStillOpen,

    #[error("coordinate value {value} exceeds the {digits}-digit format")]
    CoordinateOverflow { value: i64, digits: u32 },

    #[error("non-finite coordinate")]
    NonFiniteCoordinate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interpolation {
    Linear,
    ClockwiseCircular,
    CounterclockwiseCircular,
}

/// Streaming RS-274X writer. Output is emitted strictly in call order; every
/// operation validates the document state it depends on and fails before
/// writing anything malformed.
pub struct GerberWriter<W: Write> {
    sink: W,
    settings: GerberSettings,
    phase: Phase,
    polarity: Option<Polarity>,
    rotation: f64,
    interpolation: Option<Interpolation>,
    current_aperture: Option<u32>,
    position: Option<(i64, i64)>,
    in_region: bool,
    macros_defined: Vec<MacroId>,
    aperture_codes: Vec<u32>,
}

impl<W: Write> GerberWriter<W> {
    pub fn new(sink: W, settings: GerberSettings) -> Result<Self, GerberWriteError> {
        let format = settings.coordinate_format;
        if !(1..=9).contains(&format.integer_digits) || !(1..=6).contains(&format.decimal_digits) {
            return Err(GerberWriteError::UnsupportedFormat {
                integer_digits: format.integer_digits,
                decimal_digits: format.decimal_digits,
            });
        }
        Ok(Self {
            sink,
            settings,
            phase: Phase::Created,
            polarity: None,
            rotation: 0.0,
            interpolation: None,
            current_aperture: None,
            position: None,
            in_region: false,
            macros_defined: Vec::new(),
            aperture_codes: Vec::new(),
        })
    }

    fn require(&self, operation: &'static str, allowed: &[Phase]) -> Result<(), GerberWriteError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(GerberWriteError::OutOfOrder {
                operation,
                phase: self.phase,
            })
        }
    }

    /// Emits the file header: banner comment, file attributes, coordinate
    /// format, unit, and the multi-quadrant arc mode used throughout.
    pub fn header(&mut self) -> Result<(), GerberWriteError> {
        self.require("header", &[Phase::Created])?;

        if let Some(comment) = self.settings.comment.clone() {
            self.comment(&comment)?;
        }
        writeln!(self.sink, "%TF.Part,{}*%", match self.settings.part {
            FilePart::Single => "Single",
            FilePart::Array => "Array",
        })?;
        writeln!(self.sink, "%TF.FileFunction,{}*%", self.settings.function)?;
        writeln!(self.sink, "%TF.FilePolarity,{}*%", match self.settings.file_polarity {
            FilePolarity::Positive => "Positive",
            FilePolarity::Negative => "Negative",
        })?;

        let format = self.settings.coordinate_format;
        writeln!(
            self.sink,
            "%FSLAX{int}{dec}Y{int}{dec}*%",
            int = format.integer_digits,
            dec = format.decimal_digits
        )?;
        writeln!(self.sink, "%MO{}*%", match self.settings.unit {
            Unit::Millimeters => "MM",
            Unit::Inches => "IN",
        })?;
        // all arcs are emitted in multi-quadrant mode
        writeln!(self.sink, "G75*")?;

        self.phase = Phase::Header;
        debug!("gerber header written: {:?}", self.settings.function);
        Ok(())
    }

    /// `G04` comments may appear anywhere before the end of file and must not
    /// affect parsing.
    pub fn comment(&mut self, text: &str) -> Result<(), GerberWriteError> {
        if self.phase == Phase::Finished {
            return Err(GerberWriteError::OutOfOrder {
                operation: "comment",
                phase: self.phase,
            });
        }
        writeln!(self.sink, "G04 {}*", text)?;
        Ok(())
    }

    pub fn write_macro(&mut self, definition: &ApertureMacro) -> Result<(), GerberWriteError> {
        self.require("macro definition", &[Phase::Header, Phase::Macros])?;

        writeln!(self.sink, "%AM{}*", definition.id.name())?;
        for primitive in &definition.content {
            match primitive {
                MacroPrimitive::Comment(text) => writeln!(self.sink, "0 {}*", text)?,
                MacroPrimitive::VariableDefinition {
                    number,
                    expression,
                } => writeln!(self.sink, "${}={}*", number, expression)?,
                MacroPrimitive::Circle {
                    exposure,
                    diameter,
                    center,
                    rotation,
                } => writeln!(
                    self.sink,
                    "1,{},{},{},{},{}*",
                    exposure_digit(*exposure),
                    macro_decimal(diameter),
                    macro_decimal(&center.0),
                    macro_decimal(&center.1),
                    macro_decimal(rotation)
                )?,
                MacroPrimitive::CenterLine {
                    exposure,
                    width,
                    height,
                    center,
                    rotation,
                } => writeln!(
                    self.sink,
                    "21,{},{},{},{},{},{}*",
                    exposure_digit(*exposure),
                    macro_decimal(width),
                    macro_decimal(height),
                    macro_decimal(&center.0),
                    macro_decimal(&center.1),
                    macro_decimal(rotation)
                )?,
            }
        }
        writeln!(self.sink, "%")?;

        self.macros_defined.push(definition.id);
        self.phase = Phase::Macros;
        Ok(())
    }

    pub fn write_aperture(&mut self, aperture: &Aperture) -> Result<(), GerberWriteError> {
        self.require("aperture definition", &[Phase::Header, Phase::Macros, Phase::Apertures])?;

        if aperture.code < FIRST_APERTURE_CODE {
            return Err(GerberWriteError::ReservedApertureCode(aperture.code));
        }
        if let Some(&previous) = self.aperture_codes.last() {
            if aperture.code <= previous {
                return Err(GerberWriteError::ApertureOrder {
                    code: aperture.code,
                    previous,
                });
            }
        }
        if let Some(id) = aperture.macro_id() {
            if !self.macros_defined.contains(&id) {
                return Err(GerberWriteError::MacroNotDefined(id.name()));
            }
        }

        let template = aperture_template(&aperture.shape);
        writeln!(self.sink, "%ADD{}{}*%", aperture.code, template)?;

        self.aperture_codes.push(aperture.code);
        self.phase = Phase::Apertures;
        Ok(())
    }

    /// Writes every macro and aperture of a finished declare phase, in macro
    /// number then D-code order.
    pub fn write_declarations(&mut self, declared: &DeclaredApertures) -> Result<(), GerberWriteError> {
        for definition in declared.macros() {
            self.write_macro(&definition)?;
        }
        for aperture in declared.apertures() {
            self.write_aperture(aperture)?;
        }
        Ok(())
    }

    pub fn select_aperture(&mut self, id: ApertureId) -> Result<(), GerberWriteError> {
        self.require("aperture select", &[Phase::Apertures, Phase::Body])?;
        if !self.aperture_codes.contains(&id.code()) {
            return Err(GerberWriteError::UnknownAperture(id.code()));
        }

        if self.current_aperture != Some(id.code()) {
            writeln!(self.sink, "D{}*", id.code())?;
            self.current_aperture = Some(id.code());
        }
        self.phase = Phase::Body;
        Ok(())
    }

    /// Polarity is sticky; rewriting the current value is suppressed.
    pub fn set_polarity(&mut self, polarity: Polarity) -> Result<(), GerberWriteError> {
        self.require("polarity", &[Phase::Apertures, Phase::Body])?;

        if self.polarity != Some(polarity) {
            writeln!(self.sink, "%LP{}*%", match polarity {
                Polarity::Dark => "D",
                Polarity::Clear => "C",
            })?;
            self.polarity = Some(polarity);
        }
        Ok(())
    }

    /// Load rotation in degrees, sticky like polarity.
    pub fn set_rotation(&mut self, degrees: f64) -> Result<(), GerberWriteError> {
        self.require("rotation", &[Phase::Apertures, Phase::Body])?;

        if self.rotation != degrees {
            writeln!(self.sink, "%LR{}*%", format_decimal(degrees))?;
            self.rotation = degrees;
        }
        Ok(())
    }

    pub fn begin_region(&mut self) -> Result<(), GerberWriteError> {
        self.require("region open", &[Phase::Apertures, Phase::Body])?;
        if self.in_region {
            return Err(GerberWriteError::RegionAlreadyOpen);
        }
        if self.polarity.is_none() {
            return Err(GerberWriteError::PolarityNotSet);
        }

        writeln!(self.sink, "G36*")?;
        self.in_region = true;
        self.phase = Phase::Body;
        Ok(())
    }

    pub fn end_region(&mut self) -> Result<(), GerberWriteError> {
        if !self.in_region {
            return Err(GerberWriteError::RegionNotOpen);
        }
        writeln!(self.sink, "G37*")?;
        self.in_region = false;
        Ok(())
    }

    pub fn move_to(&mut self, target: Position) -> Result<(), GerberWriteError> {
        self.require("move", &[Phase::Body])?;
        self.check_draw_state()?;

        let (x, y) = self.fixed_pair(target)?;
        let line = format!(
            "X{}Y{}D02*",
            self.settings.coordinate_format.format_fixed(x)?,
            self.settings.coordinate_format.format_fixed(y)?
        );
        writeln!(self.sink, "{}", line)?;
        self.position = Some((x, y));
        Ok(())
    }

    pub fn line_to(&mut self, target: Position) -> Result<(), GerberWriteError> {
        self.require("line", &[Phase::Body])?;
        self.check_draw_state()?;
        self.ensure_interpolation(Interpolation::Linear)?;

        let (x, y) = self.fixed_pair(target)?;
        let line = format!(
            "X{}Y{}D01*",
            self.settings.coordinate_format.format_fixed(x)?,
            self.settings.coordinate_format.format_fixed(y)?
        );
        writeln!(self.sink, "{}", line)?;
        self.position = Some((x, y));
        Ok(())
    }

    /// Circular interpolation to `target` around the absolute `center`;
    /// counter-clockwise when `ccw` is set. I/J offsets are measured from the
    /// current point.
    pub fn arc_to(&mut self, target: Position, center: Position, ccw: bool) -> Result<(), GerberWriteError> {
        self.require("arc", &[Phase::Body])?;
        self.check_draw_state()?;
        let Some(position) = self.position else {
            // an arc is meaningless without a known start point
            return Err(GerberWriteError::OutOfOrder {
                operation: "arc without current point",
                phase: self.phase,
            });
        };
        self.ensure_interpolation(if ccw {
            Interpolation::CounterclockwiseCircular
        } else {
            Interpolation::ClockwiseCircular
        })?;

        let (x, y) = self.fixed_pair(target)?;
        let (cx, cy) = self.fixed_pair(center)?;
        let format = self.settings.coordinate_format;
        let line = format!(
            "X{}Y{}I{}J{}D01*",
            format.format_fixed(x)?,
            format.format_fixed(y)?,
            format.format_fixed(cx - position.0)?,
            format.format_fixed(cy - position.1)?
        );
        writeln!(self.sink, "{}", line)?;
        self.position = Some((x, y));
        Ok(())
    }

    pub fn flash(&mut self, target: Position) -> Result<(), GerberWriteError> {
        self.require("flash", &[Phase::Body])?;
        if self.in_region {
            return Err(GerberWriteError::OutOfOrder {
                operation: "flash inside region body",
                phase: self.phase,
            });
        }
        if self.current_aperture.is_none() {
            return Err(GerberWriteError::ApertureNotSelected);
        }
        if self.polarity.is_none() {
            return Err(GerberWriteError::PolarityNotSet);
        }

        let (x, y) = self.fixed_pair(target)?;
        let line = format!(
            "X{}Y{}D03*",
            self.settings.coordinate_format.format_fixed(x)?,
            self.settings.coordinate_format.format_fixed(y)?
        );
        writeln!(self.sink, "{}", line)?;
        self.position = Some((x, y));
        Ok(())
    }

    /// Draws one closed contour: a move to the first vertex, then a line or
    /// arc per edge, the final edge landing back on the start.
    pub fn contour_path(&mut self, contour: &Contour) -> Result<(), GerberWriteError> {
        let Some(first) = contour.first_vertex() else {
            return Ok(());
        };
        self.move_to(first)?;
        for edge in contour.edges() {
            if edge.is_arc() {
                self.arc_to(edge.end, edge.arc_center(), edge.bulge > 0.0)?;
            } else {
                self.line_to(edge.end)?;
            }
        }
        Ok(())
    }

    /// Emits a synthesized region forest.
    ///
    /// For every node: polarity by depth parity, filled contour between
    /// G36/G37, then the boundary stroked Dark with the region's aperture so
    /// the outline is always drawn regardless of fill polarity. Children are
    /// followed only down to the nesting cutoff.
    pub fn region_forest(&mut self, forest: &PolygonForest, stroke: ApertureId) -> Result<(), GerberWriteError> {
        for root in &forest.roots {
            self.region_node(root, 0, stroke)?;
        }
        Ok(())
    }

    fn region_node(&mut self, node: &ForestNode, depth: usize, stroke: ApertureId) -> Result<(), GerberWriteError> {
        trace!("region node at depth {}: {:?}", depth, Polarity::for_depth(depth));
        self.set_polarity(Polarity::for_depth(depth))?;
        self.begin_region()?;
        self.contour_path(&node.contour)?;
        self.end_region()?;

        self.set_polarity(Polarity::Dark)?;
        self.select_aperture(stroke)?;
        self.contour_path(&node.contour)?;

        if depth < MAX_NESTING_DEPTH {
            for child in &node.children {
                self.region_node(child, depth + 1, stroke)?;
            }
        }
        Ok(())
    }

    /// Ends the document with `M02` and hands the sink back.
    pub fn finish(mut self) -> Result<W, GerberWriteError> {
        if self.in_region {
            return Err(GerberWriteError::RegionStillOpen);
        }
        self.require("end of file", &[Phase::Header, Phase::Macros, Phase::Apertures, Phase::Body])?;

        writeln!(self.sink, "M02*")?;
        self.phase = Phase::Finished;
        Ok(self.sink)
    }

    fn check_draw_state(&self) -> Result<(), GerberWriteError> {
        if self.polarity.is_none() {
            return Err(GerberWriteError::PolarityNotSet);
        }
        if !self.in_region && self.current_aperture.is_none() {
            return Err(GerberWriteError::ApertureNotSelected);
        }
        Ok(())
    }

    fn ensure_interpolation(&mut self, mode: Interpolation) -> Result<(), GerberWriteError> {
        if self.interpolation != Some(mode) {
            writeln!(self.sink, "{}", match mode {
                Interpolation::Linear => "G01*",
                Interpolation::ClockwiseCircular => "G02*",
                Interpolation::CounterclockwiseCircular => "G03*",
            })?;
            self.interpolation = Some(mode);
        }
        Ok(())
    }

    fn fixed_pair(&self, position: Position) -> Result<(i64, i64), GerberWriteError> {
        Ok((fixed_from_mm(position.x)?, fixed_from_mm(position.y)?))
    }
}

fn fixed_from_mm(mm: f64) -> Result<i64, GerberWriteError> {
    if !mm.is_finite() {
        return Err(GerberWriteError::NonFiniteCoordinate);
    }
    Ok((mm * FIXED_UNITS_PER_MM as f64).round() as i64)
}

fn exposure_digit(exposure: bool) -> char {
    if exposure {
        '1'
    } else {
        '0'
    }
}

fn macro_decimal(value: &MacroDecimal) -> String {
    match value {
        MacroDecimal::Value(v) => format_decimal(*v),
        MacroDecimal::Variable(n) => format!("${}", n),
        MacroDecimal::Expression(text) => (*text).to_string(),
    }
}

/// Plain decimal with trailing zeros trimmed; used for aperture dimensions
/// and macro constants, which are not bound by the `%FS` format.
pub(crate) fn format_decimal(value: f64) -> String {
    let mut text = format!("{:.6}", value);
    while text.ends_with('0') {
        text.pop();
    }
    if text.ends_with('.') {
        text.pop();
    }
    text
}

fn aperture_template(shape: &ApertureShape) -> String {
    match *shape {
        ApertureShape::Circle {
            diameter,
        } => format!("C,{}", format_decimal(diameter)),
        ApertureShape::Rectangle {
            width,
            height,
            rotation,
        } => format!(
            "{},{}X{}X{}",
            MacroId::Rectangle.name(),
            format_decimal(width),
            format_decimal(height),
            format_decimal(rotation)
        ),
        ApertureShape::RoundRectangle {
            width,
            height,
            corner_radius,
            rotation,
        } => format!(
            "{},{}X{}X{}X{}",
            MacroId::RoundRectangle.name(),
            format_decimal(width),
            format_decimal(height),
            format_decimal(corner_radius),
            format_decimal(rotation)
        ),
        // no dedicated obround macro: rendered through the round-rectangle
        // path with the corner radius at half the short side
        ApertureShape::Obround {
            width,
            height,
            rotation,
        } => format!(
            "{},{}X{}X{}X{}",
            MacroId::RoundRectangle.name(),
            format_decimal(width),
            format_decimal(height),
            format_decimal(width.min(height) / 2.0),
            format_decimal(rotation)
        ),
        // standard polygon template, 8 vertices
        ApertureShape::Octagon {
            size,
            rotation,
        } => format!("P,{}X8X{}", format_decimal(size), format_decimal(rotation)),
    }
}

#[cfg(test)]
mod format_tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_coordinate_format_fidelity() {
        // internal value 12345678 (10⁻⁶ mm) in an (8,5) format: exactly 13
        // digits, value scaled down by one decade, left-padded
        let format = CoordinateFormat::new(8, 5);

        let text = format.format_fixed(12_345_678).unwrap();

        assert_eq!(text, "0000001234567");
        assert_eq!(text.len(), 13);
    }

    #[test]
    fn test_coordinate_format_preserves_sign() {
        let format = CoordinateFormat::new(8, 5);

        assert_eq!(format.format_fixed(-12_345_678).unwrap(), "-0000001234567");
    }

    #[rstest]
    #[case(3, 5, 2_000_000, "00200000")]
    #[case(3, 5, 0, "00000000")]
    #[case(4, 6, 1_500, "0000001500")]
    #[case(2, 4, 990_000, "009900")]
    fn test_coordinate_format_cases(
        #[case] int_digits: u8,
        #[case] dec_digits: u8,
        #[case] value: i64,
        #[case] expected: &str,
    ) {
        let format = CoordinateFormat::new(int_digits, dec_digits);
        assert_eq!(format.format_fixed(value).unwrap(), expected);
    }

    #[test]
    fn test_coordinate_overflow_is_rejected() {
        let format = CoordinateFormat::new(2, 4);

        // 123mm scales to 1230000, which does not fit 6 digits
        let result = format.format_fixed(123_000_000);

        assert!(matches!(result, Err(GerberWriteError::CoordinateOverflow { .. })));
    }

    #[rstest]
    #[case(1.6, "1.6")]
    #[case(0.0, "0")]
    #[case(22.5, "22.5")]
    #[case(0.000001, "0.000001")]
    #[case(2.0, "2")]
    fn test_format_decimal(#[case] value: f64, #[case] expected: &str) {
        assert_eq!(format_decimal(value), expected);
    }
}
