use std::collections::HashMap;
use std::fmt;

use log::{debug, trace};
use thiserror::Error;

/// D-codes are allocated from here, monotonically, and never reused.
pub const FIRST_APERTURE_CODE: u32 = 10;

/// Octagon apertures are phase-rotated so their flats, not their vertices,
/// are axis-aligned at a caller rotation of zero.
pub const OCTAGON_PHASE_DEGREES: f64 = 22.5;

/// Aperture dimensions are quantized to this (in millimetres) before being
/// used as identity, which collapses formatting noise like `1.0` vs `1.00`.
const KEY_QUANTUM: f64 = 1e-6;

#[derive(Debug, Error)]
pub enum ApertureError {
    /// `get` was called for a key that was never declared; the declare pass
    /// must cover every shape the draw pass uses.
    #[error("aperture not declared: {key}")]
    NotFound { key: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ApertureShape {
    Circle { diameter: f64 },
    Rectangle { width: f64, height: f64, rotation: f64 },
    RoundRectangle { width: f64, height: f64, corner_radius: f64, rotation: f64 },
    Octagon { size: f64, rotation: f64 },
    Obround { width: f64, height: f64, rotation: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ShapeKind {
    Circle,
    Rectangle,
    RoundRectangle,
    Octagon,
    Obround,
}

impl ShapeKind {
    fn name(&self) -> &'static str {
        match self {
            ShapeKind::Circle => "CIRCLE",
            ShapeKind::Rectangle => "RECTANGLE",
            ShapeKind::RoundRectangle => "ROUNDRECT",
            ShapeKind::Octagon => "OCTAGON",
            ShapeKind::Obround => "OBROUND",
        }
    }
}

/// Aperture identity: the literal tuple of quantized dimensions plus kind and
/// tag. Keying on values rather than a hash of a formatted string removes the
/// (unlikely but real) aperture-aliasing risk a 32-bit string hash carries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ApertureKey {
    kind: ShapeKind,
    params: Vec<i64>,
    tag: Option<String>,
}

fn quantize(value: f64) -> i64 {
    (value / KEY_QUANTUM).round() as i64
}

fn format_quantized(value: i64) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let value = value.abs();
    format!("{}{}.{:06}", sign, value / 1_000_000, value % 1_000_000)
}

impl ApertureKey {
    fn new(shape: &ApertureShape, tag: Option<&str>) -> Self {
        let (kind, params) = match *shape {
            ApertureShape::Circle {
                diameter,
            } => (ShapeKind::Circle, vec![quantize(diameter)]),
            ApertureShape::Rectangle {
                width,
                height,
                rotation,
            } => (ShapeKind::Rectangle, vec![quantize(width), quantize(height), quantize(rotation)]),
            ApertureShape::RoundRectangle {
                width,
                height,
                corner_radius,
                rotation,
            } => (
                ShapeKind::RoundRectangle,
                vec![quantize(width), quantize(height), quantize(corner_radius), quantize(rotation)],
            ),
            ApertureShape::Octagon {
                size,
                rotation,
            } => (ShapeKind::Octagon, vec![quantize(size), quantize(rotation)]),
            ApertureShape::Obround {
                width,
                height,
                rotation,
            } => (ShapeKind::Obround, vec![quantize(width), quantize(height), quantize(rotation)]),
        };
        Self {
            kind,
            params,
            tag: tag.map(str::to_string),
        }
    }

    /// Canonical textual form of the key; also the dictionary id used by the
    /// IPC-2581 serializer, so both emitters agree on deduplication.
    pub fn canonical_string(&self) -> String {
        let params = self
            .params
            .iter()
            .map(|&p| format_quantized(p))
            .collect::<Vec<_>>()
            .join("X");
        match &self.tag {
            Some(tag) => format!("{}:{}:{}", self.kind.name(), params, tag),
            None => format!("{}:{}", self.kind.name(), params),
        }
    }
}

impl fmt::Display for ApertureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_string())
    }
}

/// Handle to a declared aperture; the wrapped value is the Gerber D-code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ApertureId(u32);

impl ApertureId {
    pub fn code(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ApertureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "D{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Aperture {
    pub code: u32,
    pub shape: ApertureShape,
    pub tag: Option<String>,
}

impl Aperture {
    pub fn key(&self) -> ApertureKey {
        ApertureKey::new(&self.shape, self.tag.as_deref())
    }

    /// The macro this aperture instantiates, if any. Circles use the
    /// standard `C` template and octagons the standard `P` polygon template;
    /// obrounds reuse the round-rectangle macro with the corner radius at
    /// half the short side, which renders an exact stadium.
    pub fn macro_id(&self) -> Option<MacroId> {
        match self.shape {
            ApertureShape::Circle {
                ..
            }
            | ApertureShape::Octagon {
                ..
            } => None,
            ApertureShape::Rectangle {
                ..
            } => Some(MacroId::Rectangle),
            ApertureShape::RoundRectangle {
                ..
            }
            | ApertureShape::Obround {
                ..
            } => Some(MacroId::RoundRectangle),
        }
    }
}

/// The two canonical macro templates. New shape families get new macros, not
/// new instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MacroId {
    Rectangle = 1,
    RoundRectangle = 2,
}

impl MacroId {
    pub fn name(&self) -> &'static str {
        match self {
            MacroId::Rectangle => "RECTANGLE",
            MacroId::RoundRectangle => "ROUNDRECT",
        }
    }

    pub fn number(&self) -> u8 {
        *self as u8
    }

    pub fn definition(&self) -> ApertureMacro {
        match self {
            MacroId::Rectangle => rectangle_macro(),
            MacroId::RoundRectangle => round_rectangle_macro(),
        }
    }
}

/// A parameter slot in a macro primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum MacroDecimal {
    Value(f64),
    Variable(u32),
    Expression(&'static str),
}

/// The subset of the Gerber macro primitive language the canonical macros
/// use.
#[derive(Debug, Clone, PartialEq)]
pub enum MacroPrimitive {
    Comment(&'static str),
    VariableDefinition { number: u32, expression: &'static str },
    /// Primitive 1. The rotation spins the center around the macro origin.
    Circle {
        exposure: bool,
        diameter: MacroDecimal,
        center: (MacroDecimal, MacroDecimal),
        rotation: MacroDecimal,
    },
    /// Primitive 21, a rectangle centered on the macro origin.
    CenterLine {
        exposure: bool,
        width: MacroDecimal,
        height: MacroDecimal,
        center: (MacroDecimal, MacroDecimal),
        rotation: MacroDecimal,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApertureMacro {
    pub id: MacroId,
    pub content: Vec<MacroPrimitive>,
}

/// `$1` width, `$2` height, `$3` rotation.
fn rectangle_macro() -> ApertureMacro {
    use MacroDecimal::*;
    ApertureMacro {
        id: MacroId::Rectangle,
        content: vec![
            MacroPrimitive::Comment("Rectangle, params: width height rotation"),
            MacroPrimitive::CenterLine {
                exposure: true,
                width: Variable(1),
                height: Variable(2),
                center: (Value(0.0), Value(0.0)),
                rotation: Variable(3),
            },
        ],
    }
}

/// `$1` width, `$2` height, `$3` corner radius, `$4` rotation.
fn round_rectangle_macro() -> ApertureMacro {
    use MacroDecimal::*;
    ApertureMacro {
        id: MacroId::RoundRectangle,
        content: vec![
            MacroPrimitive::Comment("Rounded rectangle, params: width height corner-radius rotation"),
            // $5/$6: straight spans, $7/$8: corner centers
            MacroPrimitive::VariableDefinition {
                number: 5,
                expression: "$1-$3-$3",
            },
            MacroPrimitive::VariableDefinition {
                number: 6,
                expression: "$2-$3-$3",
            },
            MacroPrimitive::VariableDefinition {
                number: 7,
                expression: "$1/2-$3",
            },
            MacroPrimitive::VariableDefinition {
                number: 8,
                expression: "$2/2-$3",
            },
            MacroPrimitive::CenterLine {
                exposure: true,
                width: Variable(1),
                height: Variable(6),
                center: (Value(0.0), Value(0.0)),
                rotation: Variable(4),
            },
            MacroPrimitive::CenterLine {
                exposure: true,
                width: Variable(5),
                height: Variable(2),
                center: (Value(0.0), Value(0.0)),
                rotation: Variable(4),
            },
            MacroPrimitive::Circle {
                exposure: true,
                diameter: Expression("$3+$3"),
                center: (Variable(7), Variable(8)),
                rotation: Variable(4),
            },
            MacroPrimitive::Circle {
                exposure: true,
                diameter: Expression("$3+$3"),
                center: (Expression("0-$7"), Variable(8)),
                rotation: Variable(4),
            },
            MacroPrimitive::Circle {
                exposure: true,
                diameter: Expression("$3+$3"),
                center: (Expression("0-$7"), Expression("0-$8")),
                rotation: Variable(4),
            },
            MacroPrimitive::Circle {
                exposure: true,
                diameter: Expression("$3+$3"),
                center: (Variable(7), Expression("0-$8")),
                rotation: Variable(4),
            },
        ],
    }
}

/// Declare-phase aperture collection. One registry per output document; the
/// D-code counter is instance state, never shared.
#[derive(Debug, Default)]
pub struct ApertureRegistry {
    apertures: Vec<Aperture>,
    index: HashMap<ApertureKey, ApertureId>,
}

impl ApertureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.apertures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apertures.is_empty()
    }

    /// Idempotent: re-declaring an identical `(shape, tag)` returns the
    /// previously allocated id.
    fn declare(&mut self, shape: ApertureShape, tag: Option<&str>) -> ApertureId {
        let key = ApertureKey::new(&shape, tag);
        if let Some(&id) = self.index.get(&key) {
            trace!("aperture already declared: {} -> {}", key, id);
            return id;
        }

        let id = ApertureId(FIRST_APERTURE_CODE + self.apertures.len() as u32);
        debug!("aperture declared: {} -> {}", key, id);
        self.apertures.push(Aperture {
            code: id.code(),
            shape,
            tag: tag.map(str::to_string),
        });
        self.index.insert(key, id);
        id
    }

    pub fn declare_circle(&mut self, diameter: f64, tag: Option<&str>) -> ApertureId {
        self.declare(
            ApertureShape::Circle {
                diameter,
            },
            tag,
        )
    }

    pub fn declare_rectangle(&mut self, width: f64, height: f64, rotation: f64, tag: Option<&str>) -> ApertureId {
        self.declare(rectangle_shape(width, height, rotation), tag)
    }

    pub fn declare_round_rectangle(
        &mut self,
        width: f64,
        height: f64,
        corner_radius: f64,
        rotation: f64,
        tag: Option<&str>,
    ) -> ApertureId {
        self.declare(round_rectangle_shape(width, height, corner_radius, rotation), tag)
    }

    pub fn declare_octagon(&mut self, size: f64, rotation: f64, tag: Option<&str>) -> ApertureId {
        self.declare(octagon_shape(size, rotation), tag)
    }

    pub fn declare_obround(&mut self, width: f64, height: f64, rotation: f64, tag: Option<&str>) -> ApertureId {
        self.declare(obround_shape(width, height, rotation), tag)
    }

    /// Ends the declare phase. The returned token is the only way to look
    /// apertures up, so drawing before declaring is unrepresentable.
    pub fn finish(self) -> DeclaredApertures {
        debug!("aperture registry finished: {} aperture(s)", self.apertures.len());
        DeclaredApertures {
            apertures: self.apertures,
            index: self.index,
        }
    }
}

fn rectangle_shape(width: f64, height: f64, rotation: f64) -> ApertureShape {
    ApertureShape::Rectangle {
        width,
        height,
        rotation: rotation.rem_euclid(360.0),
    }
}

fn round_rectangle_shape(width: f64, height: f64, corner_radius: f64, rotation: f64) -> ApertureShape {
    ApertureShape::RoundRectangle {
        width,
        height,
        corner_radius,
        rotation: rotation.rem_euclid(360.0),
    }
}

fn octagon_shape(size: f64, rotation: f64) -> ApertureShape {
    // flats axis-aligned at rotation zero
    ApertureShape::Octagon {
        size,
        rotation: (rotation + OCTAGON_PHASE_DEGREES).rem_euclid(360.0),
    }
}

fn obround_shape(width: f64, height: f64, rotation: f64) -> ApertureShape {
    ApertureShape::Obround {
        width,
        height,
        rotation: rotation.rem_euclid(360.0),
    }
}

/// The immutable outcome of the declare phase: lookup for the draw pass and
/// enumeration for the emitters.
#[derive(Debug)]
pub struct DeclaredApertures {
    apertures: Vec<Aperture>,
    index: HashMap<ApertureKey, ApertureId>,
}

impl DeclaredApertures {
    fn get(&self, shape: ApertureShape, tag: Option<&str>) -> Result<ApertureId, ApertureError> {
        let key = ApertureKey::new(&shape, tag);
        self.index
            .get(&key)
            .copied()
            .ok_or_else(|| ApertureError::NotFound {
                key: key.canonical_string(),
            })
    }

    pub fn get_circle(&self, diameter: f64, tag: Option<&str>) -> Result<ApertureId, ApertureError> {
        self.get(
            ApertureShape::Circle {
                diameter,
            },
            tag,
        )
    }

    pub fn get_rectangle(
        &self,
        width: f64,
        height: f64,
        rotation: f64,
        tag: Option<&str>,
    ) -> Result<ApertureId, ApertureError> {
        self.get(rectangle_shape(width, height, rotation), tag)
    }

    pub fn get_round_rectangle(
        &self,
        width: f64,
        height: f64,
        corner_radius: f64,
        rotation: f64,
        tag: Option<&str>,
    ) -> Result<ApertureId, ApertureError> {
        self.get(round_rectangle_shape(width, height, corner_radius, rotation), tag)
    }

    pub fn get_octagon(&self, size: f64, rotation: f64, tag: Option<&str>) -> Result<ApertureId, ApertureError> {
        self.get(octagon_shape(size, rotation), tag)
    }

    pub fn get_obround(
        &self,
        width: f64,
        height: f64,
        rotation: f64,
        tag: Option<&str>,
    ) -> Result<ApertureId, ApertureError> {
        self.get(obround_shape(width, height, rotation), tag)
    }

    /// Apertures in declaration order, which is ascending D-code order.
    pub fn apertures(&self) -> &[Aperture] {
        &self.apertures
    }

    /// The macros referenced by at least one declared aperture, in macro
    /// number order.
    pub fn macros(&self) -> Vec<ApertureMacro> {
        let mut ids: Vec<MacroId> = self
            .apertures
            .iter()
            .filter_map(|aperture| aperture.macro_id())
            .collect();
        ids.sort();
        ids.dedup();
        ids.into_iter().map(|id| id.definition()).collect()
    }
}

#[cfg(test)]
mod registry_tests {
    use super::*;

    #[test]
    fn test_declare_is_idempotent() {
        let mut registry = ApertureRegistry::new();

        let first = registry.declare_circle(1.6, None);
        let second = registry.declare_circle(1.6, None);

        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_quantization_collapses_formatting_noise() {
        let mut registry = ApertureRegistry::new();

        // 0.1 + 0.2 != 0.3 in f64, but both land on the same key
        let first = registry.declare_circle(0.1 + 0.2, None);
        let second = registry.declare_circle(0.3, None);

        assert_eq!(first, second);
    }

    #[test]
    fn test_codes_are_monotonic_from_ten() {
        let mut registry = ApertureRegistry::new();

        let a = registry.declare_circle(1.0, None);
        let b = registry.declare_circle(2.0, None);
        let c = registry.declare_rectangle(1.0, 0.5, 0.0, None);

        assert_eq!(a.code(), 10);
        assert_eq!(b.code(), 11);
        assert_eq!(c.code(), 12);
    }

    #[test]
    fn test_tag_participates_in_identity() {
        let mut registry = ApertureRegistry::new();

        let untagged = registry.declare_circle(1.0, None);
        let tagged = registry.declare_circle(1.0, Some("via"));

        assert_ne!(untagged, tagged);
    }

    #[test]
    fn test_get_after_declare() {
        let mut registry = ApertureRegistry::new();
        let declared = registry.declare_round_rectangle(1.5, 0.8, 0.2, 45.0, None);

        let apertures = registry.finish();

        let found = apertures
            .get_round_rectangle(1.5, 0.8, 0.2, 45.0, None)
            .unwrap();
        assert_eq!(found, declared);
    }

    #[test]
    fn test_get_undeclared_fails() {
        let registry = ApertureRegistry::new();
        let apertures = registry.finish();

        let result = apertures.get_circle(1.0, None);

        assert!(matches!(result, Err(ApertureError::NotFound { .. })));
    }

    #[test]
    fn test_octagon_phase_rotation() {
        let mut registry = ApertureRegistry::new();
        let declared = registry.declare_octagon(2.0, 0.0, None);
        let apertures = registry.finish();

        // the caller's rotation is phase-shifted consistently on both paths
        assert_eq!(apertures.get_octagon(2.0, 0.0, None).unwrap(), declared);
        assert!(apertures.get_octagon(2.0, 22.5, None).is_err());

        match apertures.apertures()[0].shape {
            ApertureShape::Octagon {
                rotation,
                ..
            } => assert_eq!(rotation, OCTAGON_PHASE_DEGREES),
            ref other => panic!("unexpected shape {:?}", other),
        }
    }

    #[test]
    fn test_obround_and_round_rectangle_are_distinct() {
        let mut registry = ApertureRegistry::new();

        let obround = registry.declare_obround(2.0, 1.0, 0.0, None);
        let rounded = registry.declare_round_rectangle(2.0, 1.0, 0.5, 0.0, None);

        assert_ne!(obround, rounded);
    }

    #[test]
    fn test_macro_enumeration_follows_declared_shapes() {
        let mut registry = ApertureRegistry::new();
        registry.declare_circle(1.0, None);
        assert!(registry.finish().macros().is_empty());

        let mut registry = ApertureRegistry::new();
        registry.declare_rectangle(1.0, 0.5, 0.0, None);
        let macros = registry.finish().macros();
        assert_eq!(macros.len(), 1);
        assert_eq!(macros[0].id, MacroId::Rectangle);

        let mut registry = ApertureRegistry::new();
        registry.declare_obround(2.0, 1.0, 0.0, None);
        registry.declare_rectangle(1.0, 0.5, 0.0, None);
        let macros = registry.finish().macros();
        assert_eq!(macros.len(), 2);
        assert_eq!(macros[0].id, MacroId::Rectangle);
        assert_eq!(macros[1].id, MacroId::RoundRectangle);
    }

    #[test]
    fn test_canonical_string_is_stable() {
        let key = ApertureKey::new(
            &ApertureShape::RoundRectangle {
                width: 1.5,
                height: 0.8,
                corner_radius: 0.2,
                rotation: 45.0,
            },
            None,
        );

        assert_eq!(key.canonical_string(), "ROUNDRECT:1.500000X0.800000X0.200000X45.000000");
    }
}
