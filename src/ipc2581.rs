//! IPC-2581 standard-shape dictionary serializer.
//!
//! Consumes the same declared aperture set as the Gerber emitter and keys
//! every entry by the canonical aperture key, so both output formats agree on
//! shape deduplication. Full IPC-2581 document assembly lives elsewhere; this
//! covers only the dictionary fragment.

use std::fmt::{self, Write};

use crate::aperture::{ApertureShape, DeclaredApertures};
use crate::gerber::format_decimal;

pub fn write_entry_dictionary<W: Write>(declared: &DeclaredApertures, sink: &mut W) -> fmt::Result {
    writeln!(sink, "<DictionaryStandard units=\"MILLIMETER\">")?;
    for aperture in declared.apertures() {
        writeln!(sink, "  <EntryStandard id=\"{}\">", aperture.key().canonical_string())?;
        write!(sink, "    ")?;
        write_shape(&aperture.shape, sink)?;
        writeln!(sink)?;
        writeln!(sink, "  </EntryStandard>")?;
    }
    writeln!(sink, "</DictionaryStandard>")
}

/// Shape rotations are carried by placement transforms in IPC-2581, not by
/// the dictionary entries; the key keeps rotated variants distinct.
fn write_shape<W: Write>(shape: &ApertureShape, sink: &mut W) -> fmt::Result {
    match *shape {
        ApertureShape::Circle {
            diameter,
        } => write!(sink, "<Circle diameter=\"{}\"/>", format_decimal(diameter)),
        ApertureShape::Rectangle {
            width,
            height,
            ..
        } => write!(
            sink,
            "<RectCenter width=\"{}\" height=\"{}\"/>",
            format_decimal(width),
            format_decimal(height)
        ),
        ApertureShape::RoundRectangle {
            width,
            height,
            corner_radius,
            ..
        } => write!(
            sink,
            "<RectRound width=\"{}\" height=\"{}\" radius=\"{}\" upperRight=\"true\" upperLeft=\"true\" lowerRight=\"true\" lowerLeft=\"true\"/>",
            format_decimal(width),
            format_decimal(height),
            format_decimal(corner_radius)
        ),
        ApertureShape::Octagon {
            size,
            ..
        } => write!(sink, "<Octagon diameter=\"{}\"/>", format_decimal(size)),
        ApertureShape::Obround {
            width,
            height,
            ..
        } => write!(
            sink,
            "<Oval width=\"{}\" height=\"{}\"/>",
            format_decimal(width),
            format_decimal(height)
        ),
    }
}

#[cfg(test)]
mod dictionary_tests {
    use super::*;
    use crate::aperture::ApertureRegistry;

    #[test]
    fn test_dictionary_shares_canonical_keys() {
        let mut registry = ApertureRegistry::new();
        registry.declare_circle(1.6, None);
        registry.declare_round_rectangle(1.5, 0.8, 0.2, 0.0, None);
        let declared = registry.finish();

        let mut output = String::new();
        write_entry_dictionary(&declared, &mut output).unwrap();

        assert!(output.contains("<EntryStandard id=\"CIRCLE:1.600000\">"));
        assert!(output.contains("<Circle diameter=\"1.6\"/>"));
        assert!(output.contains("<EntryStandard id=\"ROUNDRECT:1.500000X0.800000X0.200000X0.000000\">"));
        assert!(output.contains("<RectRound width=\"1.5\" height=\"0.8\" radius=\"0.2\""));
    }

    #[test]
    fn test_dictionary_entry_per_declared_aperture() {
        let mut registry = ApertureRegistry::new();
        registry.declare_circle(1.0, None);
        registry.declare_circle(1.0, None); // deduplicated
        registry.declare_obround(2.0, 1.0, 0.0, None);
        let declared = registry.finish();

        let mut output = String::new();
        write_entry_dictionary(&declared, &mut output).unwrap();

        assert_eq!(output.matches("<EntryStandard").count(), 2);
        assert!(output.contains("<Oval width=\"2\" height=\"1\"/>"));
    }
}
