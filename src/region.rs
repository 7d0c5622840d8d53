use log::{debug, error, trace};
use thiserror::Error;

use crate::board::{Board, Element, ElementId, ElementKind, Layer, PadElement, PlacedElement};
use crate::geometry::{BoundingBox, Contour, PolygonForest};

/// Fixed margin added around the pour's boundary stroke when computing
/// isolation, on top of half the stroke thickness.
pub const STROKE_CLEARANCE_MARGIN: f64 = 0.05;

/// Clearance kept between a pour and the board outline.
pub const BOARD_OUTLINE_CLEARANCE: f64 = 0.3;

/// Width of the copper bridges left between a pad and its surrounding pour.
pub const THERMAL_RELIEF_BRIDGE_WIDTH: f64 = 0.3;

/// A thermal relief that yields fewer disjoint spoke holes than this has
/// degenerated (pad smaller than the bridge width); fail rather than emit it.
pub const THERMAL_SPOKE_MINIMUM: usize = 4;

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("element {0:?} is not a pour region")]
    NotARegion(ElementId),

    #[error("pour region {0:?} outline has zero area")]
    ZeroAreaOutline(ElementId),

    #[error("non-finite coordinates in the outline of pour region {0:?}")]
    NonFiniteOutline(ElementId),

    #[error("thermal relief for pad {pad:?} produced {pieces} spoke piece(s), expected at least {expected}")]
    DegenerateThermalRelief { pad: ElementId, pieces: usize, expected: usize },
}

/// Computes the final fill geometry for a pour region on one layer.
///
/// Returns `None` when the region is not a member of `target`. On non-copper
/// layers the outline is returned as-is; on copper layers it is pierced by a
/// clearance hole for every electrically foreign element and by thermal
/// relief spokes for the region's own pads.
#[profiling::function]
pub fn synthesize(
    region_element: &Element,
    target: Layer,
    board: &Board,
) -> Result<Option<PolygonForest>, SynthesisError> {
    let region = match &region_element.kind {
        ElementKind::Region(region) => region,
        _ => return Err(SynthesisError::NotARegion(region_element.id())),
    };

    if !region_element.is_on(target) {
        return Ok(None);
    }

    let mut outline = region.contour.clone();
    outline.normalize_ccw();
    if !outline.is_finite() {
        return Err(SynthesisError::NonFiniteOutline(region_element.id()));
    }
    if outline.area() < 1e-9 {
        return Err(SynthesisError::ZeroAreaOutline(region_element.id()));
    }

    if !target.is_copper() {
        // mask/silk/paste only need the poured shape, no isolation
        return Ok(Some(PolygonForest::single(outline)));
    }

    let margin_box = outline.bounding_box().inflated(region.clearance);
    let isolation_allowance = STROKE_CLEARANCE_MARGIN + region.stroke_thickness / 2.0;
    let region_net = region_element.net;

    let mut holes: Vec<Contour> = Vec::new();
    let mut pruned = 0usize;

    for placed in board.placed() {
        if placed.id() == region_element.id() {
            continue;
        }
        if matches!(placed.element.kind, ElementKind::Text(_)) {
            continue;
        }

        let candidates = if placed.is_on(Layer::Outline) {
            placed.hole_outlines(BOARD_OUTLINE_CLEARANCE + isolation_allowance)
        } else if placed.is_on(Layer::NonPlatedHoles)
            || target
                .restrict_layer()
                .map_or(false, |restrict| placed.is_on(restrict))
        {
            placed.hole_outlines(isolation_allowance)
        } else if placed.is_on(target) {
            let same_net = region_net.is_some() && placed.net() == region_net;
            if same_net {
                match placed.pad() {
                    // connected pads get spokes, not a solid short
                    Some(pad) => thermal_relief_pieces(&placed, pad, region.clearance)?,
                    // other same-net geometry simply merges into the pour
                    None => continue,
                }
            } else {
                let inflate = isolation_allowance + board.net_clearance(placed.net()).max(region.clearance);
                placed.hole_outlines(inflate)
            }
        } else {
            continue;
        };

        for candidate in candidates {
            if candidate.bounding_box().intersects(&margin_box) {
                holes.push(candidate);
            } else {
                pruned += 1;
            }
        }
    }

    debug!(
        "region {:?} on {:?}: {} hole candidate(s), {} pruned",
        region_element.id(),
        target,
        holes.len(),
        pruned
    );

    Ok(Some(subtract_holes(outline, holes)))
}

/// The holes a connected pad punches into the pour: the pad's relief ring
/// minus the bridge cross, one hole per disjoint remainder. The pieces are
/// computed in the pad's local space and lifted afterwards so the spokes stay
/// aligned with the pad under part rotation.
fn thermal_relief_pieces(
    placed: &PlacedElement<'_>,
    pad: &PadElement,
    clearance: f64,
) -> Result<Vec<Contour>, SynthesisError> {
    let ring = pad.outline(clearance);
    let bbox = ring.bounding_box();
    // bars must out-reach the ring in every direction
    let reach = bbox.width().hypot(bbox.height()) * 1.5;
    let [bar_a, bar_b] = pad.thermal_cross(THERMAL_RELIEF_BRIDGE_WIDTH, reach);

    let mut pieces = vec![ring];
    for bar in [bar_a, bar_b] {
        let mut remaining = Vec::new();
        for piece in &pieces {
            let (kept, _) = piece.difference(&bar);
            remaining.extend(kept);
        }
        pieces = remaining;
    }

    if pieces.len() < THERMAL_SPOKE_MINIMUM {
        error!(
            "thermal relief degenerated for pad {:?}: {} piece(s)",
            placed.id(),
            pieces.len()
        );
        return Err(SynthesisError::DegenerateThermalRelief {
            pad: placed.id(),
            pieces: pieces.len(),
            expected: THERMAL_SPOKE_MINIMUM,
        });
    }

    trace!("thermal relief for pad {:?}: {} spoke hole(s)", placed.id(), pieces.len());
    Ok(pieces
        .into_iter()
        .map(|piece| placed.lift(piece))
        .collect())
}

struct HoleCluster {
    outline: Contour,
    /// Areas fully enclosed by the merged holes; they survive as copper
    /// islands at the next nesting level.
    voids: Vec<Contour>,
    bbox: BoundingBox,
}

/// Subtracts the hole set from the outline in one pass and assembles the
/// polarity-alternating forest.
fn subtract_holes(outline: Contour, holes: Vec<Contour>) -> PolygonForest {
    if holes.is_empty() {
        return PolygonForest::single(outline);
    }

    // Merge overlapping holes into disjoint clusters first; afterwards each
    // cluster can be subtracted independently.
    let mut clusters: Vec<HoleCluster> = Vec::new();
    for mut hole in holes {
        hole.normalize_ccw();
        let mut outline = hole.clone();
        let mut bbox = outline.bounding_box();
        let mut voids: Vec<Contour> = Vec::new();

        let mut merged_any = true;
        while merged_any {
            merged_any = false;
            let mut index = 0;
            while index < clusters.len() {
                if clusters[index].bbox.intersects(&bbox) {
                    let (pos, neg) = clusters[index].outline.union(&outline);
                    if pos.len() == 1 {
                        let old = clusters.swap_remove(index);
                        outline = pos.into_iter().next().unwrap();
                        bbox = outline.bounding_box();
                        voids.extend(old.voids);
                        voids.extend(neg);
                        merged_any = true;
                        continue;
                    }
                }
                index += 1;
            }
        }

        clusters.push(HoleCluster {
            outline,
            voids,
            bbox,
        });
    }
    trace!("{} hole cluster(s) after merging", clusters.len());

    let mut copper = vec![outline];
    let mut hole_loops: Vec<Contour> = Vec::new();
    let mut islands: Vec<Contour> = Vec::new();

    for cluster in clusters {
        let mut remaining = Vec::new();
        for piece in copper {
            if !piece.bounding_box().intersects(&cluster.bbox) {
                remaining.push(piece);
                continue;
            }
            let (kept, carved) = piece.difference(&cluster.outline);
            remaining.extend(kept);
            hole_loops.extend(carved);
        }
        copper = remaining;
        islands.extend(cluster.voids);
    }

    debug!(
        "difference result: {} copper loop(s), {} hole loop(s), {} island(s)",
        copper.len(),
        hole_loops.len(),
        islands.len()
    );

    let mut loops = copper;
    loops.extend(hole_loops);
    loops.extend(islands);
    PolygonForest::assemble(loops)
}
