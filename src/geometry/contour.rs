use std::f64::consts::PI;

use cavalier_contours::polyline::{BooleanOp, PlineOffsetOptions, PlineSource, PlineSourceMut, Polyline};
use log::trace;

use super::bounding_box::{BoundingBox, Transform2D};
use crate::geometry::point_in_polygon;
use crate::spacial::{Position, Vector};

/// Maximum angular step used when flattening an arc edge into line segments.
const ARC_FLATTEN_STEP: f64 = PI / 36.0; // 5°

/// Arc edges are split so no single edge sweeps more than this; keeps bulge
/// values well away from the tan(90°) singularity.
const MAX_EDGE_SWEEP: f64 = 2.0 * PI / 3.0; // 120°

/// One simple closed path. Each vertex carries the bulge of the edge leaving
/// it towards the next vertex: `bulge = tan(sweep / 4)`, zero for a straight
/// edge, positive for a counter-clockwise sweep.
#[derive(Debug, Clone)]
pub struct Contour {
    pline: Polyline<f64>,
}

/// One edge of a contour, start/end plus the bulge of the span between them.
#[derive(Debug, Clone, Copy)]
pub struct ContourEdge {
    pub start: Position,
    pub end: Position,
    pub bulge: f64,
}

impl ContourEdge {
    pub fn is_arc(&self) -> bool {
        self.bulge.abs() > 1e-12
    }

    /// Sweep angle of the edge in radians, signed, zero for straight edges.
    pub fn sweep(&self) -> f64 {
        4.0 * self.bulge.atan()
    }

    /// Center of the arc this edge lies on. Must only be called on arc edges.
    pub fn arc_center(&self) -> Position {
        arc_center(self.start, self.end, self.bulge)
    }
}

/// Recovers the arc center from an edge's endpoints and bulge.
///
/// With `d` the chord length and `b` the bulge, the center sits at the chord
/// midpoint offset along the chord's left normal by `d * (1 - b²) / (4b)`
/// (zero for a semicircle, sign following the bulge).
pub(crate) fn arc_center(start: Position, end: Position, bulge: f64) -> Position {
    let chord = end - start;
    let d = chord.norm();
    let mid = nalgebra::center(&start, &end);
    let left_normal = Vector::new(-chord.y / d, chord.x / d);
    let h = d * (1.0 - bulge * bulge) / (4.0 * bulge);
    mid + left_normal * h
}

fn dir(angle: f64) -> Vector {
    let (sin, cos) = angle.sin_cos();
    Vector::new(cos, sin)
}

impl Contour {
    pub fn from_polyline(mut pline: Polyline<f64>) -> Self {
        pline.set_is_closed(true);
        pline.remove_repeat_pos(1e-9);
        Self {
            pline,
        }
    }

    /// Builds a contour from `(position, edge sweep)` pairs; the sweep (in
    /// radians) belongs to the edge leaving the vertex.
    pub fn from_vertices(vertices: impl IntoIterator<Item = (Position, f64)>) -> Self {
        let mut pline = Polyline::new();
        for (position, sweep) in vertices {
            pline.add(position.x, position.y, (sweep / 4.0).tan());
        }
        Self::from_polyline(pline)
    }

    pub fn as_polyline(&self) -> &Polyline<f64> {
        &self.pline
    }

    pub fn into_polyline(self) -> Polyline<f64> {
        self.pline
    }

    pub fn vertex_count(&self) -> usize {
        self.pline.vertex_count()
    }

    pub fn edges(&self) -> impl Iterator<Item = ContourEdge> + '_ {
        let n = self.pline.vertex_count();
        (0..n).map(move |i| {
            let v = self.pline.vertex_data[i];
            let w = self.pline.vertex_data[(i + 1) % n];
            ContourEdge {
                start: Position::new(v.x, v.y),
                end: Position::new(w.x, w.y),
                bulge: v.bulge,
            }
        })
    }

    pub fn first_vertex(&self) -> Option<Position> {
        self.pline
            .vertex_data
            .first()
            .map(|v| Position::new(v.x, v.y))
    }

    /// Signed area, positive for counter-clockwise contours.
    pub fn area(&self) -> f64 {
        self.pline.area()
    }

    pub fn is_finite(&self) -> bool {
        self.pline
            .vertex_data
            .iter()
            .all(|v| v.x.is_finite() && v.y.is_finite() && v.bulge.is_finite())
    }

    pub fn is_ccw(&self) -> bool {
        self.area() >= 0.0
    }

    /// Ensures counter-clockwise orientation, reversing the path if needed.
    pub fn normalize_ccw(&mut self) {
        if !self.is_ccw() {
            self.pline = reversed(&self.pline);
        }
    }

    /// Applies a placement transform. Mirroring flips every bulge since it
    /// reverses handedness.
    pub fn transformed(&self, transform: &Transform2D) -> Self {
        let flip = transform.flips_winding();
        let mut pline = Polyline::new();
        for v in &self.pline.vertex_data {
            let p = transform.apply_to_position(Position::new(v.x, v.y));
            let bulge = if flip { -v.bulge } else { v.bulge };
            pline.add(p.x, p.y, bulge);
        }
        Self::from_polyline(pline)
    }

    /// Flattens arcs into line segments; returns boundary points with
    /// implicit closure (the first point is not repeated at the end).
    pub fn flatten(&self) -> Vec<Position> {
        let mut points = Vec::new();
        for edge in self.edges() {
            points.push(edge.start);
            if !edge.is_arc() {
                continue;
            }
            let center = edge.arc_center();
            let radius = (edge.start - center).norm();
            let start_angle = (edge.start.y - center.y).atan2(edge.start.x - center.x);
            let sweep = edge.sweep();
            let steps = (sweep.abs() / ARC_FLATTEN_STEP).ceil().max(1.0) as usize;
            for k in 1..steps {
                let angle = start_angle + sweep * (k as f64) / (steps as f64);
                points.push(center + dir(angle) * radius);
            }
        }
        points
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(&self.flatten())
    }

    pub fn contains(&self, point: Position) -> bool {
        point_in_polygon(point, &self.flatten())
    }

    /// A point guaranteed to lie on the boundary (the first vertex); used as
    /// a representative for nesting tests between disjoint loops.
    pub fn representative_point(&self) -> Position {
        self.first_vertex()
            .unwrap_or_else(|| Position::new(0.0, 0.0))
    }

    /// Offsets the contour outward by `amount` (inward for negative values).
    /// May split into several loops, or vanish entirely when an inward offset
    /// swallows the shape.
    pub fn inflated(&self, amount: f64) -> Vec<Contour> {
        if amount == 0.0 {
            return vec![self.clone()];
        }
        let mut subject = self.clone();
        subject.normalize_ccw();

        let opts = PlineOffsetOptions {
            handle_self_intersects: true,
            ..Default::default()
        };
        // For counter-clockwise polylines a positive offset moves inward, so
        // growing means offsetting by the negated amount.
        let offset = subject.pline.parallel_offset_opt(-amount, &opts);
        trace!("inflated contour by {}: {} loop(s)", amount, offset.len());

        offset
            .into_iter()
            .map(|pline| {
                let mut contour = Contour::from_polyline(pline);
                contour.normalize_ccw();
                contour
            })
            .collect()
    }

    /// Boolean difference `self - other`; returns (remaining material,
    /// new interior holes).
    pub fn difference(&self, other: &Contour) -> (Vec<Contour>, Vec<Contour>) {
        self.boolean(other, BooleanOp::Not)
    }

    /// Boolean union `self ∪ other`; returns (outer loops, enclosed voids).
    pub fn union(&self, other: &Contour) -> (Vec<Contour>, Vec<Contour>) {
        self.boolean(other, BooleanOp::Or)
    }

    fn boolean(&self, other: &Contour, op: BooleanOp) -> (Vec<Contour>, Vec<Contour>) {
        let result = self.pline.boolean(&other.pline, op);
        let convert = |plines: Vec<_>| {
            plines
                .into_iter()
                .map(|wrapper: cavalier_contours::polyline::BooleanResultPline<Polyline<f64>>| {
                    let mut contour = Contour::from_polyline(wrapper.pline);
                    contour.normalize_ccw();
                    contour
                })
                .filter(|contour: &Contour| contour.vertex_count() >= 2)
                .collect::<Vec<_>>()
        };
        (convert(result.pos_plines), convert(result.neg_plines))
    }
}

/// Reverses a closed polyline. The bulge stored on a vertex belongs to the
/// edge leaving it, so reversal both negates bulges and shifts them to the
/// new owning vertex.
fn reversed(pline: &Polyline<f64>) -> Polyline<f64> {
    let n = pline.vertex_count();
    let mut out = Polyline::new();
    for j in 0..n {
        let vertex = pline.vertex_data[n - 1 - j];
        let bulge = -pline.vertex_data[(2 * n - 2 - j) % n].bulge;
        out.add(vertex.x, vertex.y, bulge);
    }
    out.set_is_closed(true);
    out
}

/// Shape builders. All produce counter-clockwise contours.
impl Contour {
    pub fn circle(center: Position, diameter: f64) -> Self {
        let r = diameter / 2.0;
        // two semicircular edges, bulge 1 each
        Self::from_polyline({
            let mut pline = Polyline::new();
            pline.add(center.x - r, center.y, 1.0);
            pline.add(center.x + r, center.y, 1.0);
            pline
        })
    }

    pub fn rectangle(center: Position, width: f64, height: f64, rotation: f64) -> Self {
        let hw = width / 2.0;
        let hh = height / 2.0;
        let corners = [
            Position::new(hw, -hh),
            Position::new(hw, hh),
            Position::new(-hw, hh),
            Position::new(-hw, -hh),
        ];
        Self::from_local_bulge_vertices(center, rotation, corners.iter().map(|c| (*c, 0.0)))
    }

    pub fn rounded_rectangle(center: Position, width: f64, height: f64, corner_radius: f64, rotation: f64) -> Self {
        let hw = width / 2.0;
        let hh = height / 2.0;
        let r = corner_radius.min(hw).min(hh).max(0.0);
        if r < 1e-9 {
            return Self::rectangle(center, width, height, rotation);
        }
        if hw - r < 1e-9 || hh - r < 1e-9 {
            return Self::stadium(center, width, height, rotation);
        }

        let corner = (PI / 8.0).tan(); // 90° corner arcs
        let vertices = [
            (Position::new(hw, -(hh - r)), 0.0),
            (Position::new(hw, hh - r), corner),
            (Position::new(hw - r, hh), 0.0),
            (Position::new(-(hw - r), hh), corner),
            (Position::new(-hw, hh - r), 0.0),
            (Position::new(-hw, -(hh - r)), corner),
            (Position::new(-(hw - r), -hh), 0.0),
            (Position::new(hw - r, -hh), corner),
        ];
        Self::from_local_bulge_vertices(center, rotation, vertices.iter().copied())
    }

    /// Obround: a rectangle with full semicircular caps on the two short
    /// sides. Degenerates to a circle when width equals height.
    pub fn stadium(center: Position, width: f64, height: f64, rotation: f64) -> Self {
        if (width - height).abs() < 1e-9 {
            return Self::circle(center, width);
        }
        let vertices = if width > height {
            let half_len = (width - height) / 2.0;
            let r = height / 2.0;
            [
                (Position::new(half_len, -r), 1.0),
                (Position::new(half_len, r), 0.0),
                (Position::new(-half_len, r), 1.0),
                (Position::new(-half_len, -r), 0.0),
            ]
        } else {
            let half_len = (height - width) / 2.0;
            let r = width / 2.0;
            [
                (Position::new(r, half_len), 1.0),
                (Position::new(-r, half_len), 0.0),
                (Position::new(-r, -half_len), 1.0),
                (Position::new(r, -half_len), 0.0),
            ]
        };
        Self::from_local_bulge_vertices(center, rotation, vertices.iter().copied())
    }

    /// Regular octagon given the diameter of its circumscribed circle, with a
    /// vertex at `rotation`. Callers wanting axis-aligned flats pass a
    /// rotation already phase-shifted by 22.5°.
    pub fn octagon(center: Position, circumscribed_size: f64, rotation: f64) -> Self {
        let radius = circumscribed_size / 2.0;
        let vertices = (0..8).map(|i| {
            let angle = rotation + (i as f64) * PI / 4.0;
            (Position::new(radius * angle.cos(), radius * angle.sin()), 0.0)
        });
        Self::from_local_bulge_vertices(center, 0.0, vertices)
    }

    /// The outline of a stroked arc: an annular band of half-width
    /// `half_width` around the arc, closed with semicircular end caps.
    ///
    /// When the half-width reaches the arc radius the band degenerates; the
    /// whole disc around the arc center is returned instead of erroring,
    /// since overly fat tracks are legal geometry.
    pub fn thick_arc(center: Position, radius: f64, start_angle: f64, sweep: f64, half_width: f64) -> Self {
        let outer = radius + half_width;
        let inner = radius - half_width;
        if inner <= 1e-9 || sweep.abs() >= 2.0 * PI - 1e-9 {
            return Self::circle(center, outer * 2.0);
        }

        // normalize to a counter-clockwise sweep; the band is symmetric
        let (a0, s) = if sweep >= 0.0 {
            (start_angle, sweep)
        } else {
            (start_angle + sweep, -sweep)
        };
        let a1 = a0 + s;

        let chunks = (s / MAX_EDGE_SWEEP).ceil().max(1.0) as usize;
        let step = s / (chunks as f64);
        let bulge = (step / 4.0).tan();

        let mut pline = Polyline::new();
        // outer arc, counter-clockwise from a0 to a1
        for k in 0..chunks {
            let angle = a0 + step * (k as f64);
            let p = center + dir(angle) * outer;
            pline.add(p.x, p.y, bulge);
        }
        // end cap, semicircle across the band
        let end_outer = center + dir(a1) * outer;
        pline.add(end_outer.x, end_outer.y, 1.0);
        // inner arc, back from a1 to a0
        for k in 0..chunks {
            let angle = a1 - step * (k as f64);
            let p = center + dir(angle) * inner;
            pline.add(p.x, p.y, -bulge);
        }
        // start cap
        let start_inner = center + dir(a0) * inner;
        pline.add(start_inner.x, start_inner.y, 1.0);

        Self::from_polyline(pline)
    }

    fn from_local_bulge_vertices(
        center: Position,
        rotation: f64,
        vertices: impl Iterator<Item = (Position, f64)>,
    ) -> Self {
        let (sin_theta, cos_theta) = rotation.sin_cos();
        let mut pline = Polyline::new();
        for (local, bulge) in vertices {
            let x = local.x * cos_theta - local.y * sin_theta;
            let y = local.x * sin_theta + local.y * cos_theta;
            pline.add(center.x + x, center.y + y, bulge);
        }
        Self::from_polyline(pline)
    }

    /// The outline of a stroked segment: a stadium spanning `start` to `end`
    /// with radius `half_width`.
    pub fn thick_segment(start: Position, end: Position, half_width: f64) -> Self {
        let delta = end - start;
        let length = delta.norm();
        if length < 1e-9 {
            return Self::circle(start, half_width * 2.0);
        }
        let center = nalgebra::center(&start, &end);
        let rotation = delta.y.atan2(delta.x);
        Self::stadium(center, length + 2.0 * half_width, half_width * 2.0, rotation)
    }
}

impl From<Polyline<f64>> for Contour {
    fn from(pline: Polyline<f64>) -> Self {
        Self::from_polyline(pline)
    }
}
