//! Mesh clipping against a clipping attachment's polygon.
//!
//! A [`SkeletonClipper`] owns reusable buffers and is meant to live as long as the render
//! pipeline that drives it: one instance per pipeline, never shared across threads while in use.

use crate::geometry::{ClosedPolygon, Triangulator, make_clockwise};
use crate::{ClippingAttachmentData, Skeleton};

const DEFAULT_CAPACITY: usize = 128;

/// Crossings whose denominator is at or below this magnitude use the clip edge's start point.
const PARALLEL_EPSILON: f32 = 0.000_001;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ClipState {
    #[default]
    Idle,
    Clipping {
        end_slot: Option<usize>,
    },
}

/// Sutherland–Hodgman clipping of a single triangle against one convex, clockwise area.
#[derive(Clone, Debug, Default)]
pub struct TriangleClipper {
    output: Vec<f32>,
    scratch: Vec<f32>,
}

impl TriangleClipper {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            output: Vec::with_capacity(capacity),
            scratch: Vec::with_capacity(capacity),
        }
    }

    /// Result of the last [`TriangleClipper::clip`] call, as an open polygon.
    pub fn output(&self) -> &[f32] {
        &self.output
    }

    /// Clips `[x1, y1, x2, y2, x3, y3]` against `area`.
    ///
    /// Returns `false` when the triangle lies entirely inside the area (the output then holds the
    /// triangle's vertices, possibly starting from a different one). Returns `true` otherwise, with an empty output when the triangle lies
    /// entirely outside.
    pub fn clip(&mut self, triangle: [f32; 6], area: &ClosedPolygon) -> bool {
        let area = area.as_slice();
        if area.len() < 8 {
            self.output.clear();
            return true;
        }

        let [x1, y1, x2, y2, x3, y3] = triangle;
        let edge_count = area.len() / 2 - 1;

        // Start in the buffer that makes the last edge write into `self.output`.
        let mut output_is_result = edge_count % 2 == 1;
        let (mut input, mut output) = if output_is_result {
            (&mut self.scratch, &mut self.output)
        } else {
            (&mut self.output, &mut self.scratch)
        };

        input.clear();
        input.extend_from_slice(&[x1, y1, x2, y2, x3, y3, x1, y1]);
        output.clear();

        let mut clipped = false;
        let last_edge = area.len() - 4;
        let mut i = 0usize;
        loop {
            let edge = [area[i], area[i + 1], area[i + 2], area[i + 3]];
            let [edge_x, edge_y, edge_x2, edge_y2] = edge;
            let delta_x = edge_x - edge_x2;
            let delta_y = edge_y - edge_y2;

            let output_start = output.len();
            for segment in input.windows(4).step_by(2) {
                let [input_x, input_y, input_x2, input_y2] = [segment[0], segment[1], segment[2], segment[3]];
                let side2 = delta_x * (input_y2 - edge_y2) - delta_y * (input_x2 - edge_x2) > 0.0;
                if delta_x * (input_y - edge_y2) - delta_y * (input_x - edge_x2) > 0.0 {
                    if side2 {
                        output.extend_from_slice(&[input_x2, input_y2]);
                        continue;
                    }
                    push_intersection(output, edge, [input_x, input_y, input_x2, input_y2]);
                } else if side2 {
                    push_intersection(output, edge, [input_x, input_y, input_x2, input_y2]);
                    output.extend_from_slice(&[input_x2, input_y2]);
                }
                clipped = true;
            }

            if output_start == output.len() {
                // Every subject vertex is outside this edge.
                if output_is_result {
                    output.clear();
                } else {
                    input.clear();
                }
                return true;
            }

            let (first_x, first_y) = (output[0], output[1]);
            output.extend_from_slice(&[first_x, first_y]);

            if i == last_edge {
                break;
            }
            std::mem::swap(&mut input, &mut output);
            output.clear();
            output_is_result = !output_is_result;
            i += 2;
        }

        let open_len = output.len() - 2;
        if output_is_result {
            output.truncate(open_len);
        } else {
            input.clear();
            input.extend_from_slice(&output[..open_len]);
        }
        clipped
    }
}

fn push_intersection(output: &mut Vec<f32>, edge: [f32; 4], segment: [f32; 4]) {
    let [edge_x, edge_y, edge_x2, edge_y2] = edge;
    let [input_x, input_y, input_x2, input_y2] = segment;
    let c0 = input_y2 - input_y;
    let c2 = input_x2 - input_x;
    let s = c0 * (edge_x2 - edge_x) - c2 * (edge_y2 - edge_y);
    if s.abs() > PARALLEL_EPSILON {
        let ua = (c2 * (edge_y - input_y) - c0 * (edge_x - input_x)) / s;
        output.extend_from_slice(&[
            edge_x + (edge_x2 - edge_x) * ua,
            edge_y + (edge_y2 - edge_y) * ua,
        ]);
    } else {
        output.extend_from_slice(&[edge_x, edge_y]);
    }
}

/// Clips attachment triangles against the active clipping attachment.
///
/// `Idle --clip_start--> Clipping --clip_end--> Idle`. Only one clipping attachment is active at a
/// time; `clip_start` while clipping is ignored.
#[derive(Clone, Debug)]
pub struct SkeletonClipper {
    triangulator: Triangulator,
    state: ClipState,
    clipping_polygon: Vec<f32>,
    clipping_polygons: Vec<ClosedPolygon>,
    triangle_clipper: TriangleClipper,
    clipped_vertices: Vec<f32>,
    clipped_triangles: Vec<u32>,
    clipped_uvs: Vec<f32>,
}

impl Default for SkeletonClipper {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl SkeletonClipper {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            triangulator: Triangulator,
            state: ClipState::Idle,
            clipping_polygon: Vec::new(),
            clipping_polygons: Vec::new(),
            triangle_clipper: TriangleClipper::with_capacity(capacity),
            clipped_vertices: Vec::with_capacity(capacity),
            clipped_triangles: Vec::with_capacity(capacity),
            clipped_uvs: Vec::with_capacity(capacity),
        }
    }

    pub fn state(&self) -> ClipState {
        self.state
    }

    pub fn is_clipping(&self) -> bool {
        matches!(self.state, ClipState::Clipping { .. })
    }

    pub fn clipped_vertices(&self) -> &[f32] {
        &self.clipped_vertices
    }

    pub fn clipped_triangles(&self) -> &[u32] {
        &self.clipped_triangles
    }

    pub fn clipped_uvs(&self) -> &[f32] {
        &self.clipped_uvs
    }

    /// The active clipping polygon in world space, clockwise.
    pub fn clipping_polygon(&self) -> &[f32] {
        &self.clipping_polygon
    }

    /// Convex pieces of the active clipping polygon.
    pub fn convex_polygons(&self) -> &[ClosedPolygon] {
        &self.clipping_polygons
    }

    /// Starts clipping with `clip`, attached to `slot_index` of `skeleton`.
    ///
    /// Returns the number of convex pieces, `0` when already clipping or when the polygon
    /// decomposes to nothing (everything drawn until `clip_end` is then clipped away).
    pub fn clip_start(
        &mut self,
        skeleton: &Skeleton,
        slot_index: usize,
        clip: &ClippingAttachmentData,
    ) -> usize {
        if self.is_clipping() {
            return 0;
        }
        self.clipping_polygon.clear();
        if let Some(slot) = skeleton.slots.get(slot_index) {
            clip.vertices.compute_world_vertices(
                &skeleton.bones,
                slot.bone,
                &slot.deform,
                &mut self.clipping_polygon,
            );
        }
        self.decompose_clipping_polygon(clip.end_slot)
    }

    /// Starts clipping with a polygon already in world space.
    pub fn clip_start_polygon(&mut self, world_vertices: &[f32], end_slot: Option<usize>) -> usize {
        if self.is_clipping() {
            return 0;
        }
        self.clipping_polygon.clear();
        self.clipping_polygon.extend_from_slice(world_vertices);
        self.decompose_clipping_polygon(end_slot)
    }

    fn decompose_clipping_polygon(&mut self, end_slot: Option<usize>) -> usize {
        self.state = ClipState::Clipping { end_slot };
        make_clockwise(&mut self.clipping_polygon);

        let triangles = self.triangulator.triangulate(&self.clipping_polygon);
        let pieces = self.triangulator.decompose(&self.clipping_polygon, &triangles);
        self.clipping_polygons.clear();
        self.clipping_polygons
            .extend(pieces.into_iter().map(|mut polygon| {
                make_clockwise(&mut polygon);
                ClosedPolygon::close_unchecked(polygon)
            }));

        if self.clipping_polygons.is_empty() {
            log::debug!(
                "clipping polygon with {} vertices has no convex pieces",
                self.clipping_polygon.len() / 2
            );
        } else {
            log::debug!(
                "clip start: {} convex piece(s), end slot {:?}",
                self.clipping_polygons.len(),
                end_slot
            );
        }
        self.clipping_polygons.len()
    }

    /// Ends clipping if `slot_index` is the end slot of the active clipping attachment.
    pub fn clip_end_for_slot(&mut self, slot_index: usize) {
        if let ClipState::Clipping {
            end_slot: Some(end_slot),
        } = self.state
        {
            if end_slot == slot_index {
                self.clip_end();
            }
        }
    }

    pub fn clip_end(&mut self) {
        if !self.is_clipping() {
            return;
        }
        log::trace!("clip end");
        self.state = ClipState::Idle;
        self.clipping_polygon.clear();
        self.clipping_polygons.clear();
        self.clipped_vertices.clear();
        self.clipped_triangles.clear();
        self.clipped_uvs.clear();
    }

    /// Clips a triangle list against every convex piece, replacing the `clipped_*` buffers.
    ///
    /// `vertices` and `uvs` are interleaved pairs indexed by `triangles`. While idle the output
    /// stays empty.
    ///
    /// A triangle found entirely inside a piece is emitted unclipped and not tested against the
    /// remaining pieces, so a triangle spanning several pieces can be emitted whole when an earlier
    /// piece contains it.
    pub fn clip_triangles(&mut self, vertices: &[f32], triangles: &[u32], uvs: &[f32]) {
        self.clipped_vertices.clear();
        self.clipped_uvs.clear();
        self.clipped_triangles.clear();
        if !self.is_clipping() {
            return;
        }

        let mut index: u32 = 0;
        'triangles: for triangle in triangles.chunks_exact(3) {
            let (x1, y1, u1, v1) = read_vertex(vertices, uvs, triangle[0]);
            let (x2, y2, u2, v2) = read_vertex(vertices, uvs, triangle[1]);
            let (x3, y3, u3, v3) = read_vertex(vertices, uvs, triangle[2]);

            for polygon in &self.clipping_polygons {
                if !self
                    .triangle_clipper
                    .clip([x1, y1, x2, y2, x3, y3], polygon)
                {
                    self.clipped_vertices
                        .extend_from_slice(&[x1, y1, x2, y2, x3, y3]);
                    self.clipped_uvs.extend_from_slice(&[u1, v1, u2, v2, u3, v3]);
                    self.clipped_triangles
                        .extend_from_slice(&[index, index + 1, index + 2]);
                    index += 3;
                    continue 'triangles;
                }

                let output = self.triangle_clipper.output();
                if output.is_empty() {
                    continue;
                }

                let d0 = y2 - y3;
                let d1 = x3 - x2;
                let d2 = x1 - x3;
                let d4 = y3 - y1;
                let d = 1.0 / (d0 * d2 + d1 * (y1 - y3));

                for xy in output.chunks_exact(2) {
                    let (x, y) = (xy[0], xy[1]);
                    let c0 = x - x3;
                    let c1 = y - y3;
                    let a = (d0 * c0 + d1 * c1) * d;
                    let b = (d4 * c0 + d2 * c1) * d;
                    let c = 1.0 - a - b;
                    self.clipped_vertices.extend_from_slice(&[x, y]);
                    self.clipped_uvs
                        .extend_from_slice(&[u1 * a + u2 * b + u3 * c, v1 * a + v2 * b + v3 * c]);
                }

                let count = (output.len() / 2) as u32;
                for ii in 1..count.saturating_sub(1) {
                    self.clipped_triangles
                        .extend_from_slice(&[index, index + ii, index + ii + 1]);
                }
                index += count;
            }
        }
    }
}

fn read_vertex(vertices: &[f32], uvs: &[f32], vertex: u32) -> (f32, f32, f32, f32) {
    let offset = vertex as usize * 2;
    (
        vertices[offset],
        vertices[offset + 1],
        uvs[offset],
        uvs[offset + 1],
    )
}
