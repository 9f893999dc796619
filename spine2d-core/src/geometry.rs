//! Polygon helpers shared by the clipper: winding, closed polygons, triangulation and convex
//! decomposition.
//!
//! Polygons are flat `[x0, y0, x1, y1, ...]` buffers. "Clockwise" follows the y-up convention used
//! by Spine exports: a negative shoelace sum is clockwise.

use crate::Error;

/// A polygon whose buffer repeats the first vertex at the end.
///
/// Edge walks over [`ClosedPolygon::as_slice`] can read `(i, i + 1)` pairs without wrapping.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClosedPolygon {
    vertices: Vec<f32>,
}

impl ClosedPolygon {
    /// Closes an open polygon of at least three vertices.
    pub fn close(open: Vec<f32>) -> Result<Self, Error> {
        if open.len() % 2 != 0 {
            return Err(Error::InvalidPolygon {
                message: format!("odd buffer length {}", open.len()),
            });
        }
        if open.len() < 6 {
            return Err(Error::InvalidPolygon {
                message: format!("{} vertices, need at least 3", open.len() / 2),
            });
        }
        Ok(Self::close_unchecked(open))
    }

    pub(crate) fn close_unchecked(mut open: Vec<f32>) -> Self {
        if open.len() >= 2 {
            open.push(open[0]);
            open.push(open[1]);
        }
        Self { vertices: open }
    }

    /// Vertices including the duplicated closing vertex.
    pub fn as_slice(&self) -> &[f32] {
        &self.vertices
    }

    /// Vertices without the closing vertex.
    pub fn open_vertices(&self) -> &[f32] {
        &self.vertices[..self.vertices.len().saturating_sub(2)]
    }

    /// Number of distinct vertices.
    pub fn vertex_count(&self) -> usize {
        (self.vertices.len() / 2).saturating_sub(1)
    }

    pub fn into_open(mut self) -> Vec<f32> {
        let len = self.vertices.len().saturating_sub(2);
        self.vertices.truncate(len);
        self.vertices
    }
}

/// Shoelace sum (twice the signed area) of an open polygon, wrap-around edge included.
pub fn signed_area(polygon: &[f32]) -> f32 {
    let len = polygon.len() - polygon.len() % 2;
    if len < 6 {
        return 0.0;
    }
    let mut area = polygon[len - 2] * polygon[1] - polygon[0] * polygon[len - 1];
    for edge in polygon[..len].windows(4).step_by(2) {
        area += edge[0] * edge[3] - edge[2] * edge[1];
    }
    area
}

/// Reverses the vertex order of an open polygon unless it is already clockwise.
pub fn make_clockwise(polygon: &mut [f32]) {
    if polygon.len() < 6 {
        return;
    }
    if signed_area(polygon) < 0.0 {
        return;
    }
    let count = polygon.len() / 2;
    for i in 0..count / 2 {
        let j = count - 1 - i;
        polygon.swap(i * 2, j * 2);
        polygon.swap(i * 2 + 1, j * 2 + 1);
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Winding {
    Clockwise,
    CounterClockwise,
}

fn winding(p1x: f32, p1y: f32, p2x: f32, p2y: f32, p3x: f32, p3y: f32) -> Winding {
    let px = p2x - p1x;
    let py = p2y - p1y;
    if p3x * py - p3y * px + px * p1y - p1x * py >= 0.0 {
        Winding::Clockwise
    } else {
        Winding::CounterClockwise
    }
}

fn positive_area(p1x: f32, p1y: f32, p2x: f32, p2y: f32, p3x: f32, p3y: f32) -> bool {
    p1x * (p3y - p2y) + p2x * (p1y - p3y) + p3x * (p2y - p1y) >= 0.0
}

fn point(vertices: &[f32], vertex: usize) -> (f32, f32) {
    (vertices[vertex * 2], vertices[vertex * 2 + 1])
}

/// Ear-clipping triangulator and fan-merging convex decomposer.
///
/// Input polygons are expected to be simple and clockwise.
#[derive(Clone, Debug, Default)]
pub struct Triangulator;

impl Triangulator {
    /// Triangulates an open polygon, returning vertex indices three at a time.
    pub fn triangulate(&self, vertices: &[f32]) -> Vec<u32> {
        let mut remaining = vertices.len() / 2;
        if remaining < 3 {
            return Vec::new();
        }

        let mut indices: Vec<usize> = (0..remaining).collect();
        let mut concave: Vec<bool> = (0..remaining)
            .map(|i| is_concave(i, remaining, vertices, &indices))
            .collect();
        let mut triangles = Vec::with_capacity((remaining - 2) * 3);

        while remaining > 3 {
            let ear = find_ear(vertices, &indices, &concave, remaining);
            let previous = (remaining + ear - 1) % remaining;
            let next = (ear + 1) % remaining;
            triangles.extend([
                indices[previous] as u32,
                indices[ear] as u32,
                indices[next] as u32,
            ]);

            indices.remove(ear);
            concave.remove(ear);
            remaining -= 1;

            let previous = (remaining + ear - 1) % remaining;
            let next = if ear == remaining { 0 } else { ear };
            concave[previous] = is_concave(previous, remaining, vertices, &indices);
            concave[next] = is_concave(next, remaining, vertices, &indices);
        }

        if remaining == 3 {
            triangles.extend([indices[2] as u32, indices[0] as u32, indices[1] as u32]);
        }
        triangles
    }

    /// Groups triangles produced by [`Triangulator::triangulate`] into convex polygons.
    ///
    /// Consecutive triangles sharing the same fan base are merged while the fan stays convex, then
    /// lone triangles continuing a polygon's first/last edge are folded into it.
    pub fn decompose(&self, vertices: &[f32], triangles: &[u32]) -> Vec<Vec<f32>> {
        let mut pieces: Vec<ConvexPiece> = Vec::new();
        let mut current = ConvexPiece::default();
        let mut fan_base: Option<usize> = None;
        let mut last_winding = Winding::Clockwise;

        for triangle in triangles.chunks_exact(3) {
            let t1 = triangle[0] as usize;
            let t2 = triangle[1] as usize;
            let t3 = triangle[2] as usize;
            let (x1, y1) = point(vertices, t1);
            let (x2, y2) = point(vertices, t2);
            let (x3, y3) = point(vertices, t3);

            if fan_base == Some(t1) && current.vertices.len() >= 4 {
                let poly = &current.vertices;
                let o = poly.len() - 4;
                let winding1 = winding(poly[o], poly[o + 1], poly[o + 2], poly[o + 3], x3, y3);
                let winding2 = winding(x3, y3, poly[0], poly[1], poly[2], poly[3]);
                if winding1 == last_winding && winding2 == last_winding {
                    current.vertices.extend([x3, y3]);
                    current.indices.push(t3);
                    continue;
                }
            }

            if !current.indices.is_empty() {
                pieces.push(std::mem::take(&mut current));
            }
            current = ConvexPiece {
                vertices: vec![x1, y1, x2, y2, x3, y3],
                indices: vec![t1, t2, t3],
            };
            last_winding = winding(x1, y1, x2, y2, x3, y3);
            fan_base = Some(t1);
        }
        if !current.indices.is_empty() {
            pieces.push(current);
        }

        merge_adjacent_triangles(&mut pieces);

        pieces
            .into_iter()
            .filter(|piece| !piece.vertices.is_empty())
            .map(|piece| piece.vertices)
            .collect()
    }
}

#[derive(Clone, Debug, Default)]
struct ConvexPiece {
    vertices: Vec<f32>,
    indices: Vec<usize>,
}

fn merge_adjacent_triangles(pieces: &mut [ConvexPiece]) {
    let n = pieces.len();
    for i in 0..n {
        let (first_index, last_index) = match (pieces[i].indices.first(), pieces[i].indices.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => continue,
        };

        let poly = &pieces[i].vertices;
        let o = poly.len() - 4;
        let (mut prev_prev_x, mut prev_prev_y) = (poly[o], poly[o + 1]);
        let (mut prev_x, mut prev_y) = (poly[o + 2], poly[o + 3]);
        let (first_x, first_y) = (poly[0], poly[1]);
        let (second_x, second_y) = (poly[2], poly[3]);
        let winding0 = winding(prev_prev_x, prev_prev_y, prev_x, prev_y, first_x, first_y);

        let mut ii = 0usize;
        while ii < n {
            let other = &pieces[ii];
            if ii == i
                || other.indices.len() != 3
                || other.indices[0] != first_index
                || other.indices[1] != last_index
            {
                ii += 1;
                continue;
            }

            let other_last_index = other.indices[2];
            let x3 = other.vertices[other.vertices.len() - 2];
            let y3 = other.vertices[other.vertices.len() - 1];

            let winding1 = winding(prev_prev_x, prev_prev_y, prev_x, prev_y, x3, y3);
            let winding2 = winding(x3, y3, first_x, first_y, second_x, second_y);
            if winding1 != winding0 || winding2 != winding0 {
                ii += 1;
                continue;
            }

            pieces[ii].vertices.clear();
            pieces[ii].indices.clear();
            pieces[i].vertices.extend([x3, y3]);
            pieces[i].indices.push(other_last_index);

            prev_prev_x = prev_x;
            prev_prev_y = prev_y;
            prev_x = x3;
            prev_y = y3;
            ii = 0;
        }
    }
}

fn find_ear(vertices: &[f32], indices: &[usize], concave: &[bool], count: usize) -> usize {
    let mut previous = count - 1;
    let mut i = 0usize;
    let mut next = 1usize;
    loop {
        if !concave[i] && is_ear(vertices, indices, concave, count, [previous, i, next]) {
            return i;
        }
        if next == 0 {
            // No ear: settle for the last convex vertex, or the first one.
            while i > 0 && concave[i] {
                i -= 1;
            }
            return i;
        }
        previous = i;
        i = next;
        next = (next + 1) % count;
    }
}

fn is_ear(
    vertices: &[f32],
    indices: &[usize],
    concave: &[bool],
    count: usize,
    [previous, current, next]: [usize; 3],
) -> bool {
    let (p1x, p1y) = point(vertices, indices[previous]);
    let (p2x, p2y) = point(vertices, indices[current]);
    let (p3x, p3y) = point(vertices, indices[next]);

    let mut ii = (next + 1) % count;
    while ii != previous {
        if concave[ii] {
            let (vx, vy) = point(vertices, indices[ii]);
            if positive_area(p3x, p3y, p1x, p1y, vx, vy)
                && positive_area(p1x, p1y, p2x, p2y, vx, vy)
                && positive_area(p2x, p2y, p3x, p3y, vx, vy)
            {
                return false;
            }
        }
        ii = (ii + 1) % count;
    }
    true
}

fn is_concave(index: usize, count: usize, vertices: &[f32], indices: &[usize]) -> bool {
    let (px, py) = point(vertices, indices[(count + index - 1) % count]);
    let (cx, cy) = point(vertices, indices[index]);
    let (nx, ny) = point(vertices, indices[(index + 1) % count]);
    !positive_area(px, py, cx, cy, nx, ny)
}
