use crate::{AttachmentData, QUAD_TRIANGLES, Skeleton, SkeletonClipper};

#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[repr(C)]
#[cfg_attr(feature = "bytemuck", derive(bytemuck::Pod, bytemuck::Zeroable))]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Vertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

/// A run of indices emitted for one slot.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Draw {
    pub slot: usize,
    pub first_index: usize,
    pub index_count: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DrawList {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub draws: Vec<Draw>,
}

impl DrawList {
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.draws.clear();
    }
}

pub fn build_draw_list(skeleton: &Skeleton) -> DrawList {
    let mut out = DrawList::default();
    let mut clipper = SkeletonClipper::default();
    append_draw_list(&mut out, skeleton, &mut clipper);
    out
}

/// Appends the world-space geometry of `skeleton` in draw order, clipping through `clipper`.
///
/// The clipper is left idle when this returns.
pub fn append_draw_list(out: &mut DrawList, skeleton: &Skeleton, clipper: &mut SkeletonClipper) {
    let mut positions: Vec<f32> = Vec::new();
    let mut uvs: Vec<f32> = Vec::new();

    for &slot_index in &skeleton.draw_order {
        // Clipping attachments do not end a clip on their own slot.
        let mut call_clip_end_for_slot = true;

        'process_slot: {
            let Some(slot) = skeleton.slots.get(slot_index) else {
                break 'process_slot;
            };
            let Some(attachment_name) = slot.attachment.as_deref() else {
                break 'process_slot;
            };
            let Some(attachment) = skeleton.attachment(slot_index, attachment_name) else {
                log::warn!("slot {slot_index} references missing attachment '{attachment_name}'");
                break 'process_slot;
            };
            let Some(bone) = skeleton.bones.get(slot.bone) else {
                log::warn!("slot {slot_index} references missing bone {}", slot.bone);
                break 'process_slot;
            };
            if !bone.active {
                break 'process_slot;
            }

            let (attachment_color, triangles): ([f32; 4], &[u32]) = match attachment {
                AttachmentData::Region(region) => {
                    positions.clear();
                    positions.extend(region.compute_world_vertices(bone));
                    uvs.clear();
                    uvs.extend(region.uvs);
                    (region.color, &QUAD_TRIANGLES[..])
                }
                AttachmentData::Mesh(mesh) => {
                    positions.clear();
                    mesh.vertices.compute_world_vertices(
                        &skeleton.bones,
                        slot.bone,
                        &slot.deform,
                        &mut positions,
                    );
                    uvs.clear();
                    uvs.extend(mesh.uvs.iter().flatten());
                    (mesh.color, mesh.triangles.as_slice())
                }
                AttachmentData::Clipping(clip) => {
                    call_clip_end_for_slot = false;
                    clipper.clip_start(skeleton, slot_index, clip);
                    break 'process_slot;
                }
                AttachmentData::Point(_)
                | AttachmentData::Path(_)
                | AttachmentData::BoundingBox(_) => break 'process_slot,
            };

            let color = multiply_color(
                multiply_color(skeleton.color, slot.color),
                attachment_color,
            );
            if color[3] <= 0.0 {
                break 'process_slot;
            }

            if clipper.is_clipping() {
                clipper.clip_triangles(&positions, triangles, &uvs);
                append_indexed(
                    out,
                    slot_index,
                    clipper.clipped_vertices(),
                    clipper.clipped_uvs(),
                    clipper.clipped_triangles(),
                    color,
                );
            } else {
                append_indexed(out, slot_index, &positions, &uvs, triangles, color);
            }
        }

        if call_clip_end_for_slot {
            clipper.clip_end_for_slot(slot_index);
        }
    }

    clipper.clip_end();
}

fn multiply_color(a: [f32; 4], b: [f32; 4]) -> [f32; 4] {
    [a[0] * b[0], a[1] * b[1], a[2] * b[2], a[3] * b[3]]
}

fn append_indexed(
    out: &mut DrawList,
    slot: usize,
    positions: &[f32],
    uvs: &[f32],
    indices: &[u32],
    color: [f32; 4],
) {
    if positions.is_empty() || indices.is_empty() {
        return;
    }

    let base = out.vertices.len() as u32;
    out.vertices.extend(
        positions
            .chunks_exact(2)
            .zip(uvs.chunks_exact(2))
            .map(|(position, uv)| Vertex {
                position: [position[0], position[1]],
                uv: [uv[0], uv[1]],
                color,
            }),
    );

    let first_index = out.indices.len();
    out.indices.extend(indices.iter().map(|&idx| base + idx));

    out.draws.push(Draw {
        slot,
        first_index,
        index_count: indices.len(),
    });
}
