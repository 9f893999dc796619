use crate::{
    AttachmentData, BoundingBoxAttachmentData, ClippingAttachmentData, Error, Inherit,
    MeshAttachmentData, MeshVertices, PointAttachmentData, RegionAttachmentData, SkeletonData,
};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct Bone {
    data_index: usize,
    parent: Option<usize>,

    pub inherit: Inherit,
    pub active: bool,

    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub shear_x: f32,
    pub shear_y: f32,

    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub world_x: f32,
    pub world_y: f32,
}

impl Bone {
    /// A bone with a fixed world transform and no data backing, for hosts that pose bones
    /// themselves.
    pub fn from_world(a: f32, b: f32, c: f32, d: f32, world_x: f32, world_y: f32) -> Self {
        Self {
            data_index: 0,
            parent: None,
            inherit: Inherit::Normal,
            active: true,
            x: world_x,
            y: world_y,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            shear_x: 0.0,
            shear_y: 0.0,
            a,
            b,
            c,
            d,
            world_x,
            world_y,
        }
    }

    pub fn data_index(&self) -> usize {
        self.data_index
    }

    pub fn parent_index(&self) -> Option<usize> {
        self.parent
    }

    pub fn local_to_world(&self, local_x: f32, local_y: f32) -> [f32; 2] {
        [
            self.a * local_x + self.b * local_y + self.world_x,
            self.c * local_x + self.d * local_y + self.world_y,
        ]
    }

    /// Inverse of [`Bone::local_to_world`]. A singular matrix maps everything to the origin.
    pub fn world_to_local(&self, world_x: f32, world_y: f32) -> [f32; 2] {
        let det = self.a * self.d - self.b * self.c;
        if det == 0.0 {
            return [0.0, 0.0];
        }
        let inv = 1.0 / det;
        let x = world_x - self.world_x;
        let y = world_y - self.world_y;
        [
            (x * self.d - y * self.b) * inv,
            (y * self.a - x * self.c) * inv,
        ]
    }

    pub fn world_rotation_x(&self) -> f32 {
        self.c.atan2(self.a).to_degrees()
    }

    pub fn world_rotation_y(&self) -> f32 {
        self.d.atan2(self.b).to_degrees()
    }

    pub fn world_scale_x(&self) -> f32 {
        (self.a * self.a + self.c * self.c).sqrt()
    }

    pub fn world_scale_y(&self) -> f32 {
        (self.b * self.b + self.d * self.d).sqrt()
    }

    #[cfg(feature = "glam")]
    pub fn world_affine(&self) -> glam::Affine2 {
        glam::Affine2::from_cols_array(&[
            self.a,
            self.c,
            self.b,
            self.d,
            self.world_x,
            self.world_y,
        ])
    }

    #[cfg(feature = "glam")]
    pub fn local_to_world_vec2(&self, local: glam::Vec2) -> glam::Vec2 {
        let [x, y] = self.local_to_world(local.x, local.y);
        glam::Vec2::new(x, y)
    }

    fn set_to_setup(&mut self, data: &crate::BoneData) {
        self.x = data.x;
        self.y = data.y;
        self.rotation = data.rotation;
        self.scale_x = data.scale_x;
        self.scale_y = data.scale_y;
        self.shear_x = data.shear_x;
        self.shear_y = data.shear_y;
        self.inherit = data.inherit;
    }
}

#[derive(Clone, Debug)]
pub struct Slot {
    data_index: usize,
    pub bone: usize,
    pub attachment: Option<String>,
    pub color: [f32; 4],
    /// Vertex offsets written by an animation layer; empty means "use setup vertices".
    pub deform: Vec<f32>,
}

impl Slot {
    pub fn data_index(&self) -> usize {
        self.data_index
    }
}

impl PointAttachmentData {
    pub fn compute_world_position(&self, bone: &Bone) -> [f32; 2] {
        bone.local_to_world(self.x, self.y)
    }

    /// World rotation in degrees. The local direction is pushed through the bone matrix, so
    /// shear and non-uniform scale are accounted for.
    pub fn compute_world_rotation(&self, bone: &Bone) -> f32 {
        let r = self.rotation.to_radians();
        let cos = r.cos();
        let sin = r.sin();
        let ix = cos * bone.a + sin * bone.b;
        let iy = cos * bone.c + sin * bone.d;
        iy.atan2(ix).to_degrees()
    }
}

impl MeshVertices {
    /// Appends the world positions of these vertices to `out`.
    ///
    /// Unweighted vertices follow `slot_bone`; weighted vertices blend their bones. `deform`
    /// replaces unweighted positions or offsets weighted ones when it is long enough.
    pub fn compute_world_vertices(
        &self,
        bones: &[Bone],
        slot_bone: usize,
        deform: &[f32],
        out: &mut Vec<f32>,
    ) {
        match self {
            MeshVertices::Unweighted(points) => {
                let Some(bone) = bones.get(slot_bone) else {
                    return;
                };
                let use_deform = deform.len() >= points.len() * 2;
                out.reserve(points.len() * 2);
                for (i, p) in points.iter().enumerate() {
                    let (x, y) = if use_deform {
                        (deform[i * 2], deform[i * 2 + 1])
                    } else {
                        (p[0], p[1])
                    };
                    out.extend(bone.local_to_world(x, y));
                }
            }
            MeshVertices::Weighted(points) => {
                let use_deform = deform.len() >= self.deform_len();
                let mut f = 0usize;
                out.reserve(points.len() * 2);
                for weights in points {
                    let mut wx = 0.0;
                    let mut wy = 0.0;
                    for w in weights {
                        let (dx, dy) = if use_deform {
                            (deform[f], deform[f + 1])
                        } else {
                            (0.0, 0.0)
                        };
                        f += 2;
                        let Some(bone) = bones.get(w.bone) else {
                            continue;
                        };
                        let [x, y] = bone.local_to_world(w.x + dx, w.y + dy);
                        wx += x * w.weight;
                        wy += y * w.weight;
                    }
                    out.extend([wx, wy]);
                }
            }
        }
    }
}

fn slot_world_vertices(skeleton: &Skeleton, slot_index: usize, vertices: &MeshVertices) -> Vec<f32> {
    let mut out = Vec::with_capacity(vertices.len() * 2);
    if let Some(slot) = skeleton.slots.get(slot_index) {
        vertices.compute_world_vertices(&skeleton.bones, slot.bone, &slot.deform, &mut out);
    }
    out
}

impl MeshAttachmentData {
    pub fn compute_world_vertices(&self, skeleton: &Skeleton, slot_index: usize) -> Vec<f32> {
        slot_world_vertices(skeleton, slot_index, &self.vertices)
    }
}

impl BoundingBoxAttachmentData {
    pub fn compute_world_vertices(&self, skeleton: &Skeleton, slot_index: usize) -> Vec<f32> {
        slot_world_vertices(skeleton, slot_index, &self.vertices)
    }
}

impl ClippingAttachmentData {
    pub fn compute_world_vertices(&self, skeleton: &Skeleton, slot_index: usize) -> Vec<f32> {
        slot_world_vertices(skeleton, slot_index, &self.vertices)
    }
}

impl RegionAttachmentData {
    /// Local corner offsets after the attachment's own transform, in BR, BL, UL, UR order.
    pub fn local_vertices(&self) -> [f32; 8] {
        let local_x = -self.width * 0.5 * self.scale_x;
        let local_y = -self.height * 0.5 * self.scale_y;
        let local_x2 = self.width * 0.5 * self.scale_x;
        let local_y2 = self.height * 0.5 * self.scale_y;

        let r = self.rotation.to_radians();
        let cos = r.cos();
        let sin = r.sin();

        let local_x_cos = local_x * cos + self.x;
        let local_x_sin = local_x * sin;
        let local_y_cos = local_y * cos + self.y;
        let local_y_sin = local_y * sin;
        let local_x2_cos = local_x2 * cos + self.x;
        let local_x2_sin = local_x2 * sin;
        let local_y2_cos = local_y2 * cos + self.y;
        let local_y2_sin = local_y2 * sin;

        [
            local_x2_cos - local_y_sin,
            local_y_cos + local_x2_sin,
            local_x_cos - local_y_sin,
            local_y_cos + local_x_sin,
            local_x_cos - local_y2_sin,
            local_y2_cos + local_x_sin,
            local_x2_cos - local_y2_sin,
            local_y2_cos + local_x2_sin,
        ]
    }

    pub fn compute_world_vertices(&self, bone: &Bone) -> [f32; 8] {
        let mut out = self.local_vertices();
        for corner in out.chunks_exact_mut(2) {
            let [x, y] = bone.local_to_world(corner[0], corner[1]);
            corner[0] = x;
            corner[1] = y;
        }
        out
    }
}

#[derive(Clone, Debug)]
pub struct Skeleton {
    pub data: Arc<SkeletonData>,
    pub bones: Vec<Bone>,
    pub slots: Vec<Slot>,
    pub draw_order: Vec<usize>,
    pub skin: Option<String>,
    pub color: [f32; 4],
    pub x: f32,
    pub y: f32,
    pub scale_x: f32,
    pub scale_y: f32,
}

impl Skeleton {
    pub fn new(data: Arc<SkeletonData>) -> Self {
        let bones = data
            .bones
            .values()
            .enumerate()
            .map(|(data_index, bone)| Bone {
                data_index,
                parent: bone.parent,
                inherit: bone.inherit,
                active: true,
                x: bone.x,
                y: bone.y,
                rotation: bone.rotation,
                scale_x: bone.scale_x,
                scale_y: bone.scale_y,
                shear_x: bone.shear_x,
                shear_y: bone.shear_y,
                a: 1.0,
                b: 0.0,
                c: 0.0,
                d: 1.0,
                world_x: 0.0,
                world_y: 0.0,
            })
            .collect();

        let slots = data
            .slots
            .values()
            .enumerate()
            .map(|(data_index, slot)| Slot {
                data_index,
                bone: slot.bone,
                attachment: slot.attachment.clone(),
                color: slot.color,
                deform: Vec::new(),
            })
            .collect();

        let draw_order = (0..data.slots.len()).collect();

        Self {
            data,
            bones,
            slots,
            draw_order,
            skin: None,
            color: [1.0, 1.0, 1.0, 1.0],
            x: 0.0,
            y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }

    pub fn set_to_setup_pose(&mut self) {
        self.set_bones_to_setup_pose();
        self.set_slots_to_setup_pose();
    }

    pub fn set_bones_to_setup_pose(&mut self) {
        for (bone, data) in self.bones.iter_mut().zip(self.data.bones.values()) {
            bone.set_to_setup(data);
        }
    }

    pub fn set_slots_to_setup_pose(&mut self) {
        self.draw_order.clear();
        self.draw_order.extend(0..self.slots.len());
        for (slot, data) in self.slots.iter_mut().zip(self.data.slots.values()) {
            slot.bone = data.bone;
            slot.attachment = data.attachment.clone();
            slot.color = data.color;
            slot.deform.clear();
        }
    }

    pub fn find_bone(&self, name: &str) -> Option<usize> {
        self.data.find_bone(name)
    }

    pub fn find_slot(&self, name: &str) -> Option<usize> {
        self.data.find_slot(name)
    }

    /// Mutable access to a bone by name, for hosts that pose bones themselves.
    pub fn bone_mut(&mut self, name: &str) -> Result<&mut Bone, Error> {
        let index = self.find_bone(name).ok_or_else(|| Error::UnknownBone {
            name: name.to_string(),
        })?;
        Ok(&mut self.bones[index])
    }

    pub fn set_skin(&mut self, name: Option<&str>) -> Result<(), Error> {
        match name {
            None => self.skin = None,
            Some(name) => {
                if self.data.skin(name).is_none() {
                    return Err(Error::UnknownSkin {
                        name: name.to_string(),
                    });
                }
                self.skin = Some(name.to_string());
            }
        }
        Ok(())
    }

    /// Looks up an attachment in the active skin, then in the default skin.
    pub fn attachment(&self, slot_index: usize, attachment_name: &str) -> Option<&AttachmentData> {
        if let Some(skin) = self.skin.as_deref().and_then(|name| self.data.skin(name)) {
            if let Some(attachment) = skin.attachment(slot_index, attachment_name) {
                return Some(attachment);
            }
        }
        self.data
            .default_skin()?
            .attachment(slot_index, attachment_name)
    }

    pub fn slot_attachment(&self, slot_index: usize) -> Option<&AttachmentData> {
        let name = self.slots.get(slot_index)?.attachment.as_deref()?;
        self.attachment(slot_index, name)
    }

    pub fn set_attachment(&mut self, slot_name: &str, attachment_name: Option<&str>) -> Result<(), Error> {
        let slot_index = self.find_slot(slot_name).ok_or_else(|| Error::UnknownSlot {
            name: slot_name.to_string(),
        })?;
        if let Some(attachment_name) = attachment_name {
            if self.attachment(slot_index, attachment_name).is_none() {
                return Err(Error::UnknownAttachment {
                    slot: slot_name.to_string(),
                    attachment: attachment_name.to_string(),
                });
            }
        }
        let slot = &mut self.slots[slot_index];
        let changed = slot.attachment.as_deref() != attachment_name;
        slot.attachment = attachment_name.map(str::to_string);
        if changed {
            slot.deform.clear();
        }
        Ok(())
    }

    /// Recomputes every bone's world transform. Bones are stored parents first.
    pub fn update_world_transform(&mut self) {
        for bone_index in 0..self.bones.len() {
            self.update_bone_world_transform(bone_index);
        }
    }

    fn update_bone_world_transform(&mut self, bone_index: usize) {
        if !self.bones[bone_index].active {
            return;
        }
        let parent = self.bones[bone_index]
            .parent
            .and_then(|p| self.bones.get(p))
            .map(|p| ParentTransform {
                a: p.a,
                b: p.b,
                c: p.c,
                d: p.d,
                world_x: p.world_x,
                world_y: p.world_y,
            });

        let (x, y, scale_x, scale_y) = (self.x, self.y, self.scale_x, self.scale_y);
        let bone = &mut self.bones[bone_index];
        match parent {
            Some(parent) => update_world_transform_child(bone, scale_x, scale_y, &parent),
            None => update_world_transform_root(bone, x, y, scale_x, scale_y),
        }
    }
}

#[derive(Copy, Clone, Debug)]
struct ParentTransform {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    world_x: f32,
    world_y: f32,
}

/// Local rotation/scale/shear as a 2x2 matrix `(la, lb, lc, ld)`, rotation offset by `offset`.
fn local_matrix(bone: &Bone, offset: f32) -> (f32, f32, f32, f32) {
    let rotation_x = (bone.rotation + bone.shear_x - offset).to_radians();
    let rotation_y = (bone.rotation + 90.0 + bone.shear_y - offset).to_radians();
    (
        rotation_x.cos() * bone.scale_x,
        rotation_y.cos() * bone.scale_y,
        rotation_x.sin() * bone.scale_x,
        rotation_y.sin() * bone.scale_y,
    )
}

fn update_world_transform_root(bone: &mut Bone, x: f32, y: f32, scale_x: f32, scale_y: f32) {
    let (la, lb, lc, ld) = local_matrix(bone, 0.0);
    bone.a = la * scale_x;
    bone.b = lb * scale_x;
    bone.c = lc * scale_y;
    bone.d = ld * scale_y;
    bone.world_x = bone.x * scale_x + x;
    bone.world_y = bone.y * scale_y + y;
}

fn update_world_transform_child(
    bone: &mut Bone,
    skeleton_scale_x: f32,
    skeleton_scale_y: f32,
    parent: &ParentTransform,
) {
    let mut pa = parent.a;
    let mut pb = parent.b;
    let mut pc = parent.c;
    let mut pd = parent.d;

    bone.world_x = pa * bone.x + pb * bone.y + parent.world_x;
    bone.world_y = pc * bone.x + pd * bone.y + parent.world_y;

    let (a, b, c, d) = match bone.inherit {
        Inherit::Normal => {
            let (la, lb, lc, ld) = local_matrix(bone, 0.0);
            bone.a = pa * la + pb * lc;
            bone.b = pa * lb + pb * ld;
            bone.c = pc * la + pd * lc;
            bone.d = pc * lb + pd * ld;
            return;
        }
        Inherit::OnlyTranslation => local_matrix(bone, 0.0),
        Inherit::NoRotationOrReflection => {
            let sx = if skeleton_scale_x.abs() > 1.0e-12 {
                1.0 / skeleton_scale_x
            } else {
                0.0
            };
            let sy = if skeleton_scale_y.abs() > 1.0e-12 {
                1.0 / skeleton_scale_y
            } else {
                0.0
            };
            pa *= sx;
            pc *= sy;

            let mut s = pa * pa + pc * pc;
            let prx;
            if s > 1.0e-4 {
                s = (pa * pd * sy - pb * sx * pc).abs() / s;
                pb = pc * s;
                pd = pa * s;
                prx = pc.atan2(pa).to_degrees();
            } else {
                pa = 0.0;
                pc = 0.0;
                prx = 90.0 - pd.atan2(pb).to_degrees();
            }

            let (la, lb, lc, ld) = local_matrix(bone, prx);
            (
                pa * la - pb * lc,
                pa * lb - pb * ld,
                pc * la + pd * lc,
                pc * lb + pd * ld,
            )
        }
        Inherit::NoScale | Inherit::NoScaleOrReflection => {
            let rotation = bone.rotation.to_radians();
            let cos = rotation.cos();
            let sin = rotation.sin();

            let za = (pa * cos + pb * sin) / skeleton_scale_x;
            let zc = (pc * cos + pd * sin) / skeleton_scale_y;
            let mut s = (za * za + zc * zc).sqrt();
            if s > 1.0e-5 {
                s = 1.0 / s;
            }
            let za = za * s;
            let zc = zc * s;

            let mut s2 = (za * za + zc * zc).sqrt();
            if bone.inherit == Inherit::NoScale {
                let det = pa * pd - pb * pc;
                let flip = (det < 0.0) != ((skeleton_scale_x < 0.0) != (skeleton_scale_y < 0.0));
                if flip {
                    s2 = -s2;
                }
            }

            let rotation = std::f32::consts::FRAC_PI_2 + zc.atan2(za);
            let zb = rotation.cos() * s2;
            let zd = rotation.sin() * s2;

            let shear_x = bone.shear_x.to_radians();
            let shear_y = (90.0 + bone.shear_y).to_radians();
            let la = shear_x.cos() * bone.scale_x;
            let lb = shear_y.cos() * bone.scale_y;
            let lc = shear_x.sin() * bone.scale_x;
            let ld = shear_y.sin() * bone.scale_y;
            (
                za * la + zb * lc,
                za * lb + zb * ld,
                zc * la + zd * lc,
                zc * lb + zd * ld,
            )
        }
    };

    bone.a = a * skeleton_scale_x;
    bone.b = b * skeleton_scale_x;
    bone.c = c * skeleton_scale_y;
    bone.d = d * skeleton_scale_y;
}
