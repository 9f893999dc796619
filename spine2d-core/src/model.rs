use crate::{Error, OrderedMap};

#[derive(Clone, Debug)]
pub struct BoneData {
    pub name: String,
    pub parent: Option<usize>,
    pub length: f32,
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub shear_x: f32,
    pub shear_y: f32,
    pub inherit: Inherit,
}

impl BoneData {
    /// A bone at the origin with unit scale.
    pub fn new(name: impl Into<String>, parent: Option<usize>) -> Self {
        Self {
            name: name.into(),
            parent,
            length: 0.0,
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            shear_x: 0.0,
            shear_y: 0.0,
            inherit: Inherit::Normal,
        }
    }
}

/// How a child bone composes its parent's world transform.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum Inherit {
    #[default]
    Normal,
    OnlyTranslation,
    NoRotationOrReflection,
    NoScale,
    NoScaleOrReflection,
}

#[derive(Clone, Debug)]
pub struct SlotData {
    pub name: String,
    pub bone: usize,
    pub attachment: Option<String>,
    pub color: [f32; 4],
}

impl SlotData {
    pub fn new(name: impl Into<String>, bone: usize) -> Self {
        Self {
            name: name.into(),
            bone,
            attachment: None,
            color: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

/// Triangle indices for the four corners produced by
/// [`RegionAttachmentData::compute_world_vertices`].
pub const QUAD_TRIANGLES: [u32; 6] = [0, 1, 2, 2, 3, 0];

#[derive(Clone, Debug)]
pub struct RegionAttachmentData {
    pub name: String,
    pub path: String,
    pub color: [f32; 4],
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub width: f32,
    pub height: f32,
    /// Texture coordinates of the BR, BL, UL, UR corners.
    pub uvs: [f32; 8],
}

impl RegionAttachmentData {
    pub const DEFAULT_UVS: [f32; 8] = [1.0, 1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0];

    pub fn new(name: impl Into<String>, width: f32, height: f32) -> Self {
        let name = name.into();
        Self {
            path: name.clone(),
            name,
            color: [1.0, 1.0, 1.0, 1.0],
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            width,
            height,
            uvs: Self::DEFAULT_UVS,
        }
    }
}

#[derive(Clone, Debug)]
pub struct MeshAttachmentData {
    pub name: String,
    pub path: String,
    pub color: [f32; 4],
    pub vertices: MeshVertices,
    pub uvs: Vec<[f32; 2]>,
    pub triangles: Vec<u32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VertexWeight {
    pub bone: usize,
    pub x: f32,
    pub y: f32,
    pub weight: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum MeshVertices {
    Unweighted(Vec<[f32; 2]>),
    Weighted(Vec<Vec<VertexWeight>>),
}

impl MeshVertices {
    pub fn len(&self) -> usize {
        match self {
            MeshVertices::Unweighted(v) => v.len(),
            MeshVertices::Weighted(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of floats a deform buffer needs for these vertices.
    pub fn deform_len(&self) -> usize {
        match self {
            MeshVertices::Unweighted(v) => v.len() * 2,
            MeshVertices::Weighted(v) => v.iter().map(|w| w.len() * 2).sum(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PointAttachmentData {
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
}

#[derive(Clone, Debug)]
pub struct PathAttachmentData {
    pub name: String,
    pub vertices: MeshVertices,
    pub lengths: Vec<f32>,
    pub closed: bool,
    pub constant_speed: bool,
}

#[derive(Clone, Debug)]
pub struct BoundingBoxAttachmentData {
    pub name: String,
    pub vertices: MeshVertices,
}

#[derive(Clone, Debug)]
pub struct ClippingAttachmentData {
    pub name: String,
    pub vertices: MeshVertices,
    /// Slot after which clipping stops; `None` clips until the end of the draw order.
    pub end_slot: Option<usize>,
}

#[derive(Clone, Debug)]
pub enum AttachmentData {
    Region(RegionAttachmentData),
    Mesh(MeshAttachmentData),
    Point(PointAttachmentData),
    Path(PathAttachmentData),
    BoundingBox(BoundingBoxAttachmentData),
    Clipping(ClippingAttachmentData),
}

impl AttachmentData {
    pub fn name(&self) -> &str {
        match self {
            AttachmentData::Region(a) => a.name.as_str(),
            AttachmentData::Mesh(a) => a.name.as_str(),
            AttachmentData::Point(a) => a.name.as_str(),
            AttachmentData::Path(a) => a.name.as_str(),
            AttachmentData::BoundingBox(a) => a.name.as_str(),
            AttachmentData::Clipping(a) => a.name.as_str(),
        }
    }

    /// Vertices of the attachments that carry a vertex list.
    pub fn vertices(&self) -> Option<&MeshVertices> {
        match self {
            AttachmentData::Mesh(a) => Some(&a.vertices),
            AttachmentData::Path(a) => Some(&a.vertices),
            AttachmentData::BoundingBox(a) => Some(&a.vertices),
            AttachmentData::Clipping(a) => Some(&a.vertices),
            AttachmentData::Region(_) | AttachmentData::Point(_) => None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SkinData {
    pub name: String,
    /// Attachments per slot index, keyed by attachment name.
    pub attachments: Vec<OrderedMap<String, AttachmentData>>,
}

impl SkinData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attachments: Vec::new(),
        }
    }

    pub fn attachment(&self, slot_index: usize, name: &str) -> Option<&AttachmentData> {
        self.attachments.get(slot_index)?.get(name)
    }

    /// Adds or replaces the attachment stored under `name` for `slot_index`.
    pub fn set_attachment(
        &mut self,
        slot_index: usize,
        name: impl Into<String>,
        attachment: AttachmentData,
    ) -> Option<AttachmentData> {
        if self.attachments.len() <= slot_index {
            self.attachments.resize_with(slot_index + 1, OrderedMap::new);
        }
        self.attachments[slot_index].set(name.into(), attachment)
    }

    /// `(slot_index, name, attachment)` in slot order, then insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str, &AttachmentData)> {
        self.attachments.iter().enumerate().flat_map(|(slot, map)| {
            map.iter()
                .map(move |(name, attachment)| (slot, name.as_str(), attachment))
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct SkeletonData {
    pub bones: OrderedMap<String, BoneData>,
    pub slots: OrderedMap<String, SlotData>,
    pub skins: OrderedMap<String, SkinData>,
}

impl SkeletonData {
    pub const DEFAULT_SKIN: &'static str = "default";

    /// Appends a bone. Its parent must already be present.
    pub fn add_bone(&mut self, bone: BoneData) -> Result<usize, Error> {
        let index = self.bones.len();
        if let Some(parent) = bone.parent {
            if parent >= index {
                return Err(Error::InvalidValue {
                    message: format!(
                        "bone '{}' has parent index {parent}, expected one of 0..{index}",
                        bone.name
                    ),
                });
            }
        }
        self.bones.add(bone.name.clone(), bone)?;
        Ok(index)
    }

    pub fn add_slot(&mut self, slot: SlotData) -> Result<usize, Error> {
        if slot.bone >= self.bones.len() {
            return Err(Error::InvalidValue {
                message: format!("slot '{}' has unknown bone index {}", slot.name, slot.bone),
            });
        }
        let index = self.slots.len();
        self.slots.add(slot.name.clone(), slot)?;
        Ok(index)
    }

    pub fn add_skin(&mut self, skin: SkinData) -> Result<usize, Error> {
        let index = self.skins.len();
        self.skins.add(skin.name.clone(), skin)?;
        Ok(index)
    }

    pub fn find_bone(&self, name: &str) -> Option<usize> {
        self.bones.index_of(name)
    }

    pub fn find_slot(&self, name: &str) -> Option<usize> {
        self.slots.index_of(name)
    }

    pub fn skin(&self, name: &str) -> Option<&SkinData> {
        self.skins.get(name)
    }

    pub fn default_skin(&self) -> Option<&SkinData> {
        self.skins.get(Self::DEFAULT_SKIN)
    }
}
