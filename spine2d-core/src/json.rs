use crate::{
    AttachmentData, BoneData, BoundingBoxAttachmentData, ClippingAttachmentData, Error, Inherit,
    MeshAttachmentData, MeshVertices, OrderedMap, PathAttachmentData, PointAttachmentData,
    RegionAttachmentData, SkeletonData, SkinData, SlotData, SpineVersion,
};
use serde::de::value::MapAccessDeserializer;
use serde::de::{Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct Root {
    skeleton: Option<SkeletonHeader>,
    bones: Option<Vec<BoneDef>>,
    slots: Option<Vec<SlotDef>>,
    skins: Option<SkinsDef>,
}

/// 4.x exports write an array of skins; 3.8 exports write a map keyed by skin name.
#[derive(Debug)]
enum SkinsDef {
    Array(Vec<SkinDef>),
    Map(OrderedMap<String, SkinAttachmentsDef>),
}

struct SkinsVisitor;

impl<'de> Visitor<'de> for SkinsVisitor {
    type Value = SkinsDef;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an array of skins or a map of skin names to attachments")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut skins = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(skin) = seq.next_element::<SkinDef>()? {
            skins.push(skin);
        }
        Ok(SkinsDef::Array(skins))
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
        OrderedMap::<String, SkinAttachmentsDef>::deserialize(MapAccessDeserializer::new(map))
            .map(SkinsDef::Map)
    }
}

impl<'de> Deserialize<'de> for SkinsDef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(SkinsVisitor)
    }
}

type SkinAttachmentsDef = OrderedMap<String, OrderedMap<String, AttachmentDef>>;

#[derive(Debug, Deserialize)]
struct SkinDef {
    name: String,
    #[serde(default)]
    attachments: SkinAttachmentsDef,
}

#[derive(Debug, Deserialize)]
struct SkeletonHeader {
    spine: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BoneDef {
    name: String,
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    length: f32,
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
    #[serde(default)]
    rotation: f32,
    #[serde(default = "default_one", rename = "scaleX")]
    scale_x: f32,
    #[serde(default = "default_one", rename = "scaleY")]
    scale_y: f32,
    #[serde(default, rename = "shearX")]
    shear_x: f32,
    #[serde(default, rename = "shearY")]
    shear_y: f32,
    #[serde(default, alias = "transform")]
    inherit: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SlotDef {
    name: String,
    bone: String,
    #[serde(default)]
    attachment: Option<String>,
    #[serde(default)]
    color: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AttachmentDef {
    #[serde(default, rename = "type")]
    attachment_type: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    end: Option<String>,
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
    #[serde(default)]
    rotation: f32,
    #[serde(default = "default_one", rename = "scaleX")]
    scale_x: f32,
    #[serde(default = "default_one", rename = "scaleY")]
    scale_y: f32,
    #[serde(default)]
    width: f32,
    #[serde(default)]
    height: f32,
    #[serde(default)]
    uvs: Option<Vec<f32>>,
    #[serde(default)]
    vertices: Option<Vec<f32>>,
    #[serde(default)]
    triangles: Option<Vec<u32>>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    closed: bool,
    #[serde(default = "default_true", rename = "constantSpeed")]
    constant_speed: bool,
    #[serde(default, rename = "vertexCount")]
    vertex_count: Option<usize>,
    #[serde(default)]
    lengths: Option<Vec<f32>>,
}

impl SkeletonData {
    pub fn from_json_str(input: &str) -> Result<Arc<Self>, Error> {
        Self::from_json_str_with_scale(input, 1.0)
    }

    /// Parses a Spine JSON export, multiplying positional values by `scale`.
    pub fn from_json_str_with_scale(input: &str, scale: f32) -> Result<Arc<Self>, Error> {
        let root: Root = serde_json::from_str(input).map_err(|e| Error::JsonParse {
            message: e.to_string(),
        })?;

        if let Some(v) = root.skeleton.as_ref().and_then(|s| s.spine.as_deref()) {
            validate_spine_version(v)?;
        }

        let scale = if scale.is_finite() { scale } else { 1.0 };
        let mut data = SkeletonData::default();

        for bone in root.bones.unwrap_or_default() {
            let parent = match bone.parent.as_deref() {
                None => None,
                Some(parent_name) => Some(data.find_bone(parent_name).ok_or_else(|| {
                    Error::JsonUnknownBoneParent {
                        bone: bone.name.clone(),
                        parent: parent_name.to_string(),
                    }
                })?),
            };
            data.add_bone(BoneData {
                name: bone.name,
                parent,
                length: bone.length * scale,
                x: bone.x * scale,
                y: bone.y * scale,
                rotation: bone.rotation,
                scale_x: bone.scale_x,
                scale_y: bone.scale_y,
                shear_x: bone.shear_x,
                shear_y: bone.shear_y,
                inherit: parse_inherit(bone.inherit.as_deref()),
            })?;
        }

        for slot in root.slots.unwrap_or_default() {
            let bone = data
                .find_bone(&slot.bone)
                .ok_or_else(|| Error::JsonUnknownSlotBone {
                    slot: slot.name.clone(),
                    bone: slot.bone.clone(),
                })?;
            let color = slot
                .color
                .as_deref()
                .map(|s| parse_hex_color_rgba(s, "slot color"))
                .transpose()?
                .unwrap_or([1.0, 1.0, 1.0, 1.0]);
            data.add_slot(SlotData {
                name: slot.name,
                bone,
                attachment: slot.attachment,
                color,
            })?;
        }

        let skins: Vec<(String, SkinAttachmentsDef)> = match root.skins {
            None => Vec::new(),
            Some(SkinsDef::Array(skins)) => skins
                .into_iter()
                .map(|skin| (skin.name, skin.attachments))
                .collect(),
            Some(SkinsDef::Map(skins)) => skins.into_iter().collect(),
        };

        for (skin_name, skin_slots) in skins {
            let skin = parse_skin(&data, skin_name, skin_slots, scale)?;
            data.add_skin(skin)?;
        }

        log::debug!(
            "loaded skeleton: {} bones, {} slots, {} skins",
            data.bones.len(),
            data.slots.len(),
            data.skins.len()
        );

        Ok(Arc::new(data))
    }
}

fn parse_skin(
    data: &SkeletonData,
    skin_name: String,
    skin_slots: SkinAttachmentsDef,
    scale: f32,
) -> Result<SkinData, Error> {
    let mut skin = SkinData::new(skin_name);
    for (slot_name, slot_attachments) in &skin_slots {
        let slot_index = data
            .find_slot(slot_name)
            .ok_or_else(|| Error::JsonUnknownSkinSlot {
                skin: skin.name.clone(),
                slot: slot_name.clone(),
            })?;
        for (attachment_name, def) in slot_attachments {
            let context = AttachmentContext {
                skin: &skin.name,
                slot: slot_name,
                attachment: attachment_name,
            };
            let attachment = parse_attachment(data, &context, def, scale)?;
            skin.set_attachment(slot_index, attachment_name.clone(), attachment);
        }
    }
    Ok(skin)
}

struct AttachmentContext<'a> {
    skin: &'a str,
    slot: &'a str,
    attachment: &'a str,
}

impl AttachmentContext<'_> {
    fn invalid(&self, message: impl Into<String>) -> Error {
        Error::JsonInvalidMeshData {
            skin: self.skin.to_string(),
            slot: self.slot.to_string(),
            attachment: self.attachment.to_string(),
            message: message.into(),
        }
    }
}

fn parse_attachment(
    data: &SkeletonData,
    context: &AttachmentContext<'_>,
    def: &AttachmentDef,
    scale: f32,
) -> Result<AttachmentData, Error> {
    let attachment_type = def.attachment_type.as_deref().unwrap_or("region");
    let name = def
        .name
        .clone()
        .unwrap_or_else(|| context.attachment.to_string());
    let color = def
        .color
        .as_deref()
        .map(|s| parse_hex_color_rgba(s, "attachment color"))
        .transpose()?
        .unwrap_or([1.0, 1.0, 1.0, 1.0]);

    let attachment = match attachment_type {
        "region" => AttachmentData::Region(RegionAttachmentData {
            path: def.path.clone().unwrap_or_else(|| name.clone()),
            name,
            color,
            x: def.x * scale,
            y: def.y * scale,
            rotation: def.rotation,
            scale_x: def.scale_x,
            scale_y: def.scale_y,
            width: def.width * scale,
            height: def.height * scale,
            uvs: RegionAttachmentData::DEFAULT_UVS,
        }),
        "point" => AttachmentData::Point(PointAttachmentData {
            name,
            x: def.x * scale,
            y: def.y * scale,
            rotation: def.rotation,
        }),
        "mesh" => {
            let uvs = def
                .uvs
                .as_deref()
                .ok_or_else(|| context.invalid("missing 'uvs'"))?;
            let triangles = def
                .triangles
                .clone()
                .ok_or_else(|| context.invalid("missing 'triangles'"))?;
            if uvs.len() % 2 != 0 {
                return Err(context.invalid("uvs length must be even"));
            }
            let vertex_count = uvs.len() / 2;
            let vertices = parse_vertices(data, context, def, vertex_count, scale)?;
            if triangles.iter().any(|&i| i as usize >= vertex_count) {
                return Err(context.invalid("triangle index out of range"));
            }
            AttachmentData::Mesh(MeshAttachmentData {
                path: def.path.clone().unwrap_or_else(|| name.clone()),
                name,
                color,
                vertices,
                uvs: uvs.chunks_exact(2).map(|uv| [uv[0], uv[1]]).collect(),
                triangles,
            })
        }
        "path" => {
            let vertex_count = required_vertex_count(context, def)?;
            AttachmentData::Path(PathAttachmentData {
                name,
                vertices: parse_vertices(data, context, def, vertex_count, scale)?,
                lengths: def
                    .lengths
                    .iter()
                    .flatten()
                    .map(|v| v * scale)
                    .collect(),
                closed: def.closed,
                constant_speed: def.constant_speed,
            })
        }
        "boundingbox" => {
            let vertex_count = required_vertex_count(context, def)?;
            AttachmentData::BoundingBox(BoundingBoxAttachmentData {
                name,
                vertices: parse_vertices(data, context, def, vertex_count, scale)?,
            })
        }
        "clipping" => {
            let vertex_count = required_vertex_count(context, def)?;
            let end_slot = match def.end.as_deref() {
                None => None,
                Some(end_name) => Some(data.find_slot(end_name).ok_or_else(|| {
                    Error::JsonUnknownClippingEndSlot {
                        attachment: context.attachment.to_string(),
                        slot: end_name.to_string(),
                    }
                })?),
            };
            AttachmentData::Clipping(ClippingAttachmentData {
                name,
                vertices: parse_vertices(data, context, def, vertex_count, scale)?,
                end_slot,
            })
        }
        other => {
            return Err(Error::JsonUnsupportedAttachmentType {
                skin: context.skin.to_string(),
                slot: context.slot.to_string(),
                attachment: context.attachment.to_string(),
                attachment_type: other.to_string(),
            });
        }
    };
    Ok(attachment)
}

fn required_vertex_count(context: &AttachmentContext<'_>, def: &AttachmentDef) -> Result<usize, Error> {
    def.vertex_count
        .ok_or_else(|| context.invalid("missing 'vertexCount'"))
}

/// Vertices are unweighted `x, y` pairs when the list has exactly two floats per vertex, weighted
/// otherwise.
fn parse_vertices(
    data: &SkeletonData,
    context: &AttachmentContext<'_>,
    def: &AttachmentDef,
    vertex_count: usize,
    scale: f32,
) -> Result<MeshVertices, Error> {
    let vertices = def
        .vertices
        .as_deref()
        .ok_or_else(|| context.invalid("missing 'vertices'"))?;
    if vertices.len() == vertex_count * 2 {
        return Ok(MeshVertices::Unweighted(
            vertices
                .chunks_exact(2)
                .map(|p| [p[0] * scale, p[1] * scale])
                .collect(),
        ));
    }
    let weights =
        parse_weighted_mesh_vertices(vertices, vertex_count, data.bones.len(), scale, context)?;
    Ok(MeshVertices::Weighted(weights))
}

fn parse_weighted_mesh_vertices(
    raw: &[f32],
    vertex_count: usize,
    bone_count: usize,
    scale: f32,
    context: &AttachmentContext<'_>,
) -> Result<Vec<Vec<crate::VertexWeight>>, Error> {
    fn expect_int(value: f32) -> Option<usize> {
        if !value.is_finite() {
            return None;
        }
        let rounded = value.round();
        if (value - rounded).abs() > 1.0e-4 || rounded < 0.0 {
            return None;
        }
        Some(rounded as usize)
    }

    let mut cursor = 0usize;
    let mut out = Vec::with_capacity(vertex_count);
    for _ in 0..vertex_count {
        let Some(&n_raw) = raw.get(cursor) else {
            return Err(context.invalid("unexpected end of weighted vertices"));
        };
        cursor += 1;
        let n = expect_int(n_raw)
            .ok_or_else(|| context.invalid("invalid bone count in weighted vertices"))?;

        let mut weights = Vec::with_capacity(n);
        for _ in 0..n {
            let slice = raw
                .get(cursor..cursor + 4)
                .ok_or_else(|| context.invalid("unexpected end of weighted vertices"))?;
            cursor += 4;

            let bone = expect_int(slice[0])
                .ok_or_else(|| context.invalid("invalid bone index in weighted vertices"))?;
            if bone >= bone_count {
                return Err(context.invalid("bone index out of range in weighted vertices"));
            }
            weights.push(crate::VertexWeight {
                bone,
                x: slice[1] * scale,
                y: slice[2] * scale,
                weight: slice[3],
            });
        }
        out.push(weights);
    }

    if cursor != raw.len() {
        return Err(context.invalid("unexpected extra data in weighted vertices"));
    }
    Ok(out)
}

fn parse_inherit(raw: Option<&str>) -> Inherit {
    match raw.unwrap_or("normal") {
        "onlyTranslation" => Inherit::OnlyTranslation,
        "noRotationOrReflection" => Inherit::NoRotationOrReflection,
        "noScale" => Inherit::NoScale,
        "noScaleOrReflection" => Inherit::NoScaleOrReflection,
        _ => Inherit::Normal,
    }
}

fn validate_spine_version(value: &str) -> Result<(), Error> {
    match SpineVersion::parse(value) {
        Some(version) if version.is_supported() => Ok(()),
        _ => Err(Error::JsonSpineVersion {
            value: value.to_string(),
        }),
    }
}

fn default_one() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

fn parse_hex_color_rgba(input: &str, context: &str) -> Result<[f32; 4], Error> {
    fn hex(b: u8) -> Option<u8> {
        match b {
            b'0'..=b'9' => Some(b - b'0'),
            b'a'..=b'f' => Some(b - b'a' + 10),
            b'A'..=b'F' => Some(b - b'A' + 10),
            _ => None,
        }
    }

    let invalid = || Error::JsonInvalidColor {
        context: context.to_string(),
        value: input.to_string(),
    };
    let bytes = input.as_bytes();
    if bytes.len() != 6 && bytes.len() != 8 {
        return Err(invalid());
    }

    let mut channels = [255u8; 4];
    for (channel, pair) in channels.iter_mut().zip(bytes.chunks_exact(2)) {
        let (Some(h), Some(l)) = (hex(pair[0]), hex(pair[1])) else {
            return Err(invalid());
        };
        *channel = (h << 4) | l;
    }
    Ok(channels.map(|c| c as f32 / 255.0))
}
