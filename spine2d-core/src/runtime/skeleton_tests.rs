use crate::{
    AttachmentData, BoneData, Error, Inherit, PointAttachmentData, RegionAttachmentData, Skeleton,
    SkeletonData, SkinData, SlotData,
};
use std::sync::Arc;

fn assert_approx(actual: f32, expected: f32) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= 1.0e-5,
        "expected {expected}, got {actual} (diff {diff})"
    );
}

fn two_bone_data(root: BoneData, child: BoneData) -> Arc<SkeletonData> {
    let mut data = SkeletonData::default();
    data.add_bone(root).unwrap();
    data.add_bone(child).unwrap();
    Arc::new(data)
}

fn posed(data: Arc<SkeletonData>) -> Skeleton {
    let mut skeleton = Skeleton::new(data);
    skeleton.update_world_transform();
    skeleton
}

#[test]
fn update_world_transform_root_and_child() {
    let data = two_bone_data(
        BoneData {
            x: 10.0,
            y: 20.0,
            ..BoneData::new("root", None)
        },
        BoneData {
            x: 5.0,
            rotation: 90.0,
            ..BoneData::new("child", Some(0))
        },
    );
    let skeleton = posed(data);

    let root = &skeleton.bones[0];
    assert_approx(root.world_x, 10.0);
    assert_approx(root.world_y, 20.0);
    assert_approx(root.a, 1.0);
    assert_approx(root.b, 0.0);
    assert_approx(root.c, 0.0);
    assert_approx(root.d, 1.0);

    let child = &skeleton.bones[1];
    assert_eq!(child.parent_index(), Some(0));
    assert_approx(child.world_x, 15.0);
    assert_approx(child.world_y, 20.0);
    assert_approx(child.a, 0.0);
    assert_approx(child.b, -1.0);
    assert_approx(child.c, 1.0);
    assert_approx(child.d, 0.0);
}

#[test]
fn root_uses_skeleton_position_and_scale() {
    let mut data = SkeletonData::default();
    data.add_bone(BoneData {
        x: 1.0,
        y: 2.0,
        ..BoneData::new("root", None)
    })
    .unwrap();
    let mut skeleton = Skeleton::new(Arc::new(data));
    skeleton.x = 100.0;
    skeleton.y = 50.0;
    skeleton.scale_x = 2.0;
    skeleton.scale_y = -1.0;
    skeleton.update_world_transform();

    let root = &skeleton.bones[0];
    assert_approx(root.world_x, 102.0);
    assert_approx(root.world_y, 48.0);
    assert_approx(root.a, 2.0);
    assert_approx(root.d, -1.0);
}

#[test]
fn only_translation_ignores_parent_rotation() {
    let data = two_bone_data(
        BoneData {
            x: 10.0,
            y: 20.0,
            rotation: 90.0,
            ..BoneData::new("root", None)
        },
        BoneData {
            x: 5.0,
            inherit: Inherit::OnlyTranslation,
            ..BoneData::new("child", Some(0))
        },
    );
    let skeleton = posed(data);

    let child = &skeleton.bones[1];
    assert_approx(child.world_x, 10.0);
    assert_approx(child.world_y, 25.0);
    assert_approx(child.a, 1.0);
    assert_approx(child.b, 0.0);
    assert_approx(child.c, 0.0);
    assert_approx(child.d, 1.0);
}

#[test]
fn no_rotation_or_reflection_drops_parent_rotation() {
    let data = two_bone_data(
        BoneData {
            rotation: 90.0,
            ..BoneData::new("root", None)
        },
        BoneData {
            x: 5.0,
            inherit: Inherit::NoRotationOrReflection,
            ..BoneData::new("child", Some(0))
        },
    );
    let skeleton = posed(data);

    let child = &skeleton.bones[1];
    assert_approx(child.world_x, 0.0);
    assert_approx(child.world_y, 5.0);
    assert_approx(child.a, 1.0);
    assert_approx(child.b, 0.0);
    assert_approx(child.c, 0.0);
    assert_approx(child.d, 1.0);
}

#[test]
fn no_scale_drops_parent_scale() {
    let data = two_bone_data(
        BoneData {
            scale_x: 2.0,
            scale_y: 2.0,
            ..BoneData::new("root", None)
        },
        BoneData {
            x: 5.0,
            inherit: Inherit::NoScale,
            ..BoneData::new("child", Some(0))
        },
    );
    let skeleton = posed(data);

    let child = &skeleton.bones[1];
    assert_approx(child.world_x, 10.0);
    assert_approx(child.a, 1.0);
    assert_approx(child.b, 0.0);
    assert_approx(child.c, 0.0);
    assert_approx(child.d, 1.0);
}

#[test]
fn no_scale_keeps_reflection_and_no_scale_or_reflection_drops_it() {
    let flipped_root = || BoneData {
        scale_x: -1.0,
        ..BoneData::new("root", None)
    };

    let skeleton = posed(two_bone_data(
        flipped_root(),
        BoneData {
            inherit: Inherit::NoScale,
            ..BoneData::new("child", Some(0))
        },
    ));
    let child = &skeleton.bones[1];
    assert_approx(child.a, -1.0);
    assert_approx(child.d, 1.0);

    let skeleton = posed(two_bone_data(
        flipped_root(),
        BoneData {
            inherit: Inherit::NoScaleOrReflection,
            ..BoneData::new("child", Some(0))
        },
    ));
    let child = &skeleton.bones[1];
    assert_approx(child.a, -1.0);
    assert_approx(child.d, -1.0);
}

#[test]
fn bone_local_world_round_trip() {
    let data = two_bone_data(
        BoneData {
            x: 2.0,
            y: 3.0,
            rotation: 90.0,
            ..BoneData::new("root", None)
        },
        BoneData::new("child", Some(0)),
    );
    let skeleton = posed(data);
    let bone = &skeleton.bones[0];

    let [wx, wy] = bone.local_to_world(10.0, 0.0);
    assert_approx(wx, 2.0);
    assert_approx(wy, 13.0);

    let [lx, ly] = bone.world_to_local(wx, wy);
    assert_approx(lx, 10.0);
    assert_approx(ly, 0.0);

    assert_approx(bone.world_rotation_x(), 90.0);
    assert_approx(bone.world_rotation_y().abs(), 180.0);
    assert_approx(bone.world_scale_x(), 1.0);
    assert_approx(bone.world_scale_y(), 1.0);
}

#[test]
fn inactive_bones_keep_their_last_transform() {
    let data = two_bone_data(
        BoneData::new("root", None),
        BoneData {
            x: 5.0,
            ..BoneData::new("child", Some(0))
        },
    );
    let mut skeleton = posed(data);
    skeleton.bones[1].active = false;
    skeleton.bones[0].x = 100.0;
    skeleton.update_world_transform();

    assert_approx(skeleton.bones[0].world_x, 100.0);
    assert_approx(skeleton.bones[1].world_x, 5.0);
}

#[test]
fn add_bone_requires_parent_first() {
    let mut data = SkeletonData::default();
    data.add_bone(BoneData::new("root", None)).unwrap();
    let err = data.add_bone(BoneData::new("child", Some(1))).unwrap_err();
    assert!(matches!(err, Error::InvalidValue { .. }));

    let err = data.add_bone(BoneData::new("root", None)).unwrap_err();
    assert!(matches!(err, Error::DuplicateKey { index: 0 }));

    let err = data.add_slot(SlotData::new("slot", 3)).unwrap_err();
    assert!(matches!(err, Error::InvalidValue { .. }));
}

fn skinned_data() -> Arc<SkeletonData> {
    let mut data = SkeletonData::default();
    data.add_bone(BoneData::new("root", None)).unwrap();
    data.add_slot(SlotData {
        attachment: Some("body".to_string()),
        ..SlotData::new("body", 0)
    })
    .unwrap();
    data.add_slot(SlotData::new("hand", 0)).unwrap();

    let mut default_skin = SkinData::new(SkeletonData::DEFAULT_SKIN);
    default_skin.set_attachment(
        0,
        "body",
        AttachmentData::Region(RegionAttachmentData::new("body", 10.0, 10.0)),
    );
    default_skin.set_attachment(
        1,
        "marker",
        AttachmentData::Point(PointAttachmentData {
            name: "marker".to_string(),
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
        }),
    );
    data.add_skin(default_skin).unwrap();

    let mut alt = SkinData::new("alt");
    alt.set_attachment(
        0,
        "body",
        AttachmentData::Region(RegionAttachmentData::new("body-alt", 20.0, 20.0)),
    );
    data.add_skin(alt).unwrap();
    Arc::new(data)
}

#[test]
fn attachment_lookup_prefers_active_skin_then_default() {
    let mut skeleton = Skeleton::new(skinned_data());
    assert_eq!(skeleton.find_slot("hand"), Some(1));
    assert_eq!(skeleton.find_bone("root"), Some(0));

    assert_eq!(skeleton.slot_attachment(0).map(AttachmentData::name), Some("body"));

    skeleton.set_skin(Some("alt")).unwrap();
    assert_eq!(skeleton.slot_attachment(0).map(AttachmentData::name), Some("body-alt"));
    assert_eq!(skeleton.attachment(1, "marker").map(AttachmentData::name), Some("marker"));

    let err = skeleton.set_skin(Some("missing")).unwrap_err();
    assert!(matches!(err, Error::UnknownSkin { .. }));
    assert_eq!(skeleton.skin.as_deref(), Some("alt"));

    skeleton.set_skin(None).unwrap();
    assert_eq!(skeleton.slot_attachment(0).map(AttachmentData::name), Some("body"));
}

#[test]
fn set_attachment_validates_names_and_resets_deform() {
    let mut skeleton = Skeleton::new(skinned_data());
    skeleton.slots[1].deform = vec![1.0, 2.0];

    skeleton.set_attachment("hand", Some("marker")).unwrap();
    assert_eq!(skeleton.slots[1].attachment.as_deref(), Some("marker"));
    assert!(skeleton.slots[1].deform.is_empty());

    let err = skeleton.set_attachment("hand", Some("sword")).unwrap_err();
    assert!(matches!(err, Error::UnknownAttachment { .. }));
    let err = skeleton.set_attachment("tail", None).unwrap_err();
    assert!(matches!(err, Error::UnknownSlot { .. }));

    skeleton.set_attachment("hand", None).unwrap();
    assert!(skeleton.slot_attachment(1).is_none());
}

#[test]
fn setup_pose_restores_bones_slots_and_draw_order() {
    let mut skeleton = Skeleton::new(skinned_data());
    skeleton.bones[0].x = 42.0;
    skeleton.bones[0].rotation = 15.0;
    skeleton.slots[0].attachment = None;
    skeleton.slots[0].color = [0.0, 0.0, 0.0, 0.0];
    skeleton.draw_order.reverse();

    skeleton.set_to_setup_pose();
    assert_approx(skeleton.bones[0].x, 0.0);
    assert_approx(skeleton.bones[0].rotation, 0.0);
    assert_eq!(skeleton.slots[0].attachment.as_deref(), Some("body"));
    assert_eq!(skeleton.slots[0].color, [1.0, 1.0, 1.0, 1.0]);
    assert_eq!(skeleton.draw_order, vec![0, 1]);
}

#[test]
fn bone_mut_poses_by_name() {
    let mut skeleton = Skeleton::new(two_bone_data(
        BoneData::new("root", None),
        BoneData {
            x: 5.0,
            ..BoneData::new("child", Some(0))
        },
    ));
    skeleton.bone_mut("root").unwrap().rotation = 90.0;
    skeleton.update_world_transform();
    assert_approx(skeleton.bones[1].world_x, 0.0);
    assert_approx(skeleton.bones[1].world_y, 5.0);

    let err = skeleton.bone_mut("tail").unwrap_err();
    assert!(matches!(err, Error::UnknownBone { ref name } if name == "tail"));
}

#[cfg(feature = "glam")]
#[test]
fn world_affine_matches_local_to_world() {
    let bone = crate::Bone::from_world(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
    let [x, y] = bone.local_to_world(7.0, 8.0);
    assert_approx(x, 28.0);
    assert_approx(y, 59.0);

    let p = glam::Vec2::new(7.0, 8.0);
    let affine = bone.world_affine().transform_point2(p);
    assert_approx(affine.x, x);
    assert_approx(affine.y, y);

    let v = bone.local_to_world_vec2(p);
    assert_approx(v.x, x);
    assert_approx(v.y, y);

    let direction = bone.world_affine().transform_vector2(glam::Vec2::X);
    assert_approx(direction.x, 1.0);
    assert_approx(direction.y, 3.0);
}
