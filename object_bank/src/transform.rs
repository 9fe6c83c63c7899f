//! Object space to screen space.
//!
//! Drawing and hit testing both place layers through [`layer_transform`];
//! the hit tester runs the same placement backwards with
//! [`sprite_point`], so a pixel reported as drawn is also a pixel that
//! hits.

use std::f64::consts::TAU;

use glam::DVec2;
use object_formats::ObjectRecord;

use crate::age::AgeCurve;
use crate::animation::AnimationPose;
use crate::geometry::{body_part_index, contained_center_offset, dvec, rotate, BodyPart};
use crate::sprites::{SpriteBank, SpriteRecord};

/// Where an object sits on screen. Rotation is in clockwise turns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub pos: DVec2,
    pub rot: f64,
    pub flip: bool,
    pub scale: f64,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            pos: DVec2::ZERO,
            rot: 0.0,
            flip: false,
            scale: 1.0,
        }
    }
}

impl Placement {
    pub fn at(pos: DVec2) -> Self {
        Self {
            pos,
            ..Self::default()
        }
    }

    pub fn flipped(mut self, flip: bool) -> Self {
        self.flip = flip;
        self
    }

    pub fn rotated(mut self, rot: f64) -> Self {
        self.rot = rot;
        self
    }

    pub fn scaled(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn to_screen(&self, local: DVec2) -> DVec2 {
        let mut p = local;
        if self.flip {
            p.x = -p.x;
        }
        rotate(p, -TAU * self.rot) * self.scale + self.pos
    }

    pub fn to_local(&self, screen: DVec2) -> DVec2 {
        let scale = if self.scale == 0.0 { 1.0 } else { self.scale };
        let mut p = rotate((screen - self.pos) / scale, TAU * self.rot);
        if self.flip {
            p.x = -p.x;
        }
        p
    }

    /// Screen rotation of a layer rotated `rot` within the object.
    pub fn layer_rot(&self, rot: f64) -> f64 {
        let rot = if self.flip { -rot } else { rot };
        rot + self.rot
    }
}

/// Head, body and feet layers of a person at one age, with the age
/// displacement the curve applies to them. Non-persons get index 0 and
/// no displacement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyAnchors {
    pub head: usize,
    pub body: usize,
    pub back_foot: usize,
    pub front_foot: usize,
    pub head_offset: DVec2,
    pub body_offset: DVec2,
}

impl BodyAnchors {
    pub fn resolve(record: &ObjectRecord, age: f64, ages: &dyn AgeCurve) -> Self {
        let head = body_part_index(record, BodyPart::Head, age);
        let body = body_part_index(record, BodyPart::Body, age);
        let back_foot = body_part_index(record, BodyPart::BackFoot, age);
        let front_foot = body_part_index(record, BodyPart::FrontFoot, age);

        let pos = |index: usize| {
            record
                .sprites
                .get(index)
                .map_or(DVec2::ZERO, |layer| dvec(layer.pos))
        };

        let (head_offset, body_offset) = if record.is_person() {
            (
                ages.head_offset(age, pos(head), pos(body), pos(front_foot)),
                ages.body_offset(age, pos(body)),
            )
        } else {
            (DVec2::ZERO, DVec2::ZERO)
        };

        Self {
            head,
            body,
            back_foot,
            front_foot,
            head_offset,
            body_offset,
        }
    }

    /// Age displacement of layer `index`.
    ///
    /// The head follows the head curve and everything under the body
    /// follows the body curve; the head itself takes both.
    pub fn age_offset(&self, record: &ObjectRecord, index: usize) -> DVec2 {
        if !record.is_person() {
            return DVec2::ZERO;
        }
        let mut offset = DVec2::ZERO;
        if index == self.head || record.sprite_has_ancestor(index, self.head) {
            offset += self.head_offset;
        }
        if index == self.head
            || index == self.body
            || record.sprite_has_ancestor(index, self.body)
        {
            offset += self.body_offset;
        }
        offset
    }

    /// Layer position after age displacement, in object space.
    pub fn aged_position(&self, record: &ObjectRecord, index: usize) -> DVec2 {
        record.sprites.get(index).map_or(DVec2::ZERO, |layer| {
            dvec(layer.pos) + self.age_offset(record, index)
        })
    }
}

/// One layer placed for drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerTransform {
    /// Anchor in object space, after age and pose.
    pub local: DVec2,
    pub screen: DVec2,
    /// Drawn rotation in turns.
    pub rot: f64,
    /// Drawn mirror state.
    pub flip: bool,
    pub scale: f64,
}

/// Places layer `index` of `record`.
///
/// An animation pose moves the layer by its offset and swings it around
/// its rotation center by its phase.
pub fn layer_transform(
    record: &ObjectRecord,
    index: usize,
    anchors: &BodyAnchors,
    pose: Option<&AnimationPose>,
    placement: &Placement,
) -> LayerTransform {
    let Some(layer) = record.sprites.get(index) else {
        return LayerTransform {
            local: DVec2::ZERO,
            screen: placement.pos,
            rot: placement.rot,
            flip: placement.flip,
            scale: placement.scale,
        };
    };

    let mut local = anchors.aged_position(record, index);
    let mut rot = layer.rot;

    if let Some(layer_pose) = pose.and_then(|pose| pose.layer(index)) {
        local += layer_pose.offset;
        if layer_pose.rot_phase != 0.0 {
            let pivot = local + layer_pose.rotation_center;
            local = pivot + rotate(-layer_pose.rotation_center, -TAU * layer_pose.rot_phase);
            rot += layer_pose.rot_phase;
        }
    }

    LayerTransform {
        local,
        screen: placement.to_screen(local),
        rot: placement.layer_rot(rot),
        flip: placement.flip != layer.h_flip,
        scale: placement.scale,
    }
}

/// Bitmap pixel of `sprite` under the screen `point`, measured from the
/// bitmap center with y up, for a sprite drawn with `transform`.
pub fn sprite_point(transform: &LayerTransform, sprite: &SpriteRecord, point: DVec2) -> (i32, i32) {
    let scale = if transform.scale == 0.0 {
        1.0
    } else {
        transform.scale
    };
    let mut p = rotate((point - transform.screen) / scale, TAU * transform.rot);
    if transform.flip {
        p.x = -p.x;
    }
    p.x += sprite.center_anchor_x_offset as f64;
    p.y -= sprite.center_anchor_y_offset as f64;
    (p.x.round() as i32, p.y.round() as i32)
}

/// Placement of `contained` resting in slot `slot` of `container`.
///
/// Vertical slots stand the item up a quarter turn plus its own
/// vertical rotation offset.
pub fn slot_placement(
    container: &ObjectRecord,
    slot: usize,
    contained: &ObjectRecord,
    sprites: &dyn SpriteBank,
    placement: &Placement,
) -> Placement {
    let Some(slot_def) = container.slots.get(slot) else {
        return *placement;
    };
    let mut center = contained_center_offset(container, contained, sprites);
    let mut rot = placement.rot;

    if slot_def.vertical {
        let turn = 0.25 + contained.vert_slot_rot;
        center = rotate(center, -turn * TAU);
        rot += if placement.flip { -turn } else { turn };
    }

    Placement {
        pos: placement.to_screen(dvec(slot_def.pos) - center),
        rot,
        flip: placement.flip,
        scale: placement.scale,
    }
}

/// Placement of a worn piece anchored at `anchor` in the wearer's space.
pub fn clothing_placement(anchor: DVec2, piece: &ObjectRecord, placement: &Placement) -> Placement {
    Placement {
        pos: placement.to_screen(anchor + dvec(piece.clothing_offset)),
        ..*placement
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::age::StandardAgeCurve;
    use object_formats::{Slot, SpriteLayer, Vec2};

    fn close(a: DVec2, b: DVec2) -> bool {
        a.distance(b) < 1e-9
    }

    #[test]
    fn placement_round_trips_through_every_component() {
        let placement = Placement::at(DVec2::new(100.0, -40.0))
            .rotated(0.125)
            .flipped(true)
            .scaled(2.0);
        let local = DVec2::new(13.0, 7.5);
        assert!(close(placement.to_local(placement.to_screen(local)), local));
    }

    #[test]
    fn quarter_turn_is_clockwise() {
        let placement = Placement::default().rotated(0.25);
        assert!(close(
            placement.to_screen(DVec2::new(10.0, 0.0)),
            DVec2::new(0.0, -10.0)
        ));
        assert!((placement.flipped(true).layer_rot(0.1) - 0.15).abs() < 1e-12);
    }

    #[test]
    fn flipped_layers_mirror_and_xor_their_own_flip() {
        let record = ObjectRecord {
            sprites: vec![SpriteLayer {
                pos: Vec2::new(20.0, 5.0),
                rot: 0.1,
                h_flip: true,
                ..SpriteLayer::default()
            }],
            ..ObjectRecord::default()
        };
        let anchors = BodyAnchors::resolve(&record, -1.0, &StandardAgeCurve::default());
        let placement = Placement::at(DVec2::new(50.0, 50.0)).flipped(true);
        let t = layer_transform(&record, 0, &anchors, None, &placement);
        assert!(close(t.screen, DVec2::new(30.0, 55.0)));
        assert!(!t.flip);
        assert!((t.rot + 0.1).abs() < 1e-12);
    }

    #[test]
    fn children_follow_the_head_down() {
        let body = SpriteLayer {
            pos: Vec2::new(0.0, 60.0),
            is_body: true,
            age_end: 200.0,
            ..SpriteLayer::default()
        };
        let head = SpriteLayer {
            pos: Vec2::new(0.0, 100.0),
            is_head: true,
            parent: 1,
            age_end: 200.0,
            ..SpriteLayer::default()
        };
        let hair = SpriteLayer {
            pos: Vec2::new(0.0, 110.0),
            parent: 2,
            age_end: 200.0,
            ..SpriteLayer::default()
        };
        let feet = SpriteLayer {
            pos: Vec2::ZERO,
            is_front_foot: true,
            age_end: 200.0,
            ..SpriteLayer::default()
        };
        let record = ObjectRecord {
            race: 1,
            sprites: vec![feet, body, head, hair],
            ..ObjectRecord::default()
        };
        let anchors = BodyAnchors::resolve(&record, 0.0, &StandardAgeCurve::default());
        assert_eq!(anchors.head, 2);
        assert_eq!(anchors.body, 1);
        assert_eq!(anchors.age_offset(&record, 0), DVec2::ZERO);
        assert_eq!(anchors.age_offset(&record, 1), anchors.body_offset);
        assert_eq!(
            anchors.age_offset(&record, 3),
            anchors.head_offset + anchors.body_offset
        );
        assert!(anchors.head_offset.y < 0.0);
    }

    #[test]
    fn pose_swings_around_its_center() {
        let record = ObjectRecord {
            sprites: vec![SpriteLayer::default()],
            ..ObjectRecord::default()
        };
        let anchors = BodyAnchors::resolve(&record, -1.0, &StandardAgeCurve::default());
        let pose = AnimationPose {
            layers: vec![crate::animation::LayerPose {
                offset: DVec2::ZERO,
                rot_phase: 0.5,
                rotation_center: DVec2::new(0.0, 10.0),
            }],
        };
        let t = layer_transform(&record, 0, &anchors, Some(&pose), &Placement::default());
        assert!(close(t.local, DVec2::new(0.0, 20.0)));
        assert_eq!(t.rot, 0.5);
    }

    #[test]
    fn sprite_point_undoes_the_anchor() {
        let sprite = SpriteRecord::opaque(1, 20, 20).with_anchor(3, 4);
        let t = LayerTransform {
            local: DVec2::ZERO,
            screen: DVec2::new(10.0, 10.0),
            rot: 0.0,
            flip: false,
            scale: 1.0,
        };
        assert_eq!(sprite_point(&t, &sprite, DVec2::new(10.0, 10.0)), (3, -4));
        let mirrored = LayerTransform { flip: true, ..t };
        assert_eq!(sprite_point(&mirrored, &sprite, DVec2::new(12.0, 10.0)), (1, -4));
    }

    #[test]
    fn vertical_slots_stand_items_up() {
        let container = ObjectRecord {
            slots: vec![Slot {
                pos: Vec2::new(0.0, 30.0),
                vertical: true,
                ..Slot::default()
            }],
            ..ObjectRecord::default()
        };
        let item = ObjectRecord::default();
        let sprites = crate::sprites::InMemorySprites::new();
        let placed = slot_placement(&container, 0, &item, &sprites, &Placement::default());
        assert_eq!(placed.rot, 0.25);
        assert!(close(placed.pos, DVec2::new(0.0, 30.0)));

        let flipped = slot_placement(
            &container,
            0,
            &item,
            &sprites,
            &Placement::default().flipped(true),
        );
        assert_eq!(flipped.rot, -0.25);
    }
}
