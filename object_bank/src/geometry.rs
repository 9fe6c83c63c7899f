//! Anchor lookup and bounding geometry derived from an object's sprite
//! layers and the bitmaps behind them.

use std::f64::consts::TAU;

use glam::DVec2;
use object_formats::{ObjectRecord, Rgb, SlotStyle, SpriteLayer, Vec2, WornVisibility};

use crate::sprites::SpriteBank;

/// Sprite ids of the bare body parts shown under clothing.
pub const NUDE_SPRITES: std::ops::RangeInclusive<i32> = 592..=600;

/// Half the height of a table-style slot.
const SLOT_HALF_HEIGHT: f64 = 14.0;

/// Age at which the resting eye position is measured.
const MAIN_EYES_AGE: f64 = 30.0;

pub fn dvec(v: Vec2) -> DVec2 {
    DVec2::new(v.x, v.y)
}

pub fn rotate(v: DVec2, angle: f64) -> DVec2 {
    DVec2::from_angle(angle).rotate(v)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyPart {
    Head,
    Body,
    BackFoot,
    FrontFoot,
    Eyes,
    Mouth,
}

impl BodyPart {
    fn flagged(self, layer: &SpriteLayer) -> bool {
        match self {
            BodyPart::Head => layer.is_head,
            BodyPart::Body => layer.is_body,
            BodyPart::BackFoot => layer.is_back_foot,
            BodyPart::FrontFoot => layer.is_front_foot,
            BodyPart::Eyes => layer.is_eyes,
            BodyPart::Mouth => layer.is_mouth,
        }
    }
}

/// Topmost layer flagged as `part` that is visible at `age`.
///
/// Falls back to layer 0 so the result can always be used as an index;
/// non-person objects always get 0.
pub fn body_part_index(record: &ObjectRecord, part: BodyPart, age: f64) -> usize {
    if !record.is_person() {
        return 0;
    }
    record
        .sprites
        .iter()
        .enumerate()
        .rev()
        .find(|(_, layer)| part.flagged(layer) && layer.visible_at_age(age))
        .map(|(index, _)| index)
        .unwrap_or(0)
}

/// The two hand layers visible at `age`, lowest first.
fn hand_indices(record: &ObjectRecord, age: f64) -> (Option<usize>, Option<usize>) {
    let mut first: Option<(usize, f64)> = None;
    let mut second: Option<(usize, f64)> = None;

    for (index, layer) in record.sprites.iter().enumerate() {
        if !layer.invis_holding || !layer.visible_at_age(age) {
            continue;
        }
        let y = layer.pos.y;
        if first.map_or(true, |(_, lowest)| y < lowest) {
            second = first;
            first = Some((index, y));
        } else if second.map_or(true, |(_, next)| y < next) {
            second = Some((index, y));
        }
    }

    (first.map(|(index, _)| index), second.map(|(index, _)| index))
}

/// Leftmost of the two hands. Persons with a single hand layer have no
/// back hand.
pub fn back_hand_index(record: &ObjectRecord, age: f64) -> Option<usize> {
    match hand_indices(record, age) {
        (Some(one), Some(two)) => {
            if record.sprites[one].pos.x < record.sprites[two].pos.x {
                Some(one)
            } else {
                Some(two)
            }
        }
        _ => None,
    }
}

pub fn front_hand_index(record: &ObjectRecord, age: f64) -> Option<usize> {
    match hand_indices(record, age) {
        (Some(one), Some(two)) => {
            if record.sprites[one].pos.x > record.sprites[two].pos.x {
                Some(one)
            } else {
                Some(two)
            }
        }
        _ => None,
    }
}

/// Walks from a hand or foot up the parent chain, stopping at the body.
fn limb_indices(record: &ObjectRecord, start: Option<usize>, out: &mut Vec<usize>) {
    let Some(start) = start else {
        return;
    };
    let Some(first) = record.sprites.get(start) else {
        return;
    };
    if start == 0 && !(first.invis_holding || first.is_front_foot || first.is_back_foot) {
        // index 0 is the "not found" fallback of body_part_index
        return;
    }

    let mut next = start as i32;
    let mut steps = 0;
    while next >= 0 && steps <= record.sprites.len() {
        let Some(layer) = record.sprites.get(next as usize) else {
            break;
        };
        if layer.is_body {
            break;
        }
        out.push(next as usize);
        next = layer.parent;
        steps += 1;
    }
}

pub fn front_arm_indices(record: &ObjectRecord, age: f64) -> Vec<usize> {
    let mut out = Vec::new();
    limb_indices(record, front_hand_index(record, age), &mut out);
    out
}

pub fn back_arm_indices(record: &ObjectRecord, age: f64) -> Vec<usize> {
    let mut out = Vec::new();
    limb_indices(record, back_hand_index(record, age), &mut out);
    out
}

/// Uppermost layer of the back arm, usually the shoulder.
pub fn back_arm_top_index(record: &ObjectRecord, age: f64) -> Option<usize> {
    back_arm_indices(record, age).last().copied()
}

/// Both legs plus the unparented shadow layers below the body.
pub fn leg_indices(record: &ObjectRecord, age: f64) -> Vec<usize> {
    let mut out = Vec::new();
    limb_indices(
        record,
        Some(body_part_index(record, BodyPart::BackFoot, age)),
        &mut out,
    );
    limb_indices(
        record,
        Some(body_part_index(record, BodyPart::FrontFoot, age)),
        &mut out,
    );

    if out.len() >= 2 {
        let body = body_part_index(record, BodyPart::Body, age);
        let body_y = record.sprites.get(body).map_or(0.0, |layer| layer.pos.y);
        for (index, layer) in record.sprites.iter().enumerate() {
            if !out.contains(&index) && body_y > layer.pos.y && layer.parent == -1 {
                out.push(index);
            }
        }
    }
    out
}

pub fn nude_indices(record: &ObjectRecord) -> Vec<usize> {
    record
        .sprites
        .iter()
        .enumerate()
        .filter(|(_, layer)| NUDE_SPRITES.contains(&layer.sprite))
        .map(|(index, _)| index)
        .collect()
}

/// Flags eye and mouth layers from sprite tags and records where the
/// eyes sit relative to the head in the main segment of life.
pub fn setup_eyes_and_mouth(record: &mut ObjectRecord, sprites: &dyn SpriteBank) {
    for layer in record.sprites.iter_mut() {
        layer.is_eyes = false;
        layer.is_mouth = false;
    }
    record.main_eyes_offset = Vec2::ZERO;

    if !record.is_person() {
        return;
    }

    let head = body_part_index(record, BodyPart::Head, MAIN_EYES_AGE);
    let head_pos = record.sprites.get(head).map(|layer| layer.pos);
    let mut eyes_offset = None;

    for layer in record.sprites.iter_mut() {
        if let Some(tag) = sprites.tag(layer.sprite) {
            layer.is_eyes = tag.contains("Eyes");
            layer.is_mouth = tag.contains("Mouth");
        }
        if layer.is_eyes && layer.age_start < MAIN_EYES_AGE && layer.age_end > MAIN_EYES_AGE {
            if let Some(head_pos) = head_pos {
                eyes_offset = Some(Vec2::new(
                    layer.pos.x - head_pos.x,
                    layer.pos.y - head_pos.y,
                ));
            }
        }
    }

    if let Some(offset) = eyes_offset {
        record.main_eyes_offset = offset;
    }
}

/// Pixel height of the object above its origin, ignoring transparent
/// rows and multiplicative sprites.
pub fn recompute_height(layers: &[SpriteLayer], sprites: &dyn SpriteBank) -> i32 {
    let mut max_height = 0.0_f64;

    for layer in layers {
        let mut rad = 0;
        if let Some(sprite) = sprites.sprite(layer.sprite) {
            if !sprite.multiplicative_blend {
                if sprite.hit_map.is_some() {
                    if let Some(row) = sprite.first_opaque_row() {
                        // negative when the anchor sits above the top pixel
                        rad = (sprite.height / 2 + sprite.center_anchor_y_offset) - row;
                    }
                } else {
                    rad = sprite.height / 2;
                }
            }
        }
        let height = layer.pos.y + rad as f64;
        if height > max_height {
            max_height = height;
        }
    }

    max_height.round() as i32
}

/// Diameter of the smallest origin-centered square covering every layer.
pub fn max_diameter(record: &ObjectRecord, sprites: &dyn SpriteBank) -> i32 {
    let mut max_d = 0;
    for layer in &record.sprites {
        let rad = sprites.sprite(layer.sprite).map_or(0, |sprite| sprite.max_diameter / 2);
        let x_r = (layer.pos.x.abs() + rad as f64).round() as i32;
        let y_r = (layer.pos.y.abs() + rad as f64).round() as i32;
        max_d = max_d.max(2 * x_r).max(2 * y_r);
    }
    max_d
}

fn fractional_turn(rot: f64) -> f64 {
    let abs = rot.abs();
    abs - abs.floor()
}

fn counts_for_center(layer: &SpriteLayer) -> bool {
    layer.invis_worn != WornVisibility::HiddenWhenUnworn && !layer.ignored_in_center
}

/// Index of the widest opaque layer; ties go to the lower one.
fn widest_layer(record: &ObjectRecord, sprites: &dyn SpriteBank) -> Option<usize> {
    let mut widest: Option<(usize, i32, f64)> = None;

    for (index, layer) in record.sprites.iter().enumerate() {
        let Some(sprite) = sprites.sprite(layer.sprite) else {
            continue;
        };
        if sprite.multiplicative_blend || !counts_for_center(layer) {
            continue;
        }

        let mut width = sprite.visible_width;
        if layer.rot != 0.0 {
            let turn = fractional_turn(layer.rot);
            if turn == 0.25 || turn == 0.75 {
                width = sprite.visible_height;
            }
        }

        let better = match widest {
            None => true,
            Some((_, best_width, best_y)) => {
                width > best_width || (width == best_width && layer.pos.y < best_y)
            }
        };
        if better {
            widest = Some((index, width, layer.pos.y));
        }
    }

    widest.map(|(index, _, _)| index)
}

/// Offset of the widest layer's visible center from its anchor, rotated
/// with the layer.
pub fn widest_sprite_center_offset(record: &ObjectRecord, sprites: &dyn SpriteBank) -> DVec2 {
    let Some(index) = widest_layer(record, sprites) else {
        return DVec2::ZERO;
    };
    let layer = &record.sprites[index];
    let Some(sprite) = sprites.sprite(layer.sprite) else {
        return DVec2::ZERO;
    };
    let offset = DVec2::new(
        sprite.center_x_offset as f64,
        sprite.center_y_offset as f64,
    );
    rotate(offset, TAU * layer.rot)
}

/// Visible center of the widest layer in object space.
pub fn center_offset(record: &ObjectRecord, sprites: &dyn SpriteBank) -> DVec2 {
    let Some(index) = widest_layer(record, sprites) else {
        return DVec2::ZERO;
    };
    dvec(record.sprites[index].pos) + widest_sprite_center_offset(record, sprites)
}

/// Like [`center_offset`] but with `y` placed so the lowest visible pixel
/// rests on the bottom edge of a slot.
pub fn bottom_center_offset(record: &ObjectRecord, sprites: &dyn SpriteBank) -> DVec2 {
    let mut lowest: Option<f64> = None;

    for layer in &record.sprites {
        let Some(sprite) = sprites.sprite(layer.sprite) else {
            continue;
        };
        if sprite.multiplicative_blend || !counts_for_center(layer) || layer.invis_contained {
            continue;
        }

        let mut height = sprite.visible_height as f64;
        let mut rot = layer.rot;
        if rot != 0.0 {
            // snap to the nearest eighth turn
            let mut snapped = (fractional_turn(rot) / 0.125).round() * 0.125;
            if rot < 0.0 {
                snapped = -snapped;
            }
            rot = snapped;

            let turn = fractional_turn(rot);
            if turn == 0.25 || turn == 0.75 {
                height = sprite.visible_width as f64;
            }
        }

        let center = rotate(
            DVec2::new(sprite.center_x_offset as f64, sprite.center_y_offset as f64),
            TAU * rot,
        );
        let anchor = rotate(
            DVec2::new(
                sprite.center_anchor_x_offset as f64,
                sprite.center_anchor_y_offset as f64,
            ),
            TAU * rot,
        );

        let bottom = layer.pos.y + anchor.y - center.y - height / 2.0;
        if lowest.map_or(true, |current| bottom < current) {
            lowest = Some(bottom);
        }
    }

    let Some(lowest) = lowest else {
        return DVec2::ZERO;
    };
    let mut result = center_offset(record, sprites);
    result.y = lowest + SLOT_HALF_HEIGHT;
    result
}

/// Offset subtracted from a slot position to place `contained` inside
/// `container`.
pub fn contained_center_offset(
    container: &ObjectRecord,
    contained: &ObjectRecord,
    sprites: &dyn SpriteBank,
) -> DVec2 {
    let base = match container.slot_style {
        SlotStyle::Box => center_offset(contained, sprites),
        SlotStyle::Table => bottom_center_offset(contained, sprites),
        SlotStyle::Ground => DVec2::ZERO,
    };
    base + DVec2::new(
        contained.contain_offset_x as f64,
        contained.contain_offset_y as f64,
    )
}

/// Pairing of a sub-object layer with the matching super-object layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubsetSpriteIndexMap {
    pub sub_index: usize,
    pub super_index: usize,
}

fn same_color(a: Rgb, b: Rgb) -> bool {
    a.r == b.r && a.g == b.g && a.b == b.b
}

/// Checks whether every layer of `sub` appears in `sup` with the same
/// relative placement, returning the layer mapping when it does.
///
/// A single-layer `sub` matches any layer of `sup` using the same sprite
/// and tint regardless of placement; its mapping is left empty.
pub fn sprite_subset(sup: &ObjectRecord, sub: &ObjectRecord) -> Option<Vec<SubsetSpriteIndexMap>> {
    let Some(sub_zero) = sub.sprites.first() else {
        return Some(Vec::new());
    };

    if sub.sprites.len() == 1 && !sup.sprites.is_empty() {
        let found = sup
            .sprites
            .iter()
            .any(|layer| layer.sprite == sub_zero.sprite && same_color(layer.color, sub_zero.color));
        return found.then(Vec::new);
    }

    let sub_zero_pos = dvec(sub_zero.pos);
    let mut super_zero_pos = None;
    let mut min_distance = f64::MAX;
    for layer in &sup.sprites {
        if layer.sprite == sub_zero.sprite
            && layer.rot == sub_zero.rot
            && layer.h_flip == sub_zero.h_flip
        {
            let pos = dvec(layer.pos);
            let distance = pos.distance(sub_zero_pos);
            if distance < min_distance {
                min_distance = distance;
                super_zero_pos = Some(pos);
            }
        }
    }
    let super_zero_pos = super_zero_pos?;

    let mut mapping = Vec::with_capacity(sub.sprites.len());
    for (sub_index, layer) in sub.sprites.iter().enumerate() {
        let relative = dvec(layer.pos) - sub_zero_pos;
        let super_index = sup.sprites.iter().position(|candidate| {
            candidate.sprite == layer.sprite
                && dvec(candidate.pos) - super_zero_pos == relative
                && candidate.rot == layer.rot
                && candidate.h_flip == layer.h_flip
        })?;
        mapping.push(SubsetSpriteIndexMap {
            sub_index,
            super_index,
        });
    }
    Some(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sprites::{InMemorySprites, SpriteRecord};

    fn layer(sprite: i32, x: f64, y: f64) -> SpriteLayer {
        SpriteLayer {
            sprite,
            pos: Vec2::new(x, y),
            ..SpriteLayer::default()
        }
    }

    fn person(layers: Vec<SpriteLayer>) -> ObjectRecord {
        ObjectRecord {
            race: 1,
            sprites: layers,
            ..ObjectRecord::default()
        }
    }

    #[test]
    fn body_part_prefers_topmost_visible_layer() {
        let mut young_head = layer(1, 0.0, 40.0);
        young_head.is_head = true;
        young_head.age_start = 0.0;
        young_head.age_end = 10.0;
        let mut head = layer(2, 0.0, 80.0);
        head.is_head = true;
        head.age_start = 10.0;
        head.age_end = 100.0;

        let record = person(vec![layer(0, 0.0, 0.0), young_head, head]);
        assert_eq!(body_part_index(&record, BodyPart::Head, 5.0), 1);
        assert_eq!(body_part_index(&record, BodyPart::Head, 30.0), 2);
        assert_eq!(body_part_index(&record, BodyPart::Body, 30.0), 0);

        let rock = ObjectRecord {
            sprites: record.sprites.clone(),
            ..ObjectRecord::default()
        };
        assert_eq!(body_part_index(&rock, BodyPart::Head, 30.0), 0);
    }

    #[test]
    fn hands_are_split_by_x() {
        let mut body = layer(0, 0.0, 50.0);
        body.is_body = true;
        let mut back_arm = layer(1, -10.0, 40.0);
        back_arm.parent = 0;
        let mut back_hand = layer(2, -12.0, 20.0);
        back_hand.invis_holding = true;
        back_hand.parent = 1;
        let mut front_hand = layer(3, 12.0, 22.0);
        front_hand.invis_holding = true;
        front_hand.parent = 0;

        let record = person(vec![body, back_arm, back_hand, front_hand]);
        assert_eq!(back_hand_index(&record, 30.0), Some(2));
        assert_eq!(front_hand_index(&record, 30.0), Some(3));
        assert_eq!(back_arm_indices(&record, 30.0), vec![2, 1]);
        assert_eq!(back_arm_top_index(&record, 30.0), Some(1));
        assert_eq!(front_arm_indices(&record, 30.0), vec![3]);
    }

    #[test]
    fn single_hand_has_no_back_hand() {
        let mut hand = layer(1, 0.0, 0.0);
        hand.invis_holding = true;
        let record = person(vec![layer(0, 0.0, 0.0), hand]);
        assert_eq!(back_hand_index(&record, 30.0), None);
        assert_eq!(front_hand_index(&record, 30.0), None);
    }

    #[test]
    fn legs_pick_up_shadows() {
        let mut body = layer(0, 0.0, 50.0);
        body.is_body = true;
        let shadow = layer(1, 0.0, -5.0);
        let mut back_foot = layer(2, -5.0, 0.0);
        back_foot.is_back_foot = true;
        back_foot.parent = 0;
        let mut front_foot = layer(3, 5.0, 0.0);
        front_foot.is_front_foot = true;
        front_foot.parent = 0;

        let record = person(vec![body, shadow, back_foot, front_foot]);
        assert_eq!(leg_indices(&record, 30.0), vec![2, 3, 1]);
    }

    #[test]
    fn height_uses_first_opaque_row() {
        let mut sprite = SpriteRecord::opaque(7, 4, 10);
        let mut map = vec![false; 40];
        for pixel in map.iter_mut().skip(8) {
            *pixel = true;
        }
        sprite.hit_map = Some(map);
        let sprites = InMemorySprites::new()
            .with(sprite)
            .with(SpriteRecord::opaque(8, 4, 6));

        // rows 0 and 1 are clear: 10 / 2 - 2 = 3
        assert_eq!(recompute_height(&[layer(7, 0.0, 10.0)], &sprites), 13);
        assert_eq!(recompute_height(&[layer(8, 0.0, 1.5)], &sprites), 5);
        assert_eq!(recompute_height(&[], &sprites), 0);
    }

    #[test]
    fn center_offset_tracks_widest_layer() {
        let mut wide = SpriteRecord::opaque(1, 40, 10);
        wide.center_x_offset = 2;
        let sprites = InMemorySprites::new()
            .with(wide)
            .with(SpriteRecord::opaque(2, 10, 30));

        let record = ObjectRecord {
            sprites: vec![layer(2, 0.0, 20.0), layer(1, 5.0, 3.0)],
            ..ObjectRecord::default()
        };
        assert_eq!(center_offset(&record, &sprites), DVec2::new(7.0, 3.0));

        let mut turned = record.clone();
        turned.sprites[0].rot = 0.25;
        // a quarter turn swaps in the visible height, still narrower
        assert_eq!(widest_layer(&turned, &sprites), Some(1));
    }

    #[test]
    fn table_slots_rest_on_the_lowest_pixel() {
        let sprites = InMemorySprites::new().with(SpriteRecord::opaque(1, 20, 10));
        let container = ObjectRecord {
            slot_style: SlotStyle::Table,
            ..ObjectRecord::default()
        };
        let contained = ObjectRecord {
            sprites: vec![layer(1, 0.0, 8.0)],
            contain_offset_y: 1,
            ..ObjectRecord::default()
        };
        let offset = contained_center_offset(&container, &contained, &sprites);
        // bottom at 8 - 5 = 3, plus half slot, plus contain offset
        assert_eq!(offset, DVec2::new(0.0, 18.0));
    }

    #[test]
    fn subset_requires_matching_relative_layout() {
        let sup = ObjectRecord {
            sprites: vec![layer(1, 10.0, 10.0), layer(2, 20.0, 10.0), layer(3, 0.0, 0.0)],
            ..ObjectRecord::default()
        };
        let sub = ObjectRecord {
            sprites: vec![layer(1, 0.0, 0.0), layer(2, 10.0, 0.0)],
            ..ObjectRecord::default()
        };
        let mapping = sprite_subset(&sup, &sub).expect("subset");
        assert_eq!(mapping[1].super_index, 1);

        let shifted = ObjectRecord {
            sprites: vec![layer(1, 0.0, 0.0), layer(2, 11.0, 0.0)],
            ..ObjectRecord::default()
        };
        assert!(sprite_subset(&sup, &shifted).is_none());

        let single = ObjectRecord {
            sprites: vec![layer(3, 50.0, 50.0)],
            ..ObjectRecord::default()
        };
        assert_eq!(sprite_subset(&sup, &single), Some(Vec::new()));
    }
}
