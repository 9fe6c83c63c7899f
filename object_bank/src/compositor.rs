//! Turns an object, its worn pieces and its contents into an ordered
//! list of sprite draws.
//!
//! Nothing here talks to a graphics API. Callers hand in a [`DrawSink`]
//! and get back [`SpriteDraw`]s in painter's order.

use std::f64::consts::TAU;

use glam::DVec2;
use log::trace;
use object_formats::{ObjectRecord, Rgb};

use crate::animation::AnimType;
use crate::geometry::{center_offset, dvec, rotate};
use crate::layout::{
    plan_layers, ArmHide, ContainedItem, DrawParams, HoldingPos, PlanItem, SlotPass,
};
use crate::sprites::SpriteBank;
use crate::store::ObjectStore;
use crate::transform::{slot_placement, Placement};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blend {
    Normal,
    Additive,
    Multiplicative,
}

/// One sprite to put on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteDraw {
    pub object_id: i32,
    pub layer: usize,
    pub sprite: i32,
    pub pos: DVec2,
    /// Clockwise turns.
    pub rot: f64,
    pub flip: bool,
    pub scale: f64,
    pub color: Rgb,
    pub blend: Blend,
}

pub trait DrawSink {
    fn draw_sprite(&mut self, draw: SpriteDraw);
}

impl DrawSink for Vec<SpriteDraw> {
    fn draw_sprite(&mut self, draw: SpriteDraw) {
        self.push(draw);
    }
}

/// Draws objects held in an [`ObjectStore`].
pub struct Compositor<'a> {
    store: &'a ObjectStore,
}

impl<'a> Compositor<'a> {
    pub fn new(store: &'a ObjectStore) -> Self {
        Self { store }
    }

    /// Draws object `id` with `contained` in its slots and returns where
    /// a held object should go.
    ///
    /// Without contents every layer is drawn in one pass. With contents
    /// the layers marked behind-slots go first, then the contents, then
    /// the rest.
    pub fn draw(
        &self,
        id: i32,
        params: &DrawParams,
        contained: &[ContainedItem],
        sink: &mut dyn DrawSink,
    ) -> Option<HoldingPos> {
        let record = self.store.get(id)?;
        if contained.is_empty() {
            return self.draw_pass(record, SlotPass::All, params, false, sink);
        }

        let behind = self.draw_pass(record, SlotPass::Behind, params, false, sink);
        let mut placement = params.placement;
        if record.no_flip {
            placement.flip = false;
        }
        self.draw_contents(record, &placement, params.age, contained, sink);
        let front = self.draw_pass(record, SlotPass::Front, params, false, sink);
        front.or(behind)
    }

    fn draw_contents(
        &self,
        container: &ObjectRecord,
        placement: &Placement,
        age: f64,
        contained: &[ContainedItem],
        sink: &mut dyn DrawSink,
    ) {
        if container.flags.slots_invisible {
            return;
        }
        let sprites = self.store.sprites();

        for (slot, item) in contained.iter().enumerate().take(container.num_slots()) {
            let Some(inner) = self.store.get(item.id) else {
                trace!("slot {slot} of {} holds unknown object {}", container.id, item.id);
                continue;
            };
            let inner_params = DrawParams::contained_item(
                slot_placement(container, slot, inner, sprites, placement),
                age,
            );

            if item.sub.is_empty() {
                self.draw_pass(inner, SlotPass::All, &inner_params, true, sink);
                continue;
            }

            let mut inner_placement = inner_params.placement;
            if inner.no_flip {
                inner_placement.flip = false;
            }
            self.draw_pass(inner, SlotPass::Behind, &inner_params, true, sink);
            for (sub_slot, sub_id) in item.sub.iter().enumerate().take(inner.num_slots()) {
                let Some(sub) = self.store.get(*sub_id) else {
                    continue;
                };
                let sub_params = DrawParams::contained_item(
                    slot_placement(inner, sub_slot, sub, sprites, &inner_placement),
                    age,
                );
                self.draw_pass(sub, SlotPass::All, &sub_params, true, sink);
            }
            self.draw_pass(inner, SlotPass::Front, &inner_params, true, sink);
        }
    }

    fn draw_pass(
        &self,
        record: &ObjectRecord,
        pass: SlotPass,
        params: &DrawParams,
        in_container: bool,
        sink: &mut dyn DrawSink,
    ) -> Option<HoldingPos> {
        let plan = plan_layers(self.store, record, pass, params, in_container);
        let sprites = self.store.sprites();

        for item in &plan.items {
            match item {
                PlanItem::Layer {
                    index,
                    transform,
                    skip: None,
                } => {
                    let layer = &record.sprites[*index];
                    let Some(sprite) = sprites.sprite(layer.sprite) else {
                        continue;
                    };
                    let blend = if sprite.multiplicative_blend {
                        Blend::Multiplicative
                    } else if layer.additive_blend {
                        Blend::Additive
                    } else {
                        Blend::Normal
                    };
                    sink.draw_sprite(SpriteDraw {
                        object_id: record.id,
                        layer: *index,
                        sprite: layer.sprite,
                        pos: transform.screen,
                        rot: transform.rot,
                        flip: transform.flip,
                        scale: transform.scale,
                        color: layer.color,
                        blend,
                    });
                }
                PlanItem::Layer { .. } => {}
                PlanItem::Clothing { id, placement, .. } => {
                    if let Some(piece) = self.store.get_no_default(*id) {
                        let piece_params = DrawParams::worn_piece(*placement);
                        self.draw_pass(piece, SlotPass::All, &piece_params, false, sink);
                    }
                }
            }
        }

        plan.holding
    }
}

/// How a person's limbs react to holding `held`.
///
/// Hand-held objects sit in the back hand. Rideable objects hide every
/// limb unless ridden with a biking or sitting animation. Anything else
/// is held against the body with both arms showing.
pub fn arm_holding_params(held: Option<&ObjectRecord>) -> (ArmHide, bool) {
    let Some(held) = held else {
        return (ArmHide::None, false);
    };
    if held.held_in_hand() {
        return (ArmHide::None, false);
    }
    if held.rideable() {
        let shows_limbs = matches!(
            AnimType::from_index(held.riding_animation),
            Some(AnimType::Biking) | Some(AnimType::Sitting)
        );
        return (ArmHide::None, !shows_limbs);
    }
    (ArmHide::BodyHold, false)
}

/// Screen position and rotation of `held`, given where the holder's
/// hand or body ended up.
///
/// `pos` is used when the holder reported no holding position.
pub fn held_draw_pos(
    holding: Option<HoldingPos>,
    pos: DVec2,
    held: &ObjectRecord,
    flip: bool,
    sprites: &dyn SpriteBank,
) -> HoldingPos {
    let hold = holding.map_or(pos, |holding| holding.pos);
    let mut offset = dvec(held.held_offset);
    if !held.is_person() {
        offset -= center_offset(held, sprites);
    }
    if flip {
        offset.x = -offset.x;
    }

    let mut rot = 0.0;
    if let Some(holding) = holding {
        if holding.rot != 0.0 && !held.rideable() {
            let (turn, signed) = if flip {
                (TAU * holding.rot, -holding.rot)
            } else {
                (-TAU * holding.rot, holding.rot)
            };
            offset = rotate(offset, turn);
            rot = wrap_turns(signed);
        }
    }

    HoldingPos {
        pos: hold + offset,
        rot,
    }
}

/// Brings a rotation into `[-1, 1]` turns by whole turns.
fn wrap_turns(mut rot: f64) -> f64 {
    while rot > 1.0 {
        rot -= 1.0;
    }
    while rot < -1.0 {
        rot += 1.0;
    }
    rot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::InMemoryAnimations;
    use crate::clothing::ClothingSet;
    use crate::config::BankConfig;
    use crate::folder::MemoryFolder;
    use crate::sprites::{InMemorySprites, SpriteRecord};
    use object_formats::{Clothing, HoldStyle, Slot, SpriteLayer, Vec2};

    fn layer(sprite: i32, x: f64, y: f64) -> SpriteLayer {
        SpriteLayer {
            sprite,
            pos: Vec2::new(x, y),
            ..SpriteLayer::default()
        }
    }

    fn store_with(sprites: InMemorySprites, records: Vec<ObjectRecord>) -> ObjectStore {
        let mut store = ObjectStore::new(
            BankConfig::default(),
            Box::new(MemoryFolder::unavailable()),
            Box::new(sprites),
            Box::new(InMemoryAnimations::new()),
        );
        for record in records {
            store.install(record, None, false);
        }
        store
    }

    fn sprites() -> InMemorySprites {
        let mut bank = InMemorySprites::new();
        for id in 1..=20 {
            bank.insert(SpriteRecord::opaque(id, 8, 8));
        }
        bank
    }

    /// Feet, body, back hand, head, front hand.
    fn person(id: i32) -> ObjectRecord {
        let foot = SpriteLayer {
            is_front_foot: true,
            is_back_foot: true,
            ..layer(1, 0.0, 0.0)
        };
        let body = SpriteLayer {
            is_body: true,
            ..layer(2, 0.0, 40.0)
        };
        let back_hand = SpriteLayer {
            invis_holding: true,
            parent: 1,
            ..layer(3, -10.0, 30.0)
        };
        let head = SpriteLayer {
            is_head: true,
            parent: 1,
            ..layer(4, 0.0, 70.0)
        };
        let front_hand = SpriteLayer {
            invis_holding: true,
            parent: 1,
            ..layer(5, 10.0, 31.0)
        };
        ObjectRecord {
            id,
            race: 1,
            male: true,
            sprites: vec![foot, body, back_hand, head, front_hand],
            ..ObjectRecord::default()
        }
    }

    fn draws(
        store: &ObjectStore,
        id: i32,
        params: &DrawParams,
        contained: &[ContainedItem],
    ) -> Vec<SpriteDraw> {
        let mut out = Vec::new();
        Compositor::new(store).draw(id, params, contained, &mut out);
        out
    }

    #[test]
    fn layers_draw_in_order_at_their_positions() {
        let bowl = ObjectRecord {
            id: 10,
            sprites: vec![layer(1, 0.0, 0.0), layer(2, 5.0, 3.0)],
            ..ObjectRecord::default()
        };
        let store = store_with(sprites(), vec![bowl]);
        let params = DrawParams::at(Placement::at(DVec2::new(100.0, 100.0)).flipped(true));
        let out = draws(&store, 10, &params, &[]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].sprite, 1);
        assert_eq!(out[1].pos, DVec2::new(95.0, 103.0));
        assert!(out[1].flip);
    }

    #[test]
    fn behind_slot_layers_go_under_the_contents() {
        let basket = ObjectRecord {
            id: 10,
            slots: vec![Slot {
                pos: Vec2::new(0.0, 5.0),
                ..Slot::default()
            }],
            sprites: vec![
                layer(1, 0.0, 0.0),
                SpriteLayer {
                    behind_slots: true,
                    ..layer(2, 0.0, 0.0)
                },
            ],
            ..ObjectRecord::default()
        };
        let berry = ObjectRecord {
            id: 11,
            sprites: vec![layer(3, 0.0, 0.0)],
            ..ObjectRecord::default()
        };
        let store = store_with(sprites(), vec![basket, berry]);
        let out = draws(&store, 10, &DrawParams::default(), &[ContainedItem::new(11)]);
        let order: Vec<i32> = out.iter().map(|draw| draw.sprite).collect();
        assert_eq!(order, vec![2, 3, 1]);
    }

    #[test]
    fn invisible_slots_and_extra_items_are_not_drawn() {
        let mut basket = ObjectRecord {
            id: 10,
            slots: vec![Slot::default()],
            sprites: vec![layer(1, 0.0, 0.0)],
            ..ObjectRecord::default()
        };
        let berry = ObjectRecord {
            id: 11,
            sprites: vec![layer(3, 0.0, 0.0)],
            ..ObjectRecord::default()
        };
        let store = store_with(sprites(), vec![basket.clone(), berry.clone()]);
        let two = [ContainedItem::new(11), ContainedItem::new(11)];
        assert_eq!(draws(&store, 10, &DrawParams::default(), &two).len(), 2);

        basket.set_description("basket +slotsInvis");
        let store = store_with(sprites(), vec![basket, berry]);
        assert_eq!(draws(&store, 10, &DrawParams::default(), &two).len(), 1);
    }

    #[test]
    fn nested_contents_draw_between_their_container_passes() {
        let cart = ObjectRecord {
            id: 10,
            slots: vec![Slot::default()],
            sprites: vec![layer(1, 0.0, 0.0)],
            ..ObjectRecord::default()
        };
        let box_ = ObjectRecord {
            id: 11,
            slots: vec![Slot::default()],
            sprites: vec![
                SpriteLayer {
                    behind_slots: true,
                    ..layer(2, 0.0, 0.0)
                },
                layer(3, 0.0, 0.0),
            ],
            ..ObjectRecord::default()
        };
        let gem = ObjectRecord {
            id: 12,
            sprites: vec![layer(4, 0.0, 0.0)],
            ..ObjectRecord::default()
        };
        let store = store_with(sprites(), vec![cart, box_, gem]);
        let out = draws(
            &store,
            10,
            &DrawParams::default(),
            &[ContainedItem::with_sub(11, vec![12])],
        );
        let order: Vec<i32> = out.iter().map(|draw| draw.sprite).collect();
        assert_eq!(order, vec![2, 4, 3, 1]);
    }

    #[test]
    fn holding_at_back_hand_or_body() {
        let store = store_with(sprites(), vec![person(20)]);
        let params = DrawParams::at(Placement::at(DVec2::new(0.0, 0.0))).with_age(30.0);
        let mut out = Vec::new();
        let hand = Compositor::new(&store)
            .draw(20, &params, &[], &mut out)
            .expect("hand holding position");
        assert_eq!(hand.pos, DVec2::new(-10.0, 30.0));

        let body_hold = DrawParams {
            arm_hide: ArmHide::BodyHold,
            ..params.clone()
        };
        let body = Compositor::new(&store)
            .draw(20, &body_hold, &[], &mut out)
            .expect("body holding position");
        assert_eq!(body.pos, DVec2::new(0.0, 40.0));

        let riding = DrawParams {
            hide_all_limbs: true,
            ..params.clone()
        };
        let ridden = Compositor::new(&store)
            .draw(20, &riding, &[], &mut out)
            .expect("holding position with limbs hidden");
        assert_eq!(ridden.pos, DVec2::new(0.0, 40.0));
    }

    #[test]
    fn hiding_the_front_arm_drops_its_layers() {
        let store = store_with(sprites(), vec![person(20)]);
        let params = DrawParams {
            arm_hide: ArmHide::Front,
            ..DrawParams::default().with_age(30.0)
        };
        let out = draws(&store, 20, &params, &[]);
        assert!(out.iter().all(|draw| draw.sprite != 5));
        assert_eq!(out.len(), 4);

        let swinging = DrawParams {
            held_not_in_place: true,
            ..params
        };
        assert_eq!(draws(&store, 20, &swinging, &[]).len(), 5);
    }

    #[test]
    fn clothing_slots_into_the_body() {
        let hat = ObjectRecord {
            id: 30,
            clothing: Clothing::Hat,
            sprites: vec![layer(10, 0.0, 0.0)],
            ..ObjectRecord::default()
        };
        let shirt = ObjectRecord {
            id: 31,
            clothing: Clothing::Tunic,
            sprites: vec![layer(11, 0.0, 0.0)],
            ..ObjectRecord::default()
        };
        let shoe = ObjectRecord {
            id: 32,
            clothing: Clothing::Shoe,
            sprites: vec![layer(12, 0.0, 0.0)],
            ..ObjectRecord::default()
        };
        let store = store_with(sprites(), vec![person(20), hat, shirt, shoe]);
        let mut clothing = ClothingSet::empty();
        clothing.hat = Some(30);
        clothing.tunic = Some(31);
        clothing.back_shoe = Some(32);

        let params = DrawParams::default().with_age(30.0).with_clothing(clothing);
        let order: Vec<i32> = draws(&store, 20, &params, &[])
            .iter()
            .map(|draw| draw.sprite)
            .collect();
        // foot, shoe, body, tunic, back hand, head, front hand, hat
        assert_eq!(order, vec![1, 12, 2, 11, 3, 4, 5, 10]);
    }

    #[test]
    fn arm_parameters_follow_the_held_object() {
        assert_eq!(arm_holding_params(None), (ArmHide::None, false));

        let mut cart = ObjectRecord {
            hold: HoldStyle::Ridden,
            ..ObjectRecord::default()
        };
        assert_eq!(arm_holding_params(Some(&cart)), (ArmHide::None, true));

        cart.riding_animation = 5;
        assert_eq!(arm_holding_params(Some(&cart)), (ArmHide::None, false));

        let knife = ObjectRecord {
            hold: HoldStyle::Hand,
            ..ObjectRecord::default()
        };
        assert_eq!(arm_holding_params(Some(&knife)), (ArmHide::None, false));

        let log = ObjectRecord::default();
        assert_eq!(arm_holding_params(Some(&log)), (ArmHide::BodyHold, false));
    }

    #[test]
    fn held_objects_follow_the_hand_rotation() {
        let bank = InMemorySprites::new();
        let stick = ObjectRecord {
            held_offset: Vec2::new(10.0, 0.0),
            ..ObjectRecord::default()
        };
        let holding = HoldingPos {
            pos: DVec2::new(100.0, 100.0),
            rot: 0.25,
        };
        let placed = held_draw_pos(Some(holding), DVec2::ZERO, &stick, false, &bank);
        assert!(placed.pos.distance(DVec2::new(100.0, 90.0)) < 1e-9);
        assert_eq!(placed.rot, 0.25);

        let loose = held_draw_pos(None, DVec2::new(5.0, 5.0), &stick, true, &bank);
        assert_eq!(loose.pos, DVec2::new(-5.0, 5.0));
        assert_eq!(loose.rot, 0.0);
        assert_eq!(wrap_turns(2.5), 0.5);
        assert_eq!(wrap_turns(-1.25), -0.25);
    }
}
