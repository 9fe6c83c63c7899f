//! Draw order of one object: its layers and the worn pieces slotted
//! between them.
//!
//! The compositor walks a [`LayerPlan`] front to back to emit sprites and
//! the hit tester walks the same plan back to front, so both agree on
//! which layers are shown, where they sit and what covers what.

use glam::DVec2;
use object_formats::{Clothing, ObjectRecord};

use crate::animation::AnimType;
use crate::clothing::ClothingSet;
use crate::geometry::{
    back_arm_indices, back_arm_top_index, back_hand_index, front_arm_indices, leg_indices,
};
use crate::store::ObjectStore;
use crate::transform::{
    clothing_placement, layer_transform, BodyAnchors, LayerTransform, Placement,
};

/// Which layers a pass draws relative to contained items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotPass {
    /// Layers drawn under the contents.
    Behind,
    /// Layers drawn over the contents.
    Front,
    All,
}

impl SlotPass {
    pub fn includes(self, behind_slots: bool) -> bool {
        match self {
            SlotPass::Behind => behind_slots,
            SlotPass::Front => !behind_slots,
            SlotPass::All => true,
        }
    }
}

/// Arm handling while holding something.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArmHide {
    /// Both arms shown; held objects sit at the back hand.
    #[default]
    None,
    Front,
    Back,
    /// Arms shown; held objects sit at the body.
    BodyHold,
}

/// Everything about how one object is drawn besides its contents.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawParams {
    pub placement: Placement,
    pub worn: bool,
    /// Age of a person, -1 when not applicable.
    pub age: f64,
    pub arm_hide: ArmHide,
    pub hide_all_limbs: bool,
    /// Held object is mid-swing; limbs are left alone.
    pub held_not_in_place: bool,
    pub clothing: ClothingSet,
    /// Draw only layers below this index.
    pub layer_cutoff: Option<usize>,
    pub animation: Option<AnimType>,
}

impl Default for DrawParams {
    fn default() -> Self {
        Self {
            placement: Placement::default(),
            worn: false,
            age: -1.0,
            arm_hide: ArmHide::None,
            hide_all_limbs: false,
            held_not_in_place: false,
            clothing: ClothingSet::empty(),
            layer_cutoff: None,
            animation: None,
        }
    }
}

impl DrawParams {
    pub fn at(placement: Placement) -> Self {
        Self {
            placement,
            ..Self::default()
        }
    }

    pub fn with_age(mut self, age: f64) -> Self {
        self.age = age;
        self
    }

    pub fn with_clothing(mut self, clothing: ClothingSet) -> Self {
        self.clothing = clothing;
        self
    }

    /// A worn piece drawn on its wearer.
    pub fn worn_piece(placement: Placement) -> Self {
        Self {
            placement,
            worn: true,
            ..Self::default()
        }
    }

    /// An item resting in a container slot.
    pub fn contained_item(placement: Placement, age: f64) -> Self {
        Self {
            placement,
            age,
            ..Self::default()
        }
    }
}

/// An item in a container slot and, for containers in containers, the
/// items inside it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainedItem {
    pub id: i32,
    pub sub: Vec<i32>,
}

impl ContainedItem {
    pub fn new(id: i32) -> Self {
        Self { id, sub: Vec::new() }
    }

    pub fn with_sub(id: i32, sub: Vec<i32>) -> Self {
        Self { id, sub }
    }
}

/// Where a held object goes, in screen space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoldingPos {
    pub pos: DVec2,
    pub rot: f64,
}

/// Why a layer is left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerSkip {
    Flagged,
    Age,
    Contained,
    Worn,
    Limb,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlanItem {
    Layer {
        index: usize,
        transform: LayerTransform,
        skip: Option<LayerSkip>,
    },
    Clothing {
        slot: usize,
        id: i32,
        placement: Placement,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerPlan {
    pub items: Vec<PlanItem>,
    pub holding: Option<HoldingPos>,
    /// Placement after `no_flip` is applied.
    pub placement: Placement,
    pub head: usize,
}

const BODY_PIECES: [usize; 3] = [ClothingSet::BOTTOM, ClothingSet::TUNIC, ClothingSet::BACKPACK];

pub fn is_body_piece(slot: usize) -> bool {
    BODY_PIECES.contains(&slot)
}

/// Reason layer `index` is not drawn, if any, before arm handling.
pub fn layer_skip(
    record: &ObjectRecord,
    index: usize,
    worn: bool,
    age: f64,
    in_container: bool,
) -> Option<LayerSkip> {
    let layer = record.sprites.get(index)?;
    if layer.skip_drawing {
        return Some(LayerSkip::Flagged);
    }
    if record.is_person() && !layer.visible_at_age(age) {
        return Some(LayerSkip::Age);
    }
    if in_container && layer.invis_contained {
        return Some(LayerSkip::Contained);
    }
    if record.clothing != Clothing::None && layer.invis_worn.hides(worn) {
        return Some(LayerSkip::Worn);
    }
    None
}

/// Lays out one pass of `record`.
///
/// Bottom, tunic and backpack go just under the top of the back arm, or
/// right over the body when there is no back arm. Shoes go over their
/// foot and the hat over everything.
pub fn plan_layers(
    store: &ObjectStore,
    record: &ObjectRecord,
    pass: SlotPass,
    params: &DrawParams,
    in_container: bool,
) -> LayerPlan {
    let mut placement = params.placement;
    if record.no_flip {
        placement.flip = false;
    }
    let age = params.age;
    let anchors = BodyAnchors::resolve(record, age, store.age_curve());
    let pose = params
        .animation
        .and_then(|kind| store.animations().pose(record.id, kind));

    let limbs_free = !params.held_not_in_place;
    let hidden_arm = match params.arm_hide {
        ArmHide::Front if limbs_free => front_arm_indices(record, age),
        ArmHide::Back if limbs_free => back_arm_indices(record, age),
        _ => Vec::new(),
    };
    let hidden_limbs = if limbs_free && params.hide_all_limbs {
        let mut all = front_arm_indices(record, age);
        all.extend(back_arm_indices(record, age));
        all.extend(leg_indices(record, age));
        all
    } else {
        Vec::new()
    };
    let top_back_arm = back_arm_top_index(record, age);
    let back_hand = back_hand_index(record, age);

    let len = record.sprites.len();
    let limit = params.layer_cutoff.map_or(len, |cutoff| cutoff.min(len));

    let anchor_local =
        |index: usize| layer_transform(record, index, &anchors, pose, &placement).local;
    let piece = |slot: usize, anchor: DVec2| -> Option<PlanItem> {
        let id = params.clothing.get(slot)?;
        let worn = store.get_no_default(id)?;
        Some(PlanItem::Clothing {
            slot,
            id,
            placement: clothing_placement(anchor, worn, &placement),
        })
    };
    let body_pieces = |items: &mut Vec<PlanItem>| {
        let anchor = anchor_local(anchors.body);
        items.extend(BODY_PIECES.iter().filter_map(|slot| piece(*slot, anchor)));
    };

    let mut items = Vec::with_capacity(limit + 2);
    let mut holding = None;
    let mut body_pieces_placed = false;

    for index in 0..limit {
        let layer = &record.sprites[index];
        if !pass.includes(layer.behind_slots) {
            continue;
        }

        if Some(index) == top_back_arm && index != anchors.body && !body_pieces_placed {
            body_pieces(&mut items);
            body_pieces_placed = true;
        }

        let transform = layer_transform(record, index, &anchors, pose, &placement);
        let limb_hidden = hidden_arm.contains(&index) || hidden_limbs.contains(&index);
        let skip = layer_skip(record, index, params.worn, age, in_container)
            .or_else(|| limb_hidden.then_some(LayerSkip::Limb));
        items.push(PlanItem::Layer {
            index,
            transform,
            skip,
        });

        if skip.is_none() {
            let hold_here = if Some(index) == back_hand {
                params.arm_hide == ArmHide::None && !params.hide_all_limbs
            } else {
                index == anchors.body
                    && (params.arm_hide != ArmHide::None || params.hide_all_limbs)
            };
            if hold_here {
                holding = Some(HoldingPos {
                    pos: transform.screen,
                    rot: transform.rot,
                });
            }

            if record.is_person() {
                if index == anchors.back_foot {
                    items.extend(piece(ClothingSet::BACK_SHOE, transform.local));
                } else if index == anchors.front_foot {
                    items.extend(piece(ClothingSet::FRONT_SHOE, transform.local));
                }
            }
        }

        let arm_over_body = top_back_arm.map_or(true, |top| top == anchors.body);
        if index == anchors.body && arm_over_body && !body_pieces_placed {
            body_pieces(&mut items);
            body_pieces_placed = true;
        }
    }

    if pass != SlotPass::Behind {
        items.extend(piece(ClothingSet::HAT, anchor_local(anchors.head)));
    }

    LayerPlan {
        items,
        holding,
        placement,
        head: anchors.head,
    }
}
