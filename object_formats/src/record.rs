use serde::Serialize;

use crate::flags::DescriptionFlags;
use crate::sound::SoundUsage;

/// Default upper pickup age, meaning "no limit".
pub const UNLIMITED_PICKUP_AGE: i32 = 9_999_999;

/// Smallest allowed container time stretch.
pub const MIN_SLOT_TIME_STRETCH: f32 = 0.0001;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Default for Rgb {
    fn default() -> Self {
        Self {
            r: 1.0,
            g: 1.0,
            b: 1.0,
        }
    }
}

/// How a held object attaches to the person holding it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum HoldStyle {
    /// Held relative to the body.
    #[default]
    Body,
    /// Small objects held relative to the front hand.
    Hand,
    /// Ridden objects, positioned relative to the ground under the body.
    Ridden,
}

impl HoldStyle {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => HoldStyle::Hand,
            2 => HoldStyle::Ridden,
            _ => HoldStyle::Body,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            HoldStyle::Body => 0,
            HoldStyle::Hand => 1,
            HoldStyle::Ridden => 2,
        }
    }
}

/// Wearable slot an object occupies, if any.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Clothing {
    #[default]
    None,
    Shoe,
    Tunic,
    Hat,
    Bottom,
    Backpack,
}

impl Clothing {
    pub fn from_char(c: char) -> Self {
        match c {
            's' => Clothing::Shoe,
            't' => Clothing::Tunic,
            'h' => Clothing::Hat,
            'b' => Clothing::Bottom,
            'p' => Clothing::Backpack,
            _ => Clothing::None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Clothing::None => 'n',
            Clothing::Shoe => 's',
            Clothing::Tunic => 't',
            Clothing::Hat => 'h',
            Clothing::Bottom => 'b',
            Clothing::Backpack => 'p',
        }
    }

    pub fn is_wearable(self) -> bool {
        self != Clothing::None
    }
}

/// How contained objects are aligned inside a slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum SlotStyle {
    /// Centered on the widest sprite.
    #[default]
    Box,
    /// Bottom aligned with the slot.
    Table,
    /// Raw on-ground placement.
    Ground,
}

impl SlotStyle {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => SlotStyle::Table,
            2 => SlotStyle::Ground,
            _ => SlotStyle::Box,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            SlotStyle::Box => 0,
            SlotStyle::Table => 1,
            SlotStyle::Ground => 2,
        }
    }
}

/// Visibility of a clothing sprite depending on whether it is worn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum WornVisibility {
    #[default]
    Always,
    HiddenWhenWorn,
    HiddenWhenUnworn,
}

impl WornVisibility {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => WornVisibility::HiddenWhenWorn,
            2 => WornVisibility::HiddenWhenUnworn,
            _ => WornVisibility::Always,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            WornVisibility::Always => 0,
            WornVisibility::HiddenWhenWorn => 1,
            WornVisibility::HiddenWhenUnworn => 2,
        }
    }

    pub fn hides(self, worn: bool) -> bool {
        match self {
            WornVisibility::Always => false,
            WornVisibility::HiddenWhenWorn => worn,
            WornVisibility::HiddenWhenUnworn => !worn,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Slot {
    pub pos: Vec2,
    pub vertical: bool,
    /// Sprite index this slot follows, -1 for none.
    pub parent: i32,
}

/// One positioned bitmap inside an object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpriteLayer {
    pub sprite: i32,
    pub pos: Vec2,
    pub rot: f64,
    pub h_flip: bool,
    pub color: Rgb,
    /// Age window `[age_start, age_end)`; both -1 means always visible.
    pub age_start: f64,
    pub age_end: f64,
    /// Index of the motion parent layer, -1 for a root layer.
    pub parent: i32,
    /// Marks hand layers of a person.
    pub invis_holding: bool,
    pub invis_worn: WornVisibility,
    pub behind_slots: bool,
    pub invis_contained: bool,
    pub ignored_in_center: bool,

    pub is_head: bool,
    pub is_body: bool,
    pub is_back_foot: bool,
    pub is_front_foot: bool,
    /// Derived from sprite tags for person objects.
    pub is_eyes: bool,
    pub is_mouth: bool,
    pub behind_player: bool,
    pub additive_blend: bool,
    pub use_vanish: bool,
    pub use_appear: bool,

    /// Runtime-only visibility toggle used by use dummies.
    #[serde(skip)]
    pub skip_drawing: bool,
}

impl Default for SpriteLayer {
    fn default() -> Self {
        Self {
            sprite: 0,
            pos: Vec2::ZERO,
            rot: 0.0,
            h_flip: false,
            color: Rgb::default(),
            age_start: -1.0,
            age_end: -1.0,
            parent: -1,
            invis_holding: false,
            invis_worn: WornVisibility::Always,
            behind_slots: false,
            invis_contained: false,
            ignored_in_center: false,
            is_head: false,
            is_body: false,
            is_back_foot: false,
            is_front_foot: false,
            is_eyes: false,
            is_mouth: false,
            behind_player: false,
            additive_blend: false,
            use_vanish: false,
            use_appear: false,
            skip_drawing: false,
        }
    }
}

impl SpriteLayer {
    pub fn visible_at_age(&self, age: f64) -> bool {
        if self.age_start != -1.0 || self.age_end != -1.0 {
            age >= self.age_start && age < self.age_end
        } else {
            true
        }
    }
}

/// Relations filled in after the whole population is loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordLinks {
    /// Index into the global trigger table, -1 when unset.
    pub global_trigger_index: i32,
    pub horizontal_id: i32,
    pub vertical_id: i32,
    pub corner_id: i32,

    pub use_dummy_ids: Vec<i32>,
    pub is_use_dummy: bool,
    pub use_dummy_parent: i32,
    pub use_dummy_index: i32,

    pub variable_dummy_ids: Vec<i32>,
    pub is_variable_dummy: bool,
    pub variable_dummy_parent: i32,
    pub variable_dummy_index: i32,
    pub variable_hidden: bool,
}

impl Default for RecordLinks {
    fn default() -> Self {
        Self {
            global_trigger_index: -1,
            horizontal_id: -1,
            vertical_id: -1,
            corner_id: -1,
            use_dummy_ids: Vec::new(),
            is_use_dummy: false,
            use_dummy_parent: 0,
            use_dummy_index: -1,
            variable_dummy_ids: Vec::new(),
            is_variable_dummy: false,
            variable_dummy_parent: 0,
            variable_dummy_index: -1,
            variable_hidden: false,
        }
    }
}

impl RecordLinks {
    pub fn is_dummy(&self) -> bool {
        self.is_use_dummy || self.is_variable_dummy
    }
}

/// Complete definition of one object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectRecord {
    pub id: i32,
    pub description: String,
    /// Tags parsed from `description`.
    pub flags: DescriptionFlags,
    /// Description text before a `$N` template was rewritten to `- ?`.
    #[serde(skip)]
    pub template_description: Option<String>,

    pub containable: bool,
    pub contain_size: f32,
    pub vert_slot_rot: f64,
    pub permanent: bool,
    pub min_pickup_age: i32,
    pub max_pickup_age: i32,
    pub no_flip: bool,
    pub side_access: bool,
    pub hold: HoldStyle,
    /// Animation type index used while ridden, -1 for default.
    pub riding_animation: i32,

    pub blocks_walking: bool,
    pub left_blocking_radius: i32,
    pub right_blocking_radius: i32,
    pub draw_behind_player: bool,
    pub block_modifier: bool,

    pub map_chance: f32,
    pub biomes: Vec<i32>,
    pub heat_value: i32,
    pub r_value: f32,

    /// Race number, 0 when not a person.
    pub race: i32,
    pub person_no_spawn: bool,
    pub male: bool,
    pub death_marker: bool,
    pub home_marker: bool,
    pub tapout_trigger: bool,

    pub floor: bool,
    pub no_cover: bool,
    pub floor_hugging: bool,
    pub wall_layer: bool,
    pub front_wall: bool,

    pub food_value: i32,
    pub bonus_value: i32,
    pub speed_mult: f32,
    pub contain_offset_x: i32,
    pub contain_offset_y: i32,
    pub held_offset: Vec2,
    pub clothing: Clothing,
    pub clothing_offset: Vec2,
    pub deadly_distance: i32,
    pub use_distance: i32,

    pub creation_sound: SoundUsage,
    pub using_sound: SoundUsage,
    pub eating_sound: SoundUsage,
    pub decay_sound: SoundUsage,
    pub creation_sound_initial_only: bool,
    pub creation_sound_force: bool,

    pub slots: Vec<Slot>,
    pub slot_size: f32,
    pub slot_style: SlotStyle,
    pub slot_time_stretch: f32,
    pub slots_locked: bool,
    pub slots_no_swap: bool,

    pub sprites: Vec<SpriteLayer>,
    /// Offset of the eyes from the head in the main segment of life.
    pub main_eyes_offset: Vec2,

    pub num_uses: i32,
    pub use_chance: f32,
    /// Memoized pixel height, -1 when not yet computed.
    pub cached_height: i32,

    pub links: RecordLinks,
}

impl Default for ObjectRecord {
    fn default() -> Self {
        Self {
            id: 0,
            description: String::new(),
            flags: DescriptionFlags::parse(""),
            template_description: None,
            containable: false,
            contain_size: 1.0,
            vert_slot_rot: 0.0,
            permanent: false,
            min_pickup_age: 3,
            max_pickup_age: UNLIMITED_PICKUP_AGE,
            no_flip: false,
            side_access: false,
            hold: HoldStyle::Body,
            riding_animation: -1,
            blocks_walking: false,
            left_blocking_radius: 0,
            right_blocking_radius: 0,
            draw_behind_player: false,
            block_modifier: false,
            map_chance: 0.0,
            biomes: vec![0],
            heat_value: 0,
            r_value: 0.0,
            race: 0,
            person_no_spawn: false,
            male: false,
            death_marker: false,
            home_marker: false,
            tapout_trigger: false,
            floor: false,
            no_cover: false,
            floor_hugging: false,
            wall_layer: false,
            front_wall: false,
            food_value: 0,
            bonus_value: 0,
            speed_mult: 1.0,
            contain_offset_x: 0,
            contain_offset_y: 0,
            held_offset: Vec2::ZERO,
            clothing: Clothing::None,
            clothing_offset: Vec2::ZERO,
            deadly_distance: 0,
            use_distance: 1,
            creation_sound: SoundUsage::blank(),
            using_sound: SoundUsage::blank(),
            eating_sound: SoundUsage::blank(),
            decay_sound: SoundUsage::blank(),
            creation_sound_initial_only: false,
            creation_sound_force: false,
            slots: Vec::new(),
            slot_size: 1.0,
            slot_style: SlotStyle::Box,
            slot_time_stretch: 1.0,
            slots_locked: false,
            slots_no_swap: false,
            sprites: Vec::new(),
            main_eyes_offset: Vec2::ZERO,
            num_uses: 1,
            use_chance: 1.0,
            cached_height: -1,
            links: RecordLinks::default(),
        }
    }
}

impl ObjectRecord {
    pub fn is_person(&self) -> bool {
        self.race > 0
    }

    pub fn held_in_hand(&self) -> bool {
        self.hold == HoldStyle::Hand
    }

    pub fn rideable(&self) -> bool {
        self.hold == HoldStyle::Ridden
    }

    pub fn is_wide(&self) -> bool {
        self.left_blocking_radius > 0 || self.right_blocking_radius > 0
    }

    pub fn blocks_moving(&self) -> bool {
        self.blocks_walking || self.flags.blocks_moving
    }

    pub fn is_food(&self) -> bool {
        self.food_value > 0 || self.bonus_value > 0
    }

    pub fn num_slots(&self) -> usize {
        self.slots.len()
    }

    pub fn any_sprites_behind_player(&self) -> bool {
        self.sprites.iter().any(|layer| layer.behind_player)
    }

    pub fn can_pickup(&self, age: f64) -> bool {
        age >= self.min_pickup_age as f64 && age <= self.max_pickup_age as f64
    }

    /// Replaces the description and re-derives every tag-driven attribute.
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
        self.flags = DescriptionFlags::parse(&self.description);
        self.wall_layer = self.wall_layer || self.floor_hugging || self.flags.wall;
        if self.wall_layer && self.flags.front_wall {
            self.front_wall = true;
        }
    }

    /// Biomes as a comma separated list, the form used in `mapChance=` lines.
    pub fn biomes_string(&self) -> String {
        self.biomes
            .iter()
            .map(i32::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn sounds(&self) -> [&SoundUsage; 4] {
        [
            &self.creation_sound,
            &self.using_sound,
            &self.eating_sound,
            &self.decay_sound,
        ]
    }

    /// Walks the parent chain of `child` looking for `ancestor`.
    pub fn sprite_has_ancestor(&self, child: usize, ancestor: usize) -> bool {
        let mut next = self.sprites.get(child).map(|layer| layer.parent).unwrap_or(-1);
        let mut steps = 0;
        while next != -1 && steps <= self.sprites.len() {
            if next as usize == ancestor {
                return true;
            }
            next = self
                .sprites
                .get(next as usize)
                .map(|layer| layer.parent)
                .unwrap_or(-1);
            steps += 1;
        }
        false
    }
}
