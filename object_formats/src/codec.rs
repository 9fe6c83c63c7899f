//! Text codec for object definition files.
//!
//! An object file is an ordered list of `key=value` lines. Lines added in
//! later format revisions are optional: the decoder checks whether the
//! expected key appears in the current line and, if not, keeps the default
//! and tries the same line against the next field. Scalar fields that fail
//! to scan keep their defaults instead of failing the whole record.

use thiserror::Error;

use crate::flags::DescriptionFlags;
use crate::record::{
    Clothing, HoldStyle, MIN_SLOT_TIME_STRETCH, ObjectRecord, Rgb, Slot, SlotStyle, SpriteLayer,
    UNLIMITED_PICKUP_AGE, Vec2, WornVisibility,
};
use crate::scan::Scan;
use crate::sound::SoundUsage;
use crate::sparse::{decode_sparse, encode_sparse};
use crate::tapout::TapoutRecord;

/// Files shorter than this are not object definitions.
pub const MIN_OBJECT_LINES: usize = 14;

/// Lines every sprite layer occupies at minimum.
const LINES_PER_SPRITE: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("object text has {found} lines, at least {MIN_OBJECT_LINES} required")]
    TooShort { found: usize },
    #[error("{field} count {count} exceeds the {remaining} remaining lines")]
    CountOverflow {
        field: &'static str,
        count: i32,
        remaining: usize,
    },
}

/// A decoded record plus the side-table entry its file carried.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedObject {
    pub record: ObjectRecord,
    /// Present when the file has an enabled `tapoutTrigger=` line.
    pub tapout: Option<TapoutRecord>,
}

struct LineCursor<'a> {
    lines: Vec<&'a str>,
    next: usize,
}

impl<'a> LineCursor<'a> {
    fn new(text: &'a str) -> Self {
        let lines = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect();
        Self { lines, next: 0 }
    }

    fn len(&self) -> usize {
        self.lines.len()
    }

    fn has_more(&self) -> bool {
        self.next < self.lines.len()
    }

    fn remaining(&self) -> usize {
        self.lines.len().saturating_sub(self.next)
    }

    fn peek(&self) -> &'a str {
        self.lines.get(self.next).copied().unwrap_or("")
    }

    fn take(&mut self) -> &'a str {
        let line = self.peek();
        self.next += 1;
        line
    }

    /// Takes the current line only if it carries `key`.
    fn take_if(&mut self, key: &str) -> Option<&'a str> {
        if self.peek().contains(key) {
            Some(self.take())
        } else {
            None
        }
    }
}

fn read_int(line: &str, key: &str) -> Option<i32> {
    Scan::new(line).key_int(key)
}

fn read_bool(line: &str, key: &str) -> Option<bool> {
    read_int(line, key).map(|value| value != 0)
}

fn read_float(line: &str, key: &str) -> Option<f64> {
    Scan::new(line).key_float(key)
}

fn read_pair(line: &str, key: &str) -> (Option<f64>, Option<f64>) {
    let mut scan = Scan::new(line);
    let Some(x) = scan.key_float(key) else {
        return (None, None);
    };
    (Some(x), scan.key_float(","))
}

fn checked_count(
    field: &'static str,
    count: i32,
    lines_each: usize,
    cursor: &LineCursor<'_>,
) -> Result<usize, DecodeError> {
    if count <= 0 {
        return Ok(0);
    }
    let needed = count as usize * lines_each;
    if needed > cursor.remaining() {
        return Err(DecodeError::CountOverflow {
            field,
            count,
            remaining: cursor.remaining(),
        });
    }
    Ok(count as usize)
}

/// File name an object with `id` is stored under.
pub fn object_file_name(id: i32) -> String {
    format!("{id}.txt")
}

/// Decodes one object file.
pub fn decode(text: &str) -> Result<DecodedObject, DecodeError> {
    let mut cursor = LineCursor::new(text);
    if cursor.len() < MIN_OBJECT_LINES {
        return Err(DecodeError::TooShort { found: cursor.len() });
    }

    let mut r = ObjectRecord::default();

    if let Some(id) = read_int(cursor.take(), "id=") {
        r.id = id;
    }
    r.description = cursor.take().to_string();
    r.flags = DescriptionFlags::parse(&r.description);

    r.containable = read_bool(cursor.take(), "containable=").unwrap_or(false);

    {
        let mut scan = Scan::new(cursor.take());
        if let Some(size) = scan.key_float("containSize=") {
            r.contain_size = size as f32;
            if let Some(rot) = scan.key_float(",vertSlotRot=") {
                r.vert_slot_rot = rot;
            }
        }
    }

    {
        let mut scan = Scan::new(cursor.take());
        if let Some(permanent) = scan.key_int("permanent=") {
            r.permanent = permanent != 0;
            if let Some(min_age) = scan.key_int(",minPickupAge=") {
                r.min_pickup_age = min_age;
                if let Some(max_age) = scan.key_int(",") {
                    r.max_pickup_age = max_age;
                }
            }
        }
    }

    if let Some(line) = cursor.take_if("noFlip=") {
        r.no_flip = read_bool(line, "noFlip=").unwrap_or(false);
    }
    if let Some(line) = cursor.take_if("sideAccess=") {
        r.side_access = read_bool(line, "sideAccess=").unwrap_or(false);
    }

    r.hold = HoldStyle::from_code(read_int(cursor.take(), "heldInHand=").unwrap_or(0));

    if let Some(line) = cursor.take_if("ridingAnimationIndex=") {
        r.riding_animation = read_int(line, "ridingAnimationIndex=").unwrap_or(-1);
    }

    {
        let mut scan = Scan::new(cursor.take());
        if let Some(blocks) = scan.key_int("blocksWalking=") {
            r.blocks_walking = blocks != 0;
            if let Some(left) = scan.key_int(",leftBlockingRadius=") {
                r.left_blocking_radius = left;
                if let Some(right) = scan.key_int(",rightBlockingRadius=") {
                    r.right_blocking_radius = right;
                    if let Some(behind) = scan.key_int(",drawBehindPlayer=") {
                        r.draw_behind_player = behind != 0;
                    }
                }
            }
        }
    }

    if let Some(line) = cursor.take_if("blockModifier=") {
        r.block_modifier = read_bool(line, "blockModifier=").unwrap_or(false);
    }

    {
        let line = cursor.take();
        let mut scan = Scan::new(line);
        let chance = scan.key_float("mapChance=");
        let biomes = scan.lit("#biomes_").and_then(|_| scan.word(199));
        match (chance, biomes) {
            (Some(chance), Some(biomes)) => {
                r.map_chance = chance as f32;
                r.biomes = parse_biomes(biomes);
            }
            _ => {
                // pre-biome files: every object lives in biome 0
                r.map_chance = read_float(line, "mapChance=").unwrap_or(0.0) as f32;
                r.biomes = vec![0];
            }
        }
    }

    r.heat_value = read_int(cursor.take(), "heatValue=").unwrap_or(0);
    r.r_value = read_float(cursor.take(), "rValue=").unwrap_or(0.0) as f32;

    {
        let mut scan = Scan::new(cursor.take());
        if let Some(person) = scan.key_int("person=") {
            r.race = person;
            if let Some(no_spawn) = scan.key_int(",noSpawn=") {
                r.person_no_spawn = no_spawn != 0;
            }
        }
    }

    r.male = read_bool(cursor.take(), "male=").unwrap_or(false);
    r.death_marker = read_bool(cursor.take(), "deathMarker=").unwrap_or(false);

    if let Some(line) = cursor.take_if("homeMarker=") {
        r.home_marker = read_bool(line, "homeMarker=").unwrap_or(false);
    }

    let mut tapout = None;
    if let Some(line) = cursor.take_if("tapoutTrigger=") {
        tapout = TapoutRecord::from_file_line(r.id, line);
        r.tapout_trigger = tapout.is_some();
    }

    if let Some(line) = cursor.take_if("floor=") {
        r.floor = read_bool(line, "floor=").unwrap_or(false);
    }
    if let Some(line) = cursor.take_if("partialFloor=") {
        r.no_cover = read_bool(line, "partialFloor=").unwrap_or(false);
    }
    if let Some(line) = cursor.take_if("floorHugging=") {
        r.floor_hugging = read_bool(line, "floorHugging=").unwrap_or(false);
    }
    if let Some(line) = cursor.take_if("wallLayer=") {
        r.wall_layer = read_bool(line, "wallLayer=").unwrap_or(false);
    }
    if let Some(line) = cursor.take_if("frontWall=") {
        r.front_wall = read_bool(line, "frontWall=").unwrap_or(false);
    }
    r.wall_layer = r.wall_layer || r.floor_hugging || r.flags.wall;
    if r.wall_layer && r.flags.front_wall {
        r.front_wall = true;
    }

    {
        let mut scan = Scan::new(cursor.take());
        if let Some(food) = scan.key_int("foodValue=") {
            r.food_value = food;
            if let Some(bonus) = scan.key_int(",") {
                r.bonus_value = bonus;
            }
        }
    }

    if let Some(mult) = read_float(cursor.take(), "speedMult=") {
        r.speed_mult = mult as f32;
    }

    if let Some(line) = cursor.take_if("containOffset=") {
        let mut scan = Scan::new(line);
        if let Some(x) = scan.key_int("containOffset=") {
            r.contain_offset_x = x;
            if let Some(y) = scan.key_int(",") {
                r.contain_offset_y = y;
            }
        }
    }

    if let (Some(x), y) = read_pair(cursor.take(), "heldOffset=") {
        r.held_offset = Vec2::new(x, y.unwrap_or(0.0));
    }

    {
        let mut scan = Scan::new(cursor.take());
        if scan.lit("clothing=").is_some() {
            if let Some(c) = scan.any_char() {
                r.clothing = Clothing::from_char(c);
            }
        }
    }

    if let (Some(x), y) = read_pair(cursor.take(), "clothingOffset=") {
        r.clothing_offset = Vec2::new(x, y.unwrap_or(0.0));
    }

    r.deadly_distance = read_int(cursor.take(), "deadlyDistance=").unwrap_or(0);

    if let Some(line) = cursor.take_if("useDistance=") {
        r.use_distance = read_int(line, "useDistance=").unwrap_or(1);
    }

    if let Some(line) = cursor.take_if("sounds=") {
        let list = line
            .find("sounds=")
            .map(|pos| &line[pos + "sounds=".len()..])
            .unwrap_or("");
        let parts: Vec<&str> = list.split(',').collect();
        if parts.len() == 4 {
            r.creation_sound = SoundUsage::parse(parts[0]);
            r.using_sound = SoundUsage::parse(parts[1]);
            r.eating_sound = SoundUsage::parse(parts[2]);
            r.decay_sound = SoundUsage::parse(parts[3]);
        }
    }

    if let Some(line) = cursor.take_if("creationSoundInitialOnly=") {
        r.creation_sound_initial_only =
            read_bool(line, "creationSoundInitialOnly=").unwrap_or(false);
    }
    if let Some(line) = cursor.take_if("creationSoundForce=") {
        r.creation_sound_force = read_bool(line, "creationSoundForce=").unwrap_or(false);
    }

    let mut num_slots = 0;
    {
        let mut scan = Scan::new(cursor.take());
        if let Some(count) = scan.key_int("numSlots=") {
            num_slots = count;
            if let Some(stretch) = scan.key_float("#timeStretch=") {
                r.slot_time_stretch = stretch as f32;
            }
        }
    }
    if r.slot_time_stretch < MIN_SLOT_TIME_STRETCH {
        r.slot_time_stretch = MIN_SLOT_TIME_STRETCH;
    }

    if let Some(size) = read_float(cursor.take(), "slotSize=") {
        r.slot_size = size as f32;
    }
    if let Some(line) = cursor.take_if("slotStyle=") {
        r.slot_style = SlotStyle::from_code(read_int(line, "slotStyle=").unwrap_or(0));
    }
    if let Some(line) = cursor.take_if("slotsLocked=") {
        r.slots_locked = read_bool(line, "slotsLocked=").unwrap_or(false);
    }
    if let Some(line) = cursor.take_if("slotsNoSwap=") {
        r.slots_no_swap = read_bool(line, "slotsNoSwap=").unwrap_or(false);
    }

    let num_slots = checked_count("numSlots", num_slots, 1, &cursor)?;
    r.slots = (0..num_slots).map(|_| decode_slot(cursor.take())).collect();

    let num_sprites = read_int(cursor.take(), "numSprites=").unwrap_or(0);
    let num_sprites = checked_count("numSprites", num_sprites, LINES_PER_SPRITE, &cursor)?;

    let mut sprites = Vec::with_capacity(num_sprites);
    for _ in 0..num_sprites {
        sprites.push(decode_sprite(&mut cursor));
    }

    if let Some(line) = cursor.take_if("spritesDrawnBehind=") {
        let flags = decode_sparse("spritesDrawnBehind", line, num_sprites);
        for (layer, set) in sprites.iter_mut().zip(flags) {
            layer.behind_player = set;
        }
    }
    if let Some(line) = cursor.take_if("spritesAdditiveBlend=") {
        let flags = decode_sparse("spritesAdditiveBlend", line, num_sprites);
        for (layer, set) in sprites.iter_mut().zip(flags) {
            layer.additive_blend = set;
        }
    }

    let heads = decode_sparse("headIndex", cursor.take(), num_sprites);
    let bodies = decode_sparse("bodyIndex", cursor.take(), num_sprites);
    let back_feet = decode_sparse("backFootIndex", cursor.take(), num_sprites);
    let front_feet = decode_sparse("frontFootIndex", cursor.take(), num_sprites);
    for (i, layer) in sprites.iter_mut().enumerate() {
        layer.is_head = heads[i];
        layer.is_body = bodies[i];
        layer.is_back_foot = back_feet[i];
        layer.is_front_foot = front_feet[i];
    }

    if cursor.has_more() {
        let mut scan = Scan::new(cursor.take());
        if let Some(uses) = scan.key_int("numUses=") {
            r.num_uses = uses;
            if let Some(chance) = scan.key_float(",") {
                r.use_chance = chance as f32;
            }
        }

        if cursor.has_more() {
            let vanish = decode_sparse("useVanishIndex", cursor.take(), num_sprites);
            for (layer, set) in sprites.iter_mut().zip(vanish) {
                layer.use_vanish = set;
            }

            if cursor.has_more() {
                let appear = decode_sparse("useAppearIndex", cursor.take(), num_sprites);
                for (layer, set) in sprites.iter_mut().zip(appear) {
                    layer.use_appear = set;
                }
            }
        }
    }

    if cursor.has_more() {
        if let Some(height) = read_int(cursor.take(), "pixHeight=") {
            r.cached_height = height;
        }
    }

    sanitize_sprite_parents(r.id, &mut sprites);
    r.sprites = sprites;

    Ok(DecodedObject { record: r, tapout })
}

fn parse_biomes(list: &str) -> Vec<i32> {
    list.split(',')
        .map(|part| Scan::new(part).int().unwrap_or(0))
        .collect()
}

fn decode_slot(line: &str) -> Slot {
    let mut slot = Slot {
        parent: -1,
        ..Slot::default()
    };
    let mut scan = Scan::new(line);
    let Some(x) = scan.key_float("slotPos=") else {
        return slot;
    };
    slot.pos.x = x;
    let Some(y) = scan.key_float(",") else {
        return slot;
    };
    slot.pos.y = y;
    let Some(vertical) = scan.key_int(",vert=") else {
        return slot;
    };
    slot.vertical = vertical != 0;
    if let Some(parent) = scan.key_int(",parent=") {
        slot.parent = parent;
    }
    slot
}

fn decode_sprite(cursor: &mut LineCursor<'_>) -> SpriteLayer {
    let mut layer = SpriteLayer::default();

    if let Some(id) = read_int(cursor.take(), "spriteID=") {
        layer.sprite = id;
    }
    if let (Some(x), y) = read_pair(cursor.take(), "pos=") {
        layer.pos = Vec2::new(x, y.unwrap_or(0.0));
    }
    if let Some(rot) = read_float(cursor.take(), "rot=") {
        layer.rot = rot;
    }
    layer.h_flip = read_bool(cursor.take(), "hFlip=").unwrap_or(false);

    {
        let mut scan = Scan::new(cursor.take());
        if let Some(r) = scan.key_float("color=") {
            let g = scan.key_float(",");
            let b = g.and_then(|_| scan.key_float(","));
            layer.color = Rgb {
                r: r as f32,
                g: g.unwrap_or(1.0) as f32,
                b: b.unwrap_or(1.0) as f32,
            };
        }
    }

    if let (Some(start), end) = read_pair(cursor.take(), "ageRange=") {
        layer.age_start = start;
        layer.age_end = end.unwrap_or(-1.0);
    }

    if let Some(parent) = read_int(cursor.take(), "parent=") {
        layer.parent = parent;
    }

    {
        let mut scan = Scan::new(cursor.take());
        if let Some(holding) = scan.key_int("invisHolding=") {
            layer.invis_holding = holding != 0;
            if let Some(worn) = scan.key_int(",invisWorn=") {
                layer.invis_worn = WornVisibility::from_code(worn);
                if let Some(behind) = scan.key_int(",behindSlots=") {
                    layer.behind_slots = behind != 0;
                }
            }
        }
    }

    if let Some(line) = cursor.take_if("invisCont=") {
        layer.invis_contained = read_bool(line, "invisCont=").unwrap_or(false);
    }
    if let Some(line) = cursor.take_if("ignoredCont=") {
        layer.ignored_in_center = read_bool(line, "ignoredCont=").unwrap_or(false);
    }

    layer
}

/// Detaches sprites whose parent index is out of range or whose parent
/// chain loops back on itself.
fn sanitize_sprite_parents(id: i32, sprites: &mut [SpriteLayer]) {
    let count = sprites.len();
    for layer in sprites.iter_mut() {
        if layer.parent < -1 || layer.parent >= count as i32 {
            log::warn!(
                "object {id}: sprite parent {} out of range, detaching",
                layer.parent
            );
            layer.parent = -1;
        }
    }

    for i in 0..count {
        let mut next = sprites[i].parent;
        let mut steps = 0;
        while next != -1 && steps <= count {
            if next as usize == i {
                log::warn!("object {id}: sprite {i} parent chain cycles, detaching");
                sprites[i].parent = -1;
                break;
            }
            next = sprites[next as usize].parent;
            steps += 1;
        }
    }
}

/// Encodes `record` in the current file format.
///
/// `tapout` is the side-table entry for the record, written only when the
/// record is flagged as a tapout trigger.
pub fn encode(record: &ObjectRecord, tapout: Option<&TapoutRecord>) -> String {
    let r = record;
    let mut lines: Vec<String> = Vec::with_capacity(64 + r.sprites.len() * 10);

    lines.push(format!("id={}", r.id));
    lines.push(r.description.clone());
    lines.push(format!("containable={}", r.containable as i32));
    lines.push(format!(
        "containSize={:.6},vertSlotRot={:.6}",
        r.contain_size, r.vert_slot_rot
    ));
    if r.max_pickup_age != UNLIMITED_PICKUP_AGE {
        lines.push(format!(
            "permanent={},minPickupAge={},{}",
            r.permanent as i32, r.min_pickup_age, r.max_pickup_age
        ));
    } else {
        lines.push(format!(
            "permanent={},minPickupAge={}",
            r.permanent as i32, r.min_pickup_age
        ));
    }
    lines.push(format!("noFlip={}", r.no_flip as i32));
    lines.push(format!("sideAccess={}", r.side_access as i32));
    lines.push(format!("heldInHand={}", r.hold.code()));
    if r.riding_animation > -1 {
        lines.push(format!("ridingAnimationIndex={}", r.riding_animation));
    }
    lines.push(format!(
        "blocksWalking={},leftBlockingRadius={},rightBlockingRadius={},drawBehindPlayer={}",
        r.blocks_walking as i32,
        r.left_blocking_radius,
        r.right_blocking_radius,
        r.draw_behind_player as i32
    ));
    lines.push(format!("blockModifier={}", r.block_modifier as i32));
    lines.push(format!(
        "mapChance={:.6}#biomes_{}",
        r.map_chance,
        r.biomes_string()
    ));
    lines.push(format!("heatValue={}", r.heat_value));
    lines.push(format!("rValue={:.6}", r.r_value));
    let person_number = if r.is_person() { r.race } else { 0 };
    lines.push(format!(
        "person={},noSpawn={}",
        person_number, r.person_no_spawn as i32
    ));
    lines.push(format!("male={}", r.male as i32));
    lines.push(format!("deathMarker={}", r.death_marker as i32));
    lines.push(format!("homeMarker={}", r.home_marker as i32));
    if r.tapout_trigger {
        if let Some(parameters) = tapout.and_then(TapoutRecord::parameter_string) {
            lines.push(format!("tapoutTrigger=1#{parameters}"));
        }
    }
    lines.push(format!("floor={}", r.floor as i32));
    if r.no_cover {
        lines.push("partialFloor=1".to_string());
    }
    lines.push(format!("floorHugging={}", r.floor_hugging as i32));
    if r.wall_layer {
        lines.push("wallLayer=1".to_string());
    }
    if r.front_wall {
        lines.push("frontWall=1".to_string());
    }
    if r.bonus_value > 0 {
        lines.push(format!("foodValue={},{}", r.food_value, r.bonus_value));
    } else {
        lines.push(format!("foodValue={}", r.food_value));
    }
    lines.push(format!("speedMult={:.6}", r.speed_mult));
    if r.contain_offset_x != 0 || r.contain_offset_y != 0 {
        lines.push(format!(
            "containOffset={},{}",
            r.contain_offset_x, r.contain_offset_y
        ));
    }
    lines.push(format!(
        "heldOffset={:.6},{:.6}",
        r.held_offset.x, r.held_offset.y
    ));
    lines.push(format!("clothing={}", r.clothing.as_char()));
    lines.push(format!(
        "clothingOffset={:.6},{:.6}",
        r.clothing_offset.x, r.clothing_offset.y
    ));
    lines.push(format!("deadlyDistance={}", r.deadly_distance));
    lines.push(format!("useDistance={}", r.use_distance));
    lines.push(format!(
        "sounds={},{},{},{}",
        r.creation_sound.describe(),
        r.using_sound.describe(),
        r.eating_sound.describe(),
        r.decay_sound.describe()
    ));
    lines.push(format!(
        "creationSoundInitialOnly={}",
        r.creation_sound_initial_only as i32
    ));
    lines.push(format!(
        "creationSoundForce={}",
        r.creation_sound_force as i32
    ));
    lines.push(format!(
        "numSlots={}#timeStretch={:.6}",
        r.slots.len(),
        r.slot_time_stretch
    ));
    lines.push(format!("slotSize={:.6}", r.slot_size));
    if r.slot_style != SlotStyle::Box {
        lines.push(format!("slotStyle={}", r.slot_style.code()));
    }
    lines.push(format!("slotsLocked={}", r.slots_locked as i32));
    if r.slots_no_swap {
        lines.push("slotsNoSwap=1".to_string());
    }
    for slot in &r.slots {
        lines.push(format!(
            "slotPos={:.6},{:.6},vert={},parent={}",
            slot.pos.x, slot.pos.y, slot.vertical as i32, slot.parent
        ));
    }

    lines.push(format!("numSprites={}", r.sprites.len()));
    for layer in &r.sprites {
        lines.push(format!("spriteID={}", layer.sprite));
        lines.push(format!("pos={:.6},{:.6}", layer.pos.x, layer.pos.y));
        lines.push(format!("rot={:.6}", layer.rot));
        lines.push(format!("hFlip={}", layer.h_flip as i32));
        lines.push(format!(
            "color={:.6},{:.6},{:.6}",
            layer.color.r, layer.color.g, layer.color.b
        ));
        lines.push(format!(
            "ageRange={:.6},{:.6}",
            layer.age_start, layer.age_end
        ));
        lines.push(format!("parent={}", layer.parent));
        lines.push(format!(
            "invisHolding={},invisWorn={},behindSlots={}",
            layer.invis_holding as i32,
            layer.invis_worn.code(),
            layer.behind_slots as i32
        ));
        lines.push(format!("invisCont={}", layer.invis_contained as i32));
        if layer.ignored_in_center {
            lines.push("ignoredCont=1".to_string());
        }
    }

    if r.any_sprites_behind_player() {
        lines.push(encode_sparse(
            "spritesDrawnBehind",
            r.sprites.iter().map(|layer| layer.behind_player),
        ));
    }
    if r.sprites.iter().any(|layer| layer.additive_blend) {
        lines.push(encode_sparse(
            "spritesAdditiveBlend",
            r.sprites.iter().map(|layer| layer.additive_blend),
        ));
    }
    lines.push(encode_sparse(
        "headIndex",
        r.sprites.iter().map(|layer| layer.is_head),
    ));
    lines.push(encode_sparse(
        "bodyIndex",
        r.sprites.iter().map(|layer| layer.is_body),
    ));
    lines.push(encode_sparse(
        "backFootIndex",
        r.sprites.iter().map(|layer| layer.is_back_foot),
    ));
    lines.push(encode_sparse(
        "frontFootIndex",
        r.sprites.iter().map(|layer| layer.is_front_foot),
    ));
    lines.push(format!("numUses={},{:.6}", r.num_uses, r.use_chance));
    lines.push(encode_sparse(
        "useVanishIndex",
        r.sprites.iter().map(|layer| layer.use_vanish),
    ));
    lines.push(encode_sparse(
        "useAppearIndex",
        r.sprites.iter().map(|layer| layer.use_appear),
    ));
    lines.push(format!("pixHeight={}", r.cached_height));

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGACY: &str = "id=12
Basket
containable=1
containSize=1.000000,vertSlotRot=0.000000
permanent=0,minPickupAge=3
heldInHand=1
blocksWalking=0,leftBlockingRadius=0,rightBlockingRadius=0,drawBehindPlayer=0
mapChance=0.250000
heatValue=0
rValue=0.000000
person=0,noSpawn=0
male=0
deathMarker=0
foodValue=0
speedMult=1.000000
heldOffset=2.000000,-4.000000
clothing=n
clothingOffset=0.000000,0.000000
deadlyDistance=0
numSlots=1
slotSize=1.000000
slotPos=0.000000,8.000000,vert=0,parent=-1
numSprites=1
spriteID=55
pos=0.000000,4.000000
rot=0.250000
hFlip=0
color=1.000000,0.500000,0.250000
ageRange=-1.000000,-1.000000
parent=-1
invisHolding=0,invisWorn=0,behindSlots=1
headIndex=-1
bodyIndex=-1
backFootIndex=-1
frontFootIndex=-1";

    #[test]
    fn decodes_legacy_file_with_defaults() {
        let decoded = decode(LEGACY).expect("decoded legacy object");
        let r = &decoded.record;
        assert_eq!(r.id, 12);
        assert_eq!(r.description, "Basket");
        assert!(r.containable);
        assert!(r.held_in_hand());
        assert_eq!(r.max_pickup_age, UNLIMITED_PICKUP_AGE);
        assert_eq!(r.biomes, vec![0]);
        assert!((r.map_chance - 0.25).abs() < 1e-6);
        assert_eq!(r.use_distance, 1);
        assert_eq!(r.slots.len(), 1);
        assert_eq!(r.slots[0].pos, Vec2::new(0.0, 8.0));
        assert_eq!(r.sprites.len(), 1);
        assert!(r.sprites[0].behind_slots);
        assert!(!r.sprites[0].invis_contained);
        assert_eq!(r.num_uses, 1);
        assert_eq!(r.cached_height, -1);
        assert!(decoded.tapout.is_none());
    }

    #[test]
    fn rejects_truncated_input() {
        assert_eq!(
            decode("id=1\nRock\n"),
            Err(DecodeError::TooShort { found: 3 })
        );
    }

    #[test]
    fn rejects_sprite_count_beyond_input() {
        let text = LEGACY.replace("numSprites=1", "numSprites=500");
        assert!(matches!(
            decode(&text),
            Err(DecodeError::CountOverflow {
                field: "numSprites",
                ..
            })
        ));
    }

    #[test]
    fn bad_scalar_keeps_default() {
        let text = LEGACY.replace("heatValue=0", "heatValue=warm");
        let decoded = decode(&text).expect("decoded");
        assert_eq!(decoded.record.heat_value, 0);
        assert_eq!(decoded.record.r_value, 0.0);
    }

    #[test]
    fn round_trip_preserves_semantics() {
        let mut original = decode(LEGACY).expect("decoded").record;
        original.set_description("Berry Bush +tapoutTrigger,0,1,1 *bushRing");
        original.max_pickup_age = 40;
        original.biomes = vec![1, 4];
        original.hold = HoldStyle::Ridden;
        original.riding_animation = 5;
        original.no_cover = true;
        original.bonus_value = 3;
        original.contain_offset_x = -2;
        original.slot_style = SlotStyle::Table;
        original.slots_no_swap = true;
        original.creation_sound = SoundUsage::parse("4:0.500000");
        original.num_uses = 3;
        original.use_chance = 0.5;
        original.cached_height = 42;
        original.tapout_trigger = true;
        original.sprites.push(SpriteLayer {
            sprite: 77,
            parent: 0,
            invis_worn: WornVisibility::HiddenWhenUnworn,
            is_head: true,
            use_vanish: true,
            behind_player: true,
            ignored_in_center: true,
            age_start: 0.0,
            age_end: 30.0,
            ..SpriteLayer::default()
        });

        let tapout = TapoutRecord::from_parameters(original.id, "2,1,2,3,4,9");
        let text = encode(&original, tapout.as_ref());
        let decoded = decode(&text).expect("round trip decode");

        assert_eq!(decoded.record, original);
        assert_eq!(decoded.tapout, tapout);
    }

    #[test]
    fn cyclic_parents_are_detached() {
        let mut record = ObjectRecord::default();
        record.sprites = vec![
            SpriteLayer {
                parent: 1,
                ..SpriteLayer::default()
            },
            SpriteLayer {
                parent: 0,
                ..SpriteLayer::default()
            },
            SpriteLayer {
                parent: 9,
                ..SpriteLayer::default()
            },
        ];
        let decoded = decode(&encode(&record, None)).expect("decoded");
        let parents: Vec<i32> = decoded.record.sprites.iter().map(|s| s.parent).collect();
        assert_eq!(parents, vec![-1, 0, -1]);
    }
}
