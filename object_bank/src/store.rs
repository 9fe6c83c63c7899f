//! The object table and every index derived from it.
//!
//! Records live in a vector addressed directly by id. Each mutation
//! (install, replace, remove) tears the previous record out of every
//! secondary index before the new one goes in, so the person, food, death
//! and non-permanent lists always describe exactly the records present.

use std::collections::BTreeMap;

use object_formats::{
    encode, object_file_name, DecodedObject, MonumentStatus, ObjectRecord, TapoutRecord,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::age::{AgeCurve, StandardAgeCurve};
use crate::animation::AnimationBank;
use crate::config::BankConfig;
use crate::error::BankResult;
use crate::folder::{ObjectFolder, CACHE_FILE, NEXT_NUMBER_FILE, NEXT_NUMBER_OFFSET_FILE};
use crate::geometry::{
    max_diameter, recompute_height, setup_eyes_and_mouth, sprite_subset, SubsetSpriteIndexMap,
};
use crate::races::{insert_sorted, remove_sorted, RaceIndex};
use crate::search::DescriptionIndex;
use crate::sprites::SpriteBank;
use crate::use_vis::UseVisCache;

/// Slots allocated past a new id whenever the table has to grow.
const GROWTH_MARGIN: usize = 100;

/// Biomes with a ground heat file.
pub const MAX_BIOME: i32 = 511;

/// Map ids carry metadata above these bits.
const OBJECT_ID_MASK: i32 = 0x1FFFF;

/// Strips map metadata from an id. Negative ids pass through unchanged.
pub fn extract_object_id(id: i32) -> i32 {
    if id < 0 {
        id
    } else {
        id & OBJECT_ID_MASK
    }
}

/// A group of emitters sharing the state of one meta object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalTrigger {
    pub meta_id: i32,
}

/// One page of search results plus how many matches follow it.
#[derive(Debug, Clone)]
pub struct SearchPage<'a> {
    pub records: Vec<&'a ObjectRecord>,
    pub remaining: usize,
}

impl SearchPage<'_> {
    pub fn ids(&self) -> Vec<i32> {
        self.records.iter().map(|record| record.id).collect()
    }
}

pub struct ObjectStore {
    pub(crate) config: BankConfig,
    pub(crate) folder: Box<dyn ObjectFolder>,
    pub(crate) sprites: Box<dyn SpriteBank>,
    pub(crate) animations: Box<dyn AnimationBank>,
    ages: Box<dyn AgeCurve>,
    rng: StdRng,

    pub(crate) records: Vec<Option<ObjectRecord>>,
    pub(crate) max_id: i32,
    pub(crate) default_id: Option<i32>,

    search: DescriptionIndex,
    races: RaceIndex,
    death_markers: Vec<i32>,
    possible_deaths: Vec<i32>,
    foods: Vec<i32>,
    non_permanent: Vec<i32>,
    monument_calls: Vec<i32>,
    /// Number of records listing each biome.
    biome_counts: BTreeMap<i32, usize>,
    pub(crate) biome_heat: Vec<f32>,
    max_wide_radius: i32,

    pub(crate) tapouts: BTreeMap<i32, TapoutRecord>,
    pub(crate) triggers: Vec<GlobalTrigger>,
    pub(crate) use_vis: UseVisCache,
}

impl ObjectStore {
    pub fn new(
        config: BankConfig,
        folder: Box<dyn ObjectFolder>,
        sprites: Box<dyn SpriteBank>,
        animations: Box<dyn AnimationBank>,
    ) -> Self {
        let rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            folder,
            sprites,
            animations,
            ages: Box::new(StandardAgeCurve::default()),
            rng,
            records: Vec::new(),
            max_id: 0,
            default_id: None,
            search: DescriptionIndex::new(),
            races: RaceIndex::new(),
            death_markers: Vec::new(),
            possible_deaths: Vec::new(),
            foods: Vec::new(),
            non_permanent: Vec::new(),
            monument_calls: Vec::new(),
            biome_counts: BTreeMap::new(),
            biome_heat: vec![0.0; MAX_BIOME as usize + 1],
            max_wide_radius: 0,
            tapouts: BTreeMap::new(),
            triggers: Vec::new(),
            use_vis: UseVisCache::new(),
        }
    }

    pub fn with_age_curve(mut self, ages: Box<dyn AgeCurve>) -> Self {
        self.ages = ages;
        self
    }

    pub fn config(&self) -> &BankConfig {
        &self.config
    }

    pub fn sprites(&self) -> &dyn SpriteBank {
        self.sprites.as_ref()
    }

    pub fn animations(&self) -> &dyn AnimationBank {
        self.animations.as_ref()
    }

    pub fn age_curve(&self) -> &dyn AgeCurve {
        self.ages.as_ref()
    }

    pub fn folder(&self) -> &dyn ObjectFolder {
        self.folder.as_ref()
    }

    /// Number of records present, dummies included.
    pub fn len(&self) -> usize {
        self.records.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.records.iter().all(Option::is_none)
    }

    /// Highest id ever installed.
    pub fn max_id(&self) -> i32 {
        self.max_id
    }

    pub fn default_id(&self) -> Option<i32> {
        self.default_id
    }

    pub fn ids(&self) -> impl Iterator<Item = i32> + '_ {
        self.iter().map(|record| record.id)
    }

    /// Records in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &ObjectRecord> + '_ {
        self.records.iter().flatten()
    }

    fn present(&self, id: i32) -> Option<usize> {
        let index = usize::try_from(id).ok()?;
        self.records
            .get(index)
            .is_some_and(Option::is_some)
            .then_some(index)
    }

    /// Table index for `id`, falling back to the default object.
    fn index_or_default(&self, id: i32) -> Option<usize> {
        self.present(extract_object_id(id))
            .or_else(|| self.default_id.and_then(|fallback| self.present(fallback)))
    }

    /// Looks up `id`, answering with the default object when it is absent.
    pub fn get(&self, id: i32) -> Option<&ObjectRecord> {
        self.index_or_default(id)
            .and_then(|index| self.records[index].as_ref())
    }

    pub fn get_no_default(&self, id: i32) -> Option<&ObjectRecord> {
        self.present(extract_object_id(id))
            .and_then(|index| self.records[index].as_ref())
    }

    pub(crate) fn get_mut(&mut self, id: i32) -> Option<&mut ObjectRecord> {
        let index = self.present(id)?;
        self.records[index].as_mut()
    }

    fn read_counter(&self, name: &str) -> BankResult<Option<i32>> {
        Ok(self
            .folder
            .read_file(name)?
            .and_then(|raw| raw.trim().parse().ok()))
    }

    /// Adds `object` under a fresh id, or under `replace_id` when given.
    ///
    /// With `write` set the object file is written first and the id
    /// counters advance on a fresh add; a failed write leaves the table
    /// untouched. Returns the id the record was installed under.
    pub fn add(
        &mut self,
        object: DecodedObject,
        replace_id: Option<i32>,
        write: bool,
    ) -> BankResult<i32> {
        let DecodedObject { mut record, tapout } = object;
        let replace_id = replace_id.filter(|id| *id >= 0);

        let mut next_number = self.max_id + 1;
        let mut offset = 0;
        if write {
            self.folder.ensure()?;
            next_number = self.read_counter(NEXT_NUMBER_FILE)?.unwrap_or(1);
            if self.config.consider_id_offset {
                offset = self.read_counter(NEXT_NUMBER_OFFSET_FILE)?.unwrap_or(0);
            }
        }

        let id = match replace_id {
            Some(id) => id,
            None if offset > 0 => next_number + offset,
            None => next_number.max(self.max_id + 1),
        };
        record.id = id;

        if record.cached_height == -1 {
            record.cached_height = recompute_height(&record.sprites, self.sprites.as_ref());
        }

        if write {
            let text = match &record.template_description {
                Some(template) => {
                    let mut persisted = record.clone();
                    persisted.description = template.clone();
                    encode(&persisted, tapout.as_ref())
                }
                None => encode(&record, tapout.as_ref()),
            };
            self.folder.remove_file(CACHE_FILE)?;
            self.folder.write_file(&object_file_name(id), &text)?;

            if replace_id.is_none() {
                let advanced = if offset > 0 {
                    self.folder
                        .write_file(NEXT_NUMBER_OFFSET_FILE, &(offset + 1).to_string())
                } else {
                    self.folder
                        .write_file(NEXT_NUMBER_FILE, &(next_number + 1).to_string())
                };
                if let Err(err) = advanced {
                    // the id was never handed out, so its file goes too
                    if let Err(cleanup) = self.folder.remove_file(&object_file_name(id)) {
                        log::warn!("object {id}: stale file left behind: {cleanup}");
                    }
                    return Err(err);
                }
            }
        }

        let searchable = self.config.enable_search && !record.links.is_dummy();
        log::debug!("adding object {id} ({})", record.description);
        Ok(self.install(record, tapout, searchable))
    }

    /// Installs a record under its own id, replacing whatever was there.
    pub(crate) fn install(
        &mut self,
        mut record: ObjectRecord,
        tapout: Option<TapoutRecord>,
        searchable: bool,
    ) -> i32 {
        let id = record.id;
        let Ok(index) = usize::try_from(id) else {
            log::warn!("refusing to install object with negative id {id}");
            return -1;
        };

        setup_eyes_and_mouth(&mut record, self.sprites.as_ref());
        self.free(id);

        if index >= self.records.len() {
            self.records.resize_with(index + GROWTH_MARGIN, || None);
        }
        self.max_id = self.max_id.max(id);

        if record.tapout_trigger {
            if let Some(tapout) = tapout {
                self.tapouts.insert(id, tapout.with_trigger(id));
            }
        }

        self.index(&record, searchable);
        self.records[index] = Some(record);
        id
    }

    fn index(&mut self, record: &ObjectRecord, searchable: bool) {
        let id = record.id;
        if searchable {
            self.search.insert(&record.description, id);
        }
        for biome in &record.biomes {
            *self.biome_counts.entry(*biome).or_default() += 1;
        }
        self.max_wide_radius = self
            .max_wide_radius
            .max(record.left_blocking_radius)
            .max(record.right_blocking_radius);

        if record.links.is_dummy() {
            return;
        }
        if record.is_person() && !record.person_no_spawn {
            self.races.insert(id, record.race, record.male);
        }
        if record.death_marker {
            insert_sorted(&mut self.death_markers, id);
        }
        if record.flags.from_death {
            insert_sorted(&mut self.possible_deaths, id);
        }
        if record.is_food() {
            insert_sorted(&mut self.foods, id);
        }
        if !record.permanent {
            insert_sorted(&mut self.non_permanent, id);
        }
        if record.flags.monument == Some(MonumentStatus::Call) {
            insert_sorted(&mut self.monument_calls, id);
        }
    }

    /// Takes the record out of the table and every index.
    pub(crate) fn free(&mut self, id: i32) -> Option<ObjectRecord> {
        self.tapouts.remove(&id);
        let index = self.present(id)?;
        let old = self.records[index].take()?;

        self.search.remove(&old.description, id);
        for biome in &old.biomes {
            if let Some(count) = self.biome_counts.get_mut(biome) {
                *count -= 1;
                if *count == 0 {
                    self.biome_counts.remove(biome);
                }
            }
        }
        self.races.remove(id);
        remove_sorted(&mut self.death_markers, id);
        remove_sorted(&mut self.possible_deaths, id);
        remove_sorted(&mut self.foods, id);
        remove_sorted(&mut self.non_permanent, id);
        remove_sorted(&mut self.monument_calls, id);
        self.use_vis.forget(id);
        Some(old)
    }

    /// Swaps the description, keeping the search index in step.
    pub(crate) fn redescribe(&mut self, id: i32, description: String) {
        let Some(index) = self.present(id) else {
            return;
        };
        let Some(record) = self.records[index].as_mut() else {
            return;
        };
        let searchable = self.search.remove(&record.description, id);
        record.set_description(description);
        if searchable {
            self.search.insert(&record.description, id);
        }
    }

    /// Deletes the object file and the record. Returns false when `id`
    /// was not present.
    pub fn remove(&mut self, id: i32) -> BankResult<bool> {
        if self.present(id).is_none() {
            return Ok(false);
        }
        if self.folder.is_available() {
            self.folder.remove_file(CACHE_FILE)?;
            self.folder.remove_file(&object_file_name(id))?;
        }
        self.free(id);
        self.animations.clear_animations(id);

        if self.default_id == Some(id) {
            self.default_id = self.find_default();
        }
        log::debug!("removed object {id}");
        Ok(true)
    }

    /// First record tagged `+default`, else the lowest id present.
    pub(crate) fn find_default(&self) -> Option<i32> {
        self.iter()
            .find(|record| record.flags.default_object)
            .or_else(|| self.iter().next())
            .map(|record| record.id)
    }

    /// Rewrites every authored object file from the in-memory records.
    pub fn resave_all(&mut self) -> BankResult<usize> {
        let ids: Vec<i32> = self
            .iter()
            .filter(|record| !record.links.is_dummy())
            .map(|record| record.id)
            .collect();

        for id in &ids {
            let Some(record) = self.get_no_default(*id).cloned() else {
                continue;
            };
            let tapout = self.tapouts.get(id).copied();
            self.add(DecodedObject { record, tapout }, Some(*id), true)?;
        }
        log::info!("resaved {} objects", ids.len());
        Ok(ids.len())
    }

    /// Pages through objects.
    ///
    /// An empty query lists everything newest first. A numeric query
    /// returns that object followed by its use dummies. Anything else is
    /// a case-insensitive substring match on descriptions.
    pub fn search(&self, query: &str, skip: usize, take: usize) -> SearchPage<'_> {
        if query.is_empty() {
            let all: Vec<&ObjectRecord> = self
                .records
                .iter()
                .rev()
                .flatten()
                .filter(|record| record.id != 0)
                .collect();
            let records: Vec<&ObjectRecord> = all.iter().skip(skip).take(take).copied().collect();
            let remaining = all.len().saturating_sub(skip + records.len());
            return SearchPage { records, remaining };
        }

        if query.bytes().all(|b| b.is_ascii_digit()) {
            let Some(record) = query.parse().ok().and_then(|id| self.get_no_default(id)) else {
                return SearchPage {
                    records: Vec::new(),
                    remaining: 0,
                };
            };
            let family: Vec<&ObjectRecord> = std::iter::once(record)
                .chain(
                    record
                        .links
                        .use_dummy_ids
                        .iter()
                        .filter_map(|id| self.get_no_default(*id)),
                )
                .collect();
            let records: Vec<&ObjectRecord> =
                family.iter().skip(skip).take(take).copied().collect();
            let remaining = family.len().saturating_sub(skip + records.len());
            return SearchPage { records, remaining };
        }

        let records: Vec<&ObjectRecord> = self
            .search
            .matches(query, skip, take)
            .into_iter()
            .filter_map(|id| self.get_no_default(id))
            .collect();
        let remaining = self
            .search
            .count_matches(query)
            .saturating_sub(skip + records.len());
        SearchPage { records, remaining }
    }

    pub fn persons(&self) -> &[i32] {
        self.races.persons()
    }

    pub fn female_persons(&self) -> &[i32] {
        self.races.females()
    }

    pub fn races(&self) -> Vec<i32> {
        self.races.races()
    }

    pub fn race_members(&self, race: i32) -> &[i32] {
        self.races.race_members(race)
    }

    pub fn race_size(&self, race: i32) -> usize {
        self.races.race_size(race)
    }

    pub fn random_person(&mut self) -> Option<i32> {
        self.races.random_person(&mut self.rng)
    }

    pub fn random_female_person(&mut self) -> Option<i32> {
        self.races.random_female(&mut self.rng)
    }

    pub fn random_person_of_race(&mut self, race: i32) -> Option<i32> {
        self.races.random_of_race(race, &mut self.rng)
    }

    /// A relative of `mother` drawn from her race within `span` positions.
    pub fn random_family_member(
        &mut self,
        race: i32,
        mother: i32,
        span: usize,
        force_girl: bool,
    ) -> Option<i32> {
        self.races
            .family_member(race, mother, span, force_girl, &mut self.rng)
    }

    pub fn next_person(&self, current: i32) -> Option<i32> {
        self.races.next_person(current)
    }

    pub fn prev_person(&self, current: i32) -> Option<i32> {
        self.races.prev_person(current)
    }

    pub fn random_death_marker(&mut self) -> Option<i32> {
        if self.death_markers.is_empty() {
            return None;
        }
        let index = self.rng.gen_range(0..self.death_markers.len());
        Some(self.death_markers[index])
    }

    pub fn death_markers(&self) -> &[i32] {
        &self.death_markers
    }

    /// Objects tagged `fromDeath`.
    pub fn possible_death_ids(&self) -> &[i32] {
        &self.possible_deaths
    }

    pub fn food_ids(&self) -> &[i32] {
        &self.foods
    }

    pub fn non_permanent_ids(&self) -> &[i32] {
        &self.non_permanent
    }

    pub fn monument_call_ids(&self) -> &[i32] {
        &self.monument_calls
    }

    pub fn monument_status(&self, id: i32) -> Option<MonumentStatus> {
        self.get_no_default(id)?.flags.monument
    }

    /// Every biome some object lists, ascending.
    pub fn biomes(&self) -> Vec<i32> {
        self.biome_counts.keys().copied().collect()
    }

    /// Ground heat of `biome`; zero outside the known range.
    pub fn biome_heat(&self, biome: i32) -> f32 {
        usize::try_from(biome)
            .ok()
            .and_then(|index| self.biome_heat.get(index))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn max_wide_radius(&self) -> i32 {
        self.max_wide_radius
    }

    pub fn tapout_record(&self, id: i32) -> Option<&TapoutRecord> {
        self.tapouts.get(&id)
    }

    pub fn global_triggers(&self) -> &[GlobalTrigger] {
        &self.triggers
    }

    pub fn meta_trigger_object(&self, index: usize) -> Option<i32> {
        self.triggers.get(index).map(|trigger| trigger.meta_id)
    }

    /// Pixel height of an object, computed once and kept on the record.
    pub fn object_height(&mut self, id: i32) -> i32 {
        let Some(index) = self.index_or_default(id) else {
            return 0;
        };
        let sprites = self.sprites.as_ref();
        let Some(record) = self.records[index].as_mut() else {
            return 0;
        };
        if record.cached_height == -1 {
            record.cached_height = recompute_height(&record.sprites, sprites);
        }
        record.cached_height
    }

    pub fn max_diameter(&self, id: i32) -> i32 {
        self.get(id)
            .map_or(0, |record| max_diameter(record, self.sprites.as_ref()))
    }

    pub fn sprite_subset(&self, super_id: i32, sub_id: i32) -> Option<Vec<SubsetSpriteIndexMap>> {
        sprite_subset(self.get_no_default(super_id)?, self.get_no_default(sub_id)?)
    }

    pub fn is_sprite_used(&self, sprite_id: i32) -> bool {
        self.iter()
            .any(|record| record.sprites.iter().any(|layer| layer.sprite == sprite_id))
    }

    pub fn is_sound_used_by_object(&self, sound_id: i32) -> bool {
        self.iter().any(|record| {
            record
                .sounds()
                .iter()
                .any(|usage| usage.uses_sound(sound_id))
        })
    }

    /// The object a dummy was generated from, or `id` itself.
    pub fn object_parent(&self, id: i32) -> i32 {
        match self.get_no_default(id) {
            Some(record) if record.links.is_use_dummy => record.links.use_dummy_parent,
            Some(record) if record.links.is_variable_dummy => record.links.variable_dummy_parent,
            _ => id,
        }
    }

    /// Id to reveal to players: hidden variants report their template.
    pub fn hide_id_for_client(&self, id: i32) -> i32 {
        if id <= 0 {
            return id;
        }
        match self.get_no_default(id) {
            Some(record) if record.links.is_variable_dummy && record.links.variable_hidden => {
                record.links.variable_dummy_parent
            }
            Some(record) => record.id,
            None => extract_object_id(id),
        }
    }

    /// True when one object is a use dummy of the other, or both are
    /// use dummies of the same parent.
    pub fn same_use_parent(&self, a: i32, b: i32) -> bool {
        let (Some(ra), Some(rb)) = (self.get_no_default(a), self.get_no_default(b)) else {
            return false;
        };
        match (ra.links.is_use_dummy, rb.links.is_use_dummy) {
            (true, true) => ra.links.use_dummy_parent == rb.links.use_dummy_parent,
            (false, true) => rb.links.use_dummy_parent == a,
            (true, false) => ra.links.use_dummy_parent == b,
            (false, false) => false,
        }
    }

    pub fn can_pickup(&self, id: i32, age: f64) -> bool {
        self.get(id).is_some_and(|record| record.can_pickup(age))
    }

    pub fn skip_mask(&mut self, id: i32, uses_remaining: i32) -> Vec<bool> {
        let Some(index) = self.present(id) else {
            return Vec::new();
        };
        match self.records[index].as_ref() {
            Some(record) => self.use_vis.skip_mask(record, uses_remaining),
            None => Vec::new(),
        }
    }
}
