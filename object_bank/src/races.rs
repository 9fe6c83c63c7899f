//! Spawnable person objects grouped by race.

use std::collections::BTreeMap;

use rand::Rng;

/// Races above this share the last bucket.
pub const MAX_RACE: i32 = 100;

fn bucket_of(race: i32) -> usize {
    race.clamp(0, MAX_RACE) as usize
}

#[derive(Debug, Clone)]
pub struct RaceIndex {
    /// Every spawnable person, ascending id.
    persons: Vec<i32>,
    females: Vec<i32>,
    /// Per-race members in alternating sex order.
    buckets: Vec<Vec<i32>>,
    male: BTreeMap<i32, bool>,
    race_of: BTreeMap<i32, usize>,
}

impl Default for RaceIndex {
    fn default() -> Self {
        Self {
            persons: Vec::new(),
            females: Vec::new(),
            buckets: vec![Vec::new(); MAX_RACE as usize + 1],
            male: BTreeMap::new(),
            race_of: BTreeMap::new(),
        }
    }
}

pub(crate) fn insert_sorted(list: &mut Vec<i32>, id: i32) {
    if let Err(pos) = list.binary_search(&id) {
        list.insert(pos, id);
    }
}

pub(crate) fn remove_sorted(list: &mut Vec<i32>, id: i32) {
    if let Ok(pos) = list.binary_search(&id) {
        list.remove(pos);
    }
}

impl RaceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn contains(&self, id: i32) -> bool {
        self.male.contains_key(&id)
    }

    /// Adds or re-files a person and reorders its race bucket.
    pub fn insert(&mut self, id: i32, race: i32, male: bool) {
        self.remove(id);
        insert_sorted(&mut self.persons, id);
        if !male {
            insert_sorted(&mut self.females, id);
        }
        let bucket = bucket_of(race);
        self.male.insert(id, male);
        self.race_of.insert(id, bucket);
        self.buckets[bucket].push(id);
        self.rebuild_bucket(bucket);
    }

    pub fn remove(&mut self, id: i32) -> bool {
        let Some(bucket) = self.race_of.remove(&id) else {
            return false;
        };
        self.male.remove(&id);
        remove_sorted(&mut self.persons, id);
        remove_sorted(&mut self.females, id);
        self.buckets[bucket].retain(|member| *member != id);
        self.rebuild_bucket(bucket);
        true
    }

    /// Interleaves the sexes, leading with the more numerous one so the
    /// surplus is spread as thin as possible. Ties lead with a female.
    fn rebuild_bucket(&mut self, bucket: usize) {
        let mut boys = Vec::new();
        let mut girls = Vec::new();
        for id in &self.buckets[bucket] {
            if self.male.get(id).copied().unwrap_or(false) {
                boys.push(*id);
            } else {
                girls.push(*id);
            }
        }
        boys.sort_unstable();
        girls.sort_unstable();

        let (first, second) = if boys.len() > girls.len() {
            (boys, girls)
        } else {
            (girls, boys)
        };

        let mut ordered = Vec::with_capacity(first.len() + second.len());
        let mut first = first.into_iter();
        let mut second = second.into_iter();
        loop {
            match (first.next(), second.next()) {
                (None, None) => break,
                (a, b) => {
                    ordered.extend(a);
                    ordered.extend(b);
                }
            }
        }
        self.buckets[bucket] = ordered;
    }

    pub fn persons(&self) -> &[i32] {
        &self.persons
    }

    pub fn females(&self) -> &[i32] {
        &self.females
    }

    /// Races with at least one member, ascending.
    pub fn races(&self) -> Vec<i32> {
        self.buckets
            .iter()
            .enumerate()
            .filter(|(_, members)| !members.is_empty())
            .map(|(race, _)| race as i32)
            .collect()
    }

    pub fn race_members(&self, race: i32) -> &[i32] {
        &self.buckets[bucket_of(race)]
    }

    pub fn race_size(&self, race: i32) -> usize {
        if race > MAX_RACE {
            return 0;
        }
        self.race_members(race).len()
    }

    fn is_male(&self, id: i32) -> bool {
        self.male.get(&id).copied().unwrap_or(false)
    }

    pub fn random_person<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<i32> {
        pick(&self.persons, rng)
    }

    pub fn random_female<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<i32> {
        pick(&self.females, rng)
    }

    pub fn random_of_race<R: Rng + ?Sized>(&self, race: i32, rng: &mut R) -> Option<i32> {
        pick(self.race_members(race), rng)
    }

    /// Picks a child for `mother` among the race members within `span`
    /// positions on either side of her, wrapping around the bucket.
    ///
    /// The candidate pool is padded so both sexes are equally likely when
    /// both are present; `force_girl` drops boys when any girl is in reach.
    pub fn family_member<R: Rng + ?Sized>(
        &self,
        race: i32,
        mother: i32,
        span: usize,
        force_girl: bool,
        rng: &mut R,
    ) -> Option<i32> {
        let members = self.race_members(race);
        match members.len() {
            0 => return None,
            1 => return Some(members[0]),
            _ => {}
        }

        let Some(mother_index) = members.iter().position(|id| *id == mother) else {
            return self.random_of_race(race, rng);
        };

        if members.len() == 2 {
            return Some(members[1 - mother_index]);
        }

        let len = members.len() as i64;
        let span = span.max(1) as i64;
        let mut pool: Vec<i32> = Vec::new();
        let mut boys = 0;
        let mut girls = 0;

        for offset in 1..=span {
            for sign in [-1_i64, 1] {
                let index = (mother_index as i64 + offset * sign).rem_euclid(len) as usize;
                if index == mother_index {
                    continue;
                }
                let id = members[index];
                if pool.contains(&id) {
                    continue;
                }
                pool.push(id);
                if self.is_male(id) {
                    boys += 1;
                } else {
                    girls += 1;
                }
            }
        }

        self.balance(&mut pool, &mut boys, &mut girls);

        if force_girl && girls > 0 {
            pool.retain(|id| !self.is_male(*id));
        }

        pick(&pool, rng)
    }

    /// Duplicates members of the scarcer sex until both counts match.
    fn balance(&self, pool: &mut Vec<i32>, boys: &mut usize, girls: &mut usize) {
        while *boys > *girls && *girls >= 1 {
            let mut index = 0;
            while index < pool.len() && *girls < *boys {
                if !self.is_male(pool[index]) {
                    pool.push(pool[index]);
                    *girls += 1;
                }
                index += 1;
            }
        }
        while *girls > *boys && *boys >= 1 {
            let mut index = 0;
            while index < pool.len() && *boys < *girls {
                if self.is_male(pool[index]) {
                    pool.push(pool[index]);
                    *boys += 1;
                }
                index += 1;
            }
        }
    }

    /// Person after `current`, wrapping to the first.
    pub fn next_person(&self, current: i32) -> Option<i32> {
        let first = *self.persons.first()?;
        Some(
            self.persons
                .iter()
                .position(|id| *id == current)
                .and_then(|index| self.persons.get(index + 1).copied())
                .unwrap_or(first),
        )
    }

    /// Person before `current`, wrapping to the last.
    pub fn prev_person(&self, current: i32) -> Option<i32> {
        let last = *self.persons.last()?;
        Some(
            self.persons
                .iter()
                .position(|id| *id == current)
                .filter(|index| *index > 0)
                .map(|index| self.persons[index - 1])
                .unwrap_or(last),
        )
    }
}

fn pick<R: Rng + ?Sized>(list: &[i32], rng: &mut R) -> Option<i32> {
    if list.is_empty() {
        return None;
    }
    Some(list[rng.gen_range(0..list.len())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn longest_run(index: &RaceIndex, race: i32) -> usize {
        let members = index.race_members(race);
        let mut longest = 0;
        let mut run = 0;
        let mut last = None;
        for id in members {
            let male = index.is_male(*id);
            if Some(male) == last {
                run += 1;
            } else {
                run = 1;
                last = Some(male);
            }
            longest = longest.max(run);
        }
        longest
    }

    #[test]
    fn buckets_alternate_sexes() {
        let mut index = RaceIndex::new();
        for id in 1..=4 {
            index.insert(id, 2, true);
        }
        for id in 5..=7 {
            index.insert(id, 2, false);
        }
        assert_eq!(index.race_members(2), &[1, 5, 2, 6, 3, 7, 4]);
        assert_eq!(longest_run(&index, 2), 1);

        index.remove(5);
        index.remove(6);
        assert_eq!(index.race_members(2), &[1, 7, 2, 3, 4]);
        assert_eq!(index.races(), vec![2]);
        assert_eq!(index.females(), &[7]);
    }

    #[test]
    fn oversized_races_share_the_last_bucket() {
        let mut index = RaceIndex::new();
        index.insert(1, 250, false);
        index.insert(2, 100, true);
        assert_eq!(index.race_members(400), &[1, 2]);
        assert_eq!(index.race_size(250), 0);
        assert_eq!(index.race_size(100), 2);
    }

    #[test]
    fn next_and_prev_wrap() {
        let mut index = RaceIndex::new();
        index.insert(9, 1, true);
        index.insert(3, 1, false);
        index.insert(5, 2, true);
        assert_eq!(index.next_person(3), Some(5));
        assert_eq!(index.next_person(9), Some(3));
        assert_eq!(index.prev_person(3), Some(9));
        assert_eq!(index.prev_person(42), Some(9));
        assert_eq!(RaceIndex::new().next_person(1), None);
    }

    #[test]
    fn family_member_never_returns_the_mother() {
        let mut index = RaceIndex::new();
        for id in 1..=6 {
            index.insert(id, 1, id % 2 == 0);
        }
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let child = index
                .family_member(1, 1, 2, false, &mut rng)
                .expect("race has members");
            assert_ne!(child, 1);
            let girl = index
                .family_member(1, 1, 2, true, &mut rng)
                .expect("race has members");
            assert!(!index.is_male(girl));
        }
    }

    #[test]
    fn tiny_races_have_fixed_answers() {
        let mut index = RaceIndex::new();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(index.family_member(4, 1, 1, false, &mut rng), None);
        index.insert(1, 4, false);
        assert_eq!(index.family_member(4, 1, 1, false, &mut rng), Some(1));
        index.insert(2, 4, true);
        assert_eq!(index.family_member(4, 1, 1, false, &mut rng), Some(2));
    }
}
