use std::collections::BTreeSet;

/// Case-insensitive substring index over object descriptions.
///
/// Entries are kept ordered by lower-cased description, then id, so paged
/// queries return a stable sequence.
#[derive(Debug, Default, Clone)]
pub struct DescriptionIndex {
    entries: BTreeSet<(String, i32)>,
}

impl DescriptionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn insert(&mut self, description: &str, id: i32) {
        self.entries.insert((description.to_lowercase(), id));
    }

    pub fn remove(&mut self, description: &str, id: i32) -> bool {
        self.entries.remove(&(description.to_lowercase(), id))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn matching<'a>(&'a self, needle: &'a str) -> impl Iterator<Item = i32> + 'a {
        self.entries
            .iter()
            .filter(move |(text, _)| text.contains(needle))
            .map(|(_, id)| *id)
    }

    pub fn count_matches(&self, query: &str) -> usize {
        let needle = query.to_lowercase();
        self.matching(&needle).count()
    }

    pub fn matches(&self, query: &str, skip: usize, take: usize) -> Vec<i32> {
        let needle = query.to_lowercase();
        self.matching(&needle).skip(skip).take(take).collect()
    }
}
