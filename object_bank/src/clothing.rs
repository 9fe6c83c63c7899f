//! The six wearable slots of a person.

use object_formats::Clothing;

pub const CLOTHING_SLOTS: usize = 6;

/// Wearable pieces by object id. Slot indices are stable and shared with
/// gameplay code: hat, tunic, front shoe, back shoe, bottom, backpack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClothingSet {
    pub hat: Option<i32>,
    pub tunic: Option<i32>,
    pub front_shoe: Option<i32>,
    pub back_shoe: Option<i32>,
    pub bottom: Option<i32>,
    pub backpack: Option<i32>,
}

impl ClothingSet {
    pub const HAT: usize = 0;
    pub const TUNIC: usize = 1;
    pub const FRONT_SHOE: usize = 2;
    pub const BACK_SHOE: usize = 3;
    pub const BOTTOM: usize = 4;
    pub const BACKPACK: usize = 5;

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        (0..CLOTHING_SLOTS).all(|index| self.get(index).is_none())
    }

    pub fn get(&self, index: usize) -> Option<i32> {
        match index {
            Self::HAT => self.hat,
            Self::TUNIC => self.tunic,
            Self::FRONT_SHOE => self.front_shoe,
            Self::BACK_SHOE => self.back_shoe,
            Self::BOTTOM => self.bottom,
            Self::BACKPACK => self.backpack,
            _ => None,
        }
    }

    /// Sets slot `index`; out-of-range indices are ignored.
    pub fn set(&mut self, index: usize, id: Option<i32>) {
        let slot = match index {
            Self::HAT => &mut self.hat,
            Self::TUNIC => &mut self.tunic,
            Self::FRONT_SHOE => &mut self.front_shoe,
            Self::BACK_SHOE => &mut self.back_shoe,
            Self::BOTTOM => &mut self.bottom,
            Self::BACKPACK => &mut self.backpack,
            _ => return,
        };
        *slot = id;
    }

    /// First piece present in `new` that differs from what `self` wore.
    pub fn added_in(&self, new: &ClothingSet) -> Option<i32> {
        (0..CLOTHING_SLOTS).find_map(|index| {
            let after = new.get(index)?;
            (self.get(index) != Some(after)).then_some(after)
        })
    }

    /// Slot indices a piece of the given kind may occupy.
    pub fn slots_for(kind: Clothing) -> &'static [usize] {
        match kind {
            Clothing::Hat => &[Self::HAT],
            Clothing::Tunic => &[Self::TUNIC],
            Clothing::Shoe => &[Self::FRONT_SHOE, Self::BACK_SHOE],
            Clothing::Bottom => &[Self::BOTTOM],
            Clothing::Backpack => &[Self::BACKPACK],
            Clothing::None => &[],
        }
    }
}
