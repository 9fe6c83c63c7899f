//! Sprite bitmap metadata consumed by geometry, drawing and picking.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BankError, BankResult};

/// Dimensions, anchors and opacity of one sprite bitmap.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpriteRecord {
    pub id: i32,
    pub width: i32,
    pub height: i32,
    /// Size of the non-transparent region.
    pub visible_width: i32,
    pub visible_height: i32,
    /// Offset from the bitmap center to the center of the visible region.
    pub center_x_offset: i32,
    pub center_y_offset: i32,
    /// Offset of the drawing anchor from the bitmap center.
    pub center_anchor_x_offset: i32,
    pub center_anchor_y_offset: i32,
    pub max_diameter: i32,
    pub multiplicative_blend: bool,
    pub tag: String,
    /// Row-major opacity mask. `None` treats every pixel as opaque.
    pub hit_map: Option<Vec<bool>>,
}

impl SpriteRecord {
    /// A fully opaque `width` x `height` sprite anchored at its center.
    pub fn opaque(id: i32, width: i32, height: i32) -> Self {
        Self {
            id,
            width,
            height,
            visible_width: width,
            visible_height: height,
            max_diameter: width.max(height),
            ..Self::default()
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn with_anchor(mut self, x: i32, y: i32) -> Self {
        self.center_anchor_x_offset = x;
        self.center_anchor_y_offset = y;
        self
    }

    /// Tests the pixel at `(x, y)`, measured from the bitmap center with y
    /// pointing up.
    pub fn hit(&self, x: i32, y: i32) -> bool {
        let px = self.width / 2 + x;
        let py = self.height / 2 - y;
        if px < 0 || py < 0 || px >= self.width || py >= self.height {
            return false;
        }
        match &self.hit_map {
            Some(map) => map
                .get((py * self.width + px) as usize)
                .copied()
                .unwrap_or(false),
            None => true,
        }
    }

    /// Index of the topmost row holding an opaque pixel.
    pub fn first_opaque_row(&self) -> Option<i32> {
        let Some(map) = &self.hit_map else {
            return (self.height > 0).then_some(0);
        };
        if self.width <= 0 {
            return None;
        }
        map.chunks(self.width as usize)
            .position(|row| row.iter().any(|opaque| *opaque))
            .map(|row| row as i32)
    }
}

/// Lookup of sprite records by id.
pub trait SpriteBank {
    fn sprite(&self, id: i32) -> Option<&SpriteRecord>;

    fn tag(&self, id: i32) -> Option<&str> {
        self.sprite(id).map(|record| record.tag.as_str())
    }
}

/// Sprite bank backed by a plain map.
#[derive(Debug, Default, Clone)]
pub struct InMemorySprites {
    records: HashMap<i32, SpriteRecord>,
}

impl InMemorySprites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: SpriteRecord) {
        self.records.insert(record.id, record);
    }

    pub fn with(mut self, record: SpriteRecord) -> Self {
        self.insert(record);
        self
    }

    /// Reads a JSON array of sprite records.
    pub fn from_json_file(path: &Path) -> BankResult<Self> {
        let raw = fs::read_to_string(path).map_err(|source| BankError::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;
        let records: Vec<SpriteRecord> =
            serde_json::from_str(&raw).map_err(|source| BankError::ManifestParse {
                path: path.to_path_buf(),
                source,
            })?;
        let mut bank = Self::new();
        for record in records {
            bank.insert(record);
        }
        Ok(bank)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl SpriteBank for InMemorySprites {
    fn sprite(&self, id: i32) -> Option<&SpriteRecord> {
        self.records.get(&id)
    }
}
