//! Static animation pose snapshots keyed by object and animation type.

use std::collections::HashMap;

use glam::DVec2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimType {
    Ground,
    Held,
    Moving,
    Eating,
    Doing,
    Biking,
    Sitting,
}

impl AnimType {
    pub const ALL: [AnimType; 7] = [
        AnimType::Ground,
        AnimType::Held,
        AnimType::Moving,
        AnimType::Eating,
        AnimType::Doing,
        AnimType::Biking,
        AnimType::Sitting,
    ];

    /// Maps a stored `ridingAnimationIndex` to a type.
    pub fn from_index(index: i32) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
    }
}

/// Frozen state of one sprite layer at phase zero.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayerPose {
    pub offset: DVec2,
    /// Extra rotation in turns.
    pub rot_phase: f64,
    /// Pivot of `rot_phase`, relative to the layer position.
    pub rotation_center: DVec2,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationPose {
    pub layers: Vec<LayerPose>,
}

impl AnimationPose {
    pub fn layer(&self, index: usize) -> Option<&LayerPose> {
        self.layers.get(index)
    }
}

pub trait AnimationBank {
    fn pose(&self, object_id: i32, kind: AnimType) -> Option<&AnimationPose>;

    /// Duplicates every animation of `from` under `to`.
    fn copy_animations(&mut self, from: i32, to: i32);

    fn clear_animations(&mut self, object_id: i32);
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryAnimations {
    poses: HashMap<(i32, AnimType), AnimationPose>,
}

impl InMemoryAnimations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, object_id: i32, kind: AnimType, pose: AnimationPose) {
        self.poses.insert((object_id, kind), pose);
    }

    pub fn has_any(&self, object_id: i32) -> bool {
        AnimType::ALL
            .iter()
            .any(|kind| self.poses.contains_key(&(object_id, *kind)))
    }
}

impl AnimationBank for InMemoryAnimations {
    fn pose(&self, object_id: i32, kind: AnimType) -> Option<&AnimationPose> {
        self.poses.get(&(object_id, kind))
    }

    fn copy_animations(&mut self, from: i32, to: i32) {
        for kind in AnimType::ALL {
            if let Some(pose) = self.poses.get(&(from, kind)).cloned() {
                self.poses.insert((to, kind), pose);
            }
        }
    }

    fn clear_animations(&mut self, object_id: i32) {
        self.poses.retain(|(id, _), _| *id != object_id);
    }
}
