//! In-memory database of object definitions for a 2D life simulation,
//! with the derived relations between them and the compositor and hit
//! tester that place their sprites on screen.

pub mod age;
pub mod animation;
pub mod clothing;
pub mod compositor;
pub mod config;
pub mod error;
pub mod folder;
pub mod geometry;
pub mod layout;
pub mod loader;
pub mod races;
pub mod resolver;
pub mod search;
pub mod sprites;
pub mod store;
pub mod transform;
pub mod use_vis;

pub use age::{AgeCurve, StandardAgeCurve};
pub use animation::{AnimType, AnimationBank, AnimationPose, InMemoryAnimations, LayerPose};
pub use clothing::ClothingSet;
pub use compositor::{arm_holding_params, held_draw_pos, Blend, Compositor, DrawSink, SpriteDraw};
pub use config::BankConfig;
pub use error::{BankError, BankResult};
pub use folder::{DirFolder, FolderCache, MemoryFolder, ObjectFolder};
pub use hit_test::{HitOptions, HitTester, PartHit, NO_HIT_DISTANCE};
pub use layout::{ArmHide, ContainedItem, DrawParams, HoldingPos};
pub use loader::{load_bank, BankLoader, LoadReport};
pub use resolver::{resolve, ResolveReport};
pub use sprites::{InMemorySprites, SpriteBank, SpriteRecord};
pub use store::{extract_object_id, GlobalTrigger, ObjectStore, SearchPage};
pub use transform::Placement;
