pub mod codec;
pub mod flags;
pub mod record;
pub mod scan;
pub mod sound;
pub mod sparse;
pub mod tapout;

pub use codec::{DecodeError, DecodedObject, MIN_OBJECT_LINES, decode, encode, object_file_name};
pub use flags::{DescriptionFlags, MonumentStatus, SpeechPipe, variable_label, variable_token};
pub use record::{
    Clothing, HoldStyle, MIN_SLOT_TIME_STRETCH, ObjectRecord, RecordLinks, Rgb, Slot, SlotStyle,
    SpriteLayer, UNLIMITED_PICKUP_AGE, Vec2, WornVisibility,
};
pub use sound::{SoundUsage, SubSound};
pub use tapout::{NO_SPECIFIC_COORD, TapoutMode, TapoutRecord};
