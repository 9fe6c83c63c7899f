use serde::Serialize;

use crate::scan::Scan;

/// One sound referenced by a usage, with its playback volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SubSound {
    pub id: i32,
    pub volume: f64,
}

/// Opaque handle describing which sounds an object plays for one action.
///
/// Serialized as `id:volume` pairs joined by `#`; an empty usage is written
/// as `-1:0.000000`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SoundUsage {
    pub sounds: Vec<SubSound>,
}

impl SoundUsage {
    pub fn blank() -> Self {
        Self::default()
    }

    pub fn is_blank(&self) -> bool {
        self.sounds.is_empty()
    }

    pub fn uses_sound(&self, sound_id: i32) -> bool {
        self.sounds.iter().any(|sound| sound.id == sound_id)
    }

    pub fn sound_ids(&self) -> impl Iterator<Item = i32> + '_ {
        self.sounds.iter().map(|sound| sound.id)
    }

    pub fn clear(&mut self) {
        self.sounds.clear();
    }

    /// Parses a usage; malformed parts and the `-1` placeholder are skipped.
    pub fn parse(text: &str) -> Self {
        let mut sounds = Vec::new();
        for part in text.trim().split('#') {
            let mut scan = Scan::new(part);
            let Some(id) = scan.int() else {
                continue;
            };
            if id < 0 {
                continue;
            }
            let volume = scan
                .lit(":")
                .and_then(|_| scan.float())
                .unwrap_or(1.0);
            sounds.push(SubSound { id, volume });
        }
        Self { sounds }
    }

    pub fn describe(&self) -> String {
        if self.sounds.is_empty() {
            return "-1:0.000000".to_string();
        }
        self.sounds
            .iter()
            .map(|sound| format!("{}:{:.6}", sound.id, sound.volume))
            .collect::<Vec<_>>()
            .join("#")
    }
}
