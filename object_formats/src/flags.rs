//! Attributes carried inside an object's free-text description.
//!
//! Descriptions double as a tag language (`+wall`, `*bell`, `>bell`,
//! `&written`, `$3`, ...). [`DescriptionFlags::parse`] reads every tag once
//! so later passes work on typed fields instead of re-scanning text.

use serde::Serialize;

use crate::scan::Scan;
use crate::tapout::TapoutRecord;

/// Monument progression role, numbered the way gameplay code expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MonumentStatus {
    Step = 1,
    Done = 2,
    Call = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SpeechPipe {
    In(i32),
    Out(i32),
}

impl SpeechPipe {
    pub fn index(self) -> i32 {
        match self {
            SpeechPipe::In(index) | SpeechPipe::Out(index) => index,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DescriptionFlags {
    pub written: bool,
    pub writable: bool,
    pub may_have_metadata: bool,
    pub click_to_read: bool,
    pub pass_to_read: bool,

    pub global_trigger_on: bool,
    pub global_trigger_off: bool,
    pub global_receiver: bool,
    /// `>name` built from the emitter's `*name`/`!name` token.
    pub trigger_meta_name: Option<String>,
    /// `*name` built from a receiver's `>name` token.
    pub receiver_emitter_name: Option<String>,
    /// The `*name` token of an on-emitter, kept for receiver matching.
    pub emitter_token: Option<String>,

    pub speech_pipe: Option<SpeechPipe>,
    pub flying: bool,
    pub flight_landing: bool,
    pub owned: bool,
    pub password_protectable: bool,
    pub password_assigner: bool,
    pub no_highlight: bool,
    pub no_click_through: bool,
    pub max_pickup_age: Option<i32>,
    pub auto_default_trans: bool,
    pub no_back_access: bool,
    pub alcohol: i32,
    /// Object id of the yum parent, -1 when the object is its own class.
    pub yum_parent: i32,
    pub slots_invisible: bool,
    pub wall: bool,
    pub front_wall: bool,
    pub blocks_moving: bool,
    pub default_object: bool,
    pub from_death: bool,
    pub apocalypse_trigger: bool,
    pub monument: Option<MonumentStatus>,

    /// `N` of a `$N` template, only when `N >= 2`.
    pub variable_count: Option<u32>,
    /// True when the `$N` token sits after a `#` comment marker.
    pub variable_after_comment: bool,

    /// Parameters of a legacy `+tapoutTrigger,...` tag, keyed to id 0.
    pub tapout: Option<TapoutRecord>,

    pub horizontal_label: Option<String>,
    pub vertical_label: Option<String>,
    pub corner_label: Option<String>,
}

const WALL_LABEL_LEN: usize = 19;

impl DescriptionFlags {
    pub fn parse(description: &str) -> Self {
        let mut flags = DescriptionFlags {
            yum_parent: -1,
            ..DescriptionFlags::default()
        };
        let has = |tag: &str| description.contains(tag);

        if has("&written") {
            flags.written = true;
            flags.may_have_metadata = true;
        }
        flags.writable = has("&writable");
        flags.click_to_read = has("+clickToRead");
        flags.pass_to_read = has("+passToRead");

        if let Some(pos) = description.find('*') {
            flags.global_trigger_on = true;
            let token = first_word(&description[pos..]);
            flags.emitter_token = Some(token.to_string());
            flags.trigger_meta_name = Some(format!(">{}", &token[1..]));
        } else if let Some(pos) = description.find('!') {
            flags.global_trigger_off = true;
            let token = first_word(&description[pos..]);
            flags.trigger_meta_name = Some(format!(">{}", &token[1..]));
        }
        if let Some(pos) = description.find('>') {
            if pos != 0 {
                flags.global_receiver = true;
                let token = first_word(&description[pos..]);
                flags.receiver_emitter_name = Some(format!("*{}", &token[1..]));
            }
        }

        if has("speech") {
            if let Some(index) = int_after(description, "speechIn_") {
                flags.speech_pipe = Some(SpeechPipe::In(index));
            } else if description.contains("speechIn_") {
                flags.speech_pipe = Some(SpeechPipe::In(-1));
            } else if let Some(index) = int_after(description, "speechOut_") {
                flags.speech_pipe = Some(SpeechPipe::Out(index));
            } else if description.contains("speechOut_") {
                flags.speech_pipe = Some(SpeechPipe::Out(-1));
            }
        }

        if has("+fly") {
            flags.flying = true;
        } else if has("+land") {
            flags.flight_landing = true;
        }
        flags.owned = has("+owned");
        flags.password_protectable = has("+password-protectable");
        flags.password_assigner = has("+password-assigner");
        flags.no_highlight = has("+noHighlight");
        flags.no_click_through = has("+noClickThrough");
        flags.max_pickup_age = int_after(description, "maxPickupAge_");
        flags.auto_default_trans = has("+autoDefaultTrans");
        flags.no_back_access = has("+noBackAccess");
        flags.alcohol = int_after(description, "+alcohol").unwrap_or(0);
        flags.yum_parent = int_after(description, "+yum").unwrap_or(-1);
        flags.slots_invisible = has("+slotsInvis");
        flags.wall = has("+wall");
        flags.front_wall = has("+frontWall");
        flags.blocks_moving = has("+blocksMoving");
        flags.default_object = has("+default");
        flags.from_death = has("fromDeath");
        flags.apocalypse_trigger = description.starts_with("The Apocalypse");

        if has("monument") {
            flags.monument = if has("monumentStep") {
                Some(MonumentStatus::Step)
            } else if has("monumentDone") {
                Some(MonumentStatus::Done)
            } else if has("monumentCall") {
                Some(MonumentStatus::Call)
            } else {
                None
            };
        }

        if let Some(pos) = description.find('$') {
            if let Some(count) = Scan::new(&description[pos + 1..]).int() {
                if count >= 2 {
                    flags.variable_count = Some(count as u32);
                    let token = format!("${count}");
                    if let (Some(comment), Some(target)) =
                        (description.find('#'), description.find(&token))
                    {
                        flags.variable_after_comment = comment < target;
                    }
                }
            }
        }

        flags.tapout = TapoutRecord::from_description(0, description);

        flags.horizontal_label = label_after(description, "+horizontal");
        flags.vertical_label = label_after(description, "+vertical");
        flags.corner_label = label_after(description, "+corner");

        flags
    }

    pub fn monument_code(&self) -> i32 {
        self.monument.map(|status| status as i32).unwrap_or(0)
    }
}

/// The `$N` token a variable template carries, if any.
pub fn variable_token(count: u32) -> String {
    format!("${count}")
}

/// Label for the `n`th (1-based) variable variant: `- A`, `- B`, ...,
/// `- Z`, `- AA`, `- AB`, ...
pub fn variable_label(n: u32) -> String {
    let mut remaining = n as i64 - 1;
    let mut digits: Vec<char> = Vec::new();

    if remaining == 0 {
        digits.push('A');
    }
    while remaining > 0 {
        let digit = remaining % 26;
        digits.push((b'A' + digit as u8) as char);
        remaining -= digit;
        if remaining == 26 {
            digits.push('A');
        }
        remaining /= 26;
        remaining -= 1;
    }

    let mut label = String::from("- ");
    label.extend(digits.iter().rev());
    label
}

fn first_word(text: &str) -> &str {
    match text.find(' ') {
        Some(end) => &text[..end],
        None => text,
    }
}

fn int_after(description: &str, key: &str) -> Option<i32> {
    let pos = description.find(key)?;
    Scan::new(&description[pos + key.len()..]).int()
}

fn label_after(description: &str, key: &str) -> Option<String> {
    let pos = description.find(key)?;
    let mut scan = Scan::new(&description[pos + key.len()..]);
    scan.word(WALL_LABEL_LEN).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_tokens() {
        let on = DescriptionFlags::parse("Bell Tower *bellRing sounding");
        assert!(on.global_trigger_on);
        assert_eq!(on.trigger_meta_name.as_deref(), Some(">bellRing"));
        assert_eq!(on.emitter_token.as_deref(), Some("*bellRing"));

        let off = DescriptionFlags::parse("Silent Tower !bellRing");
        assert!(off.global_trigger_off);
        assert!(!off.global_trigger_on);

        let receiver = DescriptionFlags::parse("Listener >bellRing heard");
        assert!(receiver.global_receiver);
        assert_eq!(receiver.receiver_emitter_name.as_deref(), Some("*bellRing"));

        let meta = DescriptionFlags::parse(">bellRing");
        assert!(!meta.global_receiver);
    }

    #[test]
    fn numeric_tags() {
        let flags = DescriptionFlags::parse("Wine +alcohol3 +yum55 maxPickupAge_12 speechOut_4");
        assert_eq!(flags.alcohol, 3);
        assert_eq!(flags.yum_parent, 55);
        assert_eq!(flags.max_pickup_age, Some(12));
        assert_eq!(flags.speech_pipe, Some(SpeechPipe::Out(4)));
    }

    #[test]
    fn variable_template() {
        let flags = DescriptionFlags::parse("Letter $3");
        assert_eq!(flags.variable_count, Some(3));
        assert!(!flags.variable_after_comment);

        let hidden = DescriptionFlags::parse("Letter #hidden $2");
        assert!(hidden.variable_after_comment);

        assert!(DescriptionFlags::parse("Price $1").variable_count.is_none());
    }

    #[test]
    fn variable_labels_follow_base_26() {
        assert_eq!(variable_label(1), "- A");
        assert_eq!(variable_label(3), "- C");
        assert_eq!(variable_label(26), "- Z");
        assert_eq!(variable_label(27), "- AA");
        assert_eq!(variable_label(28), "- AB");
    }

    #[test]
    fn wall_labels_stop_at_whitespace() {
        let flags = DescriptionFlags::parse("Fence +horizontalFenceA rest");
        assert_eq!(flags.horizontal_label.as_deref(), Some("FenceA"));
        assert!(flags.vertical_label.is_none());
    }

    #[test]
    fn monument_precedence() {
        let flags = DescriptionFlags::parse("Bell monumentCall");
        assert_eq!(flags.monument, Some(MonumentStatus::Call));
        assert_eq!(flags.monument_code(), 3);
        assert_eq!(DescriptionFlags::parse("Rock").monument_code(), 0);
    }
}
