//! Relations that only make sense once every object is loaded.
//!
//! [`resolve`] first strips whatever a previous run derived (generated
//! dummies, trigger groups, wall links, rewritten template descriptions)
//! so running it twice over the same population gives the same ids and
//! indices. Missing partners never abort the pass; the link stays unset
//! and a warning is logged.

use object_formats::{variable_label, variable_token, DecodedObject, RecordLinks, TapoutRecord};
use serde::Serialize;

use crate::folder::ground_heat_file;
use crate::store::{GlobalTrigger, ObjectStore, MAX_BIOME};

/// Placeholder written into a variable template's own description.
const VARIABLE_PLACEHOLDER: &str = "- ?";

/// What a resolve pass produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolveReport {
    pub tapouts: usize,
    pub default_id: Option<i32>,
    pub trigger_groups: usize,
    pub use_dummies: usize,
    pub variable_dummies: usize,
    pub wall_sets: usize,
}

pub fn resolve(store: &mut ObjectStore) -> ResolveReport {
    reset_derived(store);

    let mut report = ResolveReport {
        tapouts: register_tapouts(store),
        ..ResolveReport::default()
    };

    store.default_id = store.find_default();
    report.default_id = store.default_id;

    report.trigger_groups = link_emitters(store);
    link_receivers(store);

    if store.config.auto_generate_used {
        report.use_dummies = generate_use_dummies(store);
    }
    if store.config.auto_generate_variable {
        report.variable_dummies = generate_variable_dummies(store);
    }

    report.wall_sets = link_walls(store);
    load_biome_heat(store);

    log::info!(
        "resolved {} trigger groups, {} use dummies, {} variable dummies, {} wall sets",
        report.trigger_groups,
        report.use_dummies,
        report.variable_dummies,
        report.wall_sets
    );
    report
}

fn reset_derived(store: &mut ObjectStore) {
    let dummies: Vec<i32> = store
        .iter()
        .filter(|record| record.links.is_dummy())
        .map(|record| record.id)
        .collect();
    for id in &dummies {
        store.free(*id);
        store.animations.clear_animations(*id);
    }

    let ids: Vec<i32> = store.ids().collect();
    let mut templates = Vec::new();
    for id in ids {
        let Some(record) = store.get_mut(id) else {
            continue;
        };
        if !record.links.use_dummy_ids.is_empty() {
            for layer in record.sprites.iter_mut().filter(|layer| layer.use_appear) {
                layer.skip_drawing = false;
            }
        }
        record.links = RecordLinks::default();
        if let Some(template) = record.template_description.take() {
            templates.push((id, template));
        }
    }
    for (id, template) in templates {
        store.redescribe(id, template);
    }

    store.triggers.clear();
    store.max_id = store.ids().max().unwrap_or(0);
}

/// Registers tapouts declared with the legacy `+tapoutTrigger` tag.
fn register_tapouts(store: &mut ObjectStore) -> usize {
    let pending: Vec<TapoutRecord> = store
        .iter()
        .filter(|record| !store.tapouts.contains_key(&record.id))
        .filter_map(|record| record.flags.tapout.map(|tapout| tapout.with_trigger(record.id)))
        .collect();

    for tapout in &pending {
        store.tapouts.insert(tapout.trigger_id, *tapout);
        if let Some(record) = store.get_mut(tapout.trigger_id) {
            record.tapout_trigger = true;
        }
    }
    pending.len()
}

fn link_emitters(store: &mut ObjectStore) -> usize {
    let emitters: Vec<(i32, String)> = store
        .iter()
        .filter(|record| record.flags.global_trigger_on || record.flags.global_trigger_off)
        .filter_map(|record| {
            record
                .flags
                .trigger_meta_name
                .clone()
                .map(|name| (record.id, name))
        })
        .collect();

    for (id, meta_name) in emitters {
        let meta = store.iter().find(|other| {
            other.id != id
                && !other.flags.global_trigger_on
                && !other.flags.global_trigger_off
                && !other.flags.global_receiver
                && other.description.starts_with(&meta_name)
        });
        let Some(meta_id) = meta.map(|record| record.id) else {
            log::warn!("object {id}: no meta object starts with {meta_name}");
            continue;
        };

        let index = match store
            .triggers
            .iter()
            .position(|trigger| trigger.meta_id == meta_id)
        {
            Some(index) => index,
            None => {
                store.triggers.push(GlobalTrigger { meta_id });
                store.triggers.len() - 1
            }
        };
        if let Some(record) = store.get_mut(id) {
            record.links.global_trigger_index = index as i32;
        }
    }
    store.triggers.len()
}

fn link_receivers(store: &mut ObjectStore) {
    let receivers: Vec<(i32, String)> = store
        .iter()
        .filter(|record| record.flags.global_receiver)
        .filter_map(|record| {
            record
                .flags
                .receiver_emitter_name
                .clone()
                .map(|name| (record.id, name))
        })
        .collect();

    for (id, emitter_name) in receivers {
        // the highest matching emitter wins
        let index = store
            .iter()
            .filter(|other| {
                other.id != id
                    && other.flags.global_trigger_on
                    && other.description.contains(&emitter_name)
            })
            .map(|other| other.links.global_trigger_index)
            .last();
        match index {
            Some(index) => {
                if let Some(record) = store.get_mut(id) {
                    record.links.global_trigger_index = index;
                }
            }
            None => log::warn!("object {id}: no emitter carries {emitter_name}"),
        }
    }
}

/// Links kept by a generated copy of `parent`.
fn dummy_links(parent: &RecordLinks) -> RecordLinks {
    RecordLinks {
        global_trigger_index: parent.global_trigger_index,
        ..RecordLinks::default()
    }
}

fn generate_use_dummies(store: &mut ObjectStore) -> usize {
    let parents: Vec<i32> = store
        .iter()
        .filter(|record| record.num_uses > 1 && !record.links.is_dummy())
        .map(|record| record.id)
        .collect();

    let mut generated = 0;
    for parent_id in parents {
        let Some(parent) = store.get_mut(parent_id) else {
            continue;
        };
        for layer in parent.sprites.iter_mut().filter(|layer| layer.use_appear) {
            layer.skip_drawing = true;
        }
        let parent = parent.clone();
        let tapout = store.tapouts.get(&parent_id).copied();

        let mut dummy_ids = Vec::with_capacity(parent.num_uses as usize - 1);
        for d in 1..parent.num_uses {
            let mut dummy = parent.clone();
            dummy.set_description(format!("{} (use {d})", parent.description));
            dummy.template_description = None;
            dummy.num_uses = 0;
            dummy.map_chance = 0.0;
            dummy.links = RecordLinks {
                is_use_dummy: true,
                use_dummy_parent: parent_id,
                use_dummy_index: d - 1,
                ..dummy_links(&parent.links)
            };
            if parent.creation_sound_initial_only && d != 1 {
                dummy.creation_sound.clear();
            }
            let mask = store.use_vis.skip_mask(&parent, d);
            for (layer, skip) in dummy.sprites.iter_mut().zip(mask) {
                layer.skip_drawing = skip;
            }

            let record = DecodedObject {
                record: dummy,
                tapout,
            };
            match store.add(record, None, false) {
                Ok(id) => {
                    store.animations.copy_animations(parent_id, id);
                    dummy_ids.push(id);
                    generated += 1;
                }
                Err(err) => log::warn!("object {parent_id}: use dummy {d} not added: {err}"),
            }
        }

        if let Some(parent) = store.get_mut(parent_id) {
            parent.links.use_dummy_ids = dummy_ids;
        }
    }
    generated
}

/// Expands `$N` templates, use dummies of templates included.
fn generate_variable_dummies(store: &mut ObjectStore) -> usize {
    let parents: Vec<(i32, u32)> = store
        .iter()
        .filter(|record| !record.links.is_variable_dummy)
        .filter_map(|record| record.flags.variable_count.map(|count| (record.id, count)))
        .collect();

    let mut generated = 0;
    for (parent_id, count) in parents {
        let Some(parent) = store.get_no_default(parent_id).cloned() else {
            continue;
        };
        let token = variable_token(count);
        if !parent.description.contains(&token) {
            continue;
        }
        let hidden = parent.flags.variable_after_comment;
        let tapout = store.tapouts.get(&parent_id).copied();

        let mut dummy_ids = Vec::with_capacity(count as usize);
        for d in 1..=count {
            let mut dummy = parent.clone();
            dummy.set_description(parent.description.replacen(&token, &variable_label(d), 1));
            dummy.template_description = None;
            dummy.map_chance = 0.0;
            dummy.links = RecordLinks {
                is_variable_dummy: true,
                variable_dummy_parent: parent_id,
                variable_dummy_index: d as i32 - 1,
                variable_hidden: hidden,
                ..dummy_links(&parent.links)
            };

            let record = DecodedObject {
                record: dummy,
                tapout,
            };
            match store.add(record, None, false) {
                Ok(id) => {
                    store.animations.copy_animations(parent_id, id);
                    dummy_ids.push(id);
                    generated += 1;
                }
                Err(err) => log::warn!("object {parent_id}: variable dummy {d} not added: {err}"),
            }
        }

        store.redescribe(
            parent_id,
            parent.description.replacen(&token, VARIABLE_PLACEHOLDER, 1),
        );
        if let Some(record) = store.get_mut(parent_id) {
            record.template_description = Some(parent.description);
            record.links.variable_dummy_ids = dummy_ids;
        }
    }
    generated
}

/// Cross-links `+horizontalX` objects with their `+verticalX` and
/// `+cornerX` siblings. Partial sets stay unlinked.
fn link_walls(store: &mut ObjectStore) -> usize {
    let horizontals: Vec<(i32, String)> = store
        .iter()
        .filter(|record| !record.links.is_dummy())
        .filter_map(|record| {
            record
                .flags
                .horizontal_label
                .clone()
                .map(|label| (record.id, label))
        })
        .collect();

    let mut linked = 0;
    for (id, label) in horizontals {
        let vertical_key = format!("+vertical{label}");
        let corner_key = format!("+corner{label}");
        let mut vertical = None;
        let mut corner = None;
        for other in store
            .iter()
            .filter(|other| other.id != id && !other.links.is_dummy())
        {
            if other.description.contains(&vertical_key) {
                vertical = Some(other.id);
            } else if other.description.contains(&corner_key) {
                corner = Some(other.id);
            }
        }

        let (Some(vertical), Some(corner)) = (vertical, corner) else {
            log::warn!("object {id}: wall set {label} is incomplete");
            continue;
        };
        for member in [id, vertical, corner] {
            if let Some(record) = store.get_mut(member) {
                record.links.horizontal_id = id;
                record.links.vertical_id = vertical;
                record.links.corner_id = corner;
            }
        }
        linked += 1;
    }
    linked
}

fn load_biome_heat(store: &mut ObjectStore) {
    store.biome_heat.fill(0.0);
    if !store.folder.is_available() {
        return;
    }
    for biome in store.biomes() {
        if !(0..=MAX_BIOME).contains(&biome) {
            continue;
        }
        let heat = match store.folder.read_file(&ground_heat_file(biome)) {
            Ok(contents) => contents
                .and_then(|raw| raw.split_whitespace().next().and_then(|v| v.parse().ok()))
                .unwrap_or(0.0),
            Err(err) => {
                log::warn!("ground heat for biome {biome} unreadable: {err}");
                0.0
            }
        };
        store.biome_heat[biome as usize] = heat;
    }
}
