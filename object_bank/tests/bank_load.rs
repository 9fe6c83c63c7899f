use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use object_bank::{
    load_bank, resolve, BankConfig, DirFolder, InMemoryAnimations, InMemorySprites, ObjectStore,
    SpriteRecord,
};
use object_formats::{decode, encode, object_file_name, DecodedObject, ObjectRecord, SpriteLayer};
use tempfile::tempdir;

fn record(id: i32, description: &str) -> ObjectRecord {
    let mut record = ObjectRecord {
        id,
        ..ObjectRecord::default()
    };
    record.set_description(description);
    record
}

fn write_object(dir: &Path, record: &ObjectRecord) -> Result<()> {
    let path = dir.join(object_file_name(record.id));
    fs::write(&path, encode(record, None)).with_context(|| format!("writing {}", path.display()))
}

fn open(dir: &Path, sprites: InMemorySprites) -> Result<ObjectStore> {
    let store = ObjectStore::new(
        BankConfig {
            random_seed: Some(7),
            ..BankConfig::default()
        },
        Box::new(DirFolder::new(dir)),
        Box::new(sprites),
        Box::new(InMemoryAnimations::new()),
    );
    let (store, _) = load_bank(store).context("loading bank")?;
    Ok(store)
}

fn description(store: &ObjectStore, id: i32) -> Option<String> {
    store
        .get_no_default(id)
        .map(|record| record.description.clone())
}

#[test]
fn generated_variants_follow_their_templates() -> Result<()> {
    let dir = tempdir()?;
    write_object(dir.path(), &record(1, "Stone"))?;
    write_object(dir.path(), &record(2, "Letter $3"))?;
    let mut bush = record(3, "Berry Bush");
    bush.num_uses = 3;
    write_object(dir.path(), &bush)?;

    let store = ObjectStore::new(
        BankConfig::default(),
        Box::new(DirFolder::new(dir.path())),
        Box::new(InMemorySprites::new()),
        Box::new(InMemoryAnimations::new()),
    );
    let (store, report) = load_bank(store)?;
    assert_eq!(report.loaded, 3);
    assert_eq!(report.resolve.use_dummies, 2);
    assert_eq!(report.resolve.variable_dummies, 3);

    assert_eq!(description(&store, 4).as_deref(), Some("Berry Bush (use 1)"));
    assert_eq!(description(&store, 5).as_deref(), Some("Berry Bush (use 2)"));
    assert_eq!(description(&store, 2).as_deref(), Some("Letter - ?"));
    for (id, label) in [(6, "Letter - A"), (7, "Letter - B"), (8, "Letter - C")] {
        let variant = store.get_no_default(id).expect("variant present");
        assert_eq!(variant.description, label);
        assert_eq!(variant.map_chance, 0.0);
        assert!(variant.links.is_variable_dummy);
        assert_eq!(variant.links.variable_dummy_parent, 2);
    }
    let letter = store.get_no_default(2).expect("template present");
    assert_eq!(letter.links.variable_dummy_ids, vec![6, 7, 8]);

    // generated copies stay out of search results
    assert_eq!(store.search("letter", 0, 10).ids(), vec![2]);
    assert_eq!(store.search("bush", 0, 10).ids(), vec![3]);
    assert_eq!(store.search("3", 0, 10).ids(), vec![3, 4, 5]);
    Ok(())
}

#[test]
fn resolving_twice_changes_nothing() -> Result<()> {
    let dir = tempdir()?;
    write_object(dir.path(), &record(1, ">bellRing"))?;
    write_object(dir.path(), &record(2, "Bell Tower *bellRing"))?;
    write_object(dir.path(), &record(3, "Listener >bellRing"))?;
    write_object(dir.path(), &record(4, "Sign $2"))?;
    let mut basket = record(5, "Basket");
    basket.num_uses = 2;
    write_object(dir.path(), &basket)?;

    let mut store = open(dir.path(), InMemorySprites::new())?;
    let snapshot = |store: &ObjectStore| -> Vec<(i32, String, i32)> {
        store
            .iter()
            .map(|record| {
                (
                    record.id,
                    record.description.clone(),
                    record.links.global_trigger_index,
                )
            })
            .collect()
    };
    let first = snapshot(&store);
    let first_triggers = store.global_triggers().to_vec();
    assert_eq!(first_triggers.len(), 1);
    assert_eq!(
        store.get_no_default(3).map(|record| record.links.global_trigger_index),
        Some(0)
    );

    let report = resolve(&mut store);
    assert_eq!(snapshot(&store), first);
    assert_eq!(store.global_triggers(), first_triggers.as_slice());
    assert_eq!(report.use_dummies, 1);
    assert_eq!(report.variable_dummies, 2);
    Ok(())
}

#[test]
fn trigger_groups_keep_their_index_when_an_emitter_goes() -> Result<()> {
    let dir = tempdir()?;
    write_object(dir.path(), &record(1, ">bellRing"))?;
    write_object(dir.path(), &record(2, ">gongStrike"))?;
    write_object(dir.path(), &record(3, "Bell Tower *bellRing"))?;
    write_object(dir.path(), &record(4, "Gong Stand *gongStrike"))?;

    let mut store = open(dir.path(), InMemorySprites::new())?;
    let gong_index = store
        .get_no_default(4)
        .map(|record| record.links.global_trigger_index)
        .expect("gong stand present");
    assert_eq!(store.meta_trigger_object(gong_index as usize), Some(2));

    assert!(store.remove(3)?);
    assert_eq!(store.global_triggers().len(), 2);
    assert_eq!(
        store
            .get_no_default(4)
            .map(|record| record.links.global_trigger_index),
        Some(gong_index)
    );
    Ok(())
}

#[test]
fn missing_height_is_computed_on_first_use() -> Result<()> {
    let dir = tempdir()?;
    let mut post = record(1, "Post");
    post.sprites = vec![SpriteLayer {
        sprite: 9,
        ..SpriteLayer::default()
    }];
    let text = encode(&post, None);
    let without_height: String = text
        .lines()
        .filter(|line| !line.starts_with("pixHeight="))
        .map(|line| format!("{line}\n"))
        .collect();
    let decoded = decode(&without_height).context("file without height decodes")?;
    assert_eq!(decoded.record.cached_height, -1);
    fs::write(dir.path().join(object_file_name(1)), without_height)?;

    let sprites = InMemorySprites::new().with(SpriteRecord::opaque(9, 12, 30));
    let mut store = open(dir.path(), sprites)?;
    assert_eq!(
        store.get_no_default(1).map(|record| record.cached_height),
        Some(-1)
    );
    assert_eq!(store.object_height(1), 15);
    assert_eq!(
        store.get_no_default(1).map(|record| record.cached_height),
        Some(15)
    );
    Ok(())
}

#[test]
fn edits_reach_the_folder_and_survive_a_reload() -> Result<()> {
    let dir = tempdir()?;
    write_object(dir.path(), &record(1, "Stone"))?;
    let mut store = open(dir.path(), InMemorySprites::new())?;

    let bowl = DecodedObject {
        record: record(0, "Clay Bowl"),
        tapout: None,
    };
    let bowl_id = store.add(bowl, None, true)?;
    assert!(dir.path().join(object_file_name(bowl_id)).exists());

    let replacement = DecodedObject {
        record: record(0, "Stone Tool"),
        tapout: None,
    };
    assert_eq!(store.add(replacement, Some(1), true)?, 1);
    assert_eq!(store.search("stone", 0, 10).ids(), vec![1]);

    let reloaded = open(dir.path(), InMemorySprites::new())?;
    assert_eq!(description(&reloaded, 1).as_deref(), Some("Stone Tool"));
    assert_eq!(description(&reloaded, bowl_id).as_deref(), Some("Clay Bowl"));

    let mut store = reloaded;
    assert!(store.remove(bowl_id)?);
    assert!(!dir.path().join(object_file_name(bowl_id)).exists());
    let reloaded = open(dir.path(), InMemorySprites::new())?;
    assert!(reloaded.get_no_default(bowl_id).is_none());
    assert_eq!(reloaded.default_id(), Some(1));
    Ok(())
}

#[test]
fn person_picks_alternate_sexes_within_a_race() -> Result<()> {
    let dir = tempdir()?;
    for (id, male) in [(1, true), (2, true), (3, false), (4, false)] {
        let mut person = record(id, if male { "Man" } else { "Woman" });
        person.race = 1;
        person.male = male;
        write_object(dir.path(), &person)?;
    }
    let mut store = open(dir.path(), InMemorySprites::new())?;
    assert_eq!(store.persons(), &[1, 2, 3, 4]);
    assert_eq!(store.female_persons(), &[3, 4]);
    assert_eq!(store.races(), vec![1]);
    assert_eq!(store.race_members(1), &[1, 3, 2, 4]);

    for _ in 0..8 {
        let woman = store.random_female_person().expect("a woman exists");
        assert!([3, 4].contains(&woman));
    }
    assert_eq!(store.next_person(4), Some(1));
    assert_eq!(store.prev_person(1), Some(4));
    Ok(())
}
