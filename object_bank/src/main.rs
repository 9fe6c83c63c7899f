use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use object_bank::{
    load_bank, BankConfig, Compositor, DirFolder, DrawParams, HitOptions, HitTester,
    InMemoryAnimations, InMemorySprites, LoadReport, ObjectStore, Placement, SpriteDraw,
};

mod cli;
use cli::{Command, DrawArgs, Invocation};

fn main() -> Result<()> {
    env_logger::init();
    let invocation = cli::parse()?;

    let mut config = BankConfig::from_json_file(invocation.config.as_deref())
        .context("loading bank configuration")?;
    if let Some(seed) = invocation.seed {
        config.random_seed = Some(seed);
    }
    let sprites = match invocation.sprites.as_deref() {
        Some(path) => InMemorySprites::from_json_file(path).context("loading sprite manifest")?,
        None => InMemorySprites::new(),
    };

    let store = ObjectStore::new(
        config,
        Box::new(DirFolder::new(&invocation.objects)),
        Box::new(sprites),
        Box::new(InMemoryAnimations::new()),
    );
    let (store, report) = load_bank(store)
        .with_context(|| format!("loading objects from {}", invocation.objects.display()))?;

    if let Some(path) = invocation.report_json.as_deref() {
        write_report(path, &report)?;
    }

    run_command(&store, &report, invocation)
}

fn run_command(store: &ObjectStore, report: &LoadReport, invocation: Invocation) -> Result<()> {
    match invocation.command {
        Command::Summary => print_summary(store, report),
        Command::Search { query, skip, take } => {
            let page = store.search(&query, skip, take);
            for record in &page.records {
                println!("{:>6}  {}", record.id, record.description);
            }
            if page.remaining > 0 {
                println!("... {} more", page.remaining);
            }
        }
        Command::Show { id, json } => {
            let record = store
                .get_no_default(id)
                .with_context(|| format!("object {id} is not in the bank"))?;
            if json {
                let text = serde_json::to_string_pretty(record)
                    .context("serializing object record")?;
                println!("{text}");
            } else {
                println!("{}", object_formats::encode(record, store.tapout_record(id)));
            }
        }
        Command::Draw(args) => draw(store, &args)?,
    }
    Ok(())
}

fn print_summary(store: &ObjectStore, report: &LoadReport) {
    println!(
        "objects: {} loaded, {} skipped (max id {})",
        report.loaded,
        report.skipped,
        store.max_id()
    );
    match report.resolve.default_id {
        Some(id) => println!("default object: {id}"),
        None => println!("default object: none"),
    }
    println!(
        "persons: {} in {} races",
        store.persons().len(),
        store.races().len()
    );
    println!(
        "generated: {} use dummies, {} variable dummies",
        report.resolve.use_dummies, report.resolve.variable_dummies
    );
    println!(
        "tapouts: {}, trigger groups: {}, wall sets: {}",
        report.resolve.tapouts, report.resolve.trigger_groups, report.resolve.wall_sets
    );
    println!(
        "death markers: {}, foods: {}",
        store.death_markers().len(),
        store.food_ids().len()
    );
}

fn draw(store: &ObjectStore, args: &DrawArgs) -> Result<()> {
    store
        .get_no_default(args.id)
        .with_context(|| format!("object {} is not in the bank", args.id))?;

    let params = DrawParams::at(Placement::default().flipped(args.flip)).with_age(args.age);

    let mut draws: Vec<SpriteDraw> = Vec::new();
    let holding = Compositor::new(store).draw(args.id, &params, &[], &mut draws);
    info!("object {} drew {} sprites", args.id, draws.len());

    for draw in &draws {
        println!(
            "layer {:>3}  sprite {:>6}  at ({:.1}, {:.1})  rot {:.3}{}",
            draw.layer,
            draw.sprite,
            draw.pos.x,
            draw.pos.y,
            draw.rot,
            if draw.flip { "  flipped" } else { "" }
        );
    }
    if let Some(holding) = holding {
        println!(
            "holding at ({:.1}, {:.1}) rot {:.3}",
            holding.pos.x, holding.pos.y, holding.rot
        );
    }

    if let Some((x, y)) = args.hit {
        let hit = HitTester::new(store).closest_part(
            args.id,
            &params,
            &[],
            glam::DVec2::new(x, y),
            &HitOptions::default(),
        );
        match (hit.sprite, hit.clothing) {
            (Some(layer), None) if hit.is_direct() => println!("hit layer {layer}"),
            (_, Some(slot)) => println!("hit clothing slot {slot}"),
            _ => println!("no hit"),
        }
    }
    Ok(())
}

fn write_report(path: &Path, report: &LoadReport) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    let json = serde_json::to_string_pretty(report).context("serializing load report")?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    println!("saved load report to {}", path.display());
    Ok(())
}
