use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use object_formats::decode;

/// Decode an object definition file and print its fields.
#[derive(Parser)]
struct Args {
    /// Path to the object `.txt` file to inspect
    path: PathBuf,
    /// Print the whole decoded record as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let text = fs::read_to_string(&args.path)
        .with_context(|| format!("reading {}", args.path.display()))?;
    let decoded =
        decode(&text).with_context(|| format!("decoding {}", args.path.display()))?;
    let record = &decoded.record;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&decoded.record)?);
        return Ok(());
    }

    println!("object {}  {}", record.id, record.description);
    println!("slots: {}", record.slots.len());
    println!("uses: {}", record.num_uses);
    println!("biomes: {}", record.biomes_string());
    if record.is_person() {
        println!(
            "person race {}  {}",
            record.race,
            if record.male { "male" } else { "female" }
        );
    }
    if let Some(tapout) = &decoded.tapout {
        println!(
            "tapout {}",
            tapout.parameter_string().unwrap_or_else(|| "?".to_string())
        );
    }
    println!("sprites: {}", record.sprites.len());

    for (index, layer) in record.sprites.iter().enumerate() {
        println!(
            "{:>4}  sprite {:>6}  parent {:>3}  pos ({:>8.2}, {:>8.2})  rot {:.3}",
            index, layer.sprite, layer.parent, layer.pos.x, layer.pos.y, layer.rot
        );
    }

    Ok(())
}
