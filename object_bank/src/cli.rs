use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    about = "Loads an object folder and inspects, searches or draws its objects",
    version
)]
pub struct Args {
    /// Directory holding the numbered object files
    #[arg(long, default_value = "objects")]
    pub objects: PathBuf,

    /// Optional JSON bank configuration
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// JSON array of sprite records used for drawing and picking
    #[arg(long)]
    pub sprites: Option<PathBuf>,

    /// Seed for random person picks (overrides the configuration)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Path to write the load report as JSON
    #[arg(long)]
    pub report_json: Option<PathBuf>,

    /// Case-insensitive description search; empty lists the newest objects
    #[arg(long)]
    pub search: Option<String>,

    /// Search results to skip
    #[arg(long, default_value_t = 0)]
    pub skip: usize,

    /// Search results to show
    #[arg(long, default_value_t = 20)]
    pub take: usize,

    /// Print one object
    #[arg(long, value_name = "ID")]
    pub show: Option<i32>,

    /// Print the show output as JSON
    #[arg(long)]
    pub json: bool,

    /// List the sprite draws of one object placed at the origin
    #[arg(long, value_name = "ID")]
    pub draw: Option<i32>,

    /// Age used when drawing persons
    #[arg(long, default_value_t = -1.0, allow_hyphen_values = true)]
    pub age: f64,

    /// Draw mirrored
    #[arg(long)]
    pub flip: bool,

    /// Report the part under this point (requires --draw)
    #[arg(long, num_args = 2, value_names = ["X", "Y"], allow_hyphen_values = true)]
    pub hit: Option<Vec<f64>>,
}

#[derive(Debug)]
pub enum Command {
    Summary,
    Search {
        query: String,
        skip: usize,
        take: usize,
    },
    Show {
        id: i32,
        json: bool,
    },
    Draw(DrawArgs),
}

#[derive(Debug)]
pub struct DrawArgs {
    pub id: i32,
    pub age: f64,
    pub flip: bool,
    pub hit: Option<(f64, f64)>,
}

#[derive(Debug)]
pub struct Invocation {
    pub objects: PathBuf,
    pub config: Option<PathBuf>,
    pub sprites: Option<PathBuf>,
    pub seed: Option<u64>,
    pub report_json: Option<PathBuf>,
    pub command: Command,
}

pub fn parse() -> Result<Invocation> {
    let args = Args::parse();
    args.into_invocation()
}

impl Args {
    fn into_invocation(self) -> Result<Invocation> {
        let modes = [self.search.is_some(), self.show.is_some(), self.draw.is_some()]
            .iter()
            .filter(|set| **set)
            .count();
        if modes > 1 {
            bail!("--search, --show and --draw are mutually exclusive");
        }
        if self.hit.is_some() && self.draw.is_none() {
            bail!("--hit requires --draw");
        }
        if self.json && self.show.is_none() {
            bail!("--json requires --show");
        }

        let command = if let Some(query) = self.search {
            Command::Search {
                query,
                skip: self.skip,
                take: self.take,
            }
        } else if let Some(id) = self.show {
            Command::Show {
                id,
                json: self.json,
            }
        } else if let Some(id) = self.draw {
            let hit = match self.hit.as_deref() {
                Some([x, y]) => Some((*x, *y)),
                Some(_) => bail!("--hit takes exactly two coordinates"),
                None => None,
            };
            Command::Draw(DrawArgs {
                id,
                age: self.age,
                flip: self.flip,
                hit,
            })
        } else {
            Command::Summary
        };

        Ok(Invocation {
            objects: self.objects,
            config: self.config,
            sprites: self.sprites,
            seed: self.seed,
            report_json: self.report_json,
            command,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation(args: &[&str]) -> Result<Invocation> {
        let mut argv = vec!["object_bank"];
        argv.extend_from_slice(args);
        Args::try_parse_from(argv)?.into_invocation()
    }

    #[test]
    fn defaults_to_summary() {
        let parsed = invocation(&[]).expect("no arguments is valid");
        assert!(matches!(parsed.command, Command::Summary));
        assert_eq!(parsed.objects, PathBuf::from("objects"));
    }

    #[test]
    fn hit_needs_a_draw() {
        assert!(invocation(&["--hit", "1", "2"]).is_err());
        let parsed = invocation(&["--draw", "5", "--hit", "-3", "4.5"]).expect("draw with hit");
        match parsed.command {
            Command::Draw(draw) => assert_eq!(draw.hit, Some((-3.0, 4.5))),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn modes_are_exclusive() {
        assert!(invocation(&["--search", "bowl", "--show", "3"]).is_err());
        assert!(invocation(&["--json"]).is_err());
    }
}
