//! `omrlabel` command line: label rendered pages, review the labels, and
//! generate synthetic scores to render.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use omrlabel::batch::{run_batch, BatchConfig};
use omrlabel::generator::{generate_dir, GeneratorConfig};
use omrlabel::review::review_dir;
use omrlabel::{CalibrationProfile, HorizontalPolicy, MeasureGrid};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Log every file and label (same as RUST_LOG=debug)
    #[clap(short = 'v', long, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write one YOLO annotation file per rendered page
    Label {
        /// Rendered page images (PNG or JPEG)
        #[clap(long, default_value = "data/png")]
        image_dir: PathBuf,

        /// MusicXML documents the pages were rendered from
        #[clap(long, default_value = "data/xml")]
        notation_dir: PathBuf,

        /// Where annotation files are written
        #[clap(long, default_value = "data/labels")]
        label_dir: PathBuf,

        /// Calibration profile (JSON); the reference setup if omitted
        #[clap(short, long)]
        calibration: Option<PathBuf>,

        /// Use a uniform measure grid instead of proportional spacing
        #[clap(long)]
        per_measure: bool,

        /// Part to label, counting from 0
        #[clap(long, default_value_t = 0)]
        part: usize,

        /// Append each finished annotation path to this file
        #[clap(long)]
        completion_log: Option<PathBuf>,

        /// Write the batch summary as JSON
        #[clap(long)]
        report: Option<PathBuf>,
    },

    /// Draw annotation boxes over their pages as SVG overlays
    Review {
        #[clap(long, default_value = "data/labels")]
        label_dir: PathBuf,

        #[clap(long, default_value = "data/png")]
        image_dir: PathBuf,

        #[clap(long, default_value = "output/visualized_boxes")]
        output_dir: PathBuf,
    },

    /// Write random single-part scores as MusicXML
    Generate {
        #[clap(long, default_value = "data/xml")]
        out_dir: PathBuf,

        /// Number of scores
        #[clap(short = 'n', long, default_value_t = 20)]
        count: usize,

        /// Events per score
        #[clap(long, default_value_t = 4)]
        length: usize,

        #[clap(long, default_value_t = 0)]
        seed: u64,

        /// Probability that a note gets a second chord tone
        #[clap(long, default_value_t = 0.0)]
        chord_probability: f64,
    },

    /// Print the reference calibration profile as JSON
    Calibration,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match args.command {
        Command::Label {
            image_dir,
            notation_dir,
            label_dir,
            calibration,
            per_measure,
            part,
            completion_log,
            report,
        } => {
            let mut profile = match &calibration {
                Some(path) => CalibrationProfile::load(path)
                    .with_context(|| format!("cannot load calibration '{}'", path.display()))?,
                None => CalibrationProfile::default(),
            };
            if per_measure && profile.horizontal == HorizontalPolicy::Proportional {
                profile.horizontal = HorizontalPolicy::PerMeasure(MeasureGrid::default());
            }

            let config = BatchConfig {
                image_dir,
                notation_dir,
                label_dir,
                part_index: part,
                completion_log,
            };
            let summary = run_batch(&config, &profile)
                .with_context(|| format!("cannot label '{}'", config.image_dir.display()))?;

            println!(
                "labeled {} files ({} noteheads), skipped {}",
                summary.succeeded.len(),
                summary.label_count(),
                summary.skipped.len()
            );
            for (kind, count) in summary.skipped_by_kind() {
                println!("  {kind:?}: {count}");
            }
            if let Some(path) = report {
                std::fs::write(&path, summary.to_json()?)
                    .with_context(|| format!("cannot write report '{}'", path.display()))?;
            }
        }
        Command::Review {
            label_dir,
            image_dir,
            output_dir,
        } => {
            let summary = review_dir(&label_dir, &image_dir, &output_dir)
                .with_context(|| format!("cannot review '{}'", label_dir.display()))?;
            println!(
                "rendered {} overlays into {}, skipped {}",
                summary.rendered,
                output_dir.display(),
                summary.skipped
            );
        }
        Command::Generate {
            out_dir,
            count,
            length,
            seed,
            chord_probability,
        } => {
            let config = GeneratorConfig {
                length,
                chord_probability,
                ..GeneratorConfig::default()
            };
            let written = generate_dir(&out_dir, count, &config, seed)
                .with_context(|| format!("cannot write scores to '{}'", out_dir.display()))?;
            println!("generated {} scores in {}", written.len(), out_dir.display());
        }
        Command::Calibration => {
            println!("{}", CalibrationProfile::default().to_json()?);
        }
    }
    Ok(())
}
