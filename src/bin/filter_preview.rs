// Render one still image through every filter in the catalog

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;
use tracing::info;

use sketch_video::filters::FilterId;

#[derive(Parser)]
#[command(name = "filter-preview", about = "Preview every sketch-video filter on a single image")]
struct Args {
    /// Image to filter
    input: PathBuf,

    /// Directory for the previews (one PNG per filter)
    #[arg(short, long, default_value = "previews")]
    output_dir: PathBuf,

    /// Only render these filters (comma separated)
    #[arg(short, long, value_delimiter = ',')]
    filters: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let image = image::open(&args.input)
        .with_context(|| format!("could not open {}", args.input.display()))?
        .to_rgb8();
    info!("Loaded {} ({}x{})", args.input.display(), image.width(), image.height());

    let selected: Vec<FilterId> = if args.filters.is_empty() {
        FilterId::ALL.to_vec()
    } else {
        args.filters
            .iter()
            .map(|id| id.parse::<FilterId>().map_err(|e| anyhow::anyhow!(e.user_message())))
            .collect::<Result<_>>()?
    };

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("could not create {}", args.output_dir.display()))?;

    selected.par_iter().try_for_each(|id| -> Result<()> {
        let target = args.output_dir.join(format!("{}.png", id.as_str()));
        id.apply(&image)
            .save(&target)
            .with_context(|| format!("could not write {}", target.display()))?;
        info!("{:<18} -> {}", id.as_str(), target.display());
        Ok(())
    })?;

    info!("Wrote {} previews to {}", selected.len(), args.output_dir.display());
    Ok(())
}
