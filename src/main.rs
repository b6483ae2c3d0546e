use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use copperwall::build::{build_site, plan_pages};
use copperwall::config::Config;
use copperwall::pages::write_listing;

#[derive(Parser)]
#[command(name = "copperwall", version, about = "Builds a static blog from Markdown posts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the site into the output directory
    Build {
        /// The project directory (or any directory below it)
        #[arg(default_value = ".")]
        project: PathBuf,

        /// Where to write the site; defaults to `public` beside the project file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the pages a build would write, without writing them
    Pages {
        #[arg(default_value = ".")]
        project: PathBuf,
    },
}

fn main() {
    if let Err(err) = main_result() {
        eprintln!("Error: {:?}", err);
        std::process::exit(1);
    }
}

fn main_result() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Commands::Build { project, output } => {
            let config = Config::from_directory(&project, output.as_deref())?;
            let summary = build_site(&config).with_context(|| {
                format!("building site into `{}`", config.output_directory.display())
            })?;
            log::info!(
                "built {} posts into {} pages ({} assets) at `{}`",
                summary.posts,
                summary.pages,
                summary.assets,
                config.output_directory.display()
            );
        }
        Commands::Pages { project } => {
            let config = Config::from_directory(&project, None)?;
            let (_, pages) = plan_pages(&config)?;
            write_listing(&pages, &mut std::io::stdout().lock())?;
        }
    }
    Ok(())
}
