//! gmdc - GMDC/CRES resource file tool
//!
//! Inspects resource files, checks that they re-encode byte for byte, and
//! converts geometry between OBJ and geometry data containers.

use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use gmdc_mesh::{ExportOptions, ImportOptions, MorphExport};
use gmdc_tools::{export, extract, inspect};

#[derive(Parser)]
#[command(name = "gmdc")]
#[command(about = "GMDC/CRES resource file tool")]
#[command(version)]
struct Cli {
    /// Verbose output (debug logging, full node dumps)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the nodes of a resource file
    Info {
        /// Input .cres/.gmdc/.5gd file
        input: PathBuf,
    },

    /// Decode and re-encode a file, comparing the bytes
    Verify {
        /// Input resource file
        input: PathBuf,
    },

    /// Print the transform hierarchy of a skeleton
    Skeleton {
        /// Input .cres file
        input: PathBuf,
    },

    /// Pack OBJ meshes into a geometry resource file
    Export {
        /// Input OBJ files; every object becomes one mesh
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output .5gd file
        #[arg(short, long)]
        output: PathBuf,

        /// Resource name (default: output file name)
        #[arg(long)]
        name: Option<String>,

        /// Append the locator suffix to the resource name
        #[arg(long)]
        locator_suffix: bool,

        /// Export per-corner tangents
        #[arg(long)]
        tangents: bool,

        /// Morph export: none, positions or normals
        #[arg(long, default_value = "none")]
        morphs: MorphExport,

        /// Shape key as NAME=FILE.obj (repeatable)
        #[arg(long = "shape-key", value_parser = export::parse_shape_key_arg)]
        shape_keys: Vec<(String, PathBuf)>,

        /// OBJ holding the bounding shape
        #[arg(long)]
        shape: Option<PathBuf>,

        /// Skeleton .cres file; enables rigging
        #[arg(long)]
        cres: Option<PathBuf>,

        /// Honor object name/flags/selection properties
        #[arg(long)]
        use_properties: bool,
    },

    /// Unpack a geometry resource file into OBJ files
    Extract {
        /// Input .5gd/.gmdc file
        input: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Skeleton .cres file for bone names and dynamic bounding shapes
        #[arg(long)]
        cres: Option<PathBuf>,

        /// Also write the bounding shapes
        #[arg(long)]
        bounding: bool,

        /// Merge duplicate vertices first
        #[arg(long)]
        remove_doubles: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    match cli.command {
        Commands::Info { input } => {
            let file = inspect::load(&input)?;
            println!("{}", inspect::info_report(&file, cli.verbose));
        }

        Commands::Verify { input } => {
            let data = fs::read(&input)?;
            let report = inspect::verify_bytes(&data)?;
            match report.first_difference {
                None => tracing::info!(
                    "{:?}: {} nodes, {} bytes re-encoded identically",
                    input,
                    report.nodes,
                    report.size
                ),
                Some(offset) => anyhow::bail!(
                    "{:?}: re-encoded file differs at byte {} ({} bytes in, {} bytes out)",
                    input,
                    offset,
                    report.size,
                    report.encoded_size
                ),
            }
        }

        Commands::Skeleton { input } => {
            let tree = inspect::load_skeleton(&input)?;
            println!("{}", tree);
        }

        Commands::Export {
            inputs,
            output,
            name,
            locator_suffix,
            tangents,
            morphs,
            shape_keys,
            shape,
            cres,
            use_properties,
        } => {
            let options = ExportOptions::new()
                .with_rigging(cres.is_some())
                .with_tangents(tangents)
                .with_morphs(morphs)
                .with_use_properties(use_properties);
            let settings = export::ExportSettings {
                name,
                locator_suffix,
                options,
                shape,
                skeleton: cres,
                shape_keys,
            };
            tracing::info!("Exporting {:?} -> {:?}", inputs, output);
            let summary = export::export_objs(&inputs, &output, &settings)?;
            if summary.warnings > 0 {
                tracing::warn!("Finished with {} warnings", summary.warnings);
            }
            tracing::info!("Done!");
        }

        Commands::Extract {
            input,
            output,
            cres,
            bounding,
            remove_doubles,
        } => {
            let settings = extract::ExtractSettings {
                skeleton: cres,
                options: ImportOptions::new()
                    .with_import_bounding_mesh(bounding)
                    .with_remove_doubles(remove_doubles),
            };
            tracing::info!("Extracting {:?} -> {:?}", input, output);
            for path in extract::extract(&input, &output, &settings)? {
                println!("{}", path.display());
            }
            tracing::info!("Done!");
        }
    }

    Ok(())
}
