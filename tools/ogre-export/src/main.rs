//! ogre-export - Ogre interchange and PhysX collision tool
//!
//! Exports host scene snapshots (JSON) to `.mesh.xml` / `.skeleton.xml` /
//! `.material` and `.repx` / NXUSTREAM2 collision files, and imports Ogre
//! meshes back into a JSON dump.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use ogre_export::config::{CollisionFormat, ObjectSelection, RootTransform};
use ogre_export::{HostScene, ToolConfig, export_collision, export_mesh, import_mesh};

#[derive(Parser)]
#[command(name = "ogre-export")]
#[command(about = "Ogre mesh/skeleton XML and PhysX collision exporter")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./ogre-export.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export selected meshes (and their skeleton) from a scene snapshot
    Export {
        /// Scene snapshot (JSON)
        scene: PathBuf,

        /// Output mesh file, or directory with --batch
        #[arg(short, long)]
        output: PathBuf,

        /// One file per selected object
        #[arg(long)]
        batch: bool,

        /// Export the armature and its actions
        #[arg(long)]
        skeleton: bool,

        /// XML converter executable
        #[arg(long)]
        converter: Option<PathBuf>,
    },

    /// Import a .mesh or .mesh.xml file
    Import {
        /// Input mesh file
        input: PathBuf,

        /// Write the imported scene as JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// XML converter executable
        #[arg(long)]
        converter: Option<PathBuf>,
    },

    /// Export rigid bodies as a collision document
    Collision {
        /// Scene snapshot (JSON)
        scene: PathBuf,

        /// Output file; the format's extension is appended when missing
        #[arg(short, long)]
        output: PathBuf,

        /// Write PhysX 2.8 NXUSTREAM2 instead of RepX
        #[arg(long)]
        legacy: bool,

        /// Which objects to export
        #[arg(long, value_enum)]
        objects: Option<ObjectSelection>,

        /// Frame the shapes are written in
        #[arg(long, value_enum)]
        transform: Option<RootTransform>,

        /// Write a dynamic actor
        #[arg(long)]
        dynamic: bool,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ToolConfig::load_or_default(cli.config.as_deref())?;

    let cancelled = match cli.command {
        Commands::Export {
            scene,
            output,
            batch,
            skeleton,
            converter,
        } => {
            let export = &mut config.export;
            export.batch_export |= batch;
            if skeleton {
                export.export_skeleton = true;
                export.export_animation = true;
            }
            if converter.is_some() {
                export.xml_converter_path = converter;
            }

            tracing::info!("Exporting {:?} -> {:?}", scene, output);
            let scene = HostScene::load(&scene)?;
            let outcome = export_mesh(&scene, &output, export)?;
            outcome.report("Export");
            outcome.is_cancelled()
        }

        Commands::Import {
            input,
            output,
            converter,
        } => {
            if converter.is_some() {
                config.import.xml_converter_path = converter;
            }
            let outcome = import_mesh(&input, &config.import)?;
            outcome.report("Import");
            if let Some(scene) = &outcome.value {
                let json = serde_json::to_string_pretty(scene)?;
                match output {
                    Some(path) => {
                        std::fs::write(&path, json)
                            .with_context(|| format!("Failed to write {:?}", path))?;
                        tracing::info!("Wrote {:?}", path);
                    }
                    None => println!("{}", json),
                }
            }
            outcome.is_cancelled()
        }

        Commands::Collision {
            scene,
            output,
            legacy,
            objects,
            transform,
            dynamic,
        } => {
            let collision = &mut config.collision;
            if legacy {
                collision.format = CollisionFormat::Nxustream;
            }
            if let Some(objects) = objects {
                collision.objects = objects;
            }
            if let Some(transform) = transform {
                collision.root_transform = transform;
            }
            collision.dynamic |= dynamic;

            let scene = HostScene::load(&scene)?;
            let outcome = export_collision(&scene, &output, collision)?;
            outcome.report("Collision export");
            outcome.is_cancelled()
        }
    };

    if cancelled {
        std::process::exit(2);
    }
    Ok(())
}
