use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use fnanno::config::{default_config_path, load_config};
use fnanno::logger;
use fnanno::models::Annotation;
use fnanno::{AnnotationDecoder, AnnotationEncoder, CodecConfig};

#[derive(Parser, Debug)]
#[command(name = "fnanno", version)]
#[command(about = "Convert annotations to and from the FnAnno XML format")]
struct Cli {
    /// Config file; defaults to the per-user config directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a JSON annotation as FnAnno XML
    Encode {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
        /// Content element index used in F_NAME; overrides the config
        #[arg(long)]
        index: Option<u32>,
    },
    /// Read FnAnno XML and print the annotation as JSON
    Decode {
        #[arg(long)]
        input: PathBuf,
        /// MIME type of the annotated content
        #[arg(long)]
        mime: String,
    },
}

fn main() -> anyhow::Result<()> {
    logger::init_logging();
    let cli = Cli::parse();
    let config = resolve_config(cli.config.as_deref())?;

    match cli.command {
        Command::Encode { input, output, index } => {
            let content = fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let annotation: Annotation = serde_json::from_str(&content).with_context(|| {
                format!("Failed to parse annotation JSON in {}", input.display())
            })?;

            let encoder = AnnotationEncoder::from_config(&config)?;
            let index = index.unwrap_or(config.content_element_index);
            match output {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    let mut writer = BufWriter::new(file);
                    encoder.write_annotation(&mut writer, &annotation, index)?;
                }
                None => {
                    let mut stdout = io::stdout().lock();
                    encoder.write_annotation(&mut stdout, &annotation, index)?;
                    writeln!(stdout)?;
                }
            }
            tracing::info!(
                "Encoded {} annotation {}",
                annotation.kind.name(),
                annotation.id()
            );
        }
        Command::Decode { input, mime } => {
            let file = File::open(&input)
                .with_context(|| format!("Failed to open {}", input.display()))?;
            let decoder = AnnotationDecoder::from_config(&config);
            if let Some(annotation) = decoder.decode_reader(file, &mime)? {
                println!("{}", serde_json::to_string_pretty(&annotation)?);
            }
        }
    }

    Ok(())
}

fn resolve_config(path: Option<&Path>) -> anyhow::Result<CodecConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => default_config_path()?,
    };
    load_config(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}
