//! # Command-Line Entry Point
//!
//! ## Usage
//!
//! ```bash
//! imgpack validate photo.png
//! imgpack capacity photo.png --ratio 0.25
//! imgpack embed photo.png secret.pdf --output coded.png --password hunter2
//! imgpack decode coded.png --json
//! imgpack extract coded.png --dir ./out
//! ```
//!
//! All commands accept `--config FILE` (TOML, see `common::config`).

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use image::GenericImageView;
use log::info;

use imgpack::codec::{self, capacity, CodecError, Eligibility, PayloadKind};
use imgpack::common::config::AppConfig;
use imgpack::processing;
use imgpack::utils::init_logger;

/// Command-line arguments for the imgpack binary
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (TOML format)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check whether an image can carry a frame
    Validate { image: PathBuf },

    /// Print the frame capacity of an image in bytes
    Capacity {
        image: PathBuf,
        /// Override the configured embed ratio
        #[arg(long)]
        ratio: Option<f64>,
    },

    /// Detect a frame and print its header
    Decode {
        image: PathBuf,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the embedded file out
    Extract {
        image: PathBuf,
        /// Destination file (defaults to the stored name inside --dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },

    /// Embed a file into an image and save the result as PNG
    Embed {
        image: PathBuf,
        file: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Name to store instead of the file's own name
        #[arg(long)]
        name: Option<String>,
        /// Stored as plain metadata, not used for encryption
        #[arg(long)]
        password: Option<String>,
        /// Override the configured embed ratio
        #[arg(long)]
        ratio: Option<f64>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::load_or_default(args.config.as_deref())?;
    init_logger(&config.log, &config.app.name)?;

    match args.command {
        Command::Validate { image } => {
            let img = image::open(&image)?;
            match codec::validate(&img) {
                Eligibility::Eligible => println!("{}: eligible", image.display()),
                Eligibility::Ineligible { layout } => {
                    println!("{}: ineligible ({layout})", image.display())
                }
            }
        }

        Command::Capacity { image, ratio } => {
            let ratio = ratio.unwrap_or(config.codec.embed_ratio);
            config.codec = config.codec.with_ratio(ratio);
            config.codec.validate()?;

            let img = image::open(&image)?;
            if let Eligibility::Ineligible { layout } = codec::validate(&img) {
                return Err(CodecError::IneligibleImage { layout }.into());
            }
            let (width, height) = img.dimensions();
            println!("{}", capacity(width, height, ratio));
        }

        Command::Decode { image, json } => {
            let report = processing::inspect_file(&image, &config.codec)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if !report.eligible {
                println!("ineligible image");
            } else {
                match report.header {
                    None => println!("not coded"),
                    Some(header) => {
                        println!("coded");
                        if header.password_flag {
                            println!("  password: {}", header.password);
                        }
                        match header.kind {
                            PayloadKind::File { name, length } => {
                                println!("  file:     {name}");
                                println!("  length:   {length}");
                            }
                            PayloadKind::Other { code } => println!("  type:     {code}"),
                        }
                    }
                }
            }
        }

        Command::Extract { image, output, dir } => {
            let (header, path, written) =
                processing::extract_file(&image, output.as_deref(), &dir, &config.codec)?;
            if header.password_flag {
                info!("frame carries password metadata");
            }
            println!("{} bytes -> {}", written, path.display());
        }

        Command::Embed {
            image,
            file,
            output,
            name,
            password,
            ratio,
        } => {
            if let Some(ratio) = ratio {
                config.codec = config.codec.with_ratio(ratio);
            }
            if output.extension().map_or(true, |ext| !ext.eq_ignore_ascii_case("png")) {
                bail!("output must be a .png file, lossy formats destroy the frame");
            }
            let summary = processing::embed_file(
                &image,
                &file,
                &output,
                name.as_deref(),
                password.as_deref(),
                &config.codec,
            )?;
            println!(
                "{} -> {} ({} header + {} payload bytes, capacity {})",
                file.display(),
                output.display(),
                summary.header_bytes,
                summary.payload_bytes,
                summary.capacity
            );
        }
    }

    Ok(())
}
