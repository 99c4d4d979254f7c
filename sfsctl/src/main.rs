// SPDX-License-Identifier: MIT

mod config;
mod utils;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use sfs::prelude::*;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::utils::LogLevel;

type ImageFs = Sfs<StdBlockIO<File>>;

#[derive(Parser)]
#[command(name = "sfsctl", version, about = "Simple File System image tool", long_about = None)]
struct Cli {
    /// Print every step
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Geometry file (block_size, block_count, inode_count, direct_count, max_open)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new image and write an empty volume to it
    Format {
        image: PathBuf,
        /// Also zero the data region
        #[arg(long)]
        full: bool,
    },
    /// List the files of a volume
    Ls { image: PathBuf },
    /// Copy a host file into the volume, replacing any file of the same name
    Put {
        image: PathBuf,
        file: PathBuf,
        /// Name inside the volume (defaults to the host file name)
        #[arg(long)]
        name: Option<String>,
    },
    /// Print a file's content
    Cat {
        image: PathBuf,
        name: String,
        /// Write to a host file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete a file
    Rm { image: PathBuf, name: String },
    /// Show inode, size and block usage of a file
    Stat { image: PathBuf, name: String },
    /// Verify the volume metadata
    Check { image: PathBuf },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    utils::init(LogLevel::from_flags(cli.verbose, cli.quiet));

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Format { image, full } => format(&image, &config, full),
        Commands::Ls { image } => list(&mut mount(&image, &config)?),
        Commands::Put { image, file, name } => {
            put(&mut mount(&image, &config)?, &file, name.as_deref())
        }
        Commands::Cat {
            image,
            name,
            output,
        } => cat(&mut mount(&image, &config)?, &name, output.as_deref()),
        Commands::Rm { image, name } => {
            mount(&image, &config)?.remove(&name)?;
            log_info!("Removed '{name}'");
            Ok(())
        }
        Commands::Stat { image, name } => stat(&mut mount(&image, &config)?, &name),
        Commands::Check { image } => check(&mut mount(&image, &config)?),
    }
}

/// Opens an existing image, taking the geometry from its superblock.
fn mount(image: &Path, config: &Config) -> anyhow::Result<ImageFs> {
    let mut io = StdBlockIO::open_file(image)
        .with_context(|| format!("cannot open image {}", image.display()))?;
    let mut meta = SfsMeta::from_io(&mut io)?;
    if let Some(max_open) = config.max_open {
        meta.max_open = max_open;
    }
    log_verbose!(
        "Mounting {} ({} x {} bytes, {} inodes)",
        image.display(),
        meta.block_count,
        meta.block_size,
        meta.inode_count
    );
    Ok(Sfs::mount(io, meta)?)
}

fn format(image: &Path, config: &Config, full: bool) -> anyhow::Result<()> {
    config.validate()?;
    let meta = config.meta();

    log_info!(
        "Formatting {} ({} blocks of {} bytes, {} inodes x {} pointers)",
        image.display(),
        meta.block_count,
        meta.block_size,
        meta.inode_count,
        meta.direct_count
    );
    let mut io = StdBlockIO::create_file(image, meta.size_bytes())
        .with_context(|| format!("cannot create image {}", image.display()))?;
    SfsFormatter::new(&mut io, &meta)
        .format(full)
        .map_err(FsError::from)?;

    let vol = Sfs::mount(io, meta)?;
    log_info!(
        "Done: {} data blocks, {} bytes per inode",
        vol.free_blocks(),
        meta.capacity_per_inode()
    );
    Ok(())
}

fn list(vol: &mut ImageFs) -> anyhow::Result<()> {
    let files: Vec<(String, u32)> = vol.files().collect();
    println!("  {:<12} {:>6} {:>10}", "Name".bold(), "Inode".bold(), "Size".bold());
    for (name, inode) in &files {
        let size = vol.file_size(name)?;
        println!("  {name:<12} {inode:>6} {size:>10}");
    }
    log_info!(
        "{} files, {} free blocks, {} free inodes",
        files.len(),
        vol.free_blocks(),
        vol.free_inodes()
    );
    Ok(())
}

fn put(vol: &mut ImageFs, file: &Path, name: Option<&str>) -> anyhow::Result<()> {
    let name = match name {
        Some(name) => name.to_owned(),
        None => file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .context("host path has no file name")?,
    };
    let data = fs::read(file).with_context(|| format!("cannot read {}", file.display()))?;

    if vol.file_size(&name).is_ok() {
        log_verbose!("Replacing existing '{name}'");
        vol.remove(&name)?;
    }
    let fd = vol.open(&name)?;
    vol.write_all(fd, &data)
        .with_context(|| format!("writing '{name}' ({} bytes)", data.len()))?;
    vol.close(fd)?;

    log_info!("Stored '{name}' ({} bytes)", data.len());
    Ok(())
}

fn cat(vol: &mut ImageFs, name: &str, output: Option<&Path>) -> anyhow::Result<()> {
    vol.file_size(name)?;
    match output {
        Some(path) => {
            let mut file = File::create(path)
                .with_context(|| format!("cannot create {}", path.display()))?;
            let len = copy_out(vol, name, &mut file)?;
            log_info!("Wrote {len} bytes to {}", path.display());
        }
        None => {
            copy_out(vol, name, &mut std::io::stdout().lock())?;
        }
    }
    Ok(())
}

/// Writes the content of `name` to `sink`, nothing else.
fn copy_out<W: Write>(vol: &mut ImageFs, name: &str, sink: &mut W) -> anyhow::Result<usize> {
    // `open` would create a missing file
    vol.file_size(name)?;
    let fd = vol.open(name)?;
    let data = vol.read_to_vec(fd)?;
    vol.close(fd)?;

    sink.write_all(&data)?;
    sink.flush()?;
    Ok(data.len())
}

fn stat(vol: &mut ImageFs, name: &str) -> anyhow::Result<()> {
    vol.file_size(name)?;
    let fd = vol.open(name)?;
    let st = vol.stat(fd)?;
    vol.close(fd)?;

    let meta = *vol.meta();
    let blocks = (st.size as u64).div_ceil(meta.block_size as u64);
    let inodes = (st.size as u64).div_ceil(meta.capacity_per_inode()).max(1);
    println!("  {:<8} {name}", "Name".bold());
    println!("  {:<8} {}", "Inode".bold(), st.inode);
    println!("  {:<8} {} bytes", "Size".bold(), st.size);
    println!("  {:<8} {blocks} data, {inodes} inodes in chain", "Blocks".bold());
    Ok(())
}

fn check(vol: &mut ImageFs) -> anyhow::Result<()> {
    let report = vol.checker().scan().map_err(FsError::from)?;
    log_info!(
        "{} files, {} inodes ({} links), {} data blocks",
        report.files,
        report.inodes_used,
        report.link_inodes,
        report.blocks_used
    );

    if report.is_clean() {
        log_info!("{}", "Volume is consistent".green());
        return Ok(());
    }
    for issue in &report.issues {
        eprintln!("  {} {issue}", "x".red());
    }
    anyhow::bail!("{} issues found", report.issues.len())
}
