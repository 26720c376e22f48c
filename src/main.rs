use clap::{Parser, Subcommand};
use imgpipe::config::PipeConfig;
use imgpipe::processor::ProcessOutput;
use imgpipe::store::ByteStore;
use imgpipe::{ImageProcessor, LocalStore, StyleProcessor};
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Extensions the batch command treats as source images.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "tif", "tiff"];

#[derive(Parser)]
#[command(name = "imgpipe")]
#[command(version)]
#[command(about = "URL-driven image transformation pipeline")]
#[command(long_about = "\
URL-driven image transformation pipeline

An instruction is a slash-delimited sequence of operations with
comma-separated parameters, applied in order:

  image/resize,w_100,h_100/rounded-corners,r_10/format,png

Styles are named instructions stored in the [styles] table of pipe.toml and
invoked as style/<name>:

  imgpipe process photo.jpg style/thumb

Run 'imgpipe actions' for the registered operations and
'imgpipe gen-config' for a documented pipe.toml.")]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = "pipe.toml", global = true)]
    config: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply an instruction to one image
    Process {
        /// Source image file
        source: PathBuf,
        /// Instruction, e.g. image/resize,w_100/format,png or style/<name>
        instruction: String,
        /// Output file (default: <stem>-out.<ext> beside the source)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Encode WebP when the instruction names no format
        #[arg(long)]
        auto_webp: bool,
        /// Print the output info block as JSON
        #[arg(long)]
        json: bool,
    },
    /// Apply one instruction to every image under a directory
    Batch {
        /// Source directory, walked recursively
        source: PathBuf,
        /// Instruction applied to every image
        instruction: String,
        /// Output directory (default: <source>/derived)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Max parallel workers (default: CPU cores)
        #[arg(long)]
        jobs: Option<usize>,
        /// Encode WebP when the instruction names no format
        #[arg(long)]
        auto_webp: bool,
    },
    /// List the registered actions
    Actions,
    /// Print a stock pipe.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    match cli.command {
        Command::Process {
            source,
            instruction,
            output,
            auto_webp,
            json,
        } => {
            let config = PipeConfig::load_or_default(&cli.config)?;
            let result = run_one(&source, &instruction, &config, auto_webp)?;
            let out_path = output.unwrap_or_else(|| derived_name(&source, &result));
            std::fs::write(&out_path, &result.data)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result.info)?);
            } else {
                println!(
                    "{} -> {} ({}x{} {}, {} bytes)",
                    source.display(),
                    out_path.display(),
                    result.info.width,
                    result.info.height,
                    result.info.format,
                    result.data.len()
                );
            }
        }
        Command::Batch {
            source,
            instruction,
            output,
            jobs,
            auto_webp,
        } => {
            let config = PipeConfig::load_or_default(&cli.config)?;
            init_thread_pool(jobs);
            let out_dir = output.unwrap_or_else(|| source.join("derived"));
            run_batch(&source, &out_dir, &instruction, &config, auto_webp)?;
        }
        Command::Actions => {
            for name in imgpipe::ActionRegistry::global().names() {
                println!("{name}");
            }
        }
        Command::GenConfig => {
            print!("{}", PipeConfig::stock_toml());
        }
    }

    Ok(())
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    simple_logger::SimpleLogger::new()
        .with_level(level)
        .init()
        .ok();
}

/// Initialize the rayon thread pool. Caps at the number of available CPU
/// cores — the user can constrain down, not up.
fn init_thread_pool(jobs: Option<usize>) {
    let Some(jobs) = jobs else { return };
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.min(cores).max(1))
        .build_global()
        .ok();
}

/// Process a single file through the pipeline.
fn run_one(
    source: &Path,
    instruction: &str,
    config: &PipeConfig,
    auto_webp: bool,
) -> Result<ProcessOutput, Box<dyn std::error::Error>> {
    let parent = source.parent().unwrap_or(Path::new("."));
    let key = source
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or("source has no file name")?;
    let store = LocalStore::new(parent);
    process_key(&store, key, instruction, config, auto_webp).map_err(Into::into)
}

/// Process one store key; shared by the single and batch paths.
fn process_key(
    store: &dyn ByteStore,
    key: &str,
    instruction: &str,
    config: &PipeConfig,
    auto_webp: bool,
) -> imgpipe::Result<ProcessOutput> {
    let processor = ImageProcessor::global();
    let mut ctx = processor.new_context(key, instruction, store)?;
    ctx.features = config.request_features();
    if auto_webp {
        ctx.features.auto_webp = true;
    }
    ctx.handle.encode_settings_mut().quality = Some(config.output.quality as u8);

    if instruction_is_style(instruction) {
        let styles = config.style_store();
        let style_processor = StyleProcessor::new(&styles, processor);
        style_processor.process(&mut ctx)
    } else {
        processor.process(&mut ctx)
    }
}

fn instruction_is_style(instruction: &str) -> bool {
    instruction
        .split('/')
        .next()
        .is_some_and(|segment| segment == StyleProcessor::NAME)
}

/// Default output path: `<stem>-out.<ext>` beside the source, extension
/// from the encoded format.
fn derived_name(source: &Path, result: &ProcessOutput) -> PathBuf {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    source.with_file_name(format!(
        "{stem}-out.{}",
        result.info.format.extension()
    ))
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
}

/// Walk the source directory and process every image in parallel. Derived
/// outputs are content-addressed: `<stem>-<hash8>.<ext>` where the hash
/// covers source bytes and instruction, so re-running with the same inputs
/// overwrites rather than multiplies.
fn run_batch(
    source: &Path,
    out_dir: &Path,
    instruction: &str,
    config: &PipeConfig,
    auto_webp: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = LocalStore::new(source);
    let sink = LocalStore::new(out_dir);
    std::fs::create_dir_all(out_dir)?;

    let keys: Vec<String> = walkdir::WalkDir::new(source)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && is_image_file(entry.path()))
        .filter_map(|entry| {
            entry
                .path()
                .strip_prefix(source)
                .ok()
                .and_then(|rel| rel.to_str().map(str::to_string))
        })
        .collect();

    println!("Processing {} image(s) from {}", keys.len(), source.display());

    let results: Vec<(String, Result<String, String>)> = keys
        .par_iter()
        .map(|key| {
            let outcome = process_key(&store, key, instruction, config, auto_webp)
                .map_err(|e| e.to_string())
                .and_then(|result| {
                    let bytes = store.get(key).map_err(|e| e.to_string())?.bytes;
                    let name = derived_key(key, &bytes, instruction, &result);
                    sink.put(&name, &result.data).map_err(|e| e.to_string())
                });
            (key.clone(), outcome)
        })
        .collect();

    let mut failed = 0;
    for (key, outcome) in &results {
        match outcome {
            Ok(reference) => println!("  {key} -> {reference}"),
            Err(message) => {
                failed += 1;
                eprintln!("  {key}: {message}");
            }
        }
    }
    println!("Done: {} ok, {failed} failed", results.len() - failed);
    if failed > 0 {
        return Err(format!("{failed} image(s) failed").into());
    }
    Ok(())
}

/// Content-addressed output name for a batch derivative.
fn derived_key(key: &str, source_bytes: &[u8], instruction: &str, result: &ProcessOutput) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_bytes);
    hasher.update(instruction.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    let stem = Path::new(key)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    format!(
        "{stem}-{}.{}",
        &digest[..8],
        result.info.format.extension()
    )
}
