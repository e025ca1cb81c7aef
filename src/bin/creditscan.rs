use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use creditscan::{
    CreditLocator, CreditReport, CreditScanner, CreditStart, ProgressCallback, ProgressInfo,
    ScanOptions, WindowDivisor, audit, extract,
};

const CLI_AFTER_HELP: &str = "Examples:\n  creditscan detect movie.mp4\n  creditscan detect movie.mp4 --regenerate false --batch-size 16 --progress\n  creditscan scan-frames ~cache --offset 5400 --json\n  creditscan replay ~cache/results.txt --sample-size 15\n  creditscan completions zsh > _creditscan";

#[derive(Debug, Parser)]
#[command(
    name = "creditscan",
    version,
    about = "Find where a video's closing credits begin",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show debug logging output (RUST_LOG overrides).
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a progress bar while frames are classified.
    #[arg(long, global = true)]
    progress: bool,

    /// Print the result as machine-readable JSON.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Debug, Args, Clone)]
struct DetectionArgs {
    /// Credits probability above which a single frame counts as credits.
    #[arg(long, default_value_t = 0.9)]
    credits_threshold: f64,

    /// Mean a window of frames must exceed to mark the credit start.
    #[arg(long, default_value_t = 0.7)]
    mean_threshold: f64,

    /// Sliding window length in frames.
    #[arg(long, default_value_t = 10)]
    sample_size: usize,

    /// Divisor for windows clipped at the end of the range (available, available-plus-one).
    #[arg(long, default_value = "available")]
    divisor: String,

    /// Number of frame stills numbering starts at (1 for 001.jpeg).
    #[arg(long, default_value_t = 1)]
    first_frame: u64,
}

#[derive(Debug, Args, Clone)]
struct ClassifierArgs {
    /// Frames classified concurrently per batch.
    #[arg(long, default_value_t = 10)]
    batch_size: usize,

    /// Classifier command line; {frame} is replaced by the still's path.
    #[arg(long)]
    classifier: Option<String>,

    /// Per-frame classifier timeout in seconds (0 waits forever).
    #[arg(long, default_value_t = 120)]
    classifier_timeout: u64,

    /// Audit log path (default: results.txt in the frame directory).
    #[arg(long)]
    audit_log: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Probe, sample, and classify a video.
    #[command(
        about = "Detect the credit start of a video",
        after_help = "Examples:\n  creditscan detect movie.mp4\n  creditscan detect movie.mp4 --tail-window 900 --clean"
    )]
    Detect {
        /// Input video path.
        input: PathBuf,

        #[command(flatten)]
        detection: DetectionArgs,

        #[command(flatten)]
        classifier: ClassifierArgs,

        /// Wipe the cache and extract fresh stills (false reuses cached stills).
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        regenerate: bool,

        /// Seconds at the end of the video to sample.
        #[arg(long, default_value_t = 600)]
        tail_window: u64,

        /// Directory for extracted stills (default: ~cache next to the input).
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Remove the cache directory after the scan.
        #[arg(long)]
        clean: bool,

        /// ffprobe binary.
        #[arg(long, default_value = "ffprobe")]
        ffprobe: String,

        /// ffmpeg binary.
        #[arg(long, default_value = "ffmpeg")]
        ffmpeg: String,
    },

    /// Classify an existing directory of stills.
    #[command(about = "Classify an existing frame directory")]
    ScanFrames {
        /// Directory holding 001.jpeg, 002.jpeg, ...
        directory: PathBuf,

        /// Second of the video the first still was taken at.
        #[arg(long, default_value_t = 0)]
        offset: u64,

        /// Number of store slots (default: highest frame number found).
        #[arg(long)]
        store_len: Option<usize>,

        #[command(flatten)]
        detection: DetectionArgs,

        #[command(flatten)]
        classifier: ClassifierArgs,
    },

    /// Re-run the locator over an audit log without classifying anything.
    #[command(about = "Re-score an audit log")]
    Replay {
        /// Audit log written by a previous scan.
        log: PathBuf,

        /// Second of the video the first still was taken at.
        #[arg(long, default_value_t = 0)]
        offset: u64,

        #[command(flatten)]
        detection: DetectionArgs,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_window_divisor(value: &str) -> Option<WindowDivisor> {
    match value.to_ascii_lowercase().as_str() {
        "available" | "clipped" => Some(WindowDivisor::Available),
        "available-plus-one" | "plus-one" => Some(WindowDivisor::AvailablePlusOne),
        _ => None,
    }
}

fn parse_timeout(seconds: u64) -> Option<Duration> {
    (seconds > 0).then(|| Duration::from_secs(seconds))
}

fn apply_detection(
    options: ScanOptions,
    detection: &DetectionArgs,
) -> Result<ScanOptions, Box<dyn std::error::Error>> {
    let divisor = parse_window_divisor(&detection.divisor)
        .ok_or(format!("unsupported --divisor: {}", detection.divisor))?;
    Ok(options
        .with_credits_threshold(detection.credits_threshold)
        .with_mean_threshold(detection.mean_threshold)
        .with_sample_size(detection.sample_size)
        .with_window_divisor(divisor)
        .with_first_frame_number(detection.first_frame))
}

fn apply_classifier(options: ScanOptions, classifier: &ClassifierArgs) -> ScanOptions {
    let mut options = options
        .with_batch_size(classifier.batch_size)
        .with_classifier_timeout(parse_timeout(classifier.classifier_timeout));
    if let Some(command) = &classifier.classifier {
        options = options.with_classifier_command(command.clone());
    }
    if let Some(path) = &classifier.audit_log {
        options = options.with_audit_log(path.clone());
    }
    options
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.green} {bar:40.cyan/blue} {pos}/{len} frames {msg}",
        )?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if let Some(total) = info.total {
            self.bar.set_length(total);
        }
        self.bar.set_position(info.current);
        self.bar
            .set_message(format!("batch {}", info.batches_completed));
    }
}

fn attach_progress(
    options: ScanOptions,
    global: &GlobalOptions,
) -> Result<(ScanOptions, Option<ProgressBar>), Box<dyn std::error::Error>> {
    if !global.progress {
        return Ok((options, None));
    }
    let progress = TerminalProgress::new()?;
    let bar = progress.bar.clone();
    Ok((options.with_progress(Arc::new(progress)), Some(bar)))
}

fn print_report(report: &CreditReport, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    if let Some(duration) = report.duration_seconds {
        println!("Duration: {duration}s (sampling from {}s)", report.seek_offset);
    }
    println!(
        "Frames: {} classified of {} ({} failed, {} batches{})",
        report.pool.frames_classified,
        report.pool.frames_total,
        report.pool.failures,
        report.pool.batches_completed,
        if report.pool.stopped_early {
            ", stopped early"
        } else {
            ""
        },
    );
    if let Some(path) = &report.audit_log {
        println!("Audit log: {}", path.display());
    }

    match (report.credit_start(), report.credits_start_seconds) {
        (CreditStart::Found { offset }, Some(seconds)) => println!(
            "{} {}",
            "success:".green().bold(),
            format!("Closing credits start at {seconds} seconds (offset {offset})").green()
        ),
        _ => println!(
            "{} {}",
            "warning:".yellow().bold(),
            "No closing credits found".yellow()
        ),
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_filter = if cli.global.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    match cli.command {
        Commands::Detect {
            input,
            detection,
            classifier,
            regenerate,
            tail_window,
            cache_dir,
            clean,
            ffprobe,
            ffmpeg,
        } => {
            let mut options = apply_detection(ScanOptions::new(), &detection)?;
            options = apply_classifier(options, &classifier)
                .with_regenerate_frames(regenerate)
                .with_tail_window(Duration::from_secs(tail_window))
                .with_ffprobe(ffprobe)
                .with_ffmpeg(ffmpeg);
            if let Some(directory) = &cache_dir {
                options = options.with_cache_directory(directory.clone());
            }
            let (options, bar) = attach_progress(options, &cli.global)?;

            let report = CreditScanner::new(options).scan(&input)?;
            if let Some(bar) = bar {
                bar.finish_with_message("done");
            }
            print_report(&report, cli.global.json)?;

            if clean {
                extract::remove_cache_directory(&report.frame_directory)?;
            }
        }
        Commands::ScanFrames {
            directory,
            offset,
            store_len,
            detection,
            classifier,
        } => {
            let options = apply_detection(ScanOptions::new(), &detection)?;
            let options = apply_classifier(options, &classifier);
            let (options, bar) = attach_progress(options, &cli.global)?;

            let report = CreditScanner::new(options).scan_frames(&directory, store_len, offset)?;
            if let Some(bar) = bar {
                bar.finish_with_message("done");
            }
            print_report(&report, cli.global.json)?;
        }
        Commands::Replay {
            log,
            offset,
            detection,
        } => {
            let options = apply_detection(ScanOptions::new(), &detection)?;
            options.validate()?;
            let records = audit::read_audit_log(&log)?;
            let flags = audit::flags_from_records(&records, detection.first_frame);
            let locator: CreditLocator = options.locator();
            let credit_start = locator.locate(&flags);
            let seconds = credit_start.offset().map(|index| offset + index as u64);

            if cli.global.json {
                let payload = json!({
                    "records": records.len(),
                    "store_len": flags.len(),
                    "credit_start": credit_start,
                    "credits_start_seconds": seconds,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("Records: {} ({} slots)", records.len(), flags.len());
                match seconds {
                    Some(seconds) => println!(
                        "{} {}",
                        "success:".green().bold(),
                        format!("Closing credits start at {seconds} seconds").green()
                    ),
                    None => println!(
                        "{} {}",
                        "warning:".yellow().bold(),
                        "No closing credits found".yellow()
                    ),
                }
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "creditscan", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}
