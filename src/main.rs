use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use console::Emoji;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use podgrab::{
    CancelSource, NoopReporter, ProgressEvent, ProgressReporter, ReqwestClient,
    SharedProgressReporter, SyncOptions, default_sources, resolve_sources, run,
};

// Emoji with fallback for terminals without Unicode support
static MICROPHONE: Emoji<'_, '_> = Emoji("🎙️  ", "");
static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "[~] ");
static HEADPHONES: Emoji<'_, '_> = Emoji("🎧 ", "[i] ");
static DOWNLOAD: Emoji<'_, '_> = Emoji("📥 ", "[+] ");
static SUCCESS: Emoji<'_, '_> = Emoji("✅ ", "[+] ");
static WARNING: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");
static FAILURE: Emoji<'_, '_> = Emoji("❌ ", "[!] ");
static PARTY: Emoji<'_, '_> = Emoji("🎉 ", "[*] ");
static FOLDER: Emoji<'_, '_> = Emoji("📁 ", "");
static CROSS: Emoji<'_, '_> = Emoji("✗ ", "x ");

/// Download new podcast episodes into one folder per podcast
#[derive(Parser, Debug)]
#[command(name = "podgrab")]
#[command(about = "A simple command-line podcast downloader")]
#[command(after_help = "Example: podgrab ~/Podcasts -i subscriptions.opml")]
#[command(version)]
struct Args {
    /// Parent directory for your local podcast folders
    directory: PathBuf,

    /// Report episodes skipped because they are already downloaded
    #[arg(short, long)]
    warnings: bool,

    /// OPML file to import instead of the built-in feed list
    #[arg(short, long, value_name = "FILE")]
    import: Option<PathBuf>,

    /// Quiet mode - suppress progress output
    #[arg(short, long)]
    quiet: bool,
}

/// Progress reporter using indicatif for terminal output
///
/// Downloads run one at a time, so there is at most one download bar.
struct IndicatifReporter {
    multi: MultiProgress,
    main_bar: ProgressBar,
    download_bar: Mutex<Option<ProgressBar>>,
}

impl IndicatifReporter {
    fn new() -> Self {
        let multi = MultiProgress::new();

        let main_style = ProgressStyle::default_bar()
            .template("{spinner:.green} {wide_msg}")
            .unwrap();

        let main_bar = multi.add(ProgressBar::new_spinner());
        main_bar.set_style(main_style);
        main_bar.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            multi,
            main_bar,
            download_bar: Mutex::new(None),
        }
    }

    fn println(&self, line: String) {
        let _ = self.multi.println(line);
    }

    fn start_bar(&self, filename: &str, total_bytes: u64) {
        let style = ProgressStyle::default_bar()
            .template(
                "  {msg:.bold.blue} [{bar:30.cyan/blue}] {percent:>3}% • {bytes}/{total_bytes} • {bytes_per_sec} • {eta}",
            )
            .unwrap()
            .progress_chars("█▓░");

        let bar = self.multi.add(ProgressBar::new(total_bytes));
        bar.set_style(style);
        bar.set_message(truncate_title(filename, 40));

        if let Some(previous) = self.download_bar.lock().unwrap().replace(bar) {
            previous.finish_and_clear();
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Some(bar) = self.download_bar.lock().unwrap().as_ref() {
            f(bar);
        }
    }

    fn take_bar(&self) -> Option<ProgressBar> {
        self.download_bar.lock().unwrap().take()
    }
}

impl ProgressReporter for IndicatifReporter {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::FetchingFeed { url } => {
                self.main_bar
                    .set_message(format!("{SEARCH}Fetching feed: {}", url.cyan()));
            }

            ProgressEvent::FeedFailed { url, error } => {
                self.println(format!(
                    "{FAILURE}{} {} - {}",
                    "Skipping feed".red().bold(),
                    url.cyan(),
                    error.red()
                ));
            }

            ProgressEvent::DirectoryFailed { url, error } => {
                self.println(format!(
                    "{FAILURE}{} {} - {}",
                    "Cannot prepare directory for".red().bold(),
                    url.cyan(),
                    error.red()
                ));
            }

            ProgressEvent::PodcastReady {
                podcast_title,
                directory,
                total_episodes,
                new_episodes,
            } => {
                self.println(format!(
                    "{HEADPHONES}{} • {} episodes total, {} new • {}",
                    podcast_title.bold().green(),
                    total_episodes.to_string().cyan(),
                    new_episodes.to_string().yellow(),
                    directory.display().to_string().dimmed()
                ));
                self.main_bar
                    .set_message(format!("{HEADPHONES}{}", podcast_title.bold()));
            }

            ProgressEvent::AlreadyDownloaded { filename } => {
                self.println(format!(
                    "{WARNING}{} {} {}",
                    "File".yellow().bold(),
                    filename.cyan(),
                    "already downloaded".yellow().bold()
                ));
            }

            ProgressEvent::FilenameCollision { filename, url } => {
                self.println(format!(
                    "{WARNING}{} {} {} {}",
                    "Skipping".yellow().bold(),
                    url.cyan(),
                    "- filename already taken:".yellow(),
                    filename.cyan()
                ));
            }

            ProgressEvent::DownloadStarting {
                filename,
                episode_index,
                total_to_download,
                content_length,
            } => {
                self.println(format!(
                    "{DOWNLOAD}{} [{}/{}] {}",
                    "New episode, downloading".green().bold(),
                    (episode_index + 1).to_string().cyan(),
                    total_to_download.to_string().cyan(),
                    filename.blue()
                ));
                self.start_bar(&filename, content_length);
            }

            ProgressEvent::DownloadProgress {
                bytes_downloaded,
                total_bytes,
                ..
            } => {
                self.with_bar(|bar| {
                    bar.set_length(total_bytes);
                    bar.set_position(bytes_downloaded);
                });
            }

            ProgressEvent::DownloadCompleted { filename, .. } => {
                if let Some(bar) = self.take_bar() {
                    bar.finish_and_clear();
                }
                self.println(format!("  {SUCCESS}{}", truncate_title(&filename, 60).green()));
            }

            ProgressEvent::DownloadCancelled {
                filename,
                bytes_downloaded,
            } => {
                if let Some(bar) = self.take_bar() {
                    bar.abandon_with_message(format!(
                        "{} {} (partial, {} bytes)",
                        truncate_title(&filename, 30).yellow(),
                        "interrupted".yellow().bold(),
                        bytes_downloaded
                    ));
                }
            }

            ProgressEvent::DownloadFailed { filename, error } => {
                if let Some(bar) = self.take_bar() {
                    bar.finish_and_clear();
                }
                self.println(format!(
                    "  {FAILURE}{} - {}",
                    truncate_title(&filename, 30).red(),
                    error.red()
                ));
            }

            ProgressEvent::Cancelled => {
                self.println(format!(
                    "{WARNING}{}",
                    "Interrupted, skipping remaining episodes".yellow().bold()
                ));
            }

            ProgressEvent::RunCompleted {
                downloaded_count,
                skipped_count,
                failed_count,
                failed_feeds,
            } => {
                self.main_bar.finish_and_clear();
                println!(
                    "\n{PARTY}{} {} downloaded, {} skipped, {} failed, {} feeds unavailable",
                    "Sync complete:".bold().green(),
                    downloaded_count.to_string().green().bold(),
                    skipped_count.to_string().yellow(),
                    if failed_count > 0 {
                        failed_count.to_string().red().bold()
                    } else {
                        failed_count.to_string().green()
                    },
                    if failed_feeds > 0 {
                        failed_feeds.to_string().red().bold()
                    } else {
                        failed_feeds.to_string().green()
                    }
                );
            }
        }
    }
}

fn truncate_title(title: &str, max_len: usize) -> String {
    if title.chars().count() <= max_len {
        title.to_string()
    } else {
        let kept: String = title.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Filter used when `RUST_LOG` is unset
///
/// With progress output on, the console already shows every skipped item, so
/// only errors are logged on top of it.
fn default_log_filter(quiet: bool) -> &'static str {
    if quiet { "warn" } else { "error" }
}

fn init_tracing(quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_filter(quiet)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Cancel the run on the first Ctrl-C, exit hard on the second
fn install_interrupt_handler(cancel: CancelSource) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            tracing::warn!("Could not listen for Ctrl-C");
            return;
        }
        eprintln!(
            "\n{WARNING}{}",
            "Interrupt received, stopping at the next chunk (Ctrl-C again to quit now)"
                .yellow()
                .bold()
        );
        cancel.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.quiet);

    if !args.directory.is_dir() {
        eprintln!(
            "{FAILURE}{} {} {}",
            "Directory".yellow().bold(),
            args.directory.display().to_string().cyan(),
            "is not a valid existing directory".yellow().bold()
        );
        std::process::exit(1);
    }

    let sources = resolve_sources(&default_sources(), args.import.as_deref())
        .context("Failed to import OPML subscription list")?;

    if !args.quiet {
        println!(
            "\n{}{} {}\n",
            MICROPHONE,
            "podgrab".bold().magenta(),
            "- Podcast Downloader".dimmed()
        );
    }

    let client = ReqwestClient::new().context("Failed to create HTTP client")?;

    let options = SyncOptions {
        warn_existing: args.warnings,
    };

    let reporter: SharedProgressReporter = if args.quiet {
        NoopReporter::shared()
    } else {
        Arc::new(IndicatifReporter::new())
    };

    let cancel = CancelSource::new();
    install_interrupt_handler(cancel.clone());

    let summary = run(
        &client,
        &sources,
        &args.directory,
        &options,
        &cancel.signal(),
        &reporter,
    )
    .await;

    if !args.quiet && !summary.failed_episodes.is_empty() {
        println!("\n{}", "Failed episodes:".red().bold());
        for (filename, error) in &summary.failed_episodes {
            println!(
                "  {}{} - {}",
                CROSS,
                filename.yellow(),
                error.dimmed()
            );
        }
    }

    if !args.quiet {
        println!(
            "\n{FOLDER}Output: {}\n",
            args.directory.display().to_string().cyan()
        );
    }

    Ok(())
}
