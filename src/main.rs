//! IISLens: a fast, filterable IIS access log analyser.
//!
//! Entry point: initialises structured logging, loads one W3C log file into
//! a [`Session`], applies the filters given on the command line and prints
//! the filtered view with its statistics.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, ValueEnum};
use tracing_subscriber::Layer as _;

use iislens::app::Session;
use iislens::core::criteria::{CriteriaChange, FilterCriteria, SearchType};
use iislens::core::filter_preset::{self, FilterPreset};
use iislens::core::statistics::Statistics;
use iislens::export::{self, csv_export, json_export};
use iislens::util::constants;
use iislens::util::error::{IisLensError, Result};
use iislens::util::time::{format_duration, format_table_timestamp, parse_clock_input, parse_date_input};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "iislens",
    version,
    about = "Filter and summarise IIS W3C access logs"
)]
struct Cli {
    /// IIS log file in W3C extended format
    log_file: PathBuf,
    /// Only keep responses with status >= 400
    #[arg(long, short = 'e', default_value_t = false)]
    errors_only: bool,
    /// Field the search text applies to: url, ip, method or status
    #[arg(long, short = 't', default_value = "url")]
    search_type: SearchType,
    /// Search text
    #[arg(long, short = 's')]
    search: Option<String>,
    /// First day to keep (YYYY-MM-DD)
    #[arg(long, value_parser = date_arg)]
    start_date: Option<NaiveDate>,
    /// Start time of day (HH:MM or HH:MM:SS); defaults to 00:00:00
    #[arg(long, value_parser = clock_arg, requires = "start_date")]
    start_time: Option<NaiveTime>,
    /// Last day to keep (YYYY-MM-DD)
    #[arg(long, value_parser = date_arg)]
    end_date: Option<NaiveDate>,
    /// End time of day (HH:MM or HH:MM:SS); defaults to 23:59:59
    #[arg(long, value_parser = clock_arg, requires = "end_date")]
    end_time: Option<NaiveTime>,
    /// Output format for the summary
    #[arg(long, short = 'o', value_enum, default_value = "text")]
    output: OutputFormat,
    /// Number of filtered records to print in text mode
    #[arg(long, short = 'n', default_value_t = 20)]
    limit: usize,
    /// Write the filtered records to a CSV file
    #[arg(long)]
    export_csv: Option<PathBuf>,
    /// Write the filtered records and statistics to a JSON file
    #[arg(long)]
    export_json: Option<PathBuf>,
    /// JSON file holding saved filter presets
    #[arg(long)]
    preset_file: Option<PathBuf>,
    /// Start from the named preset; other flags override it
    #[arg(long, requires = "preset_file")]
    preset: Option<String>,
    /// Save the effective filters under this name in the preset file
    #[arg(long, requires = "preset_file")]
    save_preset: Option<String>,
}

fn date_arg(s: &str) -> std::result::Result<NaiveDate, String> {
    parse_date_input(s).ok_or_else(|| format!("expected YYYY-MM-DD, got '{s}'"))
}

fn clock_arg(s: &str) -> std::result::Result<NaiveTime, String> {
    parse_clock_input(s).ok_or_else(|| format!("expected HH:MM or HH:MM:SS, got '{s}'"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Dual-layer logging: stderr (env-controlled) + file (always debug).
    let log_dir = init_log_dir();
    init_logging(&log_dir);

    tracing::info!("{} v{} starting", constants::APP_NAME, constants::APP_VERSION);
    if let Some(dir) = &log_dir {
        tracing::debug!("Log file: {}", dir.join(constants::LOG_FILE_NAME).display());
    }

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let criteria = build_criteria(cli)?;

    for path in [&cli.export_csv, &cli.export_json].into_iter().flatten() {
        export::validate_export_path(path)?;
    }

    let mut session = Session::new();
    let report = session.load_log_file(&cli.log_file);
    if report.error.is_some() {
        eprintln!("{}", session.status_text());
        return Ok(ExitCode::FAILURE);
    }

    session.update_criteria(CriteriaChange::Replace(criteria));
    session.wait_for_filter();

    if let (Some(file), Some(name)) = (&cli.preset_file, &cli.save_preset) {
        save_preset(file, FilterPreset::from_criteria(name, session.criteria()))?;
    }

    match cli.output {
        OutputFormat::Text => print_text(&session, cli.limit),
        OutputFormat::Json => print_json(&session)?,
    }

    if cli.export_csv.is_some() || cli.export_json.is_some() {
        let records = session.filtered_records();
        if let Some(path) = &cli.export_csv {
            csv_export::export_csv(&records, path)?;
        }
        if let Some(path) = &cli.export_json {
            json_export::export_json(&records, session.statistics(), path)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Start from the named preset (if any) and layer the explicit flags on top.
fn build_criteria(cli: &Cli) -> Result<FilterCriteria> {
    let mut criteria = match (&cli.preset_file, &cli.preset) {
        (Some(file), Some(name)) => {
            let presets = filter_preset::load_presets(file)?;
            filter_preset::find_preset(&presets, name)
                .ok_or_else(|| IisLensError::Preset(format!("no preset named '{name}'")))?
                .to_criteria()?
        }
        _ => FilterCriteria::default(),
    };

    if cli.errors_only {
        criteria.show_errors_only = true;
    }
    if let Some(text) = &cli.search {
        criteria.search_type = cli.search_type;
        criteria.search_text = text.clone();
    }
    if let Some(d) = cli.start_date {
        criteria.start_date = Some(d);
    }
    if let Some(t) = cli.start_time {
        criteria.start_time = Some(t);
        criteria.include_start_time = true;
    }
    if let Some(d) = cli.end_date {
        criteria.end_date = Some(d);
    }
    if let Some(t) = cli.end_time {
        criteria.end_time = Some(t);
        criteria.include_end_time = true;
    }
    Ok(criteria)
}

/// Insert or replace `preset` in `file`, creating the file if needed.
fn save_preset(file: &Path, preset: FilterPreset) -> Result<()> {
    let mut presets = if file.exists() {
        filter_preset::load_presets(file)?
    } else {
        Vec::new()
    };
    match presets
        .iter_mut()
        .find(|p| p.name.eq_ignore_ascii_case(&preset.name))
    {
        Some(slot) => *slot = preset,
        None => presets.push(preset),
    }
    filter_preset::save_presets(&presets, file)
}

fn print_text(session: &Session, limit: usize) {
    let s = session.statistics();
    println!(
        "{} ({} entries, {} shown)",
        session.loaded_file_name().unwrap_or("-"),
        session.total_in_file(),
        s.total_count
    );
    if let Some(elapsed) = session.filter_elapsed() {
        println!("Filtered in {}", format_duration(elapsed));
    }
    println!();
    print_stats(s);

    if limit == 0 || s.total_count == 0 {
        return;
    }
    println!();
    println!(
        "{:<19}  {:<7} {:>6}  {:<12}  {:>8}  {:<15}  URL",
        "Timestamp", "Method", "Status", "Class", "Time(s)", "Client IP"
    );
    for r in session.filtered_view().take(limit) {
        let url = if r.uri_query.is_empty() || r.uri_query == "-" {
            r.uri_stem.clone()
        } else {
            format!("{}?{}", r.uri_stem, r.uri_query)
        };
        println!(
            "{:<19}  {:<7} {:>6}  {:<12}  {:>8.3}  {:<15}  {}",
            format_table_timestamp(r.timestamp.as_ref()),
            r.method,
            r.status_code,
            r.status_class().label(),
            r.time_taken_seconds(),
            r.client_ip,
            url
        );
    }
    if s.total_count > limit {
        println!("\u{2026} {} more", s.total_count - limit);
    }
}

fn print_stats(s: &Statistics) {
    println!("Total requests     {}", s.total_count);
    println!("Success (2xx)      {}", s.success_count);
    println!("Redirect (3xx)     {}", s.redirect_count);
    println!("Client error (4xx) {}", s.client_error_count);
    println!("Server error (5xx) {}", s.server_error_count);
    println!("Errors (>=400)     {} ({:.1}%)", s.error_count, s.error_rate());
    println!("GET / POST         {} / {}", s.get_count, s.post_count);
    println!("Unique client IPs  {}", s.unique_ip_count);
    println!("Token requests     {}", s.token_endpoint_count);
    println!(
        "Most requested     {} ({})",
        s.most_requested_url, s.most_requested_count
    );
    println!(
        "Slowest response   {:.3}s",
        s.slowest_response_time_seconds()
    );
}

#[derive(serde::Serialize)]
struct JsonSummary<'a> {
    file: Option<&'a str>,
    total_in_file: usize,
    filter: FilterPreset,
    statistics: &'a Statistics,
}

fn print_json(session: &Session) -> Result<()> {
    let summary = JsonSummary {
        file: session.loaded_file_name(),
        total_in_file: session.total_in_file(),
        filter: FilterPreset::from_criteria("current", session.criteria()),
        statistics: session.statistics(),
    };
    let json = serde_json::to_string_pretty(&summary)
        .map_err(|e| IisLensError::Export(format!("Failed to render JSON: {e}")))?;
    println!("{json}");
    Ok(())
}

/// Create the persistent log directory under the per-user data directory
/// (`%LOCALAPPDATA%`, `$XDG_DATA_HOME` or `~/.local/share`).
///
/// Returns `None` if no directory can be created; logging then falls back
/// to stderr only.
fn init_log_dir() -> Option<PathBuf> {
    let base = std::env::var_os("LOCALAPPDATA")
        .or_else(|| std::env::var_os("XDG_DATA_HOME"))
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share")))?;
    let log_dir = base.join(constants::APP_DATA_DIR).join(constants::LOG_DIR);
    std::fs::create_dir_all(&log_dir).ok()?;

    // Rotate the log file if it exceeds the size limit.
    let log_file = log_dir.join(constants::LOG_FILE_NAME);
    if let Ok(meta) = std::fs::metadata(&log_file) {
        if meta.len() > constants::MAX_LOG_FILE_SIZE {
            let backup = log_dir.join(format!("{}.old", constants::LOG_FILE_NAME));
            let _ = std::fs::rename(&log_file, &backup);
        }
    }

    Some(log_dir)
}

/// Initialise the dual-layer tracing subscriber.
///
/// - **stderr layer**: filtered by `RUST_LOG` (default: `info`).
/// - **file layer** (if `log_dir` is `Some`): always writes at `debug` level.
fn init_logging(log_dir: &Option<PathBuf>) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    if let Some(dir) = log_dir {
        let log_path = dir.join(constants::LOG_FILE_NAME);
        if let Ok(file) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
        {
            let file_layer = tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .with_filter(tracing_subscriber::EnvFilter::new("debug"));

            tracing_subscriber::registry()
                .with(stderr_layer.with_filter(env_filter))
                .with(file_layer)
                .init();
            return;
        }
    }

    // Fallback: stderr only
    tracing_subscriber::registry()
        .with(stderr_layer.with_filter(env_filter))
        .init();
}
