// Entry point and high-level CLI flow.
//
// - `load` loads and cleans the CSV, printing diagnostics.
// - `report` computes one filtered view and exports it.
// - `interactive` (the default) runs a menu loop: load once, then generate
//   reports for as many filter selections as needed. Views are memoized, so
//   repeating a selection is free.
use clap::{Args, Parser, Subcommand};
use housing_report::config::Config;
use housing_report::dashboard::{Dashboard, DashboardView, Dataset};
use housing_report::error::Result;
use housing_report::reports::{self, SummaryReport};
use housing_report::util::{format_int, format_metric, parse_f64_safe};
use housing_report::{logging, output, Filter};
use once_cell::sync::Lazy;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "housing_report")]
#[command(about = "Summary statistics and investment scores for property listings")]
#[command(version)]
struct Cli {
    /// TOML configuration file (default: ./housing_report.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Listings CSV, overrides `[data] path`
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and clean the dataset, then print diagnostics
    Load,
    /// Compute a filtered view and export it
    Report(ReportArgs),
    /// Menu-driven session (default)
    Interactive,
}

#[derive(Args, Default)]
struct ReportArgs {
    /// Cities to include (comma-separated)
    #[arg(long, value_delimiter = ',')]
    city: Vec<String>,
    /// Property types to include (comma-separated)
    #[arg(long, value_delimiter = ',')]
    property_type: Vec<String>,
    /// BHK values to include (comma-separated)
    #[arg(long, value_delimiter = ',')]
    bhk: Vec<u32>,
    #[arg(long)]
    min_price: Option<f64>,
    #[arg(long)]
    max_price: Option<f64>,
    #[arg(long)]
    min_size: Option<f64>,
    #[arg(long)]
    max_size: Option<f64>,
    /// Directory for exported files, overrides `[report] out_dir`
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

impl ReportArgs {
    fn filter(&self) -> Filter {
        Filter::new()
            .cities(&self.city)
            .property_types(&self.property_type)
            .bhk(self.bhk.iter().copied())
            .price_range(self.min_price, self.max_price)
            .size_range(self.min_size, self.max_size)
    }
}

// Simple in-memory app state so we only load/clean the CSV once but can
// generate reports multiple times in a single run.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| {
    Mutex::new(AppState {
        dashboard: None,
        filter: Filter::new(),
    })
});

struct AppState {
    dashboard: Option<Dashboard>,
    filter: Filter,
}

/// Read a single line of input after printing `prompt`.
///
/// Returns `None` once the input is exhausted or unreadable, so callers can
/// leave their loops instead of re-prompting forever.
fn read_line<R: BufRead>(input: &mut R, prompt: &str) -> Option<String> {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match input.read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// Ask the user whether to go back to the menu after generating reports.
///
/// Returns `true` if the user chose `Y`, `false` if they chose `N` or the
/// input ended.
fn prompt_back_to_menu<R: BufRead>(input: &mut R) -> bool {
    loop {
        let Some(resp) = read_line(input, "Back to Report Selection (Y/N): ") else {
            return false;
        };
        match resp.to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn load_dataset(path: &Path) -> Result<Dataset> {
    let dataset = Dataset::load(path)?;
    let report = dataset.clean_report();
    println!(
        "Processing dataset... ({} rows read, {} kept)",
        format_int(report.total_rows),
        format_int(report.kept_rows)
    );
    println!(
        "Note: {} rows skipped ({} missing required fields, {} invalid values, {} duplicates).",
        format_int(report.dropped_rows()),
        format_int(report.missing_required),
        format_int(report.invalid_values),
        format_int(report.duplicates)
    );
    println!();
    Ok(dataset)
}

/// Print the view and write every export into `out_dir`.
fn export_view(
    view: &DashboardView,
    dataset: &Dataset,
    out_dir: &Path,
    preview_rows: usize,
) -> Result<()> {
    std::fs::create_dir_all(out_dir)?;
    let summary = &view.summary;

    println!("Key Metrics\n");
    output::preview_table_rows(
        &reports::key_metric_rows(summary, &view.deltas),
        usize::MAX,
    );
    if summary.is_empty() {
        println!("No properties match the current selection.\n");
    }
    if view.derive_report.non_positive_size > 0 {
        println!(
            "Note: {} rows excluded from features (size_sqft <= 0).\n",
            format_int(view.derive_report.non_positive_size)
        );
    }

    let groups = [
        ("City Summary", "city_summary.csv", &summary.by_city),
        ("Property Type Summary", "property_type_summary.csv", &summary.by_property_type),
        ("BHK Summary", "bhk_summary.csv", &summary.by_bhk),
    ];
    for (title, file, metrics) in groups {
        let rows = reports::group_rows(metrics);
        let path = out_dir.join(file);
        output::write_csv(&path, &rows)?;
        println!("{}\n", title);
        output::preview_table_rows(&rows, preview_rows);
        println!("(Full table exported to {})\n", path.display());
    }

    let derived = reports::derived_rows(&view.derived);
    let derived_path = out_dir.join("derived_records.csv");
    output::write_csv(&derived_path, &derived)?;
    println!("Derived Records\n");
    output::preview_table_rows(&derived, preview_rows);
    println!("(Full table exported to {})\n", derived_path.display());

    let insights = &view.insights;
    println!("Insights");
    println!(
        "Size-price correlation: {}, price skewness: {}, retained: {}%",
        format_metric(insights.size_price_correlation, 3),
        format_metric(insights.price_skewness, 2),
        format_metric(insights.retained_pct, 1)
    );
    for (i, line) in insights.lines.iter().enumerate() {
        println!("  Insight #{}: {}", i + 1, line);
    }
    println!();

    let matrix = &insights.correlation_matrix;
    for (title, pairs) in [
        ("Top Positive Correlations", &matrix.top_positive),
        ("Top Negative Correlations", &matrix.top_negative),
    ] {
        println!("{}\n", title);
        output::preview_table_rows(&reports::correlation_rows(pairs), preview_rows);
    }

    let report = SummaryReport {
        generated_at: chrono::Local::now(),
        filter: &view.filter,
        cleaning: dataset.clean_report(),
        derivation: &view.derive_report,
        summary,
        key_metrics: &view.deltas,
        insights,
    };
    let summary_path = out_dir.join("summary.json");
    output::write_json(&summary_path, &report)?;
    println!("Summary Stats exported to {}\n", summary_path.display());
    info!(rows = summary.total_count, out_dir = %out_dir.display(), "reports generated");
    Ok(())
}

fn build_dashboard(dataset: Dataset, config: &Config) -> Dashboard {
    Dashboard::new(dataset, config.scoring)
        .with_capacity(config.cache.capacity)
        .with_top_cities(config.report.top_cities)
}

/// Menu option [1]: load and clean the CSV into `APP_STATE`.
fn handle_load(config: &Config) {
    match load_dataset(&config.data.path) {
        Ok(dataset) => {
            let mut state = APP_STATE.lock().unwrap_or_else(|e| e.into_inner());
            match state.dashboard.as_mut() {
                Some(d) => d.replace_dataset(dataset),
                None => state.dashboard = Some(build_dashboard(dataset, config)),
            }
        }
        Err(e) => {
            error!("Failed to load file: {}", e);
            eprintln!("Failed to load file: {}\n", e);
        }
    }
}

/// Menu option [2]: generate reports for the current filter.
fn handle_generate_reports(config: &Config) {
    let mut state = APP_STATE.lock().unwrap_or_else(|e| e.into_inner());
    let filter = state.filter.clone();
    let Some(dashboard) = state.dashboard.as_mut() else {
        println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
        return;
    };
    println!("Generating reports...\n");
    let view = dashboard.view(&filter);
    if let Err(e) = export_view(
        &view,
        dashboard.dataset(),
        &config.report.out_dir,
        config.report.preview_rows,
    ) {
        eprintln!("Write error: {}", e);
    }
}

/// Blank means "no bound"; anything unparsable is treated the same.
fn parse_bound(s: &str) -> Option<f64> {
    parse_f64_safe(Some(s))
}

/// Read the filter prompts. `None` if the input ends part-way through.
fn read_filter<R: BufRead>(input: &mut R) -> Option<Filter> {
    let cities = read_line(input, "Cities (comma-separated, blank for all): ")?;
    let types = read_line(input, "Property types (comma-separated, blank for all): ")?;
    let bhk = read_line(input, "BHK values (comma-separated, blank for all): ")?;
    let min_price = read_line(input, "Min price (blank for none): ")?;
    let max_price = read_line(input, "Max price (blank for none): ")?;
    let min_size = read_line(input, "Min size in sq ft (blank for none): ")?;
    let max_size = read_line(input, "Max size in sq ft (blank for none): ")?;

    let bhk: Vec<u32> = bhk
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();
    Some(
        Filter::new()
            .cities(cities.split(','))
            .property_types(types.split(','))
            .bhk(bhk)
            .price_range(parse_bound(&min_price), parse_bound(&max_price))
            .size_range(parse_bound(&min_size), parse_bound(&max_size)),
    )
}

/// Menu option [3]: choose the filter used by subsequent reports.
fn handle_set_filter<R: BufRead>(input: &mut R) {
    let Some(filter) = read_filter(input) else {
        return;
    };
    let mut state = APP_STATE.lock().unwrap_or_else(|e| e.into_inner());
    state.filter = filter;
    println!("Filter updated.\n");
}

fn run_interactive<R: BufRead>(config: &Config, input: &mut R) {
    loop {
        println!("Housing Report");
        println!("[1] Load the file");
        println!("[2] Generate Reports");
        println!("[3] Set Filter\n");
        let Some(choice) = read_line(input, "Enter choice: ") else {
            println!("\nExiting the program.");
            break;
        };
        match choice.as_str() {
            "1" => handle_load(config),
            "2" => {
                println!();
                handle_generate_reports(config);
                if !prompt_back_to_menu(input) {
                    println!("Exiting the program.");
                    break;
                }
            }
            "3" => handle_set_filter(input),
            _ => println!("Invalid choice. Please enter 1, 2 or 3.\n"),
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(path) = cli.data {
        config.data.path = path;
    }

    match cli.command.unwrap_or(Commands::Interactive) {
        Commands::Load => {
            load_dataset(&config.data.path)?;
        }
        Commands::Report(args) => {
            if let Some(dir) = &args.out_dir {
                config.report.out_dir = dir.clone();
            }
            let dataset = load_dataset(&config.data.path)?;
            let mut dashboard = build_dashboard(dataset, &config);
            let view = dashboard.view(&args.filter());
            export_view(
                &view,
                dashboard.dataset(),
                &config.report.out_dir,
                config.report.preview_rows,
            )?;
        }
        Commands::Interactive => {
            let stdin = io::stdin();
            run_interactive(&config, &mut stdin.lock());
        }
    }
    Ok(())
}

fn main() {
    logging::init_logging();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
