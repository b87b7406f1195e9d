//! Metrica CLI - evaluate metrics and pivot queries over a dataset
//!
//! Usage:
//!   metrica eval --metric <name>... [--filter <expr>...]
//!   metrica query --fact <table> --rows <dim>... --metric <name>... [--filter <expr>...]
//!   metrica list
//!   metrica validate
//!
//! Examples:
//!   metrica --model model.toml --data sales.json eval --metric revenue --filter year=2025
//!   metrica query --fact sales --rows regionId --metric revenue --metric attainment --filter year=2025
//!   metrica list

use clap::{Parser, Subcommand, ValueEnum};
use metrica::config::Settings;
use metrica::context::parse_filters;
use metrica::database::Database;
use metrica::loader::{load_dataset_file, load_model_file, Model};
use metrica::model::{MetricKind, Value};
use metrica::semantic::{MetricEngine, PivotQuery, PivotRow};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "metrica")]
#[command(about = "Metrica - evaluate metrics over in-memory fact tables")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to METRICA_CONFIG, ./metrica.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Model definition file (overrides [data] model)
    #[arg(long, global = true)]
    model: Option<PathBuf>,

    /// Dataset file (overrides [data] dataset)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Log level
    #[arg(long, global = true, default_value = "warn")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate metrics under one filter context
    Eval {
        /// Metric to evaluate (repeatable)
        #[arg(short, long = "metric", required = true)]
        metrics: Vec<String>,

        /// Filter expression, e.g. year=2025 or month=1..3 (repeatable)
        #[arg(short, long = "filter")]
        filters: Vec<String>,

        /// Output format
        #[arg(short, long, default_value = "table")]
        output: OutputFormat,
    },

    /// Run a pivot query
    Query {
        /// Fact table whose rows define the groups
        #[arg(long)]
        fact: String,

        /// Row dimension (repeatable)
        #[arg(short, long = "rows", required = true)]
        rows: Vec<String>,

        /// Metric to evaluate per group (repeatable)
        #[arg(short, long = "metric", required = true)]
        metrics: Vec<String>,

        /// Base filter expression (repeatable)
        #[arg(short, long = "filter")]
        filters: Vec<String>,

        /// Output format
        #[arg(short, long, default_value = "table")]
        output: OutputFormat,
    },

    /// List fact tables, metrics and transforms in the model
    List,

    /// Load the model and dataset and report every dangling reference
    Validate,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    None,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Aligned text table
    Table,
    /// JSON
    Json,
}

fn init_logging(log_level: LogLevel) {
    let level = match log_level {
        LogLevel::None => return,
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };

    let env = env_logger::Env::default().filter_or("RUST_LOG", level);

    env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(matches!(log_level, LogLevel::Debug | LogLevel::Trace))
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading settings: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let Some(model) = load_model(&cli, &settings) else {
        return ExitCode::FAILURE;
    };

    if let Commands::List = cli.command {
        return cmd_list(&model);
    }

    let Some(database) = load_database(&cli, &settings) else {
        return ExitCode::FAILURE;
    };
    let engine = MetricEngine::new(&model.registry, &database)
        .with_format_settings(settings.format.clone());

    match cli.command {
        Commands::Eval {
            metrics,
            filters,
            output,
        } => cmd_eval(&engine, &metrics, &filters, output),
        Commands::Query {
            fact,
            rows,
            metrics,
            filters,
            output,
        } => cmd_query(&engine, &model, fact, rows, metrics, &filters, output),
        Commands::List => cmd_list(&model),
        Commands::Validate => cmd_validate(&model, &database),
    }
}

fn resolve_input(
    explicit: &Option<PathBuf>,
    configured: Result<Option<PathBuf>, metrica::config::SettingsError>,
    what: &str,
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.clone());
    }
    match configured {
        Ok(Some(path)) => Some(path),
        Ok(None) => {
            eprintln!(
                "No {} file given: pass --{} or set [data] {} in the settings",
                what,
                flag_for(what),
                what
            );
            None
        }
        Err(e) => {
            eprintln!("Error resolving {} path: {}", what, e);
            None
        }
    }
}

fn flag_for(what: &str) -> &str {
    match what {
        "dataset" => "data",
        other => other,
    }
}

fn load_model(cli: &Cli, settings: &Settings) -> Option<Model> {
    let path = resolve_input(&cli.model, settings.model_path(), "model")?;
    match load_model_file(&path, settings.time.clone()) {
        Ok(model) => Some(model),
        Err(e) => {
            eprintln!("Error loading model '{}': {}", path.display(), e);
            None
        }
    }
}

fn load_database(cli: &Cli, settings: &Settings) -> Option<Database> {
    let path = resolve_input(&cli.data, settings.dataset_path(), "dataset")?;
    match load_dataset_file(&path) {
        Ok(db) => Some(db),
        Err(e) => {
            eprintln!("Error loading dataset '{}': {}", path.display(), e);
            None
        }
    }
}

fn cmd_eval(engine: &MetricEngine<'_>, metrics: &[String], filters: &[String], output: OutputFormat) -> ExitCode {
    let context = match parse_filters(filters) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let values = match engine.evaluate_metrics(metrics, &context) {
        Ok(values) => values,
        Err(e) => {
            eprintln!("Evaluation error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match output {
        OutputFormat::Json => {
            let object: serde_json::Map<String, serde_json::Value> = values
                .iter()
                .map(|(name, value)| (name.clone(), serde_json::json!(value)))
                .collect();
            println!("{}", serde_json::Value::Object(object));
        }
        OutputFormat::Table => {
            println!("Context: {}", context);
            let width = metrics.iter().map(|m| m.len()).max().unwrap_or(0);
            for name in metrics {
                let value = values.get(name).copied().flatten();
                let display = metrica::format::format_value(
                    value,
                    engine.registry().display_format(name),
                    engine.format_settings(),
                )
                .unwrap_or_else(|| "null".to_string());
                println!("  {:<width$}  {}", name, display, width = width);
            }
        }
    }
    ExitCode::SUCCESS
}

fn cmd_query(
    engine: &MetricEngine<'_>,
    model: &Model,
    fact: String,
    rows: Vec<String>,
    metrics: Vec<String>,
    filters: &[String],
    output: OutputFormat,
) -> ExitCode {
    let context = match parse_filters(filters) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let labels: Vec<_> = model
        .labels
        .iter()
        .filter(|l| rows.contains(&l.dimension))
        .cloned()
        .collect();
    let query = PivotQuery::new(fact)
        .with_rows(rows)
        .with_filters(context)
        .with_metrics(metrics)
        .with_labels(labels);

    let result = match engine.run_query(&query) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Query error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match output {
        OutputFormat::Json => {
            let json: Vec<serde_json::Value> = result.iter().map(|r| r.to_json()).collect();
            match serde_json::to_string_pretty(&json) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("Error rendering JSON: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
        OutputFormat::Table => print_table(&result),
    }
    ExitCode::SUCCESS
}

fn print_table(rows: &[PivotRow]) {
    let Some(first) = rows.first() else {
        println!("No rows.");
        return;
    };

    let headers: Vec<String> = first
        .dimensions
        .iter()
        .chain(&first.labels)
        .map(|(k, _)| k.clone())
        .chain(first.values.iter().map(|c| c.name.clone()))
        .collect();

    let cells = |row: &PivotRow| -> Vec<String> {
        let text = |v: &Value| if v.is_null() { String::new() } else { v.to_string() };
        row.dimensions
            .iter()
            .chain(&row.labels)
            .map(|(_, v)| text(v))
            .chain(row.values.iter().map(|c| c.display.clone().unwrap_or_default()))
            .collect()
    };
    let body: Vec<Vec<String>> = rows.iter().map(cells).collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            body.iter()
                .filter_map(|r| r.get(i))
                .map(|c| c.chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<w$}", c, w = *w))
            .collect::<Vec<_>>()
            .join("  ")
    };

    println!("{}", line(headers.as_slice()));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    println!("{}", line(rule.as_slice()));
    for row in &body {
        println!("{}", line(row.as_slice()));
    }
}

fn cmd_list(model: &Model) -> ExitCode {
    let registry = &model.registry;

    let tables = registry.fact_tables();
    if !tables.is_empty() {
        println!("Fact tables:");
        for table in tables {
            let mut measures: Vec<&str> = table.measures.keys().map(String::as_str).collect();
            measures.sort_unstable();
            println!(
                "  - {} (grain: {}; measures: {})",
                table.name,
                table.grain.join(", "),
                measures.join(", ")
            );
        }
        println!();
    }

    for kind in ["fact", "expression", "derived", "transform"] {
        let metrics: Vec<_> = registry
            .metrics()
            .into_iter()
            .filter(|m| m.kind_name() == kind)
            .collect();
        if metrics.is_empty() {
            continue;
        }
        println!("{} metrics:", capitalize(kind));
        for metric in metrics {
            let detail = match &metric.kind {
                MetricKind::FactMeasure(m) => format!("{}.{}", m.fact_table, m.measure),
                MetricKind::Expression(m) => m.fact_table.clone(),
                MetricKind::Derived(m) => m.depends_on.join(", "),
                MetricKind::ContextTransform(m) => format!("{} of {}", m.transform, m.base),
            };
            match &metric.description {
                Some(desc) => println!("  - {} ({}): {}", metric.name, detail, desc),
                None => println!("  - {} ({})", metric.name, detail),
            }
        }
        println!();
    }

    println!("Transforms: {}", registry.transforms().names().join(", "));
    ExitCode::SUCCESS
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn cmd_validate(model: &Model, database: &Database) -> ExitCode {
    let mut problems: Vec<String> = model
        .registry
        .validate_references(Some(database))
        .iter()
        .map(|e| e.to_string())
        .collect();

    for label in &model.labels {
        if !database.contains(&label.table) {
            problems.push(format!(
                "Label lookup '{}' reads table '{}', which is not in the dataset",
                label.alias, label.table
            ));
        }
    }

    if !problems.is_empty() {
        eprintln!("Validation errors:");
        for problem in &problems {
            eprintln!("  {}", problem);
        }
        return ExitCode::FAILURE;
    }

    println!(
        "OK: {} metrics, {} fact tables, {} tables loaded",
        model.registry.metric_names().len(),
        model.registry.fact_tables().len(),
        database.table_names().len()
    );
    ExitCode::SUCCESS
}
