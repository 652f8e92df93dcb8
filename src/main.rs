//! Paddock CLI
//!
//! Builds walk-forward driver features from a table of Formula 1 race results.

use clap::{Parser, Subcommand};
use paddock::{CircuitKey, Config, Result};

#[derive(Parser)]
#[command(name = "paddock")]
#[command(about = "Walk-forward driver features from F1 race results", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the feature table from a race results CSV
    Build {
        /// Input race results (overrides config)
        #[arg(short, long)]
        input: Option<String>,
        /// Output feature CSV (overrides config)
        #[arg(short, long)]
        output: Option<String>,
        /// Prior races required before a row is emitted
        #[arg(long)]
        min_history: Option<usize>,
        /// Position assumed for unclassified finishes
        #[arg(long)]
        imputed_position: Option<f64>,
        /// Column identifying a circuit (event_name or location)
        #[arg(long)]
        circuit_key: Option<CircuitKey>,
        /// Process drivers on a single thread
        #[arg(long)]
        sequential: bool,
    },
    /// Show what an input file contains
    Status {
        /// Input race results (overrides config)
        #[arg(short, long)]
        input: Option<String>,
    },
    /// Write a default config file
    Init,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Build {
            input,
            output,
            min_history,
            imputed_position,
            circuit_key,
            sequential,
        } => {
            let mut config = config;
            if let Some(path) = input {
                config.data.input_path = path;
            }
            if let Some(path) = output {
                config.data.output_path = path;
            }
            if let Some(n) = min_history {
                config.features.min_history = n;
            }
            if let Some(p) = imputed_position {
                config.features.imputed_position = p;
            }
            if let Some(key) = circuit_key {
                config.features.circuit_key = key;
            }
            config.runtime.sequential |= sequential;
            config.features.validate().and_then(|_| commands::build(&config))
        }
        Commands::Status { input } => {
            let mut config = config;
            if let Some(path) = input {
                config.data.input_path = path;
            }
            commands::status(&config)
        }
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use paddock::data::{FeatureWriter, RecordLoader};
    use paddock::features::{ChronologicalIndex, WalkForwardBuilder};

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!(
            "  2. Export race results to {} from the ingestion pipeline",
            config.data.input_path
        );
        println!("  3. Run 'paddock build' to generate {}", config.data.output_path);

        Ok(())
    }

    pub fn build(config: &Config) -> Result<()> {
        let loaded = RecordLoader::new(config.features.unorderable_records)
            .load_path(&config.data.input_path)?;
        let unorderable = loaded.unorderable;

        let index = ChronologicalIndex::build(loaded.records)?;
        println!(
            "Loaded {} records: {} seasons, {} races, {} drivers",
            index.len(),
            index.seasons().len(),
            index.race_count(),
            index.driver_count()
        );

        let mut table = WalkForwardBuilder::new(config.features.clone())
            .sequential(config.runtime.sequential)
            .build(&index);
        table.summary.unorderable_records = unorderable;

        FeatureWriter::write_path(&table.rows, &config.data.output_path)?;

        let summary = &table.summary;
        println!("\nFeature Build");
        println!("───────────────────────────────");
        println!("  Output:               {}", config.data.output_path);
        println!("  Drivers processed:    {}", summary.drivers_processed);
        println!("  Rows written:         {}", summary.rows_emitted);
        println!("  Insufficient history: {}", summary.insufficient_history);
        println!("  Failed rows:          {}", summary.failed_rows);
        println!("  Unorderable skipped:  {}", summary.unorderable_records);

        println!("\nRows per season:");
        for season in index.seasons() {
            let rows = summary.rows_per_season.get(&season).copied().unwrap_or(0);
            let skipped = summary.skipped_per_season.get(&season).copied().unwrap_or(0);
            println!("  {}: {} rows ({} skipped)", season, rows, skipped);
        }

        if !summary.is_balanced() {
            log::warn!(
                "Row accounting mismatch: {} indexed, {} emitted, {} skipped, {} failed",
                summary.records_indexed,
                summary.rows_emitted,
                summary.insufficient_history,
                summary.failed_rows
            );
        }

        Ok(())
    }

    pub fn status(config: &Config) -> Result<()> {
        let loaded = RecordLoader::new(config.features.unorderable_records)
            .load_path(&config.data.input_path)?;
        let unorderable = loaded.unorderable;
        let index = ChronologicalIndex::build(loaded.records)?;

        println!("Record Table Status");
        println!("───────────────────────────────");
        println!("  Path:        {}", config.data.input_path);
        println!("  Records:     {}", index.len());
        println!("  Drivers:     {}", index.driver_count());
        println!("  Races:       {}", index.race_count());
        println!("  Seasons:     {:?}", index.seasons());
        println!("  Unorderable: {}", unorderable);
        if let Some((earliest, latest)) = index.date_range() {
            println!("  Range:       {} to {}", earliest, latest);
        }

        Ok(())
    }
}
