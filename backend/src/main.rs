//! qsflat CLI - flatten query strings stored in a CSV column
//!
//! # Main Commands
//!
//! ```bash
//! qsflat parse orders.csv -c C                    # → parsed_output.csv
//! qsflat parse orders.csv -c C --separate-items   # itemSku, itemUnitPrice, ... columns
//! qsflat serve                                    # Start HTTP server (port 3000)
//! ```
//!
//! # Helper Commands
//!
//! ```bash
//! qsflat columns orders.csv                       # List columns with their letters
//! qsflat decode 'item1=A&amt1=2'                  # Show a decoded query string
//! ```

use clap::{Parser, Subcommand};
use qsflat::{
    describe_columns, parse_csv_file, table_to_bytes, transform_csv, write_table_file, Config,
    ItemMode, ParseOptions, RowTransformer,
};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "qsflat")]
#[command(about = "Flatten URL query strings stored in a CSV column", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Flatten the query-string column of a CSV file
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// Column letter holding the query strings (e.g. A, C, AB)
        #[arg(short, long)]
        column: String,

        /// Write itemSku, itemUnitPrice, itemQuantity, itemDiscount columns
        /// instead of a single items column
        #[arg(short, long)]
        separate_items: bool,

        /// Output file, `-` for stdout (default: parsed_output.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Skip rows with an item index above this value
        #[arg(long)]
        max_item_index: Option<usize>,
    },

    /// List the columns of a CSV file with their letters
    Columns {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,
    },

    /// Decode a single query string and print the flattened fields as JSON
    Decode {
        /// Query string, e.g. 'item1=A&amt1=2&currency=EUR'
        query: String,

        /// Use separate item columns
        #[arg(short, long)]
        separate_items: bool,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: QSFLAT_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse {
            input,
            column,
            separate_items,
            output,
            delimiter,
            max_item_index,
        } => {
            let options = ParseOptions::new(column)
                .separate_items(separate_items)
                .with_delimiter(delimiter)
                .with_max_item_index(max_item_index.unwrap_or(config.max_item_index));
            let output = output.unwrap_or_else(|| PathBuf::from(&config.output_name));
            cmd_parse(&input, &options, &output)
        }

        Commands::Columns { input, delimiter } => cmd_columns(&input, delimiter),

        Commands::Decode {
            query,
            separate_items,
        } => cmd_decode(&query, separate_items, &config),

        Commands::Serve { port } => {
            let config = Config {
                port: port.unwrap_or(config.port),
                ..config
            };
            qsflat::server::start_server(config).await
        }
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_parse(
    input: &Path,
    options: &ParseOptions,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Processing: {}", input.display());

    let result = transform_csv(input, options)?;

    eprintln!("\n📊 Summary:");
    eprintln!("   Rows read:     {}", result.csv_info.row_count);
    eprintln!("   Rows written:  {}", result.table.len());
    eprintln!("   Rows skipped:  {}", result.skipped.len());
    eprintln!("   Columns:       {}", result.table.schema.len());

    if output == Path::new("-") {
        let bytes = table_to_bytes(&result.table)?;
        std::io::stdout().write_all(&bytes)?;
    } else {
        write_table_file(&result.table, output)?;
        eprintln!("\n💾 File saved as: {}", output.display());
    }

    eprintln!("✨ Done!");
    Ok(())
}

fn cmd_columns(input: &Path, delimiter: Option<char>) -> Result<(), Box<dyn std::error::Error>> {
    let dataset = parse_csv_file(input, delimiter)?;

    eprintln!(
        "📋 {} has {} columns ({} rows):",
        input.display(),
        dataset.column_count(),
        dataset.rows.len()
    );
    for line in describe_columns(&dataset.headers) {
        println!("  {}", line);
    }
    Ok(())
}

fn cmd_decode(
    query: &str,
    separate_items: bool,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let transformer = RowTransformer::new(0, ItemMode::from_separate(separate_items))
        .with_max_item_index(config.max_item_index);
    let record = transformer.transform_query(query)?;

    let fields: serde_json::Map<String, serde_json::Value> = record
        .fields()
        .into_iter()
        .map(|(field, value)| (field.name().to_string(), value.into()))
        .collect();

    println!("{}", serde_json::to_string_pretty(&fields)?);
    Ok(())
}
