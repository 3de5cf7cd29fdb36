use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use lab_core::{
    config::resolve_catalog, price_from_grand_total, BaseAmountQuote, CoreConfig, LineItem,
    OrderItem, OrderStatus, PortalService, QuotationNumber, StageView,
};
use lab_types::SampleCount;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "lab")]
#[command(about = "Laboratory services portal CLI")]
struct Cli {
    /// Print JSON instead of a table
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Price one item whose amount excludes GST
    Preview {
        /// Study type, for example "Toxicity Study"
        study_type: String,
        /// Item amount excluding GST
        amount: f64,
        /// Number of samples
        samples: i64,
        /// Selected guidelines (comma-separated)
        #[arg(long, value_delimiter = ',')]
        guidelines: Vec<String>,
        /// Selected microbiology studies (comma-separated)
        #[arg(long, value_delimiter = ',')]
        studies: Vec<String>,
    },
    /// Price a cart group from a JSON array of order items (amounts include GST)
    Cart {
        /// Path to the JSON file
        file: PathBuf,
    },
    /// Split a GST-inclusive total into subtotal and GST
    Split {
        /// Grand total including GST
        grand_total: f64,
    },
    /// Derive the tracking view from a JSON order status
    Stage {
        /// Path to the JSON file
        file: PathBuf,
    },
    /// List catalog categories, the studies in a category, or one entry
    Lookup {
        /// Study category
        category: Option<String>,
        /// Study or guideline name
        study: Option<String>,
    },
    /// Estimate a base amount from catalog list prices
    Estimate {
        /// Study category
        category: String,
        /// Studies to include (comma-separated)
        #[arg(value_delimiter = ',')]
        studies: Vec<String>,
        /// Number of samples
        #[arg(long, default_value_t = 1)]
        samples: i64,
    },
    /// Issue a new quotation number
    QuoteNumber {
        /// Number prefix (defaults to LAB_QUOTATION_PREFIX or "QT")
        #[arg(long)]
        prefix: Option<String>,
        /// Issue date as YYYY-MM-DD (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let cfg = CoreConfig::from_values(
        None,
        None,
        std::env::var("LAB_QUOTATION_PREFIX").ok(),
        std::env::var("LAB_CATALOG_FILE").ok(),
    )?;
    let catalog = resolve_catalog(&cfg)?;
    let service = PortalService::new(Arc::new(cfg), Arc::new(catalog));

    match cli.command {
        Some(Commands::Preview {
            study_type,
            amount,
            samples,
            guidelines,
            studies,
        }) => {
            let item = OrderItem {
                quotation_number: String::new(),
                study_type,
                base_amount: amount,
                number_of_samples: samples,
                selected_guidelines: guidelines,
                selected_studies: studies,
                order_status: None,
            };
            match service.preview_item(&item) {
                Ok(quote) if cli.json => print_json(&quote)?,
                Ok(quote) => print_quote(&quote),
                Err(e) => eprintln!("Error pricing item: {}", e),
            }
        }
        Some(Commands::Cart { file }) => {
            let text = std::fs::read_to_string(&file)?;
            match OrderItem::parse_list(&text).and_then(|items| service.price_cart(&items)) {
                Ok(quote) if cli.json => print_json(&quote)?,
                Ok(quote) => {
                    for priced in &quote.items {
                        println!("{} ({})", priced.study_type, priced.quotation_number);
                        print_line_items(&priced.line_items);
                    }
                    println!("Document subtotal: {:.2}", quote.document_sub_total);
                    println!("Subtotal:          {:.2}", quote.totals.sub_total);
                    println!(
                        "GST ({}%):         {:.2}",
                        quote.gst_percent, quote.totals.gst_amount
                    );
                    println!("Grand total:       {:.2}", quote.totals.grand_total);
                }
                Err(e) => eprintln!("Error pricing cart from {}: {}", file.display(), e),
            }
        }
        Some(Commands::Split { grand_total }) => match price_from_grand_total(grand_total) {
            Ok(split) if cli.json => print_json(&split)?,
            Ok(split) => println!(
                "Subtotal: {:.2}, GST: {:.2}, Grand total: {:.2}",
                split.sub_total, split.gst_amount, split.grand_total
            ),
            Err(e) => eprintln!("Error splitting total: {}", e),
        },
        Some(Commands::Stage { file }) => {
            let text = std::fs::read_to_string(&file)?;
            match OrderStatus::parse(&text) {
                Ok(status) => {
                    let (view, anomalies) = service.track(&status);
                    if cli.json {
                        print_json(&view)?;
                    } else {
                        print_stage_view(&view);
                        for anomaly in &anomalies {
                            println!("Warning: {:?}", anomaly);
                        }
                    }
                }
                Err(e) => eprintln!("Error reading order status from {}: {}", file.display(), e),
            }
        }
        Some(Commands::Lookup { category, study }) => {
            let catalog = service.catalog();
            match (category, study) {
                (None, _) => {
                    for name in catalog.category_names() {
                        println!("{}", name);
                    }
                }
                (Some(category), None) => match catalog.studies(&category) {
                    Some(studies) if cli.json => print_json(&studies)?,
                    Some(studies) => {
                        for entry in studies {
                            println!(
                                "{:<50} {:>10.2}  {}",
                                entry.name.as_str(),
                                entry.price,
                                entry.duration
                            );
                        }
                    }
                    None => eprintln!("Unknown study category: {}", category),
                },
                (Some(category), Some(study)) => match service.lookup_guideline(&category, &study) {
                    Some(entry) if cli.json => print_json(entry)?,
                    Some(entry) => println!(
                        "{}: {:.2} per sample, {}, deviation {}",
                        entry.name, entry.price, entry.duration, entry.deviation
                    ),
                    None => eprintln!("No entry for '{}' in '{}'", study, category),
                },
            }
        }
        Some(Commands::Estimate {
            category,
            studies,
            samples,
        }) => {
            let samples = match SampleCount::new(samples) {
                Ok(samples) => samples,
                Err(e) => {
                    eprintln!("Error estimating: {}", e);
                    return Ok(());
                }
            };
            match service.catalog().estimate(&category, &studies, samples) {
                Ok(estimate) if cli.json => print_json(&estimate)?,
                Ok(estimate) => {
                    for entry in &estimate.entries {
                        println!("{:<50} {:>10.2}", entry.name.as_str(), entry.price);
                    }
                    println!("Base amount (excl. GST): {:.2}", estimate.base_amount);
                }
                Err(e) => eprintln!("Error estimating: {}", e),
            }
        }
        Some(Commands::QuoteNumber { prefix, date }) => {
            let number = match (prefix, date) {
                (None, None) => service.issue_quotation_number(),
                (prefix, date) => QuotationNumber::issue(
                    prefix
                        .as_deref()
                        .unwrap_or(service.config().quotation_prefix()),
                    date.unwrap_or_else(|| chrono::Utc::now().date_naive()),
                ),
            };
            match number {
                Ok(number) => println!("{}", number),
                Err(e) => eprintln!("Error issuing quotation number: {}", e),
            }
        }
        None => {
            println!("Use 'lab --help' for commands");
        }
    }

    Ok(())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_line_items(line_items: &[LineItem]) {
    for line in line_items {
        println!(
            "  {:<48} {:>4} x {:>10.2} = {:>10.2}",
            line.name,
            line.qty.get(),
            line.unit_price,
            line.total_price
        );
    }
}

fn print_quote(quote: &BaseAmountQuote) {
    print_line_items(&quote.line_items);
    println!("Subtotal:    {:.2}", quote.sub_total);
    println!("GST ({}%):   {:.2}", quote.gst_percent, quote.gst_amount);
    println!("Grand total: {:.2}", quote.grand_total);
}

fn print_stage_view(view: &StageView) {
    println!("Current stage: {}", view.current_stage);
    for stage in &view.stages {
        println!("{}", stage.label);
        for progress in &stage.checkpoints {
            println!(
                "  [{:?}] {}{}",
                progress.status,
                progress.label,
                progress
                    .timestamp
                    .as_deref()
                    .map(|t| format!(" ({})", t))
                    .unwrap_or_default()
            );
        }
    }
}
