//! Command-line front end for allergen checks.
//!
//! Usage:
//!     allercheck check --allergies milk,peanuts --ingredients "flour, butter"
//!     allercheck image meal.jpg --allergies milk
//!     allercheck request request.json
//!     allercheck filter Bread Dog "Kitchen table" --strict
//!     allercheck table --export

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use allercheck_allergens::AllergenVariantTable;
use allercheck_features::{clean_labels, split_manual_entry, FoodLabelFilter};
use allercheck_matcher::analyze;
use allercheck_model::{AnalysisReport, DetectionSource, DetectionStatus, IngredientDetection};
use allercheck_report::{explain_match, summarize_report, AnalysisEnvelope};
use allercheck_vision::{
    detect_ingredients, load_image, CloudVisionDetector, LabelDetector, VisionConfig,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;

#[derive(Parser)]
#[command(name = "allercheck")]
#[command(about = "Check ingredient lists against declared allergies")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text, json)
    #[arg(short, long, global = true, default_value = "text")]
    format: String,

    /// Allergen table to use instead of the built-in one (versioned JSON)
    #[arg(long, global = true, env = "ALLERCHECK_TABLE")]
    table: Option<PathBuf>,

    /// Cloud Vision base URL
    #[arg(long, global = true, default_value = "https://vision.googleapis.com")]
    vision_url: String,

    /// Cloud Vision API key
    #[arg(long, global = true, env = "GOOGLE_VISION_API_KEY", hide_env_values = true)]
    vision_key: Option<String>,

    /// Cloud Vision request timeout in seconds
    #[arg(long, global = true, default_value = "30")]
    vision_timeout: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Check manually entered ingredients
    Check {
        /// Allergies to check for (comma-separated)
        #[arg(short, long, required = true, value_delimiter = ',')]
        allergies: Vec<String>,

        /// Ingredients separated by commas or newlines
        #[arg(short, long)]
        ingredients: Option<String>,

        /// Read ingredients from a file instead (stdin if neither is given)
        #[arg(long, conflicts_with = "ingredients")]
        file: Option<PathBuf>,
    },

    /// Detect ingredients in an image and check them
    Image {
        /// Image file path or data URL
        image: String,

        /// Allergies to check for (comma-separated)
        #[arg(short, long, required = true, value_delimiter = ',')]
        allergies: Vec<String>,

        /// Only keep labels that contain a food keyword
        #[arg(long)]
        strict: bool,
    },

    /// Process a JSON analysis request and print the response envelope
    Request {
        /// Path to the request document
        path: PathBuf,

        /// Only keep labels that contain a food keyword
        #[arg(long)]
        strict: bool,
    },

    /// Run the food-label filter over raw labels
    Filter {
        /// Raw labels from an image-labeling service
        labels: Vec<String>,

        /// Only keep labels that contain a food keyword
        #[arg(long)]
        strict: bool,

        /// Maximum labels to keep
        #[arg(long, default_value = "10")]
        max: usize,
    },

    /// List or export the allergen table
    Table {
        /// Print the table as versioned JSON
        #[arg(long)]
        export: bool,
    },
}

/// Body of an analysis request: allergies plus ingredients or an image.
#[derive(Debug, Default, Deserialize)]
struct AnalysisRequest {
    #[serde(default)]
    allergies: Option<Vec<String>>,

    #[serde(default)]
    ingredients: Option<Vec<String>>,

    /// Image as a `data:image/...;base64,` URL
    #[serde(default)]
    image: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so JSON output stays clean
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("allercheck=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let table = load_table(cli.table.as_deref())?;
    let vision = VisionConfig {
        base_url: cli.vision_url.clone(),
        api_key: cli.vision_key.clone(),
        timeout_secs: cli.vision_timeout,
        ..Default::default()
    };

    match cli.command {
        Commands::Check {
            allergies,
            ingredients,
            file,
        } => {
            run_check(&table, &allergies, ingredients, file.as_deref(), &cli.format)?;
        }
        Commands::Image {
            image,
            allergies,
            strict,
        } => {
            let detector = CloudVisionDetector::new(vision)?;
            run_image(&table, &detector, &image, &allergies, filter_for(strict), &cli.format)
                .await?;
        }
        Commands::Request { path, strict } => {
            let detector = CloudVisionDetector::new(vision)?;
            run_request(&table, &detector, &path, filter_for(strict)).await?;
        }
        Commands::Filter {
            labels,
            strict,
            max,
        } => {
            run_filter(&labels, filter_for(strict).with_max_labels(max), &cli.format)?;
        }
        Commands::Table { export } => {
            run_table(&table, export || cli.format == "json")?;
        }
    }

    Ok(())
}

fn load_table(path: Option<&Path>) -> Result<Cow<'static, AllergenVariantTable>> {
    match path {
        Some(path) => {
            let table = AllergenVariantTable::load(path)
                .with_context(|| format!("Failed to load allergen table {}", path.display()))?;
            tracing::info!(path = %path.display(), allergens = table.len(), "Using custom allergen table");
            Ok(Cow::Owned(table))
        }
        None => Ok(Cow::Borrowed(AllergenVariantTable::builtin())),
    }
}

fn filter_for(strict: bool) -> FoodLabelFilter {
    if strict {
        FoodLabelFilter::strict()
    } else {
        FoodLabelFilter::default()
    }
}

fn run_check(
    table: &AllergenVariantTable,
    allergies: &[String],
    ingredients: Option<String>,
    file: Option<&Path>,
    format: &str,
) -> Result<()> {
    let text = match (ingredients, file) {
        (Some(text), _) => text,
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, None) => std::io::read_to_string(std::io::stdin())?,
    };

    let Some((detection, report)) = analyze_manual(table, allergies, &text) else {
        anyhow::bail!("No ingredients to check");
    };

    if format == "json" {
        let envelope = AnalysisEnvelope::completed(report).with_detection(detection);
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

/// Split typed text and check it. `None` when no ingredients remain.
fn analyze_manual(
    table: &AllergenVariantTable,
    allergies: &[String],
    text: &str,
) -> Option<(IngredientDetection, AnalysisReport)> {
    let ingredients = split_manual_entry(text);
    if ingredients.is_empty() {
        return None;
    }

    let report = analyze(&ingredients, &clean_labels(allergies), table);
    Some((IngredientDetection::manual(ingredients), report))
}

async fn run_image<D: LabelDetector>(
    table: &AllergenVariantTable,
    detector: &D,
    image: &str,
    allergies: &[String],
    filter: FoodLabelFilter,
    format: &str,
) -> Result<()> {
    let payload = load_image(image)
        .await
        .with_context(|| format!("Failed to load image {}", image))?;

    let detection = detect_ingredients(detector, &payload.bytes, &filter).await;
    let report = analyze(&detection.ingredients, &clean_labels(allergies), table);

    if format == "json" {
        let envelope = AnalysisEnvelope::completed(report).with_detection(detection);
        println!("{}", serde_json::to_string_pretty(&envelope)?);
        return Ok(());
    }

    print_detection(&detection);
    if detection.ingredients.is_empty() {
        println!("No ingredients to check; this is not a safety verdict.");
    } else {
        print_report(&report);
    }

    Ok(())
}

async fn run_request<D: LabelDetector>(
    table: &AllergenVariantTable,
    detector: &D,
    path: &Path,
    filter: FoodLabelFilter,
) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let request: AnalysisRequest = serde_json::from_str(&content)
        .with_context(|| format!("Invalid request document {}", path.display()))?;

    let envelope = handle_request(table, detector, request, &filter).await;
    println!("{}", serde_json::to_string_pretty(&envelope)?);

    Ok(())
}

/// Turn a request into a response envelope. Failures become `success: false`.
async fn handle_request<D: LabelDetector>(
    table: &AllergenVariantTable,
    detector: &D,
    request: AnalysisRequest,
    filter: &FoodLabelFilter,
) -> AnalysisEnvelope {
    let Some(allergies) = request.allergies.as_deref().map(clean_labels) else {
        return AnalysisEnvelope::failed("Missing allergies data or image");
    };

    if let Some(ingredients) = request.ingredients {
        let ingredients = clean_labels(&ingredients);
        let report = analyze(&ingredients, &allergies, table);
        return AnalysisEnvelope::completed(report).with_detection(IngredientDetection {
            source: DetectionSource::Request,
            status: DetectionStatus::Detected,
            ingredients,
            raw_labels: Vec::new(),
        });
    }

    let Some(image) = request.image else {
        return AnalysisEnvelope::failed("Missing allergies data or image");
    };

    let payload = match load_image(&image).await {
        Ok(payload) => payload,
        Err(e) => return AnalysisEnvelope::failed(format!("Error analyzing image: {}", e)),
    };

    let detection = detect_ingredients(detector, &payload.bytes, filter).await;
    let report = analyze(&detection.ingredients, &allergies, table);
    AnalysisEnvelope::completed(report).with_detection(detection)
}

fn run_filter(labels: &[String], filter: FoodLabelFilter, format: &str) -> Result<()> {
    let kept = filter.apply(labels);

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&kept)?);
    } else {
        for label in &kept {
            println!("{}", label);
        }
        println!("---");
        println!("Kept {} of {} labels", kept.len(), labels.len());
    }

    Ok(())
}

fn run_table(table: &AllergenVariantTable, export: bool) -> Result<()> {
    if export {
        println!("{}", table.to_json()?);
        return Ok(());
    }

    for entry in table.iter() {
        println!("{}: {}", entry.label, entry.variants.join(", "));
    }
    println!("---");
    println!("Total: {} allergens", table.len());

    Ok(())
}

fn print_detection(detection: &IngredientDetection) {
    match &detection.status {
        DetectionStatus::Detected => {
            println!("Detected: {}", detection.ingredients.join(", "));
        }
        DetectionStatus::NoFoodLabels => {
            println!(
                "No food labels among {} detected label(s)",
                detection.raw_labels.len()
            );
        }
        DetectionStatus::Unavailable { reason } => {
            println!("Label detection unavailable: {}", reason);
        }
    }
}

fn print_report(report: &AnalysisReport) {
    println!("Checked {} ingredient(s)", report.ingredients_checked);
    println!("---");

    for (i, hit) in report.allergens_detected.iter().enumerate() {
        let explanation = explain_match(hit);
        println!("{}. {} [{}]", i + 1, explanation.summary, hit.match_type.as_str());
        println!("   {}", explanation.detail);
    }

    println!("{}", summarize_report(report));
}
