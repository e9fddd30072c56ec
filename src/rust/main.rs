use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use weedwise::{
    advise, weed_override, EnvironmentContext, ModelManager, Pipeline, PipelineConfig, Report,
    RuntimeConfig, SoilType, DEFAULT_TARGET_SIZE,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Photograph of the weed (JPEG or PNG)
    image: PathBuf,

    /// Path to the ONNX classifier. Defaults to $WEEDWISE_MODEL or the cache directory
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Expected SHA-256 of the model file
    #[arg(long)]
    sha256: Option<String>,

    /// Soil type: clay, sandy, loamy, silty or peaty
    #[arg(short, long, default_value = "unknown")]
    soil: String,

    /// Air temperature in °C
    #[arg(short, long, default_value_t = 25.0, allow_negative_numbers = true)]
    temperature: f64,

    /// Crop grown in the field, e.g. wheat, corn, soyabean
    #[arg(short, long, default_value = "")]
    crop: String,

    /// Weed label to recommend for instead of the predicted one
    #[arg(short, long)]
    weed: Option<String>,

    /// Side length images are resized to before classification
    #[arg(long, default_value_t = DEFAULT_TARGET_SIZE.0)]
    size: u32,

    /// ONNX Runtime intra-op threads (0 lets the runtime decide)
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    info!("=== Starting weed identification ===");
    let start_time = Instant::now();

    let soil = SoilType::parse(&args.soil);
    let context = EnvironmentContext::new(soil, args.temperature, args.crop.clone());
    let bytes = std::fs::read(&args.image)
        .with_context(|| format!("Failed to read image {:?}", args.image))?;

    let config = PipelineConfig {
        model_path: args.model.clone().unwrap_or_else(ModelManager::default_model_path),
        model_sha256: args.sha256.clone(),
        target_size: (args.size, args.size),
        labels: None,
    };
    let manager = ModelManager::onnx(RuntimeConfig {
        intra_threads: args.threads,
        ..RuntimeConfig::default()
    });

    let report = match Pipeline::with_manager(&manager, config) {
        Ok(pipeline) => pipeline
            .analyze(&bytes, args.weed.as_deref(), &context)
            .context("Failed to analyze image")?,
        Err(e) => match weed_override(args.weed.as_deref()) {
            // A known weed still gets advice when the model is unavailable
            Some(label) => {
                warn!("Model unavailable ({}); recommending for '{}' only", e, label);
                advise(label, &context)?
            }
            None => return Err(e).context("Failed to load the weed classifier"),
        },
    };

    info!("=== Done (took {:.2?}) ===", start_time.elapsed());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &Report) {
    if let Some(diagnosis) = &report.diagnosis {
        println!(
            "\n{} {} ({:.1}% confidence)",
            diagnosis.record.icon,
            diagnosis.prediction.label,
            diagnosis.prediction.confidence * 100.0
        );
        if !diagnosis.record.description.is_empty() {
            println!("  {}", diagnosis.record.description);
        }
    }

    println!("\nRecommendations for {}:", report.label);
    let rec = &report.recommendation;
    if rec.has_pesticides() {
        println!("  Recommended herbicides: {}", rec.pesticides.join(", "));
        println!("  {}", rec.general_recommendation);
    } else {
        println!("  No specific herbicide recommendation available for this weed.");
    }

    if !rec.contextual_notes.is_empty() {
        println!("\n  Field conditions:");
        for note in &rec.contextual_notes {
            println!("    - {}", note);
        }
    }
}
