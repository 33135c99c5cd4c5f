//! partlex - Hebrew car-parts description parser CLI.
//!
//! ```bash
//! # Parse one line
//! partlex parse "בולם קדמי ימין מזדה 3"
//!
//! # Parse a file of listings, one record per line as JSON
//! partlex import parts.txt --json
//!
//! # Initialize or inspect a knowledge-base file
//! partlex kb init enhanced_knowledge_base.json
//! partlex kb show enhanced_knowledge_base.json
//! ```

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use partlex::{KnowledgeBase, ParsedRecord, PartsParser};

/// Hebrew car-parts description parser.
#[derive(Parser)]
#[command(name = "partlex", author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Knowledge-base file to use (created from the seed if missing).
    #[arg(long, global = true)]
    kb: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a single part description line.
    #[command(visible_alias = "p")]
    Parse {
        /// The part description text.
        text: Vec<String>,

        /// Emit the full record as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Parse a file of part descriptions, one per line.
    Import {
        /// Input file (UTF-8, one listing per line).
        file: PathBuf,

        /// Emit records as JSON lines instead of a summary table.
        #[arg(long)]
        json: bool,
    },

    /// Knowledge-base file operations.
    Kb {
        #[command(subcommand)]
        command: KbCommands,
    },
}

#[derive(Subcommand)]
enum KbCommands {
    /// Write the seed knowledge base to a file (no-op if one exists).
    Init { path: PathBuf },

    /// Print knowledge-base cardinality.
    Show { path: PathBuf },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let parser = || match &cli.kb {
        Some(path) => PartsParser::load(path),
        None => PartsParser::new(),
    };

    match cli.command {
        Commands::Parse { text, json } => {
            let line = text.join(" ");
            if line.trim().is_empty() {
                eprintln!("error: no text given");
                return ExitCode::FAILURE;
            }
            match parser().parse_line(&line) {
                Some(record) => {
                    print_record(&record, json);
                    ExitCode::SUCCESS
                }
                None => {
                    eprintln!("error: nothing to parse");
                    ExitCode::FAILURE
                }
            }
        }

        Commands::Import { file, json } => {
            let text = match fs::read_to_string(&file) {
                Ok(text) => text,
                Err(e) => {
                    eprintln!("error: cannot read {}: {}", file.display(), e);
                    return ExitCode::FAILURE;
                }
            };
            let summary = parser().parse_many(text.lines());
            if json {
                for record in &summary.records {
                    match serde_json::to_string(record) {
                        Ok(line) => println!("{line}"),
                        Err(e) => eprintln!("error: serialization failed: {e}"),
                    }
                }
            } else {
                for record in &summary.records {
                    print_record(record, false);
                    println!();
                }
            }
            eprintln!(
                "parsed {} lines, skipped {}",
                summary.records.len(),
                summary.skipped
            );
            ExitCode::SUCCESS
        }

        Commands::Kb { command } => match command {
            KbCommands::Init { path } => {
                if path.exists() {
                    eprintln!("{} already exists", path.display());
                    return ExitCode::SUCCESS;
                }
                match KnowledgeBase::seed().save(&path) {
                    Ok(()) => {
                        println!("wrote seed knowledge base to {}", path.display());
                        ExitCode::SUCCESS
                    }
                    Err(e) => {
                        eprintln!("error: {e}");
                        ExitCode::FAILURE
                    }
                }
            }
            KbCommands::Show { path } => {
                let kb = KnowledgeBase::load(&path);
                println!("car makes:       {}", kb.car_makes.len());
                println!("car models:      {}", kb.car_models.len());
                println!("part categories: {}", kb.part_categories.len());
                println!("engine codes:    {}", kb.engine_codes.len());
                println!("special patterns:{}", kb.special_patterns.len());
                ExitCode::SUCCESS
            }
        },
    }
}

fn print_record(record: &ParsedRecord, json: bool) {
    if json {
        match serde_json::to_string_pretty(record) {
            Ok(text) => println!("{text}"),
            Err(e) => eprintln!("error: serialization failed: {e}"),
        }
        return;
    }

    println!("{}", record.part_name);
    let fields: &[(&str, Option<&str>)] = &[
        ("make", record.car_make.as_deref()),
        ("model", record.car_model.as_deref()),
        ("category", record.category.as_deref()),
        ("specific", record.category_specific.as_deref()),
        ("location", record.location.as_deref()),
        ("side", record.side.as_deref()),
        ("engine code", record.engine_code.as_deref()),
        ("displacement", record.engine_displacement.as_deref()),
        ("drive type", record.drive_type.as_deref()),
        ("dimensions", record.dimensions.as_deref()),
        ("part number", record.part_number.as_deref()),
        ("extra", record.additional_info.as_deref()),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            println!("  {label:<13}{value}");
        }
    }
    match (record.year_from, record.year_to) {
        (Some(from), Some(to)) => println!("  {:<13}{}-{}", "years", from, to),
        (Some(from), None) => println!("  {:<13}{}-", "years", from),
        _ => {}
    }
    println!("  {:<13}{:.2}", "confidence", record.confidence_score);
}
