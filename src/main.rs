//! proofgate CLI: gated decisions from the command line.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use proofgate::decision::{Decision, Outcome};
use proofgate::domain::{DomainPack, DomainRegistry, DomainSource, DEFAULT_DOMAIN};

#[derive(Parser)]
#[command(name = "proofgate", version, about = "Evidence-gated decision verification")]
struct Cli {
    /// Domain pack id, or a path to a domain TOML file.
    #[arg(long, global = true, default_value = DEFAULT_DOMAIN)]
    domain: String,

    /// Directory scanned for additional domain packs.
    #[arg(long, global = true)]
    domains_dir: Option<PathBuf>,

    /// Override the domain's minimum confidence threshold.
    #[arg(long, global = true)]
    threshold: Option<f64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decide a question.
    Decide {
        /// The question, in natural language.
        query: String,

        /// Print the full decision as JSON.
        #[arg(long)]
        json: bool,

        /// Abandon the request after this many milliseconds.
        #[arg(long)]
        budget_ms: Option<u64>,
    },

    /// List available domain packs.
    Domains,

    /// List the facts of the selected domain.
    Facts {
        /// Only show facts retrieved for this text.
        #[arg(long)]
        query: Option<String>,
    },
}

fn registry(domains_dir: Option<&PathBuf>) -> DomainRegistry {
    match domains_dir {
        Some(dir) => DomainRegistry::discover(dir),
        None => DomainRegistry::bundled(),
    }
}

fn print_decision(decision: &Decision) {
    let outcome = decision.outcome();
    println!("Outcome:      {outcome}");
    if outcome == Outcome::Refused {
        if let Some(reason) = &decision.refuse_reason {
            println!("Reason:       {reason}");
        }
        println!("Code:         {}", decision.verification_code);
        return;
    }

    println!("Answer:       {}", if decision.answer { "yes" } else { "no" });
    println!(
        "Confidence:   {:.2} ({})",
        decision.confidence, decision.confidence_label
    );
    println!("Code:         {}", decision.verification_code);

    if let Some(reasoning) = &decision.reasoning {
        println!("\nProof chain:");
        for line in reasoning.lines() {
            println!("  {line}");
        }
    }
    if !decision.limitations.is_empty() {
        println!("\nLimitations:");
        for limitation in &decision.limitations {
            println!("  - {limitation}");
        }
    }
    if !decision.alternative_paths.is_empty() {
        println!("\nAlternatives: {}", decision.alternative_paths.join(", "));
    }
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let registry = registry(cli.domains_dir.as_ref());

    match cli.command {
        Commands::Domains => {
            let packs = registry.list();
            if packs.is_empty() {
                println!("No domain packs found.");
            }
            for pack in packs {
                let summary = pack.summary();
                println!(
                    "{:<12} v{:<8} {:>3} facts  {}",
                    summary.id, summary.version, summary.facts, summary.name
                );
                println!("{:<12} {}", "", summary.description);
                if !matches!(pack.source, DomainSource::Bundled) {
                    println!("{:<12} from {}", "", summary.source);
                }
            }
        }

        Commands::Facts { query } => {
            let pack = registry.resolve(&cli.domain)?;
            let kb = pack.knowledge_base()?;
            let facts = match &query {
                Some(text) => kb.query(text),
                None => kb.facts().iter().collect(),
            };
            if facts.is_empty() {
                println!("No facts.");
            }
            for fact in facts {
                println!("{} [weight {:.2}] {}", fact.id, fact.weight, fact.statement);
                for ev in &fact.evidences {
                    println!(
                        "    {} ({}, {}, confidence {:.2})",
                        ev.source,
                        ev.evidence_type,
                        ev.publication_date.as_deref().unwrap_or("undated"),
                        ev.confidence
                    );
                }
            }
        }

        Commands::Decide {
            query,
            json,
            budget_ms,
        } => {
            let pack: DomainPack = registry.resolve(&cli.domain)?;
            let mut config = pack.config.clone();
            if let Some(threshold) = cli.threshold {
                config = config.with_threshold(threshold);
            }
            let pipeline = pack.compile_with(config)?;

            let decision = match budget_ms {
                Some(ms) => pipeline.decide_within(&query, Duration::from_millis(ms)),
                None => pipeline.decide(&query),
            };

            if json {
                let out = serde_json::to_string_pretty(&decision).into_diagnostic()?;
                println!("{out}");
            } else {
                print_decision(&decision);
            }
        }
    }

    Ok(())
}
