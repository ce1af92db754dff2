//! Drive one simulated participant through a full session and print the outcome as JSON.
//!
//! Usage:
//!   simulate_session [--participant ID] [--seed S] [--treatments a,b] [--belief-noise N]
//!
//! The bot consumes the role suggestion when there is one (half of c1_max otherwise)
//! and reports the true dot count, optionally perturbed by up to ±N dots.

use clap::Parser;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

use signals::config::{ExperimentConfig, TreatmentConfig};
use signals::types::{DecisionRecord, FinalPayoffSelection, RoundAssignment};
use signals::{Experiment, InMemoryStore, SignalsError};

#[derive(Parser)]
#[command(name = "simulate_session")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Participant identifier
    #[arg(short, long, default_value = "P1")]
    participant: String,

    /// Session seed (overrides SIGNALS_SESSION_SEED)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Treatment presets to run, in order
    #[arg(short, long, value_delimiter = ',')]
    treatments: Option<Vec<String>>,

    /// Maximum absolute error of the bot's dot-count report
    #[arg(long, default_value_t = 0)]
    belief_noise: u32,

    /// Seed of the bot's own noise
    #[arg(long, default_value_t = 0)]
    bot_seed: u64,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct PracticeSummary {
    treatment: String,
    round_index: usize,
    c1: f64,
    c2: f64,
    utility: f64,
}

#[derive(Serialize)]
struct SessionReport {
    participant: String,
    session_seed: u64,
    practice: Vec<PracticeSummary>,
    records: Vec<DecisionRecord>,
    selection: FinalPayoffSelection,
}

fn choose_c1(a: &RoundAssignment) -> f64 {
    match a.suggested_c1 {
        Some(c1) if c1 >= 1.0 && c1 <= a.c1_max => c1,
        _ => (a.c1_max / 2.0).floor().max(1.0),
    }
}

fn report_belief(a: &RoundAssignment, noise: u32, rng: &mut SmallRng) -> f64 {
    let truth = f64::from(a.stimulus.unwrap_or(0));
    let offset = if noise == 0 {
        0.0
    } else {
        let n = i64::from(noise);
        rng.random_range(-n..=n) as f64
    };
    (truth + offset).clamp(0.0, a.elicitation.input_max)
}

fn run(cli: &Cli) -> Result<SessionReport, SignalsError> {
    let mut config = ExperimentConfig::from_env()?;
    if let Some(seed) = cli.seed {
        config.session_seed = seed;
    }
    if let Some(names) = &cli.treatments {
        config.treatments = names
            .iter()
            .map(|n| TreatmentConfig::preset(n))
            .collect::<Result<_, _>>()?;
    }

    let session_seed = config.session_seed;
    let treatments = config.treatments.clone();
    let experiment = Experiment::new(config, InMemoryStore::new())?;
    let id = cli.participant.as_str();
    let mut bot_rng = SmallRng::seed_from_u64(cli.bot_seed);

    let phase = experiment.start_participant(id)?;
    info!(participant = id, session_seed, ?phase, "participant started");

    let mut practice = Vec::new();
    let mut records = Vec::new();
    for treatment in &treatments {
        for round in 0..treatment.round_count {
            let a = experiment.round_assignment(id, &treatment.label, round)?;
            let table = experiment.payoff_table(id, &treatment.label, round)?;
            let c1 = choose_c1(&a);
            debug!(
                treatment = %treatment.label,
                round,
                rows = table.len(),
                c1_max = a.c1_max,
                c1,
                "choice"
            );
            if a.main_round {
                let belief = report_belief(&a, cli.belief_noise, &mut bot_rng);
                records.push(experiment.record_round(id, &treatment.label, round, c1, belief)?);
            } else {
                let out = experiment.practice_round(id, &treatment.label, round, c1)?;
                practice.push(PracticeSummary {
                    treatment: treatment.label.clone(),
                    round_index: round,
                    c1: out.c1,
                    c2: out.c2,
                    utility: out.utility,
                });
            }
        }
    }

    let selection = experiment.finalize(id)?;
    experiment.end_participant(id)?;

    Ok(SessionReport {
        participant: id.to_string(),
        session_seed,
        practice,
        records,
        selection,
    })
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let report = match run(&cli) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Failed to serialize report: {e}");
            std::process::exit(1);
        }
    }
}
