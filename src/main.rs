use std::path::PathBuf;

use chrono::{Datelike, Utc};
use clap::{Parser, Subcommand};

use lotbid::config::Config;
use lotbid::error::LotResult;
use lotbid::evidence::{EvidenceRecord, EvidenceSink, JsonlSink, NullSink};
use lotbid::item;
use lotbid::optimize::{optimize_bid, OptimizerParams};
use lotbid::pipeline::{self, PipelineOptions};
use lotbid::simulate::CashConstraints;
use lotbid::stress::{self, StressScenario};

#[derive(Parser)]
#[command(name = "lotbid", about = "Monte-Carlo bid optimizer for resale lot manifests")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Clone)]
struct SearchArgs {
    /// Low end of the bid search bracket
    #[arg(long, default_value = "0.0")]
    lo: f64,

    /// High end of the bid search bracket
    #[arg(long)]
    hi: f64,

    /// Bisection tolerance in dollars
    #[arg(long, default_value = "10.0")]
    tol: f64,

    #[arg(long, default_value = "32")]
    max_iter: u32,

    /// Monte-Carlo simulations per feasibility evaluation
    #[arg(long, default_value = "2000")]
    sims: usize,

    /// Random seed
    #[arg(long, default_value = "1337")]
    seed: u64,

    /// Expected cash recovered within the horizon; defaults to the
    /// configured cashfloor
    #[arg(long)]
    min_cash_60d: Option<f64>,

    /// P5 cash recovered within the horizon (VaR floor)
    #[arg(long)]
    min_cash_60d_p5: Option<f64>,
}

impl SearchArgs {
    fn optimizer(&self) -> OptimizerParams {
        OptimizerParams {
            lo: self.lo,
            hi: self.hi,
            tol: self.tol,
            max_iter: self.max_iter,
            sims: self.sims,
            seed: self.seed,
        }
    }

    fn constraints(&self) -> CashConstraints {
        CashConstraints {
            min_cash_60d: self.min_cash_60d,
            min_cash_60d_p5: self.min_cash_60d_p5,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: gate, price, sell, optimize
    Pipeline {
        /// Manifest CSV
        #[arg(long)]
        input: PathBuf,

        /// Enriched item table output
        #[arg(long, default_value = "output/items.csv")]
        out_csv: PathBuf,

        /// Optimization result JSON
        #[arg(long, default_value = "output/result.json")]
        out_json: PathBuf,

        /// Config TOML; defaults apply when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// NDJSON evidence ledger output
        #[arg(long)]
        evidence_out: Option<PathBuf>,

        /// Keep the raw per-sim arrays in the result JSON
        #[arg(long)]
        include_samples: bool,

        #[command(flatten)]
        search: SearchArgs,
    },

    /// Optimize the bid for an already-priced item table
    Optimize {
        /// Item CSV with est_price_mu / est_price_sigma / sell_p60 columns
        #[arg(long)]
        input: PathBuf,

        #[arg(long, default_value = "output/result.json")]
        out_json: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,

        /// Write a one-line NDJSON evidence record for the optimizer
        #[arg(long)]
        evidence_out: Option<PathBuf>,

        #[arg(long)]
        include_samples: bool,

        #[command(flatten)]
        search: SearchArgs,
    },

    /// Re-run the optimizer under stress scenarios
    Stress {
        /// Item CSV with price and sell-through estimates
        #[arg(long)]
        input: PathBuf,

        #[arg(long, default_value = "output/stress.csv")]
        out_csv: PathBuf,

        #[arg(long)]
        out_json: Option<PathBuf>,

        #[arg(long)]
        config: Option<PathBuf>,

        /// Comma-separated scenario names, or "default" for the built-in set
        #[arg(long, default_value = "default")]
        scenarios: String,

        #[command(flatten)]
        search: SearchArgs,
    },
}

fn load_config(path: &Option<PathBuf>) -> LotResult<Config> {
    match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)?;
            Config::from_toml_str(&text)
        }
        None => Ok(Config::default()),
    }
}

fn write_json(value: &impl serde::Serialize, path: &PathBuf) -> LotResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

fn run(cli: Cli) -> LotResult<()> {
    match cli.command {
        Commands::Pipeline {
            input,
            out_csv,
            out_json,
            config,
            evidence_out,
            include_samples,
            search,
        } => {
            let config = load_config(&config)?;
            let manifest = item::load_items_csv(&input)?;

            let sink: Box<dyn EvidenceSink> = match &evidence_out {
                Some(p) => Box::new(JsonlSink::new(p)),
                None => Box::new(NullSink),
            };
            pipeline::record_rejected(&manifest.rejected, sink.as_ref());

            let opts = PipelineOptions {
                optimizer: search.optimizer(),
                constraints: search.constraints(),
                month: Utc::now().month(),
            };
            let report = pipeline::run_lot(manifest.items, &config, &opts, sink.as_ref())?;

            pipeline::save_enriched_csv(&report, &out_csv)?;
            let result = if include_samples {
                report.result.clone()
            } else {
                report.result.clone().without_samples()
            };
            write_json(&result, &out_json)?;

            println!(
                "{} items ({} core, {} upside, {} rejected)",
                report.items.len(),
                report.core.len(),
                report.upside.len(),
                manifest.rejected.len()
            );
            println!(
                "recommended bid: {:.2} (meets constraints: {}, iterations: {})",
                report.result.bid, report.result.meets_constraints, report.result.iterations
            );
            println!("wrote {} and {}", out_csv.display(), out_json.display());
        }

        Commands::Optimize {
            input,
            out_json,
            config,
            evidence_out,
            include_samples,
            search,
        } => {
            let config = load_config(&config)?;
            let manifest = item::load_items_csv(&input)?;

            let result = optimize_bid(
                &manifest.items,
                &config,
                &search.optimizer(),
                &search.constraints(),
            )?;

            if let Some(ev_path) = &evidence_out {
                let sink = JsonlSink::new(ev_path);
                sink.write(&EvidenceRecord::new(
                    None,
                    "optimize:bid",
                    result.meets_constraints,
                    serde_json::json!({
                        "roi_target": result.roi_target,
                        "risk_threshold": result.risk_threshold,
                        "min_cash_60d": result.min_cash_60d,
                        "min_cash_60d_p5": result.min_cash_60d_p5,
                        "lo": search.lo,
                        "hi": search.hi,
                        "tol": search.tol,
                        "max_iter": search.max_iter,
                        "sims": search.sims,
                        "seed": search.seed,
                        "bid": result.bid,
                        "prob_roi_ge_target": result.prob_roi_ge_target,
                        "expected_cash_60d": result.expected_cash_60d,
                        "cash_60d_p5": result.cash_60d_p5,
                        "iterations": result.iterations,
                        "meets_constraints": result.meets_constraints,
                        "timestamp": result.timestamp.clone(),
                    }),
                ));
            }

            let payload = if include_samples {
                result.clone()
            } else {
                result.clone().without_samples()
            };
            write_json(&payload, &out_json)?;

            println!(
                "recommended bid: {:.2} (roi_p50={:.3}, P(roi>=target)={}, meets constraints: {})",
                result.bid,
                result.roi_p50,
                result
                    .prob_roi_ge_target
                    .map(|p| format!("{:.3}", p))
                    .unwrap_or_else(|| "n/a".to_string()),
                result.meets_constraints
            );
            println!("wrote {}", out_json.display());
        }

        Commands::Stress {
            input,
            out_csv,
            out_json,
            config,
            scenarios,
            search,
        } => {
            let config = load_config(&config)?;
            let manifest = item::load_items_csv(&input)?;

            let selected: Vec<StressScenario> = if scenarios.trim() == "default" {
                StressScenario::all()
            } else {
                scenarios
                    .split(',')
                    .filter_map(|name| {
                        let parsed = StressScenario::parse(name);
                        if parsed.is_none() {
                            eprintln!("unknown scenario: {}", name.trim());
                        }
                        parsed
                    })
                    .collect()
            };

            let summaries = stress::run_stress(
                &manifest.items,
                &config,
                &search.optimizer(),
                &search.constraints(),
                &selected,
            )?;

            stress::save_stress_csv(&summaries, &out_csv)?;
            if let Some(p) = &out_json {
                stress::save_stress_json(&summaries, p)?;
            }

            println!(
                "{:<18} {:>10} {:>8} {:>8} {:>10} {:>6}",
                "scenario", "bid", "roi_p50", "roi_tail", "cash_60d", "ok"
            );
            for s in &summaries {
                println!(
                    "{:<18} {:>10.2} {:>8.3} {:>8.3} {:>10.2} {:>6}",
                    s.scenario,
                    s.recommended_bid,
                    s.roi_p50,
                    s.roi_tail,
                    s.expected_cash_60d,
                    s.meets_constraints
                );
            }
            println!("wrote {}", out_csv.display());
        }
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
