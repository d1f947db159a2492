use anyhow::Context;
use clap::Parser;
use log::info;
use spatio_bench::{
    Approach, BenchConfig, BenchmarkOrchestrator, CoordinateGenerator, MemoryStore,
    ReportFormatter, json_report_path, write_report,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// JSON or TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Report file, overwritten on each run
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long, value_delimiter = ',')]
    volumes: Option<Vec<usize>>,

    #[arg(long = "point-sizes", value_delimiter = ',')]
    point_sizes: Option<Vec<usize>>,

    /// Search radii in meters
    #[arg(long, value_delimiter = ',')]
    radii: Option<Vec<f64>>,

    #[arg(long, value_delimiter = ',')]
    approaches: Option<Vec<Approach>>,

    #[arg(long)]
    seed: Option<u64>,

    /// Also write the report as JSON next to the text report
    #[arg(long)]
    json: bool,
}

impl Args {
    fn into_config(self) -> anyhow::Result<(BenchConfig, bool)> {
        let mut config = match &self.config {
            Some(path) => BenchConfig::load(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => BenchConfig::default(),
        };

        if let Some(output) = self.output {
            config = config.with_output(output);
        }
        if let Some(volumes) = self.volumes {
            config = config.with_volumes(volumes);
        }
        if let Some(sizes) = self.point_sizes {
            config = config.with_point_set_sizes(sizes);
        }
        if let Some(radii) = self.radii {
            config = config.with_radii(radii);
        }
        if let Some(approaches) = self.approaches {
            config = config.with_approaches(approaches);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }

        config.validate().context("invalid configuration")?;
        Ok((config, self.json))
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let (config, json) = Args::parse().into_config()?;
    let output = config.output.clone();
    let json_output = json.then(|| json_report_path(&output)).transpose()?;

    // Records and query points draw from separate streams under one seed.
    let records = CoordinateGenerator::with_seed(config.seed.map(|s| s.wrapping_add(1)));
    let store =
        MemoryStore::with_generator(records).with_geohash_precision(config.geohash_precision);

    info!(
        "Benchmarking {} approaches over volumes {:?}",
        config.approaches.len(),
        config.volumes
    );

    let mut orchestrator = BenchmarkOrchestrator::new(store, config)?;
    let report = orchestrator.run();

    write_report(&output, &ReportFormatter::new().format(&report))?;
    if let Some(json_output) = json_output {
        write_report(&json_output, &report.to_json()?)?;
    }

    info!("Comparison complete: {} trials", report.len());
    Ok(())
}
