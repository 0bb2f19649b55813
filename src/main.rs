use anyhow::{Context, Result};
use clap::Parser;
use remolino::{
    cli::Cli,
    config::PipelineConfig,
    io::{read_channel_csv, write_table},
    pipeline::Pipeline,
    report::TracingReporter,
    table::BinTable,
};
use std::fs;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber (stderr; TRACE level with --debug)
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Cli) -> Result<PipelineConfig> {
    let config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    let config = args.apply_overrides(config);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let config = load_config(&args)?;
    if args.print_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    let input = args
        .input
        .as_deref()
        .context("an INPUT file is required unless --print-config is given")?;
    let raw = read_channel_csv(input)?;
    tracing::info!(
        input = %input.display(),
        samples = raw.len(),
        channels = raw.channels().len(),
        "loaded record"
    );

    let reporter = TracingReporter;
    let pipeline = Pipeline::new(config, &reporter)?;
    let (processed, calculated) = pipeline.run(&raw)?;

    let mut angle_of_attack = processed.angle_of_attack.to_table(&processed.layout)?;
    angle_of_attack.push_column("bad_percent", processed.flags.bad_angle_percent.clone())?;
    let rotation_angles = processed.rotation_angles.to_table()?;

    let tables: [(&str, &BinTable); 12] = [
        ("counts_before_processing", &processed.counts_before_processing),
        ("counts_before_gapfilling", &processed.counts_before_gapfilling),
        ("counts_after_gapfilling", &processed.counts_after_gapfilling),
        ("skewness", &processed.skewness),
        ("kurtosis", &processed.kurtosis),
        ("availability", &processed.flags.availability),
        ("hard_flags", &processed.flags.hard_flags),
        ("angle_of_attack", &angle_of_attack),
        ("rotation_angles", &rotation_angles),
        ("means", &calculated.means),
        ("moments", &calculated.moments),
        ("fluxes", &calculated.fluxes),
    ];

    fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;
    for (stem, table) in tables {
        let path = write_table(&args.output, stem, table, args.format)?;
        tracing::debug!(path = %path.display(), rows = table.rows(), "wrote table");
    }

    for summary in &processed.summaries {
        eprintln!("{:<10} {:>8} samples", summary.stage, summary.total());
    }
    eprintln!(
        "{} bins written to {}",
        processed.layout.len(),
        args.output.display()
    );

    Ok(())
}
