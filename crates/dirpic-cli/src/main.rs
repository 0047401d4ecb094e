use std::io::Write;
use std::path::PathBuf;

use clap::{ArgAction, Parser};
use dirpic_core::{CancellationToken, Config, ProcessControl, ProcessOptions};
use env_logger::Builder;
use log::LevelFilter;

#[derive(Parser)]
#[command(
    name = "dirpic",
    version,
    about = "Organize photos and videos into a YYYY/MM/YYYY-MM-DD_ tree",
    after_help = "SRC and DST should be on the same filesystem: files are hard linked, \
                  and only copied when linking across devices is impossible."
)]
struct Cli {
    /// Directory to scan for images and videos
    src: PathBuf,

    /// Directory to build the chronological tree in
    dst: PathBuf,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pictures taken before this hour go to the previous day's album
    #[arg(long)]
    boundary_hour: Option<u32>,

    /// Media extension to process (repeatable, replaces the configured set)
    #[arg(long = "ext", value_name = "EXT")]
    extensions: Vec<String>,

    /// Verbosity level. Max: 2.
    #[arg(short, action = ArgAction::Count)]
    verbose: u8,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    json: bool,
}

/// Sets up env_logger with the format "LEVEL<TAB>message".
fn configure_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            let style = buf.default_level_style(record.level());
            writeln!(buf, "{style}{}{style:#}\t{}", record.level(), record.args())
        })
        .init();
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(hour) = cli.boundary_hour {
        config = config.with_boundary_hour(hour);
    }
    if !cli.extensions.is_empty() {
        config = config.with_extensions(&cli.extensions);
    }
    config.validate()?;
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    configure_logging(cli.verbose);
    let t_total = std::time::Instant::now();

    let config = load_config(&cli)?;

    let token = CancellationToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || {
        log::warn!("interrupt received, stopping after the current file");
        handler_token.cancel();
    })?;

    let options = ProcessOptions {
        source: cli.src,
        output: cli.dst,
        config,
    };
    let summary = dirpic_core::organize(&options, &ProcessControl::new().with_cancel_token(token))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    log::info!("Done in {:.2}s", t_total.elapsed().as_secs_f64());

    Ok(())
}
