//! Headless command-line interface
//!
//! Usage:
//!   tile-pilot capture [--duration <secs>]   Run the capture/retention loop
//!   tile-pilot play [--api-key <key>]        Run the full play loop
//!   tile-pilot analyze <image>               Analyze an existing PNG
//!   tile-pilot sweep                         Run one retention sweep
//!   tile-pilot latest                        Print the newest capture
//!
//! Options:
//!   --config <path>    Load config from an explicit file
//!   --api-key <key>    Inference API key (else GEMINI_API_KEY)
//!   --duration <secs>  Stop the loop after this many seconds
//!   --json             Output in JSON format where supported

use std::path::PathBuf;
use std::time::Duration;

use tile_pilot_core::{
    latest_capture, sweep_once, CancelToken, CaptureManager, Config, GameBot, MoveAnalyzer,
    ScreenSource, SystemPointer, VisionClient,
};

/// CLI command to execute
#[derive(Debug, Clone)]
pub enum CliCommand {
    Capture,
    Play,
    Analyze { image: PathBuf },
    Sweep,
    Latest,
}

/// CLI options
#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    pub config_path: Option<PathBuf>,
    pub api_key: Option<String>,
    pub duration_secs: Option<u64>,
    pub json: bool,
}

/// Parse CLI arguments and return command + options
pub fn parse_args(args: &[String]) -> Result<(CliCommand, CliOptions), String> {
    let mut options = CliOptions::default();
    let mut command: Option<CliCommand> = None;

    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        match arg.as_str() {
            "--json" => options.json = true,
            "--config" => {
                i += 1;
                if i >= args.len() {
                    return Err("--config requires a path".to_string());
                }
                options.config_path = Some(PathBuf::from(&args[i]));
            }
            "--api-key" => {
                i += 1;
                if i >= args.len() {
                    return Err("--api-key requires a value".to_string());
                }
                options.api_key = Some(args[i].clone());
            }
            "--duration" => {
                i += 1;
                if i >= args.len() {
                    return Err("--duration requires a number of seconds".to_string());
                }
                let secs = args[i]
                    .parse::<u64>()
                    .map_err(|_| format!("Invalid duration '{}'", args[i]))?;
                options.duration_secs = Some(secs);
            }
            "capture" => command = Some(CliCommand::Capture),
            "play" => command = Some(CliCommand::Play),
            "analyze" => {
                i += 1;
                if i >= args.len() {
                    return Err("analyze requires an image path".to_string());
                }
                command = Some(CliCommand::Analyze {
                    image: PathBuf::from(&args[i]),
                });
            }
            "sweep" => command = Some(CliCommand::Sweep),
            "latest" => command = Some(CliCommand::Latest),
            _ => {
                return Err(format!("Unknown argument: {}", arg));
            }
        }
        i += 1;
    }

    match command {
        Some(command) => Ok((command, options)),
        None => Err("No command specified. Use: capture, play, analyze, sweep, or latest".to_string()),
    }
}

pub fn print_help() {
    println!("tile-pilot v{}", env!("CARGO_PKG_VERSION"));
    println!("AI-assisted autoplayer for tile-matching games");
    println!();
    println!("USAGE:");
    println!("    tile-pilot <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    capture            Run the capture + retention loop");
    println!("    play               Run the full capture/analyze/act loop");
    println!("    analyze <image>    One-shot board analysis of a PNG file");
    println!("    sweep              Run a single retention sweep and exit");
    println!("    latest             Print the newest capture file path");
    println!();
    println!("OPTIONS:");
    println!("    --config <path>    Load config from an explicit file");
    println!("    --api-key <key>    Inference API key (default: GEMINI_API_KEY env var)");
    println!("    --duration <secs>  Stop capture/play after this many seconds");
    println!("    --json             Output in JSON format where supported");
    println!("    --help             Show this help message");
    println!();
    println!("The capture region comes from the config file; set it there before");
    println!("running capture or play.");
}

/// Execute a parsed command
pub fn run(command: CliCommand, options: CliOptions) -> anyhow::Result<()> {
    let config = load_config(&options)?;

    match command {
        CliCommand::Capture => run_capture(config, &options),
        CliCommand::Play => run_play(config, &options),
        CliCommand::Analyze { image } => run_analyze(config, &image, &options),
        CliCommand::Sweep => run_sweep(config, &options),
        CliCommand::Latest => run_latest(config),
    }
}

fn load_config(options: &CliOptions) -> anyhow::Result<Config> {
    let config = match &options.config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };
    config.validate()?;
    Ok(config)
}

fn run_capture(config: Config, options: &CliOptions) -> anyhow::Result<()> {
    let token = CancelToken::new();
    spawn_deadline(&token, options.duration_secs);

    let mut source = ScreenSource::new();
    let stats = CaptureManager::new(config).run(&mut source, &token)?;

    println!(
        "Captured {} frames over {} ticks ({} failed)",
        stats.written, stats.ticks, stats.failed
    );
    Ok(())
}

fn run_play(config: Config, options: &CliOptions) -> anyhow::Result<()> {
    let analyzer = build_analyzer(&config, options)?;
    let token = CancelToken::new();
    spawn_deadline(&token, options.duration_secs);

    let mut bot = GameBot::new(config, ScreenSource::new(), analyzer, SystemPointer::new());
    let outcome = bot.run(&token)?;

    println!(
        "Played {} moves over {} rounds ({} failed rounds){}",
        outcome.moves_played,
        outcome.rounds,
        outcome.failed_rounds,
        if outcome.finished {
            ", level finished"
        } else {
            ""
        }
    );
    Ok(())
}

fn run_analyze(config: Config, image: &PathBuf, options: &CliOptions) -> anyhow::Result<()> {
    let analyzer = build_analyzer(&config, options)?;
    let png = std::fs::read(image)?;
    let analysis = analyzer.analyze(&png)?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        println!("Moves left: {}", analysis.moves_left);
        println!(
            "Objective: {} ({}/{})",
            analysis.current_objectives.kind,
            analysis.current_objectives.current,
            analysis.current_objectives.target
        );
        let mv = &analysis.best_move;
        println!(
            "Best move: row {}, col {} -> {:?}",
            mv.start_pos[0], mv.start_pos[1], mv.direction
        );
        if !mv.immediate_outcome.is_empty() {
            println!("  Outcome: {}", mv.immediate_outcome);
        }
        if !mv.cascade_potential.is_empty() {
            println!("  Cascades: {}", mv.cascade_potential);
        }
        for special in &analysis.special_tiles {
            println!(
                "Special tile: {} at row {}, col {}",
                special.kind, special.position[0], special.position[1]
            );
        }
    }
    Ok(())
}

fn run_sweep(config: Config, options: &CliOptions) -> anyhow::Result<()> {
    let cutoff = chrono::Local::now() - config.retention_age();
    let stats = sweep_once(&config.save_dir, &config.file_prefix, cutoff);

    if options.json {
        println!(
            "{}",
            serde_json::json!({
                "matched": stats.matched,
                "deleted": stats.deleted,
                "failed": stats.failed,
            })
        );
    } else {
        println!(
            "Swept {}: {} matched, {} deleted, {} failed",
            config.save_dir.display(),
            stats.matched,
            stats.deleted,
            stats.failed
        );
    }
    Ok(())
}

fn run_latest(config: Config) -> anyhow::Result<()> {
    match latest_capture(&config.save_dir, &config.file_prefix)? {
        Some(path) => println!("{}", path.display()),
        None => println!("No captures found in {}", config.save_dir.display()),
    }
    Ok(())
}

fn build_analyzer(config: &Config, options: &CliOptions) -> anyhow::Result<VisionClient> {
    let api_key = options
        .api_key
        .clone()
        .or_else(|| std::env::var("GEMINI_API_KEY").ok())
        .ok_or_else(|| {
            anyhow::anyhow!("no API key: pass --api-key or set the GEMINI_API_KEY env var")
        })?;
    Ok(VisionClient::with_endpoint(
        config.analysis.endpoint.clone(),
        api_key,
    )?)
}

/// Cancel `token` after `duration_secs`, when set. Keeps long runs
/// bounded without wiring OS signal handlers into the loops.
fn spawn_deadline(token: &CancelToken, duration_secs: Option<u64>) {
    if let Some(secs) = duration_secs {
        let token = token.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_secs(secs));
            tracing::info!("Run deadline reached after {}s, stopping", secs);
            token.cancel();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_capture_with_duration() {
        let (command, options) = parse_args(&args(&["capture", "--duration", "90"])).unwrap();
        assert!(matches!(command, CliCommand::Capture));
        assert_eq!(options.duration_secs, Some(90));
    }

    #[test]
    fn parses_analyze_with_path_and_json() {
        let (command, options) =
            parse_args(&args(&["--json", "analyze", "board.png"])).unwrap();
        match command {
            CliCommand::Analyze { image } => assert_eq!(image, PathBuf::from("board.png")),
            other => panic!("unexpected command {:?}", other),
        }
        assert!(options.json);
    }

    #[test]
    fn rejects_missing_values_and_unknown_args() {
        assert!(parse_args(&args(&["capture", "--duration"])).is_err());
        assert!(parse_args(&args(&["analyze"])).is_err());
        assert!(parse_args(&args(&["--bogus"])).is_err());
        assert!(parse_args(&args(&[])).is_err());
    }

    #[test]
    fn config_option_is_captured() {
        let (_, options) =
            parse_args(&args(&["sweep", "--config", "/tmp/pilot.json"])).unwrap();
        assert_eq!(options.config_path, Some(PathBuf::from("/tmp/pilot.json")));
    }
}
