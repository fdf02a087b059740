#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod backend;
mod cli;
mod decode;
mod error_fmt;
mod record;
mod rt;
mod run;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;
use fatigue_config::{Calibration, Config, Logging};
use fatigue_core::RigError;

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn config_error(msg: String) -> eyre::Report {
    eyre::Report::new(RigError::Config(msg))
}

fn load_config(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| config_error(format!("read {}: {e}", path.display())))?;
    let cfg: Config = toml::from_str(&text)
        .map_err(|e| config_error(format!("parse {}: {e}", path.display())))?;
    cfg.validate()
        .map_err(|e| config_error(format!("{}: {e}", path.display())))?;
    Ok(cfg)
}

fn install_shutdown() -> eyre::Result<Arc<AtomicBool>> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
        .wrap_err("install Ctrl-C handler")?;
    Ok(shutdown)
}

fn load_calibration(path: &Path) -> eyre::Result<Calibration> {
    fatigue_config::load_calibration_csv(path)
        .map_err(|e| config_error(format!("{e:#}")))
}

/// Console logs go to stderr; stdout is reserved for telemetry and results.
fn init_tracing(json: bool, level: Option<&str>, logging: Option<&Logging>) -> eyre::Result<()> {
    use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let level = level
        .or_else(|| logging.and_then(|l| l.level.as_deref()))
        .unwrap_or("info");
    let filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| config_error(format!("invalid log level {level:?}: {e}")))?,
    };

    let console = fmt::layer().with_writer(std::io::stderr);
    let console = if json {
        console.json().boxed()
    } else {
        console.with_target(false).boxed()
    };

    let file_writer = match logging.and_then(|l| l.file.as_deref()) {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| config_error(format!("logging.file {file:?} has no file name")))?;
            let appender = match logging.and_then(|l| l.rotation.as_deref()) {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(writer)
        }
        None => None,
    };
    let file_layer = file_writer.map(|w| fmt::layer().json().with_ansi(false).with_writer(w));

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .wrap_err("install tracing subscriber")
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    if matches!(cli.cmd, Commands::Decode) {
        init_tracing(cli.json, cli.log_level.as_deref(), None)?;
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        let stats = decode::decode_stream(stdin.lock(), &mut stdout.lock())?;
        tracing::info!(decoded = stats.decoded, skipped = stats.skipped, "decode finished");
        return Ok(());
    }

    // Logging settings live in the config, so read it before installing
    // the subscriber and report a bad config afterwards.
    let cfg = load_config(&cli.config);
    init_tracing(
        cli.json,
        cli.log_level.as_deref(),
        cfg.as_ref().ok().map(|c| &c.logging),
    )?;
    let cfg = cfg?;
    tracing::debug!(config = %cli.config.display(), "config loaded");

    let calib = cli.calibration.as_deref().map(load_calibration).transpose()?;

    match cli.cmd {
        Commands::Run {
            max_ticks,
            tick_hz,
            rt,
            rt_prio,
            rt_lock,
            rt_cpu,
        } => {
            let shutdown = install_shutdown()?;
            let args = run::RunArgs {
                max_ticks,
                tick_hz,
                rt,
                rt_prio,
                rt_lock,
                rt_cpu,
            };
            let summary = run::run_rig(&cfg, calib.as_ref(), args, shutdown)?;
            tracing::info!(
                ticks = summary.ticks,
                cycles = summary.cycles,
                state = %summary.final_state,
                "run finished"
            );
        }
        Commands::Record {
            name,
            out,
            stop_force,
            clear_force,
            feed_rate,
            retract_rate,
            max_ticks,
            tick_hz,
        } => {
            let shutdown = install_shutdown()?;
            let args = record::RecordArgs {
                name,
                stop_force,
                clear_force,
                feed_rate,
                retract_rate,
                max_ticks,
                tick_hz,
            };
            let summary = match out {
                Some(path) => {
                    let (run_id, file) = record::open_record_file(&path)?;
                    tracing::info!(file = %path.display(), run_id, "recording to file");
                    record::record(&cfg, calib.as_ref(), &args, run_id, file, &shutdown)?
                }
                None => {
                    let stdout = std::io::stdout();
                    record::record(&cfg, calib.as_ref(), &args, 1, stdout.lock(), &shutdown)?
                }
            };
            tracing::info!(
                run_id = summary.run_id,
                samples = summary.samples,
                transitions = summary.transitions,
                cycles = summary.run.cycles,
                state = %summary.run.final_state,
                "record finished"
            );
        }
        Commands::SelfCheck => {
            let frame = run::self_check(&cfg, calib.as_ref())?;
            if cli.json {
                let record = fatigue_core::decode_frame(&frame)?;
                println!(
                    "{}",
                    serde_json::json!({ "status": "ok", "record": decode::record_json(&record) })
                );
            } else {
                println!("ok");
            }
        }
        Commands::Decode => {}
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let json = cli.json;
    let _ = JSON_MODE.set(json);
    if !json {
        let _ = color_eyre::install();
    }

    if let Err(err) = real_main(cli) {
        let code = exit_code_for_error(&err);
        tracing::error!(error = %format!("{err:#}"), code, "fatigue failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(code);
    }
}
