//! php-tuner CLI - PHP runtime sizing calculator
//!
//! Probes the host, runs the sizing calculator for the selected runtime
//! and prints the report. The prefork subcommand can additionally patch
//! a live PHP-FPM pool config and restart the service.

use std::io;
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::Parser;
use console::Style;
use php_tuner::apply::{self, ApplyResult};
use php_tuner::calculator::{prefork, worker_server, PreforkConfig};
use php_tuner::config::{CliArgs, Commands, CommonArgs, PreforkArgs, WorkerServerArgs};
use php_tuner::error::Result;
use php_tuner::output::Printer;
use php_tuner::php::{self, ProcessMetrics};
use php_tuner::system::SystemMetrics;
use tracing_subscriber::EnvFilter;

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    // Parse CLI arguments; help and version exit cleanly, anything
    // else (unknown flag, bad value) is a usage error
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: CliArgs) -> Result<()> {
    // The worker server is the default when no subcommand is given
    match args.command {
        Some(Commands::Prefork(args)) => run_prefork(args),
        Some(Commands::WorkerServer(args)) => run_worker_server(args),
        None => run_worker_server(WorkerServerArgs {
            common: CommonArgs {
                traffic: Default::default(),
                reserved: None,
                config_only: false,
                no_color: false,
            },
            thread_mem: None,
            worker: true,
        }),
    }
}

fn run_worker_server(args: WorkerServerArgs) -> Result<()> {
    let mut printer = Printer::new(
        io::stdout(),
        args.common.no_color,
        args.common.config_only,
    );
    printer.print_header("FrankenPHP Optimizer");

    let system = SystemMetrics::collect()?;
    printer.print_system_info(&system);

    let opts = worker_server::Options {
        reserved_memory_mb: args.common.reserved.into(),
        thread_memory_mb: effective_memory_override(args.thread_mem).into(),
        traffic: args.common.traffic,
        worker_mode: args.worker,
    };
    let cfg = worker_server::calculate(&system, &opts);

    printer.print_worker_calculation(&cfg);
    printer.print_worker_config(&cfg);
    printer.print_warnings(&cfg.warnings);
    printer.print_recommendations(&cfg.recommendations);
    printer.print_worker_usage();

    Ok(())
}

fn run_prefork(args: PreforkArgs) -> Result<()> {
    let mut printer = Printer::new(
        io::stdout(),
        args.common.no_color,
        args.common.config_only,
    );
    printer.print_header("PHP-FPM Process Manager Optimizer");

    let system = SystemMetrics::collect()?;
    printer.print_system_info(&system);

    // A failed process walk is not fatal: fall back to zero metrics
    // and let the calculator use its estimate chain
    let processes = match ProcessMetrics::collect() {
        Ok(processes) => processes,
        Err(e) => {
            eprintln!("Warning: Could not detect PHP processes: {}", e);
            ProcessMetrics::default()
        }
    };
    printer.print_php_info(&processes);

    // An explicit 0 means auto, same as omitting the flag
    let process_mem = effective_memory_override(args.process_mem);

    // memory_limit is only worth querying when nothing else gave us a
    // per-process figure
    let runtime_memory_limit_mb = if processes.avg_memory_mb == 0.0 && process_mem.is_none() {
        php::memory_limit_mb()
    } else {
        None
    };

    let opts = prefork::Options {
        reserved_memory_mb: args.common.reserved.into(),
        process_memory_mb: process_mem.into(),
        traffic: args.common.traffic,
        pool_type: args.pm.into(),
        runtime_memory_limit_mb,
    };
    let cfg = prefork::calculate(&system, &processes, &opts);

    printer.print_prefork_calculation(&cfg);
    printer.print_prefork_config(&cfg);
    printer.print_warnings(&cfg.warnings);

    if args.apply {
        apply_configuration(&cfg, &args)?;
    } else {
        printer.print_recommendations(&cfg.recommendations);
        printer.print_prefork_usage();
    }

    Ok(())
}

/// Normalize a per-process/thread memory flag: a non-positive value is
/// treated as "auto", so the fallback chain (probed average, then
/// memory_limit) still runs for `--process-mem 0`.
fn effective_memory_override(flag: Option<f64>) -> Option<f64> {
    flag.filter(|mb| *mb > 0.0)
}

/// The interactive apply flow: resolve the config path, show what will
/// be touched, confirm, patch, and report the changes.
fn apply_configuration(cfg: &PreforkConfig, args: &PreforkArgs) -> Result<()> {
    let paint = |style: Style, text: &str| -> String {
        if args.common.no_color {
            text.to_string()
        } else {
            style.force_styling(true).apply_to(text).to_string()
        }
    };
    println!();
    println!("{}\n", paint(Style::new().cyan().bold(), "Apply Configuration"));

    let config_path: PathBuf = match &args.config {
        Some(path) => {
            apply::validate_config_path(path)?;
            path.clone()
        }
        None => apply::find_config_file(apply::CONFIG_PATH_CANDIDATES)?,
    };
    println!(
        "  Config file:  {}",
        paint(Style::new().green(), &config_path.display().to_string())
    );

    let service = apply::find_service(apply::SERVICE_NAME_CANDIDATES);
    match &service {
        Some(name) => println!("  Service:      {}", paint(Style::new().green(), name)),
        None => println!("  Service:      {}", paint(Style::new().yellow(), "(not detected)")),
    }

    if args.restart && service.is_none() {
        println!(
            "\n{} --restart specified but no PHP-FPM service detected",
            paint(Style::new().yellow(), "Warning:")
        );
    }
    println!();

    if !args.yes {
        let action = if args.restart {
            "Apply these settings and restart PHP-FPM?"
        } else {
            "Apply these settings?"
        };
        if !apply::confirm(action) {
            println!("Aborted.");
            return Ok(());
        }
        println!();
    }

    let result = apply::apply(cfg, &config_path, args.restart)?;
    report_apply_result(&result, args, &paint);
    Ok(())
}

fn report_apply_result(
    result: &ApplyResult,
    args: &PreforkArgs,
    paint: &dyn Fn(Style, &str) -> String,
) {
    println!("{}\n", paint(Style::new().green().bold(), "Changes Applied"));

    if result.changes.is_empty() {
        println!("  No changes were necessary (config already up to date)");
    } else {
        for change in &result.changes {
            println!("  {} {}", paint(Style::new().cyan(), "*"), change);
        }
    }

    println!();
    println!("  Backup saved to: {}", result.backup_path.display());

    if result.restarted {
        if let Some(service) = &result.service_name {
            println!(
                "  Service {} restarted successfully",
                paint(Style::new().green(), service)
            );
        }
    } else if !args.restart {
        println!(
            "\n  {} Restart PHP-FPM to apply changes:",
            paint(Style::new().yellow(), "Note:")
        );
        println!("        sudo systemctl restart php-fpm");
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    // --process-mem 0 must behave exactly like omitting the flag, so
    // it neither becomes an override nor suppresses the memory_limit
    // fallback tier
    #[test]
    fn test_zero_memory_flag_is_auto() {
        assert_eq!(effective_memory_override(None), None);
        assert_eq!(effective_memory_override(Some(0.0)), None);
        assert_eq!(effective_memory_override(Some(-5.0)), None);
        assert_eq!(effective_memory_override(Some(64.0)), Some(64.0));
    }
}
