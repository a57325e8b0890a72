mod commands;
mod logging;
mod progress;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use anyhow::{bail, Context};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, SearchArgs};
use dotenv::dotenv;
use meta_search_core::metadata::png::read_parameters;
use meta_search_core::{normalize, AppConfig, ParsedMetadata, SearchEngine};
use progress::CliReporter;
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match meta_search_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    match args.command {
        Some(Commands::Search(search)) => run_search(&config, search)?,
        Some(Commands::Inspect { file }) => run_inspect(&file)?,
        Some(Commands::Check { expression }) => run_check(&expression),
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:#?}", config);
        }
        None => {
            let _ = Cli::command().print_long_help();
        }
    }

    Ok(())
}

fn run_search(config: &AppConfig, args: SearchArgs) -> anyhow::Result<()> {
    let mut job = config.to_job();
    if let Some(term) = args.term {
        job.search = term;
    }
    if let Some(folder) = args.folder {
        job.root = folder;
    }
    if let Some(ignore) = args.ignore {
        job.ignore = ignore;
    }
    if let Some(filter) = args.filter {
        job.custom_filter = Some(filter);
    }
    if args.no_recursive {
        job.recursive = false;
    }
    if args.case_sensitive {
        job.case_sensitive = true;
    }
    if args.all_fields {
        job.search_positive = false;
        job.search_negative = false;
    } else if args.positive || args.negative {
        job.search_positive = args.positive;
        job.search_negative = args.negative;
    }
    job.exclude_patterns.extend(args.exclude);

    if job.root.as_os_str().is_empty() {
        bail!("No folder to search; pass --folder or set paths.search_folder");
    }

    let mut plan = config.to_plan();
    if args.copy_to.is_some() {
        plan.copy_to = args.copy_to;
    }
    if args.move_to.is_some() {
        plan.move_to = args.move_to;
    }
    if args.group_by_branch {
        plan.group_by_branch = true;
    }
    if args.flatten {
        plan.preserve_structure = false;
    }

    if let Some(move_to) = &plan.move_to {
        if !args.yes {
            let prompt = format!(
                "Matching files will be MOVED out of {} into {}. Continue?",
                job.root.display(),
                move_to.display()
            );
            if !prompt_confirm(&prompt, Some(false))? {
                println!("Aborted");
                return Ok(());
            }
        }
    }

    let log_dir = match args.log_dir {
        Some(dir) => Some(dir),
        None if args.log => Some(
            config
                .log_dir()
                .unwrap_or_else(|| PathBuf::from(&config.output.log_dir)),
        ),
        None => config.log_dir(),
    };

    let mut engine = SearchEngine::new();
    if let Some(workers) = args.workers {
        engine = engine.with_workers(workers);
    }
    if let Some(dir) = log_dir {
        engine = engine.with_log_dir(dir);
    }

    info!(
        "Searching {} for '{}' with {} workers",
        job.root.display(),
        job.search,
        engine.workers()
    );

    let reporter = CliReporter::new();
    let summary = engine.scan(job, plan, &reporter)?;

    println!();
    println!(
        "Match: {}, Actions: {}",
        format!("{:.2}s", summary.scan_duration.as_secs_f64()).green(),
        format!("{:.2}s", summary.action_duration.as_secs_f64()).green(),
    );
    println!(
        "{} of {} files matched, {} copied, {} moved",
        format!("{}", summary.matched).cyan(),
        summary.total_files,
        summary.copied,
        summary.moved,
    );
    if !summary.action_failures.is_empty() {
        println!(
            "{}",
            format!("{} file actions failed", summary.action_failures.len()).red()
        );
    }
    if let Some(log_file) = &summary.log_file {
        println!("Log written to {}", log_file.display());
    }

    Ok(())
}

fn run_inspect(file: &std::path::Path) -> anyhow::Result<()> {
    let blob = read_parameters(file).with_context(|| format!("reading {}", file.display()))?;

    let Some(blob) = blob else {
        println!("{}", "No parameters chunk found".yellow());
        return Ok(());
    };

    let metadata = ParsedMetadata::parse(Some(&blob));
    if metadata.is_empty() {
        println!("{}", "Parameters chunk present but nothing could be parsed".yellow());
        println!("{}", blob);
        return Ok(());
    }

    for (field, value) in metadata.fields() {
        println!("{}: {}", field.label().bold(), value);
    }
    Ok(())
}

fn run_check(expression: &str) {
    let normalized = normalize(expression);

    for warning in &normalized.warnings {
        println!("{} {}", "Warning:".yellow(), warning);
    }

    if normalized.expression.is_empty() {
        println!("{}", "Expression is empty and matches nothing".red());
        return;
    }

    println!("Cleaned: {}", normalized.expression.to_string().green());
    for (index, branch) in normalized.expression.branches().iter().enumerate() {
        println!("  [{}] {}", index, branch.text());
    }
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(default.unwrap_or(false));
        }

        match input.trim().to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}
