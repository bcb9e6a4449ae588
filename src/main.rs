//! QModes Command-Line Interface
//!
//! # Usage
//!
//! ```bash
//! # Project the converged geometry onto the normal modes
//! qmodes project opt.out freq.out data/atomic_masses.xml
//!
//! # Same, failing on malformed numeric lines and writing the report to a file
//! qmodes project opt.out freq.out masses.xml --strict --output q.txt
//!
//! # Also save the report as JSON
//! qmodes project opt.out freq.out masses.xml --json q.json
//!
//! # Print the final converged geometry, optionally saving it as XYZ
//! qmodes geom opt.out --xyz final.xyz
//!
//! # Print frequencies and displacement vectors of an 18-atom molecule
//! qmodes modes freq.out 18
//!
//! # Create a settings template
//! qmodes ci qmodes_config.cfg
//! ```

use log::info;
use qmodes::parser::{extract_optimized_geometry, ParsePolicy};
use qmodes::pipeline::{run, RunConfig};
use qmodes::settings::{SettingsManager, CONFIG_FILE_NAME};
use qmodes::{io, modes};
use std::env;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

type CliResult = Result<(), Box<dyn Error>>;

/// Options shared by the subcommands.
#[derive(Debug, Default, PartialEq)]
struct CommandArgs {
    positional: Vec<String>,
    policy: Option<ParsePolicy>,
    output: Option<PathBuf>,
    json: Option<PathBuf>,
    xyz: Option<PathBuf>,
}

fn main() {
    let settings = match SettingsManager::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            process::exit(1);
        }
    };

    env_logger::Builder::new()
        .filter_level(settings.logging().level_filter())
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .format_timestamp_millis()
        .init();
    for skipped in settings.skipped_layers() {
        eprintln!("Warning: {}", skipped);
    }
    info!("Configuration loaded from: {}", settings.config_source());

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("qmodes");
    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(program);
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    let command_args = match parse_command_args(&args[2..]) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage(program);
            process::exit(1);
        }
    };

    let result = match args[1].as_str() {
        "project" => run_project(&settings, &command_args),
        "geom" => run_geometry(&settings, &command_args),
        "modes" => run_modes(&settings, &command_args),
        "ci" => run_create_settings_template(&command_args),
        other => {
            eprintln!("Error: Unknown command: {}", other);
            print_usage(program);
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn print_usage(program: &str) {
    eprintln!("QModes - normal coordinate projection for quantum chemistry logs");
    eprintln!();
    eprintln!("Usage:");
    eprintln!(
        "  {} project <geometry_log> <frequency_log> <masses.xml> [--strict|--lenient] [--output <file>] [--json <file>]",
        program
    );
    eprintln!("  {} geom <geometry_log> [--strict|--lenient] [--xyz <file>]", program);
    eprintln!("  {} modes <frequency_log> <natoms> [--strict|--lenient]", program);
    eprintln!("  {} ci {}", program, CONFIG_FILE_NAME);
    eprintln!();
    eprintln!(
        "Settings are read from ./{0}, ~/.config/qmodes/{0} and /etc/qmodes/{0}.",
        CONFIG_FILE_NAME
    );
}

/// Splits subcommand arguments into positionals and flags.
fn parse_command_args(args: &[String]) -> Result<CommandArgs, String> {
    let mut parsed = CommandArgs::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--strict" => parsed.policy = Some(ParsePolicy::Strict),
            "--lenient" => parsed.policy = Some(ParsePolicy::Lenient),
            "--output" | "-o" => {
                let value = iter.next().ok_or("--output requires a file name")?;
                parsed.output = Some(PathBuf::from(value));
            }
            "--json" => {
                let value = iter.next().ok_or("--json requires a file name")?;
                parsed.json = Some(PathBuf::from(value));
            }
            "--xyz" => {
                let value = iter.next().ok_or("--xyz requires a file name")?;
                parsed.xyz = Some(PathBuf::from(value));
            }
            flag if flag.starts_with('-') && flag.len() > 1 => {
                return Err(format!("Unknown option: {}", flag));
            }
            _ => parsed.positional.push(arg.clone()),
        }
    }
    Ok(parsed)
}

fn expect_positionals(args: &CommandArgs, count: usize, usage: &str) -> Result<(), String> {
    if args.positional.len() != count {
        return Err(format!(
            "Expected {} argument(s), got {}. Usage: {}",
            count,
            args.positional.len(),
            usage
        ));
    }
    Ok(())
}

fn run_project(settings: &SettingsManager, args: &CommandArgs) -> CliResult {
    expect_positionals(
        args,
        3,
        "qmodes project <geometry_log> <frequency_log> <masses.xml>",
    )?;

    let mut parse = settings.settings().parse_options();
    if let Some(policy) = args.policy {
        parse.policy = policy;
    }
    let config = RunConfig::new(
        &args.positional[0],
        &args.positional[1],
        &args.positional[2],
    )
    .with_parse_options(parse);
    info!("Parse policy: {}", config.parse.policy);

    let report = run(&config)?;

    match &args.output {
        Some(path) => {
            io::write_report(&report, settings.output(), path)?;
            info!("Report written to {}", path.display());
        }
        None => print!("{}", io::format_report(&report, settings.output())),
    }
    if let Some(path) = &args.json {
        io::write_report_json(&report, path)?;
        info!("JSON report written to {}", path.display());
    }
    Ok(())
}

fn run_geometry(settings: &SettingsManager, args: &CommandArgs) -> CliResult {
    expect_positionals(args, 1, "qmodes geom <geometry_log>")?;

    let mut parse = settings.settings().parse_options();
    if let Some(policy) = args.policy {
        parse.policy = policy;
    }
    let path = Path::new(&args.positional[0]);
    let content = fs::read_to_string(path)?;
    let geometry = extract_optimized_geometry(&content, &parse)?;

    print!("{}", io::format_geometry(&geometry));
    if let Some(xyz) = &args.xyz {
        let comment = format!("Converged geometry from {}", path.display());
        io::write_xyz(&geometry, &comment, xyz)?;
        info!("XYZ written to {}", xyz.display());
    }
    Ok(())
}

fn run_modes(settings: &SettingsManager, args: &CommandArgs) -> CliResult {
    expect_positionals(args, 2, "qmodes modes <frequency_log> <natoms>")?;

    let natoms: usize = args.positional[1]
        .parse()
        .map_err(|_| format!("Invalid atom count: {}", args.positional[1]))?;
    let policy = args.policy.unwrap_or(settings.settings().parsing.policy);

    let content = fs::read_to_string(&args.positional[0])?;
    let parsed = modes::parse_frequencies_and_modes(&content, natoms, policy)?;
    print!("{}", io::format_modes(&parsed, settings.output()));
    Ok(())
}

fn run_create_settings_template(args: &CommandArgs) -> CliResult {
    expect_positionals(args, 1, "qmodes ci qmodes_config.cfg")?;
    if args.positional[0] != CONFIG_FILE_NAME {
        return Err(format!("Only '{}' templates can be created", CONFIG_FILE_NAME).into());
    }

    let path = Path::new(CONFIG_FILE_NAME);
    if path.exists() {
        return Err(format!("{} already exists; not overwriting", CONFIG_FILE_NAME).into());
    }
    SettingsManager::create_template(path)?;
    println!("✓ Settings template created: {}", CONFIG_FILE_NAME);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_command_args() {
        let parsed =
            parse_command_args(&strings(&["a.out", "--strict", "b.out", "-o", "q.txt", "m.xml"]))
                .unwrap();
        assert_eq!(parsed.positional, strings(&["a.out", "b.out", "m.xml"]));
        assert_eq!(parsed.policy, Some(ParsePolicy::Strict));
        assert_eq!(parsed.output, Some(PathBuf::from("q.txt")));
        assert_eq!(parsed.xyz, None);
        assert_eq!(parsed.json, None);
    }

    #[test]
    fn test_parse_command_args_errors() {
        assert!(parse_command_args(&strings(&["--output"])).is_err());
        assert!(parse_command_args(&strings(&["--verbose"])).is_err());
    }

    #[test]
    fn test_expect_positionals() {
        let args = CommandArgs {
            positional: strings(&["one"]),
            ..CommandArgs::default()
        };
        assert!(expect_positionals(&args, 1, "usage").is_ok());
        assert!(expect_positionals(&args, 2, "usage").is_err());
    }
}
