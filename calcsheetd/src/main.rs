//! # Calcsheet Host Daemon
//!
//! Evaluates a sheet once, or replays an edit script against it.

use calcsheetd::{ConfigLoader, HostRuntime, HostRuntimeConfig, TranscriptEntry};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct CliOptions {
    file: Option<PathBuf>,
    script: Option<PathBuf>,
    globals: Option<PathBuf>,
    config: Option<PathBuf>,
    render: Option<String>,
    debounce_ms: Option<u64>,
    list_vars: bool,
    json: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("calcsheetd");

    let options = parse_args(&args).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        print_usage(program);
        process::exit(1);
    });

    if let Err(e) = run(options) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(options: CliOptions) -> Result<(), String> {
    let mut engine_config = match &options.config {
        Some(path) => ConfigLoader::load_from_path(path),
        None => ConfigLoader::load_or_default("."),
    }
    .map_err(|e| e.to_string())?;

    if let Some(render) = &options.render {
        engine_config.render_mode = render.parse()?;
    }
    if let Some(debounce_ms) = options.debounce_ms {
        engine_config.debounce_ms = debounce_ms;
    }
    if let Some(globals) = &options.globals {
        engine_config.globals_path = globals.clone();
    }

    let document = options.file.as_deref().map(read_file).transpose()?;
    let script = options.script.as_deref().map(read_file).transpose()?;
    let base_dir = options
        .script
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let replay = script.is_some();

    let mut runtime = HostRuntime::new(HostRuntimeConfig {
        engine: engine_config,
        document,
        script,
        base_dir,
        ..HostRuntimeConfig::default()
    })
    .map_err(|e| format!("Failed to create runtime: {}", e))?;

    if replay {
        runtime.run().map_err(|e| format!("Runtime error: {}", e))?;
        for entry in runtime.transcript() {
            if !matches!(entry, TranscriptEntry::Pass { .. }) {
                println!("{}", entry);
                println!();
            }
        }
    } else {
        runtime.evaluate_now();
    }

    println!("{}", runtime.document_view());
    if options.list_vars {
        println!();
        println!("{}", runtime.engine().list_variables());
    }
    if options.json {
        println!("{}", runtime.scope_snapshot_json().map_err(|e| e.to_string())?);
    }
    Ok(())
}

fn read_file(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", path.display(), e))
}

fn parse_args(args: &[String]) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut i = 1;

    let value = |i: usize, flag: &str| -> Result<String, String> {
        args.get(i)
            .cloned()
            .ok_or_else(|| format!("Missing value for {}", flag))
    };

    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--file" | "-f" => {
                i += 1;
                options.file = Some(PathBuf::from(value(i, flag)?));
            }
            "--script" | "-s" => {
                i += 1;
                options.script = Some(PathBuf::from(value(i, flag)?));
            }
            "--globals" | "-g" => {
                i += 1;
                options.globals = Some(PathBuf::from(value(i, flag)?));
            }
            "--config" | "-c" => {
                i += 1;
                options.config = Some(PathBuf::from(value(i, flag)?));
            }
            "--render" | "-r" => {
                i += 1;
                options.render = Some(value(i, flag)?);
            }
            "--debounce-ms" => {
                i += 1;
                let raw = value(i, flag)?;
                options.debounce_ms = Some(
                    raw.parse()
                        .map_err(|_| format!("Invalid debounce value: {}", raw))?,
                );
            }
            "--list-vars" => options.list_vars = true,
            "--json" => options.json = true,
            "--help" | "-h" => {
                print_usage(args.first().map(String::as_str).unwrap_or("calcsheetd"));
                process::exit(0);
            }
            other => return Err(format!("Unknown option: {}", other)),
        }
        i += 1;
    }

    if options.file.is_none() && options.script.is_none() {
        return Err("Nothing to do: pass --file or --script".to_string());
    }
    Ok(options)
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} [OPTIONS]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -f, --file <FILE>        Sheet to evaluate");
    eprintln!("  -s, --script <FILE>      Edit script to replay");
    eprintln!("  -g, --globals <FILE>     Definitions resource (default: variables.md)");
    eprintln!("  -c, --config <FILE>      Config file (default: ./calcsheet.json if present)");
    eprintln!("  -r, --render <MODE>      rewrite (default) or overlay");
    eprintln!("  --debounce-ms <N>        Debounce window in milliseconds");
    eprintln!("  --list-vars              Print the variable listing");
    eprintln!("  --json                   Print the final scope as JSON");
    eprintln!("  -h, --help               Show this help message");
    eprintln!();
    eprintln!("Logging is controlled with RUST_LOG (default: warn).");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} --file demos/budget.md --list-vars", program);
    eprintln!("  {} --script demos/session.calc --globals demos/variables.md --render overlay", program);
}
