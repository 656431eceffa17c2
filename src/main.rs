use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use nocc::avr::{self, image::Zone};
use nocc::config::ProjectConfig;
use nocc::diagnostic::{render_diagnostics, render_diagnostics_plain};

#[derive(Parser)]
#[command(name = "noccavr", version, about = "AVR assembler built on the nocc compiler core")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Assemble a source file (or project) to .hex and .lst
    Build(BuildArgs),
    /// Assemble without writing any output files
    Check(CheckArgs),
}

#[derive(clap::Args)]
struct BuildArgs {
    /// Source file to assemble. If omitted, looks for noccavr.toml in
    /// the current directory (or an ancestor) and assembles its entry.
    file: Option<PathBuf>,
    /// MCU target, e.g. ATMEGA328. Overrides any project config / `.mcu` directive.
    #[arg(long)]
    target: Option<String>,
    /// Output directory for .hex/.lst files. Overrides project config.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(clap::Args)]
struct CheckArgs {
    file: Option<PathBuf>,
    #[arg(long)]
    target: Option<String>,
}

/// What `file`/`target` resolve to once project config (if any) is folded in.
struct Resolved {
    source_path: PathBuf,
    target: Option<String>,
    out_dir: PathBuf,
}

fn resolve(file: Option<PathBuf>, target: Option<String>, out: Option<PathBuf>) -> Result<Resolved, String> {
    if let Some(path) = file {
        return Ok(Resolved { source_path: path, target, out_dir: out.unwrap_or_else(|| PathBuf::from(".")) });
    }

    let cwd = std::env::current_dir().map_err(|e| format!("cannot read current directory: {e}"))?;
    let config_path = ProjectConfig::find(&cwd).ok_or_else(|| {
        "no source file given and no noccavr.toml found in this directory or its ancestors".to_string()
    })?;
    let config = ProjectConfig::load(&config_path).map_err(|d| d.render_plain(&config_path.display().to_string()))?;
    let source_path = config.entry_path(&config_path);
    Ok(Resolved {
        source_path,
        target: target.or(config.build.target.clone()),
        out_dir: out.unwrap_or(config.build.out_dir),
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Command::Build(args) => cmd_build(args),
        Command::Check(args) => cmd_check(args),
    }
}

fn cmd_build(args: BuildArgs) -> ExitCode {
    let resolved = match resolve(args.file, args.target, args.out) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let Some(assembled) = assemble_file(&resolved.source_path, resolved.target.as_deref()) else {
        return ExitCode::FAILURE;
    };

    if assembled.has_errors() {
        report(&assembled, &resolved.source_path);
        return ExitCode::FAILURE;
    }

    if let Err(e) = std::fs::create_dir_all(&resolved.out_dir) {
        eprintln!("error: cannot create output directory '{}': {e}", resolved.out_dir.display());
        return ExitCode::FAILURE;
    }

    let stem = resolved.source_path.file_stem().and_then(|s| s.to_str()).unwrap_or("out");
    for (zone, hex_text) in assembled.hex_outputs() {
        let name = match zone {
            Zone::Text => format!("{stem}.hex"),
            Zone::Eeprom => format!("{stem}.eep.hex"),
            Zone::Data => continue,
        };
        let path = resolved.out_dir.join(name);
        if let Err(e) = std::fs::write(&path, hex_text) {
            eprintln!("error: cannot write '{}': {e}", path.display());
            return ExitCode::FAILURE;
        }
    }

    let source_file = resolved.source_path.display().to_string();
    let listing_name = format!("{stem}.lst");
    let listing_path = resolved.out_dir.join(&listing_name);
    let listing_text = assembled.listing_text(&source_file, &listing_name);
    if let Err(e) = std::fs::write(&listing_path, listing_text) {
        eprintln!("error: cannot write '{}': {e}", listing_path.display());
        return ExitCode::FAILURE;
    }

    report(&assembled, &resolved.source_path);
    ExitCode::SUCCESS
}

fn cmd_check(args: CheckArgs) -> ExitCode {
    let resolved = match resolve(args.file, args.target, None) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let Some(assembled) = assemble_file(&resolved.source_path, resolved.target.as_deref()) else {
        return ExitCode::FAILURE;
    };
    report(&assembled, &resolved.source_path);
    if assembled.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn assemble_file(path: &Path, target: Option<&str>) -> Option<avr::Assembled> {
    match std::fs::read_to_string(path) {
        Ok(source) => Some(avr::assemble_source(&source, target)),
        Err(e) => {
            eprintln!("error: cannot read '{}': {e}", path.display());
            None
        }
    }
}

/// Print diagnostics: rich `ariadne` rendering to a terminal, the plain
/// §7 one-line form when stderr isn't a TTY (CI logs, piped output).
fn report(assembled: &avr::Assembled, path: &Path) {
    if assembled.diagnostics.is_empty() {
        return;
    }
    let filename = path.display().to_string();
    if atty_stderr() {
        let source = std::fs::read_to_string(path).unwrap_or_default();
        render_diagnostics(&assembled.diagnostics, &filename, &source);
    } else {
        eprintln!("{}", render_diagnostics_plain(&assembled.diagnostics, &filename));
    }
}

fn atty_stderr() -> bool {
    use std::io::IsTerminal;
    std::io::stderr().is_terminal()
}
