//! ato-check CLI
//!
//! Usage:
//!   ato-check [OPTIONS] [FILE]
//!
//! Options:
//!   --kind <KIND>          circuit or form (detected from the extension)
//!   -c, --config <FILE>    Check configuration (TOML format)
//!   --root <MODULE>        Module to elaborate
//!   --strict-imports       Reject references through imported types
//!   --nets                 Print elaborated nets
//!   --fmt                  Print the input in canonical form
//!   --deny-warnings        Fail on lint warnings
//!   -v, --verbose          Debug logging
//!   -g, --grammar          Show language grammar reference
//!   -h, --help             Print help

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use ato_check::{
    check_circuit, check_circuit_file, check_form, format_circuit, format_form, CheckConfig,
    CheckError,
};

#[derive(Parser)]
#[command(name = "ato-check", version)]
#[command(about = "Static checks for circuit descriptions and issue forms")]
struct Cli {
    /// Input file (reads from stdin if not provided)
    input: Option<PathBuf>,

    /// What the input is; detected from the file extension when omitted
    #[arg(long, value_enum)]
    kind: Option<Kind>,

    /// Check configuration file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Module to elaborate (default: every module nothing instantiates)
    #[arg(long)]
    root: Option<String>,

    /// Reject terminal references through imported types
    #[arg(long)]
    strict_imports: bool,

    /// Print the nets of each elaborated module
    #[arg(long)]
    nets: bool,

    /// Print the input in canonical form instead of checking it
    #[arg(long)]
    fmt: bool,

    /// Exit with an error when there are lint warnings
    #[arg(long)]
    deny_warnings: bool,

    /// Debug logging (overrides ATO_CHECK_LOG)
    #[arg(short, long)]
    verbose: bool,

    /// Show language grammar reference
    #[arg(short, long)]
    grammar: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Kind {
    Circuit,
    Form,
}

impl Kind {
    fn detect(path: Option<&Path>) -> Self {
        match path.and_then(|p| p.extension()).and_then(|e| e.to_str()) {
            Some("yml" | "yaml") => Kind::Form,
            _ => Kind::Circuit,
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("ATO_CHECK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.grammar {
        print_grammar();
        return ExitCode::SUCCESS;
    }

    // If no input file and stdin is a terminal (interactive), show intro help
    if cli.input.is_none() && io::stdin().is_terminal() {
        print_intro();
        return ExitCode::SUCCESS;
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let source = match read_input(cli.input.as_deref()) {
        Ok(source) => source,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::FAILURE;
        }
    };
    let filename = cli
        .input
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<stdin>".to_string());

    let kind = cli.kind.unwrap_or_else(|| Kind::detect(cli.input.as_deref()));
    debug!(?kind, file = %filename, "checking input");
    let ok = match kind {
        Kind::Form if cli.fmt => run_fmt(format_form(&source), &source, &filename),
        Kind::Form => run_form(&source, &filename, &config),
        Kind::Circuit if cli.fmt => run_fmt(format_circuit(&source), &source, &filename),
        Kind::Circuit => run_circuit(&cli, &source, &filename, &config),
    };
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn load_config(cli: &Cli) -> Result<CheckConfig, CheckError> {
    let mut config = match &cli.config {
        Some(path) => CheckConfig::from_file(path)?,
        None => CheckConfig::default(),
    };
    if let Some(root) = &cli.root {
        config = config.with_root(root.clone());
    }
    if cli.strict_imports {
        config = config.with_strict_imports(true);
    }
    if cli.deny_warnings {
        config = config.with_deny_warnings(true);
    }
    Ok(config)
}

fn read_input(path: Option<&Path>) -> Result<String, String> {
    match path {
        Some(path) => fs::read_to_string(path)
            .map_err(|e| format!("Error reading file '{}': {}", path.display(), e)),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map(|_| buffer)
                .map_err(|e| format!("Error reading from stdin: {}", e))
        }
    }
}

fn run_circuit(cli: &Cli, source: &str, filename: &str, config: &CheckConfig) -> bool {
    // Files on disk can follow `from` imports; stdin is checked on its own
    let result = match &cli.input {
        Some(path) => check_circuit_file(path, config),
        None => check_circuit(source, config),
    };
    let report = match result {
        Ok(report) => report,
        Err(e) => {
            eprint!("{}", e.format(source, filename));
            return false;
        }
    };

    for warning in &report.warnings {
        eprint!("{}", warning.format(source, filename));
    }
    if cli.nets {
        for netlist in &report.netlists {
            print!("{}", netlist);
        }
    }
    !report.fails(config)
}

fn run_fmt(formatted: Result<String, CheckError>, source: &str, filename: &str) -> bool {
    match formatted {
        Ok(formatted) => {
            print!("{}", formatted);
            true
        }
        Err(e) => {
            eprint!("{}", e.format(source, filename));
            false
        }
    }
}

fn run_form(source: &str, filename: &str, config: &CheckConfig) -> bool {
    match check_form(source, config) {
        Ok(report) => {
            for issue in &report.issues {
                eprintln!("{}: {}", filename, issue);
            }
            report.issues.is_empty()
        }
        Err(e) => {
            eprint!("{}", e.format(source, filename));
            false
        }
    }
}

fn print_intro() {
    println!(
        r#"ato-check - Static checks for circuit descriptions and issue forms

USAGE:
    ato-check [OPTIONS] [FILE]
    cat board.ato | ato-check --nets

OPTIONS:
    --kind <KIND>        circuit or form (default: from the file extension)
    -c, --config <FILE>  Check configuration (TOML file)
    --root <MODULE>      Module to elaborate
    --strict-imports     Reject references through imported types
    --nets               Print elaborated nets
    --fmt                Print the input in canonical form
    --deny-warnings      Fail on lint warnings
    -v, --verbose        Debug logging
    -g, --grammar        Show language grammar reference
    -h, --help           Print help

QUICK START:
    printf 'component R: signal a; signal b\nmodule M:\n    signal x\n    r = new R\n    x ~ r.a\n' | ato-check --nets

Run --grammar for the syntax reference."#
    );
}

fn print_grammar() {
    println!(
        r#"CIRCUIT LANGUAGE GRAMMAR
========================

FILES
-----
import Name, Other                 Bring in names from the standard library
from "parts/x.ato" import Name     Bring in blocks from another file
component Name: ...                Leaf part with signals and pins
module Name: ...                   Composition of instances
interface Name: ...                Bundle of signals

BLOCK BODIES
------------
A body follows the colon on the same line, or on the following lines
indented deeper than the header. Statements on one line are separated
by ';'. Comments start with '#'.

    component Crystal: signal xin; signal xout

    module Oscillator:
        signal xin
        crystal = new Crystal

STATEMENTS
----------
signal name                   Declare a signal
pin 1 / pin name              Declare a pin
private signal name           Terminal hidden from enclosing blocks
inst = new Type               Instantiate a component, module or interface
inst.attr = "0402"            Set an attribute (strings, numbers, True, False)
a ~ inst.b                    Connect two terminals
signal gnd ~ pin 2            Declare and connect in one step
pass                          Empty body

NUMBERS
-------
Numbers may carry a unit suffix: 10kohm, 12MHz, -3.3V, 5%

NETS
----
Connections are undirected and transitive: if a ~ b and b ~ c then
a, b and c are one net. Nets are named after a signal of the root module
when they contain one, otherwise after their shallowest terminal."#
    );
}
