//! Jack Compiler CLI - Compiles Jack files to VM code.
//!
//! Usage:
//!     JackCompiler <file.jack | directory>
//!     JackCompiler --dump-partial -o out/ <file.jack | directory>

use clap::Parser as ClapParser;
use jackc::{CompileOptions, compile_directory, compile_file, format_error, write_result};
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(ClapParser, Debug)]
#[command(name = "JackCompiler")]
#[command(version = "0.1.0")]
#[command(about = "Single-pass Jack to VM code compiler")]
#[command(author = "nand2tetris")]
struct Args {
    /// Input file or directory
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output directory (defaults to input directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the instructions emitted before a fatal error
    #[arg(long = "dump-partial")]
    dump_partial: bool,

    /// Log progress at info level
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };
    if let Err(e) = SimpleLogger::new().with_level(level).env().init() {
        eprintln!("Warning: logger not initialised: {}", e);
    }

    let options = CompileOptions {
        keep_partial: args.dump_partial,
    };

    let (results, output_dir) = if args.input.is_file() {
        let result = compile_file(&args.input, options);
        let output_dir = args.output.unwrap_or_else(|| {
            args.input
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."))
        });
        (vec![result], output_dir)
    } else if args.input.is_dir() {
        let results = compile_directory(&args.input, options);
        let output_dir = args.output.unwrap_or_else(|| args.input.clone());
        (results, output_dir)
    } else {
        eprintln!("Error: Input not found: {}", args.input.display());
        return ExitCode::from(2);
    };

    if results.is_empty() {
        eprintln!("Error: No .jack files found in {}", args.input.display());
        return ExitCode::from(2);
    }

    let mut has_errors = false;

    for result in &results {
        let Some(err) = &result.error else {
            match write_result(result, &output_dir) {
                Ok(()) => {
                    println!(
                        "Compiled {}.jack -> {}.vm",
                        result.filename, result.filename
                    );
                }
                Err(e) => {
                    eprintln!("Error writing {}.vm: {}", result.filename, e);
                    has_errors = true;
                }
            }
            continue;
        };

        has_errors = true;
        let jack_name = format!("{}.jack", result.filename);
        eprintln!("{}", format_error(err, &result.source, &jack_name));
        if args.dump_partial && !result.partial.is_empty() {
            eprintln!("partial output of {}:", jack_name);
            for line in &result.partial {
                eprintln!("    {}", line);
            }
        }
    }

    if has_errors {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}
