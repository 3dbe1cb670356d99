//! jinja-js-rs - compiles Jinja-like templates into ES module trees.

use clap::Parser;
use miette::{IntoDiagnostic, Result, WrapErr};
use std::process::ExitCode;

mod cli;
mod output;

use cli::Args;
use output::OutputFormatter;

fn main() -> ExitCode {
    let args = Args::parse();

    // Set up miette for nice error output
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    match run(args) {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("{:?}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let formatter = OutputFormatter::new(args.output);
    let mut compiled = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;

    for file in &args.files {
        if !args.accepts(file) {
            skipped += 1;
            if args.verbose {
                eprintln!("skipping {}", file.display());
            }
            continue;
        }

        let source = std::fs::read_to_string(file)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to read {}", file.display()))?;
        let name = file
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("template");

        // Only syntax errors are reported in-band; anything else bubbles up.
        match jinja_codegen::compile(&source, Some(name)) {
            Ok(program) => {
                compiled += 1;
                formatter.print_program(file, &program)?;
            }
            Err(error) => {
                failed += 1;
                formatter.print_syntax_error(file, &error, &source);
                if args.fail_fast {
                    break;
                }
            }
        }
    }

    formatter.print_summary(compiled, skipped, failed);
    if failed > 0 {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
