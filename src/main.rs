use std::io;
use std::process;

use clap::Parser;

use sift::json::{JsonDecoder, JsonEncoder};
use sift::StreamError;

/// Stream JSON values from stdin through a jq-style filter expression.
#[derive(Parser)]
#[command(name = "sift", version)]
struct Cli {
    /// The filter program to apply to each input value
    program: String,
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(&cli.program) {
        eprintln!("sift: {err}");
        process::exit(1);
    }
}

fn run(program: &str) -> Result<(), StreamError> {
    let filter = sift::compile("command-line", program)?;
    let mut decoder = JsonDecoder::new(io::stdin().lock());
    let mut encoder = JsonEncoder::new(io::stdout().lock());
    sift::run(&mut decoder, &filter, &mut encoder)
}
