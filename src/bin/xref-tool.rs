use std::process::exit;

use clap::Parser;

use xrefdb::logging::init_logging;
use xrefdb::tool::{render, run, ToolOpts};

fn main() {
    init_logging();
    let opts = ToolOpts::parse();

    match run(&opts).and_then(|value| render(&value, opts.output_format)) {
        Ok(s) => println!("{}", s),
        Err(err) => {
            eprintln!("{}", err);
            exit(1);
        }
    }
}
