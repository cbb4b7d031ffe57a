use std::io;

use clap::Parser;
use onebot_template_cli::{init_logging, run, Cli};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    run(&cli, &mut io::stdout().lock())
}
