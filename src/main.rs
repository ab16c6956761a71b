#![doc = include_str!("../README.md")]
use ::lib::config::{Args, Command};
use ::lib::{build_battery, run_command, setup_tracing, ShutdownSignal};
use anyhow::Result;
use tracing::debug;

#[paw::main]
fn main(args: Args) -> Result<()> {
    setup_tracing(&args)?;
    let config = args.validate()?;
    debug!("Configuration : {:#?}", config);

    let battery = build_battery(&config);
    // Ctrl-C keeps its default behavior outside of watch mode
    let shutdown = match args.command {
        Command::Status { watch: true, .. } => ShutdownSignal::on_signals()?,
        _ => ShutdownSignal::new(),
    };
    let stdout = std::io::stdout();
    if let Err(e) = run_command(&args.command, &config, &battery, &shutdown, &mut stdout.lock()) {
        debug!("Command failed: {:#}", e);
        std::process::exit(1);
    }
    Ok(())
}
