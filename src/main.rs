use clap::Parser;
use log::LevelFilter;
use simple_logger::SimpleLogger;

mod commands;

fn main() -> anyhow::Result<()> {
    let cmd = commands::Commands::parse();
    init_logger(cmd.verbose)?;
    cmd.start()
}

fn init_logger(verbose: u8) -> anyhow::Result<()> {
    let level_filter = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    SimpleLogger::new()
        .with_level(LevelFilter::Off)
        .with_module_level("bsatool", level_filter)
        .with_module_level("bsa_archive", level_filter)
        .init()?;
    Ok(())
}
