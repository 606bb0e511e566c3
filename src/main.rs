use clap::Parser;
use flyerfe::cli::{self, CliArgs};
use flyerfe::logger;
use flyerfe::settings::EditorSettings;

fn main() -> std::process::ExitCode {
    // Initialize session log (overwrites previous session log)
    logger::init();

    let args = CliArgs::parse();
    let settings = EditorSettings::load();
    cli::run(args, settings)
}
