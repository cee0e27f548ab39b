pub mod cli;
pub mod config;
pub mod git;
pub mod output;
pub mod pm;
pub mod process;
pub mod registry;
pub mod scripts;

/// Run the command line interface and return an exit code.
pub fn run_cli() -> i32 {
    cli::run()
}
