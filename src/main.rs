use clap::Parser;
use questlog::cli::commands::Cli;
use questlog::cli::handlers;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("QUESTLOG_LOG", "warn"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    if let Err(e) = handlers::dispatch(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
