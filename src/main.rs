use clap::Parser;

fn main() {
    let cli = polymask::Cli::parse();
    let level = if cli.verbose() { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(err) = polymask::run(cli) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
