use clap::Parser;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = gmail_automate::cli::Cli::parse();
    gmail_automate::logging::init(cli.verbose);

    if let Err(err) = gmail_automate::run(cli).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
