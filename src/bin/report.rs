use clap::Parser;
use pkgscope::cli::{init_logging, ReportCli, ReportCommand};
use pkgscope::config::Config;
use pkgscope::error::{AiError, Error};
use pkgscope::report;

fn main() {
    let cli = ReportCli::parse();

    match cli.command {
        ReportCommand::Run(args) => {
            init_logging(args.verbose);

            let result = Config::load(args.config.as_deref())
                .and_then(|config| report::run(&config, args.snapshot.as_deref()));

            match result {
                Ok(path) => println!("Report written to {}", path.display()),
                Err(e) => {
                    eprintln!("error: {e}");
                    if let Some(hint) = hint(&e) {
                        eprintln!("hint: {hint}");
                    }
                    std::process::exit(1);
                }
            }
        }
    }
}

fn hint(error: &Error) -> Option<&'static str> {
    match error {
        Error::Ai(AiError::RateLimit(_)) => Some("wait a minute and try again; the snapshot is kept"),
        Error::Ai(AiError::Auth(_)) => Some("check that the api key environment variable is set and valid"),
        _ => None,
    }
}
