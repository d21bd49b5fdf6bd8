use clap::Parser;
use pkgscope::aggregate;
use pkgscope::cli::{init_logging, CollectCli, CollectCommand};
use pkgscope::config::Config;
use pkgscope::exec::SystemRunner;
use pkgscope::report::summary;

fn main() {
    let cli = CollectCli::parse();

    match cli.command {
        CollectCommand::Run(args) => {
            init_logging(args.verbose);

            let config = match Config::load(args.config.as_deref()) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("error: {e}");
                    std::process::exit(1);
                }
            };

            let snapshot = aggregate::collect(&config.analysis, &SystemRunner);

            match aggregate::write(&snapshot, &config.output_dir) {
                Ok(path) => {
                    print!("{}", summary::render(&snapshot));
                    println!("\nSnapshot saved to {}", path.display());
                }
                Err(e) => {
                    eprintln!("error: failed to save snapshot: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}
