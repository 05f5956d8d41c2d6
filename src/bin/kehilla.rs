use anyhow::Result;
use chrono::Local;
use kehilla::cli::{self, Command};
use kehilla::config::Config;
use kehilla::context::StandardContext;
use std::env;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();

    let invocation = match cli::parse_args(&args) {
        Ok(inv) => inv,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Run 'kehilla --help' for usage.");
            std::process::exit(2);
        }
    };

    if invocation.command == Command::Help {
        cli::print_help("kehilla");
        return Ok(());
    }

    let ctx = StandardContext::new(invocation.root.clone());
    let config = Config::load_or_default(&ctx)?;
    kehilla::logging::init(config.log_level_filter());
    log::debug!("Leap-day policy: {}", config.leap_day_policy);

    let today = Local::now().date_naive();
    for line in cli::execute(&invocation.command, &ctx, &config, today)? {
        println!("{}", line);
    }
    Ok(())
}
