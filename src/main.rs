use std::process::ExitCode;

use clap::Parser;

use kct_config::{ConfigResolver, unicode_vars};

mod cli;
mod logging;
mod output;
mod pipeline;

use cli::Args;
use pipeline::Invocation;

/// Base name of the settings file and environment variable prefix
const APP_NAME: &str = "kube-client-template";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    let env = unicode_vars(std::env::vars_os());
    let settings = ConfigResolver::new(APP_NAME).resolve(args.config.as_deref(), env);
    let invocation = Invocation::new(args, settings);

    logging::init(invocation.log_level, invocation.log_format);
    invocation.report();

    // Every failure lands here; nothing below exits on its own
    match pipeline::run(&invocation).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
