use anyhow::Result;
use tracing_subscriber::EnvFilter;
use upgrade_cli::{command, exit_code, run, Invocation};

fn init_tracing(invocation: &Invocation) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(invocation.log_level()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if invocation.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = command().get_matches();
    let invocation = Invocation::from_matches(&matches)?;
    init_tracing(&invocation);

    let result = run(&invocation).await?;
    if invocation.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    std::process::exit(exit_code(&result));
}
