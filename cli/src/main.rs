use clap::Parser;
use placescout_cli::{init_tracing, run, Args};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);
    run(args).await
}
