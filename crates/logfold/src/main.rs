use clap::Parser;
use logfold::cli::Args;
use logfold::runtime;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    runtime::init_logging();
    let args = Args::parse();
    runtime::run(args).await
}
