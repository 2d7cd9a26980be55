use anyhow::Result;
use finda::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
