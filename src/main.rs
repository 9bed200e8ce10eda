use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    hibiscus_lib::run(hibiscus_lib::cli::Cli::parse()).await
}
