#[tokio::main]
async fn main() -> anyhow::Result<()> {
    aiagent_cli::run().await
}
