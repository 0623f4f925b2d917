#[tokio::main]
async fn main() -> anyhow::Result<()> {
    metaleads_rs::run().await
}
