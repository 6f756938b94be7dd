#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = examverse::run().await {
        eprintln!("examverse fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
