#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = cbt_rust::run().await {
        eprintln!("cbt-rust fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
