use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    project_tracker::cli::run().await
}
