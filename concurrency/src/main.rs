use concurrency::config::Config;
use concurrency::{demo, Error};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::subscriber::set_global_default(demo::subscriber())?;

    demo::run(&Config::default()).await?;

    Ok(())
}
