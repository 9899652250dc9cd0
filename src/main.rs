use selenium_supervisor::{Options, Supervisor};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut options = Options::load()?;
    if let Ok(path) = std::env::var("SELENIUM_SUPERVISOR_PATH") {
        options.path = path;
    }
    if let Ok(command) = std::env::var("SELENIUM_SUPERVISOR_COMMAND") {
        options.command = command;
    }

    let handle = Supervisor::new(options)?.start().await?;
    tracing::info!("Selenium server ready at {}", handle.endpoint());

    // Supervise until the server drains its sessions or fails.
    handle.wait().await?;
    Ok(())
}
