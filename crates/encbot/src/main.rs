use std::sync::Arc;

use encbot_core::config::Config;

#[tokio::main]
async fn main() -> Result<(), encbot_core::Error> {
    encbot_core::logging::init("encbot")?;

    let cfg = Arc::new(Config::load()?);

    encbot_telegram::router::run(cfg)
        .await
        .map_err(|e| encbot_core::Error::Transport(format!("telegram bot failed: {e}")))?;

    Ok(())
}
