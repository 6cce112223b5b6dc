use std::{net::SocketAddr, sync::Arc};

use teloxide::{
    dispatching::Dispatcher,
    dptree,
    error_handlers::LoggingErrorHandler,
    prelude::*,
    update_listeners::webhooks,
};
use tracing::{error, info};

use encbot_core::{
    app::EncryptBot,
    cipher::SecretCipher,
    config::{Config, TransportMode},
    messaging::port::MessagingPort,
    registry::ChatRegistry,
};

use crate::handlers;
use crate::TelegramMessenger;

/// Build the bot from `cfg` and serve updates until Ctrl-C.
pub async fn run(cfg: Arc<Config>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    match bot.get_me().await {
        Ok(me) => info!(username = %me.username(), "encbot started"),
        Err(e) => error!("get_me failed: {e}"),
    }

    let registry = Arc::new(ChatRegistry::load(cfg.registry_file.clone()).await?);

    let cipher = Arc::new(SecretCipher::new(&cfg.secret_key)?);
    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let app = Arc::new(EncryptBot::new(cfg.clone(), messenger, registry, cipher));

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    let mut dispatcher = Dispatcher::builder(bot.clone(), handler)
        .dependencies(dptree::deps![app])
        .enable_ctrlc_handler()
        .build();

    match &cfg.transport {
        TransportMode::Polling => {
            info!("receiving updates via long polling");
            dispatcher.dispatch().await;
        }
        TransportMode::Webhook { url, listen } => {
            let url = reqwest::Url::parse(url)?;
            info!(%url, %listen, "receiving updates via webhook");
            let listener = serve_webhook(bot, url, *listen).await?;
            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("webhook listener error"),
                )
                .await;
        }
    }

    info!("encbot stopped");
    Ok(())
}

/// Register the webhook and serve it, plus `/health`, on `listen`.
async fn serve_webhook(
    bot: Bot,
    url: reqwest::Url,
    listen: SocketAddr,
) -> anyhow::Result<impl teloxide::update_listeners::UpdateListener<Err = std::convert::Infallible>>
{
    let (listener, stop_flag, router) =
        webhooks::axum_to_router(bot, webhooks::Options::new(listen, url)).await?;

    let app = with_health(router);

    tokio::spawn(async move {
        let served = axum::Server::bind(&listen)
            .serve(app.into_make_service())
            .with_graceful_shutdown(stop_flag)
            .await;
        if let Err(e) = served {
            error!("webhook server failed: {e}");
        }
    });

    Ok(listener)
}

fn with_health(router: axum::Router) -> axum::Router {
    router.route("/health", axum::routing::get(health))
}

async fn health() -> &'static str {
    "ok"
}
