use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use leadflow_core::{chat::ChatService, domain::ChatId, messaging::types::IncomingUpdate};

/// Long-poll Telegram until SIGINT/SIGTERM, feeding text messages to `service`.
pub async fn run_polling(bot: Bot, service: Arc<ChatService>) -> anyhow::Result<()> {
    match bot.get_me().await {
        Ok(me) => tracing::info!(username = %me.username(), "telegram bot started"),
        Err(e) => tracing::warn!(error = %e, "get_me failed; polling anyway"),
    }

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handle_message));

    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![service])
        .default_handler(|_| async {})
        .build();

    let token = dispatcher.shutdown_token();
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("shutdown signal received; stopping dispatcher");
        match token.shutdown() {
            Ok(done) => done.await,
            Err(e) => tracing::debug!(error = %e, "dispatcher was not running"),
        }
    });

    dispatcher.dispatch().await;
    Ok(())
}

async fn handle_message(msg: Message, service: Arc<ChatService>) -> ResponseResult<()> {
    let Some(update) = to_incoming(&msg) else {
        return Ok(());
    };
    service.handle(update).await;
    Ok(())
}

/// Only text messages reach the chat service.
fn to_incoming(msg: &Message) -> Option<IncomingUpdate> {
    let text = msg.text()?;
    let username = msg.from().and_then(|u| u.username.clone());
    Some(IncomingUpdate::from_text(ChatId(msg.chat.id.0), username, text))
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "cannot install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = term.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
