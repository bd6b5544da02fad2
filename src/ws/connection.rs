//! WebSocket connection state machine.
//!
//! Handles the read/write loop for a single WebSocket connection,
//! dispatching incoming commands and forwarding filtered market events.

use std::time::Duration;

use alloy_primitives::Address;
use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use super::messages::{WsCommand, WsMessage, WsMessageType};
use super::subscription::SubscriptionManager;
use crate::api::dto::{QuoteRequest, QuoteResponse};
use crate::domain::{MarketEvent, parse_address};
use crate::error::RouterError;
use crate::service::RouteOptimizerService;

/// Quote replies buffered between finished searches and the socket writer.
const QUOTE_REPLY_BUFFER: usize = 16;

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads commands from the client and dispatches them.
/// - Forwards matching events from the [`broadcast::Receiver`] to the client.
/// - Writes quote replies as their searches finish.
///
/// Quotes run in their own tasks and are cancelled when the connection
/// closes.
pub async fn run_connection(
    socket: WebSocket,
    mut event_rx: broadcast::Receiver<MarketEvent>,
    optimizer: RouteOptimizerService,
    quote_timeout: Duration,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut subs = SubscriptionManager::new();
    let connection = CancellationToken::new();
    let _guard = connection.clone().drop_guard();
    let (reply_tx, mut reply_rx) = mpsc::channel::<WsMessage>(QUOTE_REPLY_BUFFER);

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let Ok(msg) = serde_json::from_str::<WsMessage>(&text) else {
                            let reply = WsMessage::error("", 400, "malformed JSON");
                            if ws_tx.send(Message::text(reply.to_json())).await.is_err() {
                                break;
                            }
                            continue;
                        };
                        let reply = match serde_json::from_value::<WsCommand>(msg.payload) {
                            Ok(WsCommand::Quote(req)) => {
                                spawn_quote(
                                    msg.id,
                                    req,
                                    optimizer.clone(),
                                    quote_timeout,
                                    connection.child_token(),
                                    reply_tx.clone(),
                                );
                                continue;
                            }
                            Ok(WsCommand::Subscribe { pair_addresses }) => {
                                subscribe(msg.id, &pair_addresses, &mut subs)
                            }
                            Ok(WsCommand::Unsubscribe { pair_addresses }) => {
                                unsubscribe(msg.id, &pair_addresses, &mut subs)
                            }
                            Err(_) => WsMessage::error(msg.id, 404, "unknown command"),
                        };
                        if ws_tx.send(Message::text(reply.to_json())).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
            Some(reply) = reply_rx.recv() => {
                if ws_tx.send(Message::text(reply.to_json())).await.is_err() {
                    break;
                }
            }
            event = event_rx.recv() => {
                match event {
                    Ok(market_event) => {
                        if subs.matches(&market_event) {
                            let msg = WsMessage::new(
                                uuid::Uuid::new_v4().to_string(),
                                WsMessageType::Event,
                                serde_json::to_value(&market_event).unwrap_or_default(),
                            );
                            if ws_tx.send(Message::text(msg.to_json())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, "ws client lagged behind event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::debug!("ws connection closed");
}

/// Adds subscriptions and returns the reply.
fn subscribe(id: String, raw: &[String], subs: &mut SubscriptionManager) -> WsMessage {
    let (pairs, wildcard) = parse_pairs(raw);
    subs.subscribe(&pairs, wildcard);
    WsMessage::new(
        id,
        WsMessageType::Response,
        serde_json::json!({
            "subscribed": pairs.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "count": subs.count(),
            "wildcard": subs.is_subscribed_all(),
        }),
    )
}

/// Removes subscriptions and returns the reply.
fn unsubscribe(id: String, raw: &[String], subs: &mut SubscriptionManager) -> WsMessage {
    let (pairs, wildcard) = parse_pairs(raw);
    subs.unsubscribe(&pairs, wildcard);
    WsMessage::new(
        id,
        WsMessageType::Response,
        serde_json::json!({
            "unsubscribed": pairs.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "remaining_count": subs.count(),
            "wildcard": subs.is_subscribed_all(),
        }),
    )
}

/// Runs a quote in its own task and sends the reply back to the connection
/// loop. The search stops when `cancel` fires.
fn spawn_quote(
    id: String,
    req: QuoteRequest,
    optimizer: RouteOptimizerService,
    quote_timeout: Duration,
    cancel: CancellationToken,
    reply_tx: mpsc::Sender<WsMessage>,
) {
    tokio::spawn(async move {
        let reply = match run_quote(&req, &optimizer, quote_timeout, &cancel).await {
            Ok(response) => WsMessage::new(
                id,
                WsMessageType::Response,
                serde_json::to_value(&response).unwrap_or_default(),
            ),
            Err(RouterError::Cancelled) if cancel.is_cancelled() => {
                tracing::debug!(%id, "ws quote abandoned with its connection");
                return;
            }
            Err(err) => WsMessage::error(id, err.error_code(), err.to_string()),
        };
        // The connection may have closed in the meantime.
        let _ = reply_tx.send(reply).await;
    });
}

async fn run_quote(
    req: &QuoteRequest,
    optimizer: &RouteOptimizerService,
    quote_timeout: Duration,
    cancel: &CancellationToken,
) -> Result<QuoteResponse, RouterError> {
    let request = req.to_route_request()?;
    let route = tokio::time::timeout(quote_timeout, optimizer.find_optimal_route(&request, cancel))
        .await
        .map_err(|_| RouterError::Cancelled)??;
    Ok(QuoteResponse::new(&route, optimizer.recommended_slippage(&route)))
}

/// Splits raw pair strings into parsed addresses and the wildcard flag.
/// Malformed entries are skipped.
fn parse_pairs(raw: &[String]) -> (Vec<Address>, bool) {
    let mut pairs = Vec::new();
    let mut wildcard = false;
    for entry in raw {
        if entry == "*" {
            wildcard = true;
        } else if let Ok(address) = parse_address(entry) {
            pairs.push(address);
        }
    }
    (pairs, wildcard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_pairs_handles_wildcard_and_garbage() {
        let raw = vec![
            "*".to_string(),
            "0x0000000000000000000000000000000000000009".to_string(),
            "not-an-address".to_string(),
        ];
        let (pairs, wildcard) = parse_pairs(&raw);
        assert!(wildcard);
        assert_eq!(pairs, vec![Address::with_last_byte(9)]);
    }
}
