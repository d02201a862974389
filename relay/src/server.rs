//! WebSocket listening surface. Each connection gets its own socket loop
//! and its own `LiveSession`; the session dies with the socket.

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::Response,
    routing::get,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info, warn};

use screenlive_types::{ClientEnvelope, ServerMessage};

use crate::session::LiveSession;
use crate::upstream::GenerateContent;

#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<dyn GenerateContent>,
}

pub fn create_router(state: AppState) -> Router {
    // Browsers talk to the relay directly, so the policy is permissive.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> &'static str {
    "ok"
}

async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    info!("WebSocket upgrade request received");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    info!("client connected");
    let mut session: Option<LiveSession> = None;

    while let Some(msg) = socket.recv().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                info!("WebSocket error: {}", e);
                break;
            }
        };
        let reply = match msg {
            Message::Text(text) => {
                dispatch(&mut session, state.upstream.as_ref(), text.as_str()).await
            }
            Message::Close(_) => break,
            _ => None,
        };
        if let Some(reply) = reply {
            let json = match serde_json::to_string(&reply) {
                Ok(json) => json,
                Err(e) => {
                    error!("failed to serialize reply: {}", e);
                    continue;
                }
            };
            if socket.send(Message::Text(json.into())).await.is_err() {
                // Client went away; any in-flight answer is discarded.
                break;
            }
        }
    }

    info!("client disconnected");
}

/// One envelope in, at most one message out. Parse failures and upstream
/// failures answer with a generic error and keep the connection open.
async fn dispatch(
    session: &mut Option<LiveSession>,
    upstream: &dyn GenerateContent,
    text: &str,
) -> Option<ServerMessage> {
    let envelope: ClientEnvelope = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!("malformed envelope: {}", e);
            return Some(ServerMessage::error(format!("malformed message: {}", e)));
        }
    };

    if let Some(setup) = envelope.setup {
        debug!("setup received, starting session");
        *session = Some(LiveSession::new(&setup));
        return Some(ServerMessage::setup_complete());
    }

    if let Some(input) = envelope.realtime_input {
        let Some(session) = session.as_mut() else {
            warn!("realtime input before setup");
            return Some(ServerMessage::error("session not initialized, send setup first"));
        };
        return match session.handle_realtime_input(upstream, &input).await {
            Ok(Some(text)) => Some(ServerMessage::text(text)),
            Ok(None) => None,
            Err(e) => {
                error!("error processing realtime input: {:#}", e);
                Some(ServerMessage::error("Failed to process input"))
            }
        };
    }

    Some(ServerMessage::error("No valid request data"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::{Candidate, Content, GenerateResponse, MockGenerateContent};

    fn text_response(text: &str) -> GenerateResponse {
        GenerateResponse {
            candidates: vec![Candidate {
                content: Some(Content::model_text(text)),
            }],
        }
    }

    #[tokio::test]
    async fn setup_is_acknowledged() {
        let upstream = MockGenerateContent::new();
        let mut session = None;
        let reply = dispatch(
            &mut session,
            &upstream,
            r#"{"setup": {"generation_config": {"response_modalities": ["TEXT"]}}}"#,
        )
        .await
        .expect("ack");
        assert_eq!(reply.status.as_deref(), Some("setup_complete"));
        assert!(session.is_some());
    }

    #[tokio::test]
    async fn realtime_input_before_setup_is_an_error_not_a_crash() {
        let upstream = MockGenerateContent::new();
        let mut session = None;
        let reply = dispatch(
            &mut session,
            &upstream,
            r#"{"realtime_input": {"media_chunks": [{"mime_type": "audio/pcm", "data": "cGNt"}]}}"#,
        )
        .await
        .expect("error envelope");
        assert!(reply.is_error());
        assert!(session.is_none());
    }

    #[tokio::test]
    async fn malformed_json_keeps_connection_and_answers_error() {
        let upstream = MockGenerateContent::new();
        let mut session = None;
        let reply = dispatch(&mut session, &upstream, "{not json").await.expect("error");
        assert!(reply.is_error());
    }

    #[tokio::test]
    async fn envelope_without_payload_is_rejected() {
        let upstream = MockGenerateContent::new();
        let mut session = None;
        let reply = dispatch(&mut session, &upstream, "{}").await.expect("error");
        assert_eq!(reply.error.as_deref(), Some("No valid request data"));
    }

    #[tokio::test]
    async fn full_round_trip_produces_text_reply() {
        let mut upstream = MockGenerateContent::new();
        upstream
            .expect_generate()
            .times(1)
            .returning(|_| Ok(text_response("I see a spreadsheet.")));

        let mut session = None;
        dispatch(
            &mut session,
            &upstream,
            r#"{"setup": {"generation_config": {"response_modalities": ["TEXT"]}}}"#,
        )
        .await;
        let reply = dispatch(
            &mut session,
            &upstream,
            r#"{"realtime_input": {"media_chunks": [
                {"mime_type": "audio/pcm", "data": "cGNt"},
                {"mime_type": "image/jpeg", "data": "anBn"}]}}"#,
        )
        .await
        .expect("text reply");
        assert_eq!(reply.text.as_deref(), Some("I see a spreadsheet."));
    }

    #[tokio::test]
    async fn empty_media_chunks_produce_no_reply() {
        let mut upstream = MockGenerateContent::new();
        upstream.expect_generate().never();

        let mut session = None;
        dispatch(
            &mut session,
            &upstream,
            r#"{"setup": {"generation_config": {"response_modalities": ["TEXT"]}}}"#,
        )
        .await;
        let reply = dispatch(
            &mut session,
            &upstream,
            r#"{"realtime_input": {"media_chunks": []}}"#,
        )
        .await;
        assert!(reply.is_none());
    }

    #[tokio::test]
    async fn upstream_failure_maps_to_generic_error_envelope() {
        let mut upstream = MockGenerateContent::new();
        upstream
            .expect_generate()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("503 from upstream")));

        let mut session = None;
        dispatch(
            &mut session,
            &upstream,
            r#"{"setup": {"generation_config": {"response_modalities": ["TEXT"]}}}"#,
        )
        .await;
        let reply = dispatch(
            &mut session,
            &upstream,
            r#"{"realtime_input": {"media_chunks": [{"mime_type": "audio/pcm", "data": "cGNt"}]}}"#,
        )
        .await
        .expect("error envelope");
        assert_eq!(reply.error.as_deref(), Some("Failed to process input"));
    }
}
