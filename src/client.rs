use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

use screenlive_types::audio::Base64EncodedAudioBytes;
use screenlive_types::{ClientEnvelope, RealtimeInput, ServerMessage};

use crate::client::state::SharedState;

mod config;
mod consts;
mod state;
mod utils;

pub use config::{Config, ConfigBuilder};
pub use state::ConnectionState;

pub type ClientTx = tokio::sync::mpsc::Sender<ClientEnvelope>;
type ServerTx = tokio::sync::broadcast::Sender<ServerMessage>;
pub type ServerRx = tokio::sync::broadcast::Receiver<ServerMessage>;

pub struct Connection {
    pub(crate) send_handle: tokio::task::JoinHandle<()>,
    pub(crate) recv_handle: tokio::task::JoinHandle<()>,
}

/// Transport client owning one WebSocket connection to the relay. On a
/// successful connect it immediately announces the configured setup. Once
/// the connection reaches `Closed` the instance is dead; create a new one
/// to reconnect.
pub struct Client {
    capacity: usize,
    config: Config,
    c_tx: Option<ClientTx>,
    s_tx: Option<ServerTx>,
    state: SharedState,
    conn: Option<Connection>,
}

impl Client {
    fn new(capacity: usize, config: Config) -> Self {
        Self {
            capacity,
            config,
            c_tx: None,
            s_tx: None,
            state: SharedState::default(),
            conn: None,
        }
    }

    async fn connect(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if self.c_tx.is_some() {
            return Err("already connected".into());
        }
        if self.state.get() == ConnectionState::Closed {
            return Err("client is closed, create a new instance".into());
        }

        self.state.set(ConnectionState::Connecting);
        let request = utils::build_request(&self.config)?;
        let (ws_stream, _) = match tokio_tungstenite::connect_async(request).await {
            Ok(ok) => ok,
            Err(e) => {
                self.state.set(ConnectionState::Closed);
                return Err(e.into());
            }
        };

        let (mut write, mut read) = ws_stream.split();

        let (c_tx, mut c_rx) = tokio::sync::mpsc::channel::<ClientEnvelope>(self.capacity);
        let (s_tx, _) = tokio::sync::broadcast::channel(self.capacity);

        self.c_tx = Some(c_tx.clone());
        self.s_tx = Some(s_tx.clone());

        let send_handle = tokio::spawn(async move {
            while let Some(envelope) = c_rx.recv().await {
                match serde_json::to_string(&envelope) {
                    Ok(text) => {
                        if let Err(e) = write.send(Message::Text(text)).await {
                            tracing::error!("failed to send message: {}", e);
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!("failed to serialize envelope: {}", e);
                    }
                }
            }
            // Channel closed by disconnect; say goodbye to the relay.
            if let Err(e) = write.send(Message::Close(None)).await {
                tracing::debug!("close frame not delivered: {}", e);
            }
        });

        let state = self.state.clone();
        let recv_handle = tokio::spawn(async move {
            while let Some(message) = read.next().await {
                let message = match message {
                    Err(e) => {
                        tracing::error!("failed to read message: {}", e);
                        break;
                    }
                    Ok(message) => message,
                };
                match message {
                    Message::Text(text) => match serde_json::from_str::<ServerMessage>(&text) {
                        Ok(response) => {
                            if let Some(error) = &response.error {
                                tracing::warn!("relay reported error: {}", error);
                            }
                            if s_tx.send(response).is_err() {
                                tracing::debug!("no subscribers for relay response");
                            }
                        }
                        Err(e) => {
                            tracing::error!("failed to deserialize response: {}, text=> {:?}", e, text);
                        }
                    },
                    Message::Binary(bin) => {
                        tracing::warn!("unexpected binary message: {} bytes", bin.len());
                    }
                    Message::Close(reason) => {
                        tracing::info!("connection closed: {:?}", reason);
                        break;
                    }
                    _ => {}
                }
            }
            state.set(ConnectionState::Closed);
        });

        self.conn = Some(Connection {
            send_handle,
            recv_handle,
        });
        self.state.set(ConnectionState::Open);

        // Announce the setup before anything else goes over the wire.
        let setup = self.config.setup().clone();
        c_tx.send(ClientEnvelope::setup(setup)).await?;
        tracing::debug!("sent setup message");
        Ok(())
    }

    /// Current transport status, derived from actual socket events.
    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    pub fn server_messages(&self) -> Result<ServerRx, Box<dyn std::error::Error>> {
        match self.s_tx {
            Some(ref tx) => Ok(tx.subscribe()),
            None => Err("not connected yet".into()),
        }
    }

    async fn send_envelope(&mut self, envelope: ClientEnvelope) -> Result<(), Box<dyn std::error::Error>> {
        if self.state.get() != ConnectionState::Open {
            return Err("connection is not open".into());
        }
        match self.c_tx {
            Some(ref tx) => {
                tx.send(envelope).await?;
                Ok(())
            }
            None => Err("not connected yet".into()),
        }
    }

    /// Fire-and-forget: packages the current audio chunk and the most recent
    /// frame into one realtime input. Responses are not correlated to sends;
    /// at most one round-trip is assumed in flight.
    pub async fn send_voice_message(
        &mut self,
        audio: Base64EncodedAudioBytes,
        image: Option<String>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let envelope = ClientEnvelope::realtime_input(RealtimeInput::voice(audio, image));
        self.send_envelope(envelope).await?;
        tracing::debug!("sent voice message");
        Ok(())
    }

    /// Closes the connection if open. Terminal: the client cannot be
    /// reconnected afterwards.
    pub async fn disconnect(&mut self) {
        self.c_tx.take();
        self.s_tx.take();
        if let Some(conn) = self.conn.take() {
            // The send task drains and emits a close frame on its own; the
            // recv task ends once the relay acknowledges or the socket dies.
            conn.recv_handle.abort();
            let _ = conn.send_handle.await;
        }
        self.state.set(ConnectionState::Closed);
    }
}

pub async fn connect_with_config(capacity: usize, config: Config) -> Result<Client, Box<dyn std::error::Error>> {
    let mut client = Client::new(capacity, config);
    client.connect().await?;
    Ok(client)
}

pub async fn connect() -> Result<Client, Box<dyn std::error::Error>> {
    let config = Config::new();
    connect_with_config(1024, config).await
}
