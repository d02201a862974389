//! End-to-end demo: microphone chunks (plus an optional screen frame) go to
//! the relay every three seconds, text answers are printed, audio answers
//! are played back.
//!
//! Env:
//!   SCREENLIVE_RELAY_URL   relay endpoint (default ws://localhost:9083/ws)
//!   SCREENLIVE_FRAME       path to a JPEG that stands in for the shared
//!                          screen; re-read on every tick

use tracing::Level;
use tracing_subscriber::fmt::time::ChronoLocal;

use screenlive::types::Setup;
use screenlive_utils::capture::{AudioCapture, FileFrameSource, FrameCache};
use screenlive_utils::playback::PlaybackSink;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv_override().ok();

    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    let config = screenlive::Config::builder()
        .with_setup(Setup::configure().with_modalities_enable_audio().build())
        .build();
    let mut client = screenlive::connect_with_config(1024, config).await?;
    let mut responses = client.server_messages()?;
    println!("connected, state: {:?}", client.state());

    let frames = std::env::var("SCREENLIVE_FRAME")
        .ok()
        .map(|path| FrameCache::start(FileFrameSource::new(path.into())));
    if frames.is_none() {
        println!("SCREENLIVE_FRAME not set, sending audio only");
    }

    let (chunk_tx, mut chunk_rx) = tokio::sync::mpsc::channel::<String>(16);
    let _capture = AudioCapture::start(None, move |chunk| {
        if chunk_tx.try_send(chunk).is_err() {
            eprintln!("dropping capture chunk, send queue full");
        }
    })?;

    let mut sink = PlaybackSink::new(None);

    loop {
        tokio::select! {
            chunk = chunk_rx.recv() => {
                let Some(chunk) = chunk else { break };
                let frame = frames.as_ref().and_then(|f| f.current_frame());
                if let Err(e) = client.send_voice_message(chunk, frame).await {
                    eprintln!("send failed: {}", e);
                    break;
                }
            }
            response = responses.recv() => {
                match response {
                    Ok(message) => {
                        if let Some(text) = &message.text {
                            println!(">> {}", text);
                        }
                        if let Some(audio) = &message.audio {
                            sink.play_chunk(audio)?;
                        }
                        if let Some(error) = &message.error {
                            eprintln!("relay error: {}", error);
                        }
                    }
                    Err(_) => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("shutting down");
                client.disconnect().await;
                break;
            }
        }
    }

    Ok(())
}
