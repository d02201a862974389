pub mod audio;
pub mod setup;
mod input;
mod response;

pub use input::{MediaChunk, MimeType, RealtimeInput};
pub use response::ServerMessage;
pub use setup::{GenerationConfig, Modality, Setup};

/// The envelope every client → relay message travels in. Exactly one of the
/// two fields is expected to be populated; an envelope with neither is
/// rejected by the relay.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ClientEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setup: Option<Setup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realtime_input: Option<RealtimeInput>,
}

impl ClientEnvelope {
    pub fn setup(setup: Setup) -> Self {
        Self {
            setup: Some(setup),
            ..Self::default()
        }
    }

    pub fn realtime_input(input: RealtimeInput) -> Self {
        Self {
            realtime_input: Some(input),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_envelope_wire_shape() {
        let setup = Setup::configure()
            .with_modalities(vec![Modality::Text])
            .with_system_instruction("be terse")
            .build();
        let json = serde_json::to_value(ClientEnvelope::setup(setup)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "setup": {
                    "generation_config": { "response_modalities": ["TEXT"] },
                    "system_instruction": "be terse",
                }
            })
        );
    }

    #[test]
    fn realtime_input_envelope_wire_shape() {
        let input = RealtimeInput::new(vec![
            MediaChunk::audio("cGNt"),
            MediaChunk::image("anBn"),
        ]);
        let json = serde_json::to_value(ClientEnvelope::realtime_input(input)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "realtime_input": {
                    "media_chunks": [
                        { "mime_type": "audio/pcm", "data": "cGNt" },
                        { "mime_type": "image/jpeg", "data": "anBn" },
                    ]
                }
            })
        );
    }

    #[test]
    fn envelope_parses_with_unknown_fields() {
        let envelope: ClientEnvelope = serde_json::from_str(
            r#"{"setup": {"generation_config": {"response_modalities": ["AUDIO"]}}, "extra": 1}"#,
        )
        .unwrap();
        let setup = envelope.setup.unwrap();
        assert_eq!(setup.generation_config.response_modalities, vec![Modality::Audio]);
        assert!(setup.system_instruction.is_none());
        assert!(envelope.realtime_input.is_none());
    }
}
