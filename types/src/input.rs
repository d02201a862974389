use crate::audio::Base64EncodedAudioBytes;

/// One capture tick worth of media. Created, sent, and discarded; there is
/// no retry buffer anywhere in the pipeline.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RealtimeInput {
    pub media_chunks: Vec<MediaChunk>,
}

impl RealtimeInput {
    pub fn new(media_chunks: Vec<MediaChunk>) -> Self {
        Self { media_chunks }
    }

    /// Mandatory audio chunk plus the most recent screen frame, if any.
    pub fn voice(audio: Base64EncodedAudioBytes, image: Option<String>) -> Self {
        let mut media_chunks = vec![MediaChunk::audio(audio)];
        if let Some(image) = image {
            media_chunks.push(MediaChunk::image(image));
        }
        Self { media_chunks }
    }

    pub fn is_empty(&self) -> bool {
        self.media_chunks.is_empty()
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MediaChunk {
    pub mime_type: MimeType,
    pub data: String,
}

impl MediaChunk {
    pub fn audio(data: impl Into<String>) -> Self {
        Self {
            mime_type: MimeType::Pcm,
            data: data.into(),
        }
    }

    pub fn image(data: impl Into<String>) -> Self {
        Self {
            mime_type: MimeType::Jpeg,
            data: data.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum MimeType {
    #[serde(rename = "audio/pcm")]
    Pcm,
    #[serde(rename = "image/jpeg")]
    Jpeg,
}

impl MimeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MimeType::Pcm => "audio/pcm",
            MimeType::Jpeg => "image/jpeg",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_without_frame_has_single_audio_chunk() {
        let input = RealtimeInput::voice("YQ==".to_string(), None);
        assert_eq!(input.media_chunks.len(), 1);
        assert_eq!(input.media_chunks[0].mime_type, MimeType::Pcm);
    }

    #[test]
    fn voice_with_frame_keeps_audio_first() {
        let input = RealtimeInput::voice("YQ==".to_string(), Some("Yg==".to_string()));
        assert_eq!(input.media_chunks.len(), 2);
        assert_eq!(input.media_chunks[0].mime_type, MimeType::Pcm);
        assert_eq!(input.media_chunks[1].mime_type, MimeType::Jpeg);
    }

    #[test]
    fn mime_types_use_wire_names() {
        assert_eq!(
            serde_json::to_string(&MimeType::Pcm).unwrap(),
            "\"audio/pcm\""
        );
        assert_eq!(
            serde_json::to_string(&MimeType::Jpeg).unwrap(),
            "\"image/jpeg\""
        );
    }
}
