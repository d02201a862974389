//! Per-connection conversation state. A session exists from the setup
//! message until the socket closes; its history is replayed into every
//! upstream call and discarded on disconnect. Nothing survives reconnects.

use anyhow::Result;

use screenlive_types::{MediaChunk, MimeType, RealtimeInput, Setup};

use crate::upstream::{
    Content, GenerateContent, GenerateRequest, GenerationConfig, Part, MAX_OUTPUT_TOKENS,
};

pub struct LiveSession {
    system_instruction: String,
    history: Vec<Content>,
}

impl LiveSession {
    pub fn new(setup: &Setup) -> Self {
        Self {
            system_instruction: setup.system_instruction().to_string(),
            history: Vec::new(),
        }
    }

    pub fn turns(&self) -> usize {
        self.history.len()
    }

    /// Media chunks become inline parts in arrival order; the synthesized
    /// instruction goes last.
    fn build_request(&self, chunks: &[MediaChunk]) -> GenerateRequest {
        let mut parts: Vec<Part> = chunks
            .iter()
            .map(|chunk| Part::inline_data(chunk.mime_type.as_str(), &chunk.data))
            .collect();
        parts.push(Part::text(synthesize_prompt(chunks)));

        let mut contents = self.history.clone();
        contents.push(Content::user(parts));

        GenerateRequest {
            system_instruction: Some(Content::system(&self.system_instruction)),
            contents,
            generation_config: GenerationConfig {
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        }
    }

    /// Forwards one realtime input upstream. Empty input is a no-op; on
    /// success both turns are appended to the history.
    pub async fn handle_realtime_input(
        &mut self,
        upstream: &dyn GenerateContent,
        input: &RealtimeInput,
    ) -> Result<Option<String>> {
        if input.is_empty() {
            tracing::debug!("realtime input without media chunks, skipping");
            return Ok(None);
        }

        let request = self.build_request(&input.media_chunks);
        let user_turn = request
            .contents
            .last()
            .cloned()
            .unwrap_or_else(|| Content::user(Vec::new()));

        let response = upstream.generate(request).await?;
        let text = response.text();

        self.history.push(user_turn);
        if let Some(text) = &text {
            self.history.push(Content::model_text(text));
        }
        Ok(text)
    }
}

fn synthesize_prompt(chunks: &[MediaChunk]) -> String {
    let has_audio = chunks.iter().any(|c| c.mime_type == MimeType::Pcm);
    let has_image = chunks.iter().any(|c| c.mime_type == MimeType::Jpeg);

    let mut prompt = String::from("Please analyze ");
    if has_image && has_audio {
        prompt.push_str("the screen content and respond to the voice input.");
    } else if has_image {
        prompt.push_str("the screen content shown in the image.");
    } else {
        prompt.push_str("and respond to the voice input.");
    }
    prompt
}
