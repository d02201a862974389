/// Default agent behavior, used whenever the embedding application does not
/// supply its own system instruction.
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are a helpful assistant for screen sharing sessions. Your role is to: \
1) Analyze and describe the content being shared on screen \
2) Answer questions about the shared content \
3) Provide relevant information and context about what's being shown \
4) Assist with technical issues related to screen sharing \
5) Maintain a professional and helpful tone. Focus on being concise and clear in your responses.";

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Setup {
    /// What output forms the caller wants back from the model.
    pub generation_config: GenerationConfig,

    /// Free-text description of agent behavior. The relay falls back to
    /// [`DEFAULT_SYSTEM_INSTRUCTION`] when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct GenerationConfig {
    pub response_modalities: Vec<Modality>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Modality {
    #[serde(rename = "TEXT")]
    Text,
    #[serde(rename = "AUDIO")]
    Audio,
}

impl Default for Setup {
    fn default() -> Self {
        SetupConfigurator::new().build()
    }
}

impl Setup {
    pub fn configure() -> SetupConfigurator {
        SetupConfigurator::new()
    }

    pub fn system_instruction(&self) -> &str {
        self.system_instruction
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_INSTRUCTION)
    }

    pub fn wants_audio(&self) -> bool {
        self.generation_config
            .response_modalities
            .contains(&Modality::Audio)
    }
}

pub struct SetupConfigurator {
    setup: Setup,
}

impl SetupConfigurator {
    pub fn new() -> Self {
        Self {
            setup: Setup {
                generation_config: GenerationConfig {
                    response_modalities: vec![Modality::Text],
                },
                system_instruction: None,
            },
        }
    }

    pub fn with_modalities(mut self, modalities: Vec<Modality>) -> Self {
        self.setup.generation_config.response_modalities = modalities;
        self
    }

    pub fn with_modalities_enable_audio(mut self) -> Self {
        self.setup.generation_config.response_modalities = vec![Modality::Text, Modality::Audio];
        self
    }

    pub fn with_system_instruction(mut self, instruction: &str) -> Self {
        self.setup.system_instruction = Some(instruction.to_string());
        self
    }

    pub fn build(self) -> Setup {
        self.setup
    }
}

impl Default for SetupConfigurator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_setup_is_text_only_with_fallback_instruction() {
        let setup = Setup::default();
        assert_eq!(setup.generation_config.response_modalities, vec![Modality::Text]);
        assert!(!setup.wants_audio());
        assert_eq!(setup.system_instruction(), DEFAULT_SYSTEM_INSTRUCTION);
    }

    #[test]
    fn modalities_serialize_screaming() {
        let setup = Setup::configure().with_modalities_enable_audio().build();
        let json = serde_json::to_value(&setup).unwrap();
        assert_eq!(
            json["generation_config"]["response_modalities"],
            serde_json::json!(["TEXT", "AUDIO"])
        );
    }
}
