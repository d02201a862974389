/// Audio data encoded as base64
pub type Base64EncodedAudioBytes = String;
