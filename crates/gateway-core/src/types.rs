//! Closed domain enums shared by every gateway crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Abstract kind of AI work a caller asks the gateway to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Interactive conversational turn
    RealtimeChat,
    /// Multi-step reasoning
    Reasoning,
    /// Long-form creative text
    CreativeWriting,
    /// Still image generation
    ImageGeneration,
    /// Video synthesis
    VideoGeneration,
    /// Text-to-speech
    SpeechSynthesis,
    /// Source code generation
    CodeGeneration,
    /// Music generation
    MusicGeneration,
    /// Document or data analysis
    Analysis,
}

impl TaskType {
    /// Every task type, in declaration order
    pub const ALL: [Self; 9] = [
        Self::RealtimeChat,
        Self::Reasoning,
        Self::CreativeWriting,
        Self::ImageGeneration,
        Self::VideoGeneration,
        Self::SpeechSynthesis,
        Self::CodeGeneration,
        Self::MusicGeneration,
        Self::Analysis,
    ];

    /// Stable snake_case name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RealtimeChat => "realtime_chat",
            Self::Reasoning => "reasoning",
            Self::CreativeWriting => "creative_writing",
            Self::ImageGeneration => "image_generation",
            Self::VideoGeneration => "video_generation",
            Self::SpeechSynthesis => "speech_synthesis",
            Self::CodeGeneration => "code_generation",
            Self::MusicGeneration => "music_generation",
            Self::Analysis => "analysis",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a task name is not recognized
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown task type: {0}")]
pub struct UnknownTaskType(pub String);

impl FromStr for TaskType {
    type Err = UnknownTaskType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "realtime_chat" | "chat" => Ok(Self::RealtimeChat),
            "reasoning" | "complex_reasoning" => Ok(Self::Reasoning),
            "creative_writing" | "creative" | "writing" => Ok(Self::CreativeWriting),
            "image_generation" | "image" => Ok(Self::ImageGeneration),
            "video_generation" | "video" => Ok(Self::VideoGeneration),
            "speech_synthesis" | "speech" | "tts" => Ok(Self::SpeechSynthesis),
            "code_generation" | "code" => Ok(Self::CodeGeneration),
            "music_generation" | "music" => Ok(Self::MusicGeneration),
            "analysis" | "data_analysis" => Ok(Self::Analysis),
            _ => Err(UnknownTaskType(s.to_string())),
        }
    }
}

/// Kind of work a provider is able to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Plain text generation
    Text,
    /// Extended reasoning
    Reasoning,
    /// Image generation
    Image,
    /// Audio (speech, music)
    Audio,
    /// Video generation
    Video,
    /// Code generation
    Code,
    /// Vector embeddings
    Embeddings,
}

impl Capability {
    /// Stable snake_case name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Reasoning => "reasoning",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Code => "code",
            Self::Embeddings => "embeddings",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "reasoning" => Ok(Self::Reasoning),
            "image" => Ok(Self::Image),
            "audio" => Ok(Self::Audio),
            "video" => Ok(Self::Video),
            "code" => Ok(Self::Code),
            "embeddings" => Ok(Self::Embeddings),
            other => Err(format!("unknown capability: {other}")),
        }
    }
}

/// Caller subscription tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Free tier
    #[default]
    Free,
    /// Paid tier
    Pro,
    /// Enterprise tier
    Enterprise,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Free => f.write_str("free"),
            Self::Pro => f.write_str("pro"),
            Self::Enterprise => f.write_str("enterprise"),
        }
    }
}

/// Where the gateway is running, which decides whether secret-bearing
/// providers may be called directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionContext {
    /// Server-side process able to hold provider credentials
    #[default]
    Trusted,
    /// Client-visible process; credentials must stay behind a trusted proxy
    Untrusted,
}

/// Marker describing which tier produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerMarker {
    /// Synchronous result from a provider registered at this layer
    Layer(u8),
    /// Deferred to the batch queue; the result is a ticket
    Batch,
}

impl LayerMarker {
    /// Numeric layer, if this is a synchronous result
    #[must_use]
    pub fn layer(&self) -> Option<u8> {
        match self {
            Self::Layer(layer) => Some(*layer),
            Self::Batch => None,
        }
    }
}

impl Default for LayerMarker {
    fn default() -> Self {
        Self::Layer(0)
    }
}

impl fmt::Display for LayerMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Layer(layer) => write!(f, "L{layer}"),
            Self::Batch => f.write_str("batch"),
        }
    }
}
