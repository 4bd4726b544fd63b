use thiserror::Error;

/// Central error catalogue for the Hearth core.
///
/// Every variant carries a stable operator-facing code so the UI and the
/// event log can reference failures without parsing display strings.
#[derive(Debug, Error)]
pub enum HearthError {
    #[error("Secret sealing failed")]
    Crypto,
    #[error("Master key file could not be accessed: {0}")]
    KeyFileIo(String),
    #[error("Master key file holds {0} bytes, expected 32")]
    KeyFileInvalid(usize),
    #[error("Unknown AI provider: {0}")]
    UnknownProvider(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(&'static str),
    #[error("{provider} is unreachable: {detail}")]
    ProviderUnreachable { provider: String, detail: String },
    #[error("{provider} failed to generate a response: {detail}")]
    ProviderError { provider: String, detail: String },
}

impl HearthError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Crypto => "SEC-1001",
            Self::KeyFileIo(_) => "CFG-1001",
            Self::KeyFileInvalid(_) => "CFG-1002",
            Self::UnknownProvider(_) => "AI-1001",
            Self::InvalidRequest(_) => "AI-1002",
            Self::ProviderUnreachable { .. } => "AI-1101",
            Self::ProviderError { .. } => "AI-1102",
        }
    }

    pub fn explain(&self) -> &'static str {
        match self {
            Self::Crypto => "The encryption engine rejected the value before it was stored.",
            Self::KeyFileIo(_) => "The master key file could not be created or read.",
            Self::KeyFileInvalid(_) => {
                "The master key file exists but does not contain a valid 32-byte key."
            }
            Self::UnknownProvider(_) => "No registered AI provider matches the requested ID.",
            Self::InvalidRequest(_) => "The completion request was rejected before any provider was contacted.",
            Self::ProviderUnreachable { .. } => {
                "The provider endpoint did not answer the model listing request."
            }
            Self::ProviderError { .. } => {
                "The provider answered but the completion could not be produced."
            }
        }
    }
}
