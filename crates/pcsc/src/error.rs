//! Error types for the PC/SC link

use tagkit_probe::LinkError;

/// PC/SC-specific errors
#[derive(Debug, thiserror::Error)]
pub enum PcscError {
    /// PC/SC error
    #[error("PC/SC error: {0}")]
    Pcsc(#[from] pcsc::Error),

    /// No readers available
    #[error("No readers available")]
    NoReadersAvailable,

    /// Reader not found
    #[error("Reader not found: {0}")]
    ReaderNotFound(String),

    /// No card present in reader
    #[error("No card present in reader: {0}")]
    NoCard(String),

    /// The reader answered with an error status word
    #[error("Status word error: {0:#06X}")]
    StatusWord(u16),

    /// The reader's answer was too short
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl PcscError {
    /// Create a new status word error from individual bytes
    pub const fn status_word_bytes(sw1: u8, sw2: u8) -> Self {
        Self::StatusWord(((sw1 as u16) << 8) | (sw2 as u16))
    }

    /// Whether the error means the card is gone
    pub const fn is_card_gone(&self) -> bool {
        matches!(
            self,
            Self::NoCard(_)
                | Self::Pcsc(
                    pcsc::Error::RemovedCard
                        | pcsc::Error::NoSmartcard
                        | pcsc::Error::ResetCard
                        | pcsc::Error::UnpoweredCard
                )
        )
    }
}

impl From<PcscError> for LinkError {
    fn from(error: PcscError) -> Self {
        if error.is_card_gone() {
            return Self::TagLost;
        }
        match error {
            PcscError::Pcsc(pcsc::Error::Timeout) => Self::Timeout,
            other => Self::io(other.to_string()),
        }
    }
}
