//! Error type for tag operations

use std::time::Duration;

use tagkit_core::KeyRole;

use crate::link::LinkError;

/// Result type for tag operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by tag-touching operations
///
/// A key that does not authenticate is normally not an error; probing simply
/// moves on to the next key. [`Error::AuthFailed`] is raised only where a
/// caller supplied the key and expected it to work.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The tag left the field or the link was closed
    #[error("Tag lost")]
    TagLost,

    /// A transient link failure
    #[error("I/O error: {0}")]
    Io(String),

    /// Connecting did not finish in time
    #[error("Connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// The operation was cancelled through a [`CancelToken`](crate::CancelToken)
    #[error("Operation cancelled")]
    Cancelled,

    /// Probing was started without candidate keys or a sector range
    #[error("Key map builder not initialized")]
    NotInitialized,

    /// Sector range outside the tag
    #[error("Invalid sector range {first}..={last} for a tag with {count} sectors")]
    InvalidRange {
        /// First sector
        first: usize,
        /// Last sector
        last: usize,
        /// Sectors on the tag
        count: usize,
    },

    /// A supplied key did not authenticate
    #[error("Authentication with key {role} failed for sector {sector}")]
    AuthFailed {
        /// Sector
        sector: usize,
        /// Role the key was tried as
        role: KeyRole,
    },

    /// Block 0 of sector 0 holds the UID and manufacturer data
    #[error("Refusing to write the manufacturer block")]
    ManufacturerBlock,

    /// Invalid tag data or geometry
    #[error(transparent)]
    Core(#[from] tagkit_core::Error),
}

impl Error {
    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    /// Whether the tag is gone and the current operation cannot continue
    pub const fn is_tag_lost(&self) -> bool {
        matches!(self, Self::TagLost)
    }

    /// Whether the error comes from the link rather than from the caller
    pub const fn is_link_error(&self) -> bool {
        matches!(self, Self::TagLost | Self::Io(_) | Self::ConnectTimeout(_))
    }
}

impl From<LinkError> for Error {
    fn from(error: LinkError) -> Self {
        match error {
            LinkError::TagLost => Self::TagLost,
            LinkError::Io(message) => Self::Io(message),
            LinkError::Timeout => Self::io("link operation timed out"),
        }
    }
}
