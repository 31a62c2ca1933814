//! Mail dispatch of generated documents.
//!
//! Jobs with an `email` section send each record's converted document to the
//! address in the recipient column. The orchestrator talks to a
//! [`MailTransport`]; [`SmtpMailer`] is the STARTTLS relay implementation.

mod body;
mod smtp;

use std::path::PathBuf;

use thiserror::Error;

pub use body::BodyTemplate;
pub use smtp::SmtpMailer;

/// Errors raised while building or sending a message.
#[derive(Error, Debug)]
pub enum MailError {
    #[error("Invalid address '{address}': {message}")]
    Address { address: String, message: String },

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("Failed to read attachment {path}: {source}")]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read body template {path}: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("SMTP error: {0}")]
    Transport(String),
}

impl MailError {
    pub fn address(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Address {
            address: address.into(),
            message: message.into(),
        }
    }

    pub fn build(message: impl Into<String>) -> Self {
        Self::Build(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }
}

/// Result type for mail operations.
pub type MailResult<T> = Result<T, MailError>;

/// File attached to an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailAttachment {
    /// Name shown to the recipient.
    pub filename: String,
    /// File on disk; read when the message is built.
    pub path: PathBuf,
}

/// One message, ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub attachment: Option<MailAttachment>,
}

/// Sends messages.
pub trait MailTransport: Send + Sync {
    fn send(&self, mail: &OutgoingMail) -> MailResult<()>;
}
