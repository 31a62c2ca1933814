//! SMTP transport over STARTTLS.

use std::fs;

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::config::EmailSettings;

use super::{MailError, MailResult, MailTransport, OutgoingMail};

/// Sends through an authenticated STARTTLS relay.
///
/// lettre is built without its `pool` feature, so every `send` opens a new
/// session and closes it when the message is delivered or rejected.
pub struct SmtpMailer {
    transport: SmtpTransport,
}

impl SmtpMailer {
    pub fn new(settings: &EmailSettings) -> MailResult<Self> {
        let transport = SmtpTransport::starttls_relay(&settings.smtp_server)
            .map_err(|e| MailError::transport(e.to_string()))?
            .port(settings.smtp_port)
            .credentials(Credentials::new(
                settings.sender_email.clone(),
                settings.sender_password.clone(),
            ))
            .build();
        Ok(Self { transport })
    }
}

impl MailTransport for SmtpMailer {
    fn send(&self, mail: &OutgoingMail) -> MailResult<()> {
        let message = build_message(mail)?;
        tracing::debug!(to = %mail.to, subject = %mail.subject, "Sending mail");
        self.transport
            .send(&message)
            .map_err(|e| MailError::transport(e.to_string()))?;
        Ok(())
    }
}

fn mailbox(address: &str) -> MailResult<Mailbox> {
    address
        .parse::<Mailbox>()
        .map_err(|e| MailError::address(address, e.to_string()))
}

/// Multipart message: HTML body plus the optional PDF attachment.
pub(crate) fn build_message(mail: &OutgoingMail) -> MailResult<Message> {
    let builder = Message::builder()
        .from(mailbox(&mail.from)?)
        .to(mailbox(&mail.to)?)
        .subject(mail.subject.as_str());

    let mut parts = MultiPart::mixed().singlepart(SinglePart::html(mail.html_body.clone()));
    if let Some(attachment) = &mail.attachment {
        let bytes = fs::read(&attachment.path).map_err(|source| MailError::Attachment {
            path: attachment.path.clone(),
            source,
        })?;
        let content_type =
            ContentType::parse("application/pdf").map_err(|e| MailError::build(e.to_string()))?;
        parts = parts.singlepart(Attachment::new(attachment.filename.clone()).body(bytes, content_type));
    }

    builder
        .multipart(parts)
        .map_err(|e| MailError::build(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::MailAttachment;
    use tempfile::tempdir;

    fn mail(to: &str) -> OutgoingMail {
        OutgoingMail {
            from: "org@example.org".to_string(),
            to: to.to_string(),
            subject: "Invitation".to_string(),
            html_body: "<p>Hello</p>".to_string(),
            attachment: None,
        }
    }

    #[test]
    fn builds_message_with_attachment() {
        let dir = tempdir().unwrap();
        let pdf = dir.path().join("doc.pdf");
        fs::write(&pdf, b"%PDF-1.4\n").unwrap();

        let mut outgoing = mail("guest@example.org");
        outgoing.attachment = Some(MailAttachment {
            filename: "Invitation_Guest.pdf".to_string(),
            path: pdf,
        });

        let message = build_message(&outgoing).unwrap();
        let raw = String::from_utf8_lossy(&message.formatted()).to_string();
        assert!(raw.contains("To: guest@example.org"));
        assert!(raw.contains("Subject: Invitation"));
        assert!(raw.contains("application/pdf"));
        assert!(raw.contains("Invitation_Guest.pdf"));
    }

    #[test]
    fn each_send_opens_its_own_session() {
        // Reserve a port, then free it so nothing listens there.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let settings = EmailSettings {
            smtp_server: "127.0.0.1".to_string(),
            smtp_port: port,
            sender_email: "org@example.org".to_string(),
            sender_password: "secret".to_string(),
        };
        let mailer = SmtpMailer::new(&settings).unwrap();

        for _ in 0..2 {
            assert!(matches!(
                mailer.send(&mail("guest@example.org")),
                Err(MailError::Transport(_))
            ));
        }
    }

    #[test]
    fn rejects_bad_address() {
        assert!(matches!(
            build_message(&mail("not an address")),
            Err(MailError::Address { .. })
        ));
    }

    #[test]
    fn missing_attachment_is_reported() {
        let dir = tempdir().unwrap();
        let mut outgoing = mail("guest@example.org");
        outgoing.attachment = Some(MailAttachment {
            filename: "x.pdf".to_string(),
            path: dir.path().join("x.pdf"),
        });
        assert!(matches!(
            build_message(&outgoing),
            Err(MailError::Attachment { .. })
        ));
    }
}
