//! Notification content and its plain-text and HTML renderings

use chrono::DateTime;
use courier_common::{Manifest, format_size};
use strum::{AsRefStr, Display};

use crate::db::TransferRecord;

/// The three notifications a transfer can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
    /// To the recipient at ingestion: files are waiting
    RecipientReceived,
    /// To the sender at ingestion: upload confirmed
    SenderConfirmed,
    /// To the sender on first download
    SenderDownloaded,
}

/// What a notification needs to know about a transfer
#[derive(Debug, Clone)]
pub struct TransferSummary {
    pub transfer_id: String,
    pub artifact_name: String,
    pub manifest: Manifest,
    pub total_size: u64,
    pub download_link: String,
    pub sender_email: String,
    pub recipient_email: String,
    pub expires_at: i64,
    pub downloaded_at: Option<i64>,
}

impl TransferSummary {
    pub fn from_record(record: &TransferRecord, download_link: String) -> Self {
        Self {
            transfer_id: record.id.clone(),
            artifact_name: record.artifact_name.clone(),
            manifest: record.manifest.clone(),
            total_size: record.total_size,
            download_link,
            sender_email: record.sender_email.clone(),
            recipient_email: record.recipient_email.clone(),
            expires_at: record.expires_at,
            downloaded_at: record.downloaded_at,
        }
    }
}

/// A rendered message ready for a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub kind: NotificationKind,
    pub transfer_id: String,
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Format-independent body of a notification
#[derive(Debug, Clone)]
pub struct MessageContent {
    pub kind: NotificationKind,
    pub to: String,
    pub subject: String,
    pub intro: String,
    /// `(path, human-readable size)` per manifest entry
    pub entries: Vec<(String, String)>,
    pub total: String,
    pub link: Option<String>,
    pub footer: String,
}

impl MessageContent {
    /// Build the content of `kind` for a transfer
    pub fn build(kind: NotificationKind, summary: &TransferSummary) -> Self {
        let expires = format_timestamp(summary.expires_at);
        let count = summary.manifest.len();
        let files = if count == 1 { "file" } else { "files" };

        let (to, subject, intro, link, footer) = match kind {
            NotificationKind::RecipientReceived => (
                summary.recipient_email.clone(),
                format!("{} sent you {count} {files}", summary.sender_email),
                format!(
                    "{} has sent you {count} {files} ({}) through Courier.",
                    summary.sender_email, summary.artifact_name
                ),
                Some(summary.download_link.clone()),
                format!("The download link expires on {expires}."),
            ),
            NotificationKind::SenderConfirmed => (
                summary.sender_email.clone(),
                format!("Your files were sent to {}", summary.recipient_email),
                format!(
                    "Your upload of {count} {files} ({}) to {} is complete.",
                    summary.artifact_name, summary.recipient_email
                ),
                Some(summary.download_link.clone()),
                format!(
                    "You will be notified when the files are downloaded. The link expires on {expires}."
                ),
            ),
            NotificationKind::SenderDownloaded => {
                let when = summary
                    .downloaded_at
                    .map_or_else(|| "just now".to_string(), format_timestamp);
                (
                    summary.sender_email.clone(),
                    format!("{} downloaded your files", summary.recipient_email),
                    format!(
                        "{} downloaded {} on {when}.",
                        summary.recipient_email, summary.artifact_name
                    ),
                    None,
                    format!("The files remain available until {expires}."),
                )
            }
        };

        let entries = summary
            .manifest
            .iter()
            .map(|entry| (entry.path.clone(), format_size(entry.size)))
            .collect();

        Self {
            kind,
            to,
            subject,
            intro,
            entries,
            total: format_size(summary.total_size),
            link,
            footer,
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str("Hello,\n\n");
        out.push_str(&self.intro);
        out.push_str("\n\n");

        for (path, size) in &self.entries {
            out.push_str(&format!("  - {path} ({size})\n"));
        }
        out.push_str(&format!("Total: {}\n\n", self.total));

        if let Some(link) = &self.link {
            out.push_str(&format!("Download: {link}\n\n"));
        }

        out.push_str(&self.footer);
        out.push_str("\n\n-- \nCourier\n");
        out
    }

    pub fn render_html(&self) -> String {
        let mut out = String::new();
        out.push_str("<!DOCTYPE html>\n<html><body>\n<p>Hello,</p>\n");
        out.push_str(&format!("<p>{}</p>\n<ul>\n", escape_html(&self.intro)));

        for (path, size) in &self.entries {
            out.push_str(&format!(
                "<li>{} ({})</li>\n",
                escape_html(path),
                escape_html(size)
            ));
        }
        out.push_str(&format!(
            "</ul>\n<p><strong>Total:</strong> {}</p>\n",
            escape_html(&self.total)
        ));

        if let Some(link) = &self.link {
            let link = escape_html(link);
            out.push_str(&format!("<p><a href=\"{link}\">{link}</a></p>\n"));
        }

        out.push_str(&format!("<p>{}</p>\n", escape_html(&self.footer)));
        out.push_str("<p>Courier</p>\n</body></html>\n");
        out
    }

    pub fn into_message(self, transfer_id: &str) -> OutgoingMessage {
        OutgoingMessage {
            text: self.render_text(),
            html: self.render_html(),
            kind: self.kind,
            transfer_id: transfer_id.to_string(),
            to: self.to,
            subject: self.subject,
        }
    }
}

/// Unix seconds as `YYYY-MM-DD HH:MM UTC`
pub fn format_timestamp(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| secs.to_string())
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
