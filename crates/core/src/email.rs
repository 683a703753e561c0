use async_trait::async_trait;

use crate::error::ApiResult;

/// Trait for sending emails. Implement this to integrate with your
/// email service (SMTP, SendGrid, SES, etc.).
#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Send an email.
    ///
    /// - `to`: recipient email address
    /// - `subject`: email subject line
    /// - `html`: HTML body (may be empty)
    /// - `text`: plain-text body (may be empty)
    async fn send(&self, to: &str, subject: &str, html: &str, text: &str) -> ApiResult<()>;
}

/// Development email provider that writes messages to the log.
pub struct ConsoleEmailProvider;

#[async_trait]
impl EmailProvider for ConsoleEmailProvider {
    async fn send(&self, to: &str, subject: &str, _html: &str, text: &str) -> ApiResult<()> {
        tracing::info!(to, subject, body = text, "email");
        Ok(())
    }
}

/// Rendered team invitation message.
#[derive(Debug, Clone)]
pub struct InvitationEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

impl InvitationEmail {
    pub fn render(app_name: &str, team_name: &str, inviter_name: &str, link: &str) -> Self {
        let subject = format!("You've been invited to join {} on {}", team_name, app_name);
        let text = format!(
            "{} invited you to join the team \"{}\" on {}.\n\nAccept the invitation: {}\n",
            inviter_name, team_name, app_name, link
        );
        let html = format!(
            "<p>{} invited you to join the team <strong>{}</strong> on {}.</p>\
             <p><a href=\"{}\">Accept the invitation</a></p>",
            escape_html(inviter_name),
            escape_html(team_name),
            escape_html(app_name),
            link
        );
        Self {
            subject,
            html,
            text,
        }
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
