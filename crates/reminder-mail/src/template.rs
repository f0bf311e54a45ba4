//! The reminder email.

use reminder_entity::job::ReminderPayload;

use crate::message::MailMessage;

/// Render the reminder for `payload`.
///
/// Subject and text body are fixed phrasings around the event name and lead
/// time; the HTML alternative wraps the same text in a styled card.
pub fn render_reminder(payload: &ReminderPayload) -> MailMessage {
    let subject = format!("Reminder: {} is coming up!", payload.event_name);
    let text = format!(
        "Your event \"{}\" is starting in {} minutes.",
        payload.event_name, payload.lead_minutes
    );
    let html = render_html(&subject, &text);

    MailMessage::text(&payload.recipient_email, subject, text).with_html(html)
}

fn render_html(subject: &str, text: &str) -> String {
    format!(
        r#"<div style="font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; color: #333; max-width: 600px; margin: auto; padding: 20px; border-radius: 8px; border: 1px solid #e0e0e0;">
  <h2 style="color: #007BFF;">&#128197; Event Reminder</h2>
  <p style="font-size: 16px;">Hi there,</p>
  <p style="font-size: 16px;">This is a friendly reminder about your upcoming event:</p>
  <blockquote style="margin: 20px 0; padding: 15px; background-color: #f9f9f9; border-left: 5px solid #007BFF;">
    <strong>{subject}</strong><br/>
    {text}
  </blockquote>
  <p style="font-size: 16px;">Make sure you're ready.</p>
  <hr style="margin: 30px 0; border: none; border-top: 1px solid #ccc;" />
  <footer style="font-size: 12px; color: #999;">Sent from handle-me.</footer>
</div>"#,
        subject = escape_html(subject),
        text = escape_html(text),
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
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
