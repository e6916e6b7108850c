use crate::models::PostType;

/// Text and HTML bodies for a post notification.
pub struct RenderedBody {
    pub text: String,
    pub html: String,
}

fn heading(post_type: PostType) -> &'static str {
    match post_type {
        PostType::Manual => "New post in",
        PostType::Auto => "Important update in",
    }
}

pub fn render_post_notification(
    post_type: PostType,
    event_title: &str,
    message: &str,
    event_url: &str,
) -> RenderedBody {
    let text = format!(
        "{message}\n\nTo see event details, attendance or change your response: {event_url}\n"
    );

    let html = format!(
        concat!(
            "<!DOCTYPE html><html><body style=\"font-family:sans-serif;background:#ffffff;padding:16px\">",
            "<p style=\"color:#4b5563;font-weight:600;margin:0\">{heading}</p>",
            "<h1 style=\"margin:0 0 16px 0\">{title}</h1>",
            "<div style=\"padding:24px;background:#e5e7eb;border-radius:8px\"><p>{message}</p></div>",
            "<p style=\"color:#4b5563;font-weight:600\">To see event details, attendance or change your response:</p>",
            "<a href=\"{url}\" style=\"display:block;padding:16px;background:#facc15;border-radius:12px;",
            "color:#000000;text-align:center;font-weight:600;text-decoration:none\">Go to event page</a>",
            "</body></html>"
        ),
        heading = heading(post_type),
        title = escape_html(event_title),
        message = escape_html(message).replace('\n', "<br>"),
        url = escape_html(event_url),
    );

    RenderedBody { text, html }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_body_is_raw_message_with_link() {
        let body = render_post_notification(
            PostType::Manual,
            "Party",
            "Bring <snacks>",
            "https://upfesto.com/event/1",
        );
        assert!(body.text.starts_with("Bring <snacks>\n"));
        assert!(body.text.contains("https://upfesto.com/event/1"));
    }

    #[test]
    fn test_html_body_escapes_user_content() {
        let body = render_post_notification(
            PostType::Auto,
            "Tom & Jerry",
            "<script>alert(1)</script>",
            "https://upfesto.com/event/1",
        );
        assert!(body.html.contains("Important update in"));
        assert!(body.html.contains("Tom &amp; Jerry"));
        assert!(!body.html.contains("<script>"));
    }
}
