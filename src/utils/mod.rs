//! Utility functions.

/// Escape HTML special characters for Telegram's HTML parse mode.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("VIP <Clients> & Co"), "VIP &lt;Clients&gt; &amp; Co");
        assert_eq!(html_escape("&lt;"), "&amp;lt;");
        assert_eq!(html_escape("plain"), "plain");
    }
}
