//! Live-reload client snippet injection.

/// Path of the reserved live-reload endpoint.
pub const LIVERELOAD_PATH: &str = "/livereload";

/// Client script: open an `EventSource` and reload on any message.
pub(crate) const LIVERELOAD_SCRIPT: &str =
    r#"<script>(() => new EventSource("/livereload").onmessage = () => location.reload())()</script>"#;

const BODY_CLOSE: &str = "</body>";

/// Insert the live-reload script before the first `</body>`.
///
/// Documents without a closing body tag get the script appended. A document
/// that already carries the script is returned unchanged.
pub(crate) fn inject_livereload(html: &str) -> String {
    if html.contains(LIVERELOAD_SCRIPT) {
        return html.to_owned();
    }

    let mut injected = String::with_capacity(html.len() + LIVERELOAD_SCRIPT.len());
    if let Some(index) = html.find(BODY_CLOSE) {
        injected.push_str(&html[..index]);
        injected.push_str(LIVERELOAD_SCRIPT);
        injected.push_str(&html[index..]);
    } else {
        injected.push_str(html);
        injected.push_str(LIVERELOAD_SCRIPT);
    }
    injected
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_script_targets_reserved_endpoint() {
        assert!(LIVERELOAD_SCRIPT.contains(&format!("EventSource(\"{LIVERELOAD_PATH}\")")));
    }

    #[test]
    fn test_inserted_before_body_close() {
        let html = "<html><body><h1>Hi</h1></body></html>";
        assert_eq!(
            inject_livereload(html),
            format!("<html><body><h1>Hi</h1>{LIVERELOAD_SCRIPT}</body></html>")
        );
    }

    #[test]
    fn test_only_first_body_close_is_used() {
        let html = "<body>a</body><body>b</body>";
        let injected = inject_livereload(html);
        assert_eq!(injected.matches(LIVERELOAD_SCRIPT).count(), 1);
        assert!(injected.starts_with(&format!("<body>a{LIVERELOAD_SCRIPT}</body>")));
    }

    #[test]
    fn test_appended_without_body_close() {
        let html = "<h1>fragment</h1>";
        assert_eq!(
            inject_livereload(html),
            format!("<h1>fragment</h1>{LIVERELOAD_SCRIPT}")
        );
    }

    #[test]
    fn test_injection_is_idempotent() {
        let once = inject_livereload("<body></body>");
        let twice = inject_livereload(&once);
        assert_eq!(once, twice);
        assert_eq!(twice.matches(LIVERELOAD_SCRIPT).count(), 1);
    }
}
