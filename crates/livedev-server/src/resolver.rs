//! Static file resolution against the build output root.
//!
//! Every request re-reads the disk; nothing is cached, so a rebuild is
//! visible on the next request.

use std::path::{Component, Path, PathBuf};

use axum::http::StatusCode;
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};

use crate::live_reload::inject_livereload;

/// Default content type for unknown extensions.
const DEFAULT_MIME: &str = "text/plain";

/// Index file served for directory requests.
const INDEX_FILE: &str = "index.html";

/// Characters escaped in directory listing links.
const LINK_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'\'')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Outcome of resolving a request path.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Resolution {
    /// File contents, with the live-reload script already injected into HTML.
    File { content_type: String, body: Vec<u8> },
    /// Generated listing for a directory without an index file.
    Listing { body: String },
    /// Directory requested without its trailing slash.
    Redirect { status: StatusCode, location: String },
    /// Nothing on disk at this path.
    NotFound { request_path: String },
    /// Path existed but could not be read.
    ReadError { message: String },
}

/// Request data the resolver needs.
pub(crate) struct ResolveRequest<'a> {
    /// URI path as received (percent-encoded, no query string).
    pub path: &'a str,
    /// `Host` header, used to build absolute redirect locations.
    pub host: Option<&'a str>,
    /// Status code for trailing-slash redirects.
    pub redirect_status: StatusCode,
}

/// Resolve `request` against `root`.
pub(crate) async fn resolve(root: &Path, request: &ResolveRequest<'_>) -> Resolution {
    let Ok(decoded) = percent_decode_str(request.path).decode_utf8() else {
        return not_found(request.path);
    };
    let Some(relative) = sanitize(&decoded) else {
        tracing::warn!(path = %decoded, "Rejected path escaping the output root");
        return not_found(&decoded);
    };

    let fs_path = root.join(relative);
    let Ok(metadata) = tokio::fs::metadata(&fs_path).await else {
        return not_found(&decoded);
    };

    if !metadata.is_dir() {
        // A trailing slash names a directory; a file there does not match
        if request.path.ends_with('/') {
            return not_found(&decoded);
        }
        return read_file(&fs_path).await;
    }

    if !request.path.ends_with('/') {
        let location = format!(
            "http://{}{}/",
            request.host.unwrap_or("localhost"),
            request.path
        );
        tracing::debug!(%location, "Redirecting directory request");
        return Resolution::Redirect {
            status: request.redirect_status,
            location,
        };
    }

    let index = fs_path.join(INDEX_FILE);
    if tokio::fs::metadata(&index)
        .await
        .is_ok_and(|meta| meta.is_file())
    {
        return read_file(&index).await;
    }

    match directory_listing(&fs_path).await {
        Ok(body) => Resolution::Listing { body },
        Err(e) => Resolution::ReadError {
            message: e.to_string(),
        },
    }
}

/// Content type for a file, from its extension.
pub(crate) fn mime_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first()
        .map_or_else(|| DEFAULT_MIME.to_owned(), |mime| mime.essence_str().to_owned())
}

fn is_html(content_type: &str) -> bool {
    content_type == "text/html"
}

fn not_found(request_path: &str) -> Resolution {
    Resolution::NotFound {
        request_path: request_path.to_owned(),
    }
}

/// Turn a decoded URL path into a root-relative filesystem path.
///
/// Returns `None` for any parent, root or prefix component after the leading
/// slash, so the result can never leave the root.
fn sanitize(url_path: &str) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    for segment in url_path.split('/').filter(|s| !s.is_empty() && *s != ".") {
        for component in Path::new(segment).components() {
            match component {
                Component::Normal(part) => relative.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }
    }
    Some(relative)
}

async fn read_file(path: &Path) -> Resolution {
    let content_type = mime_for(path);
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read file");
            return Resolution::ReadError {
                message: e.to_string(),
            };
        }
    };

    let body = if is_html(&content_type) {
        inject_livereload(&String::from_utf8_lossy(&bytes)).into_bytes()
    } else {
        bytes
    };

    Resolution::File { content_type, body }
}

/// Render immediate children of `dir` as links, in enumeration order.
async fn directory_listing(dir: &Path) -> std::io::Result<String> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut items = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        items.push(format!(
            "<li><a href=\"{}\">{}</a></li>",
            utf8_percent_encode(&name, LINK_SEGMENT),
            escape_html(&name)
        ));
    }

    let listing = format!(
        "<h1>Directory listing</h1><ul style=\"font-size: 24px\">{}</ul>",
        items.join("\n")
    );
    Ok(inject_livereload(&listing))
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live_reload::LIVERELOAD_SCRIPT;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn request(path: &str) -> ResolveRequest<'_> {
        ResolveRequest {
            path,
            host: Some("localhost:3000"),
            redirect_status: StatusCode::MOVED_PERMANENTLY,
        }
    }

    fn file(resolution: Resolution) -> (String, Vec<u8>) {
        match resolution {
            Resolution::File { content_type, body } => (content_type, body),
            other => panic!("expected file, got {other:?}"),
        }
    }

    #[test]
    fn test_mime_for() {
        assert_eq!(mime_for(Path::new("a.txt")), "text/plain");
        assert_eq!(mime_for(Path::new("index.html")), "text/html");
        assert_eq!(mime_for(Path::new("style.css")), "text/css");
        assert_eq!(mime_for(Path::new("data.json")), "application/json");
        assert_eq!(mime_for(Path::new("logo.png")), "image/png");
        assert_eq!(mime_for(Path::new("icon.svg")), "image/svg+xml");
        assert_eq!(mime_for(Path::new("file.unknown_ext_xyz")), "text/plain");
        assert_eq!(mime_for(Path::new("LICENSE")), "text/plain");
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("/"), Some(PathBuf::new()));
        assert_eq!(sanitize("/a/b.txt"), Some(PathBuf::from("a/b.txt")));
        assert_eq!(sanitize("//a/./b/"), Some(PathBuf::from("a/b")));
        assert_eq!(sanitize("/../secret"), None);
        assert_eq!(sanitize("/a/../../secret"), None);
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a&b>\"'"), "&lt;a&amp;b&gt;&quot;&#39;");
    }

    #[tokio::test]
    async fn test_file_served_with_mime() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "hello").unwrap();
        fs::write(dir.path().join("app.js"), "run()").unwrap();
        fs::write(dir.path().join("blob.zzz"), "??").unwrap();

        assert_eq!(
            file(resolve(dir.path(), &request("/a.txt")).await),
            ("text/plain".to_owned(), b"hello".to_vec())
        );
        assert_eq!(
            file(resolve(dir.path(), &request("/app.js")).await).1,
            b"run()".to_vec()
        );
        assert_eq!(
            file(resolve(dir.path(), &request("/blob.zzz")).await).0,
            "text/plain"
        );
    }

    #[tokio::test]
    async fn test_html_gets_snippet_once() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("page.html"), "<body><p>x</p></body>").unwrap();

        for _ in 0..2 {
            let (content_type, body) = file(resolve(dir.path(), &request("/page.html")).await);
            let body = String::from_utf8(body).unwrap();
            assert_eq!(content_type, "text/html");
            assert_eq!(body.matches(LIVERELOAD_SCRIPT).count(), 1);
            assert!(body.ends_with("</body>"));
        }
    }

    #[tokio::test]
    async fn test_percent_encoded_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("my file.txt"), "spaced").unwrap();

        assert_eq!(
            file(resolve(dir.path(), &request("/my%20file.txt")).await).1,
            b"spaced".to_vec()
        );
    }

    #[tokio::test]
    async fn test_directory_without_slash_redirects() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();

        assert_eq!(
            resolve(dir.path(), &request("/docs")).await,
            Resolution::Redirect {
                status: StatusCode::MOVED_PERMANENTLY,
                location: "http://localhost:3000/docs/".to_owned(),
            }
        );
    }

    #[tokio::test]
    async fn test_redirect_status_and_missing_host() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        let request = ResolveRequest {
            path: "/docs",
            host: None,
            redirect_status: StatusCode::TEMPORARY_REDIRECT,
        };

        assert_eq!(
            resolve(dir.path(), &request).await,
            Resolution::Redirect {
                status: StatusCode::TEMPORARY_REDIRECT,
                location: "http://localhost/docs/".to_owned(),
            }
        );
    }

    #[tokio::test]
    async fn test_directory_with_slash_never_redirects() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();

        for path in ["/docs/", "/docs//"] {
            let resolution = resolve(dir.path(), &request(path)).await;
            assert!(
                matches!(resolution, Resolution::Listing { .. }),
                "{path}: {resolution:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_directory_index_served() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("app")).unwrap();
        fs::write(dir.path().join("app/index.html"), "<body>app</body>").unwrap();

        let (content_type, body) = file(resolve(dir.path(), &request("/app/")).await);
        let body = String::from_utf8(body).unwrap();

        assert_eq!(content_type, "text/html");
        assert_eq!(body, format!("<body>app{LIVERELOAD_SCRIPT}</body>"));
    }

    #[tokio::test]
    async fn test_directory_listing_links_each_child() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "").unwrap();
        fs::write(dir.path().join("b <c>.txt"), "").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/deep.txt"), "").unwrap();

        let Resolution::Listing { body } = resolve(dir.path(), &request("/")).await else {
            panic!("expected listing");
        };

        assert!(body.starts_with("<h1>Directory listing</h1>"));
        assert_eq!(body.matches("<li>").count(), 3);
        assert!(body.contains("<a href=\"a.txt\">a.txt</a>"));
        assert!(body.contains("<a href=\"b%20%3Cc%3E.txt\">b &lt;c&gt;.txt</a>"));
        assert!(body.contains("<a href=\"nested\">nested</a>"));
        assert!(!body.contains("deep.txt"));
        assert_eq!(body.matches(LIVERELOAD_SCRIPT).count(), 1);
    }

    #[tokio::test]
    async fn test_missing_path_not_found() {
        let dir = tempfile::tempdir().unwrap();

        assert_eq!(
            resolve(dir.path(), &request("/missing")).await,
            Resolution::NotFound {
                request_path: "/missing".to_owned()
            }
        );
    }

    #[tokio::test]
    async fn test_file_with_trailing_slash_not_found() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "hello").unwrap();

        assert_eq!(
            resolve(dir.path(), &request("/a.txt/")).await,
            Resolution::NotFound {
                request_path: "/a.txt/".to_owned()
            }
        );
    }

    #[tokio::test]
    async fn test_traversal_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("dist");
        fs::create_dir(&root).unwrap();
        fs::write(dir.path().join("secret.txt"), "top secret").unwrap();

        for path in ["/../secret.txt", "/%2E%2E/secret.txt"] {
            assert!(
                matches!(
                    resolve(&root, &request(path)).await,
                    Resolution::NotFound { .. }
                ),
                "{path} escaped the root"
            );
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_file_is_read_error() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locked.txt");
        fs::write(&path, "x").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o000)).unwrap();

        // Root ignores permission bits; nothing to observe in that case
        if fs::read(&path).is_ok() {
            return;
        }

        assert!(matches!(
            resolve(dir.path(), &request("/locked.txt")).await,
            Resolution::ReadError { .. }
        ));
    }
}
