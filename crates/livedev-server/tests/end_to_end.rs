//! Build a fixture project and serve its output through the router.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use livedev_build::{BuildError, BuildMode, BuildPipeline, BundleMetadata, BundleOptions, Bundler};
use livedev_server::{LiveReloadRegistry, ServerConfig, create_app};
use pretty_assertions::assert_eq;
use tower::ServiceExt;

/// Writes a single bundle without invoking esbuild.
struct StubBundler;

impl Bundler for StubBundler {
    fn bundle(&self, options: &BundleOptions) -> Result<BundleMetadata, BuildError> {
        let output = options.out_dir.join("entry.js");
        fs::write(&output, "document.body.append('hi')")
            .map_err(|e| BuildError::Compile(e.to_string()))?;
        Ok(BundleMetadata {
            inputs: vec!["src/entry.jsx".to_owned()],
            outputs: vec![output.display().to_string()],
        })
    }
}

fn build_fixture(root: &Path) -> ServerConfig {
    fs::create_dir_all(root.join("static")).unwrap();
    fs::create_dir_all(root.join("src")).unwrap();
    fs::write(root.join("static/a.txt"), "hello").unwrap();
    fs::write(
        root.join("static/index.html"),
        "<html><body><script src=\"/entry.js\"></script></body></html>",
    )
    .unwrap();
    fs::write(root.join("src/entry.jsx"), "render(<App />)").unwrap();

    let options = BundleOptions {
        entry: root.join("src/entry.jsx"),
        out_dir: root.join("dist"),
        bundle: true,
        entry_names: "[name]".to_owned(),
        jsx_factory: "h".to_owned(),
        jsx_fragment: "Fragment".to_owned(),
        loaders: BTreeMap::from([(".svg".to_owned(), "dataurl".to_owned())]),
        define: BTreeMap::new(),
        metafile: root.join(".livedev/metafile.json"),
    };
    let pipeline = BuildPipeline::new(
        root.join("static"),
        options,
        BuildMode::Development,
        Box::new(StubBundler),
    );
    let report = pipeline.build().unwrap();
    assert_eq!(report.copy.files, 2);
    assert_eq!(report.compile.modules, 1);

    ServerConfig {
        out_dir: root.join("dist"),
        static_dir: root.join("static"),
        source_dir: root.join("src"),
        ..ServerConfig::default()
    }
}

async fn get(app: Router, path: &str) -> (StatusCode, String, String) {
    let request = Request::builder()
        .uri(path)
        .header(header::HOST, "localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .to_owned();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, content_type, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_built_output_is_served() {
    let dir = tempfile::tempdir().unwrap();
    let config = build_fixture(dir.path());
    let app = create_app(&config, Arc::new(LiveReloadRegistry::new())).unwrap();

    let (status, content_type, body) = get(app.clone(), "/a.txt").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type, "text/plain");
    assert_eq!(body, "hello");

    let (status, content_type, body) = get(app.clone(), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type, "text/html");
    assert!(body.contains("new EventSource(\"/livereload\")"));
    assert!(body.ends_with("</script></body></html>"));

    let (status, content_type, body) = get(app.clone(), "/entry.js").await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.ends_with("javascript"), "{content_type}");
    assert_eq!(body, "document.body.append('hi')");

    let (status, content_type, body) = get(app, "/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(content_type, "text/plain");
    assert!(body.contains("/missing"));
}

#[tokio::test]
async fn test_rebuild_is_visible_without_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = build_fixture(dir.path());
    let app = create_app(&config, Arc::new(LiveReloadRegistry::new())).unwrap();

    fs::write(dir.path().join("dist/a.txt"), "changed").unwrap();

    let (_, _, body) = get(app, "/a.txt").await;
    assert_eq!(body, "changed");
}
