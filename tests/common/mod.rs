//! Shared fixtures: an in-process fake npm registry and tarball builder

#![allow(dead_code)]

use axum::extract::{Path as UrlPath, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha512};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

pub const LEFT_PAD: &str = r#"module.exports = leftPad;

var cache = ['', ' ', '  ', '   '];

function leftPad(str, len, ch) {
  str = str + '';
  len = len - str.length;
  if (len <= 0) return str;
  if (!ch && ch !== 0) ch = ' ';
  ch = ch + '';
  if (ch === ' ' && len < 4) return cache[len] + str;
  var pad = '';
  while (true) {
    if (len & 1) pad += ch;
    len >>= 1;
    if (len) ch += ch;
    else break;
  }
  return pad + str;
}
"#;

/// Build a gzip'd tar with every path under `wrapper/`
pub fn tarball(wrapper: &str, files: &[(&str, &str)]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        builder
            .append_data(&mut header, format!("{}/{}", wrapper, path), content.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

pub fn sha512_integrity(bytes: &[u8]) -> String {
    format!("sha512-{}", BASE64.encode(Sha512::digest(bytes)))
}

/// One published version in the fake registry
pub struct FakeVersion {
    pub version: String,
    pub files: Vec<(String, String)>,
}

impl FakeVersion {
    pub fn new(version: &str, files: &[(&str, &str)]) -> Self {
        Self {
            version: version.to_string(),
            files: files
                .iter()
                .map(|(p, c)| (p.to_string(), c.to_string()))
                .collect(),
        }
    }
}

#[derive(Default)]
struct Registry {
    documents: HashMap<String, String>,
    tarballs: HashMap<String, Vec<u8>>,
}

/// Serve packages at `GET /{name}` and tarballs at `GET /-/{file}`
///
/// `latest` becomes the `latest` dist-tag. Returns the base URL.
pub async fn fake_registry(packages: Vec<(&str, &str, Vec<FakeVersion>)>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let base = format!("http://{}", addr);

    let mut registry = Registry::default();
    for (name, latest, versions) in packages {
        let mut version_map = serde_json::Map::new();
        for v in versions {
            let files: Vec<(&str, &str)> = v
                .files
                .iter()
                .map(|(p, c)| (p.as_str(), c.as_str()))
                .collect();
            let bytes = tarball("package", &files);
            let file = format!("{}-{}.tgz", name.replace('/', "-"), v.version);
            version_map.insert(
                v.version.clone(),
                serde_json::json!({
                    "name": name,
                    "version": v.version,
                    "dist": {
                        "tarball": format!("{}/-/{}", base, file),
                        "integrity": sha512_integrity(&bytes),
                    }
                }),
            );
            registry.tarballs.insert(file, bytes);
        }
        let document = serde_json::json!({
            "name": name,
            "dist-tags": {"latest": latest},
            "versions": version_map,
        });
        registry
            .documents
            .insert(name.to_string(), document.to_string());
    }

    let app = Router::new()
        .route("/{*path}", get(registry_handler))
        .with_state(Arc::new(registry));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    base
}

async fn registry_handler(
    State(registry): State<Arc<Registry>>,
    UrlPath(path): UrlPath<String>,
) -> Response {
    if let Some(file) = path.strip_prefix("-/") {
        return match registry.tarballs.get(file) {
            Some(bytes) => bytes.clone().into_response(),
            None => StatusCode::NOT_FOUND.into_response(),
        };
    }

    let name = urlencoding::decode(&path)
        .map(|n| n.into_owned())
        .unwrap_or(path);
    match registry.documents.get(&name) {
        Some(doc) => ([(header::CONTENT_TYPE, "application/json")], doc.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, "{\"error\":\"Not found\"}").into_response(),
    }
}

pub fn left_pad_versions() -> Vec<FakeVersion> {
    let descriptor = r#"{"name": "left-pad", "version": "1.3.0", "main": "index.js"}"#;
    vec![
        FakeVersion::new(
            "1.1.0",
            &[("package.json", r#"{"name": "left-pad", "main": "index.js"}"#), ("index.js", LEFT_PAD)],
        ),
        FakeVersion::new("1.3.0", &[("package.json", descriptor), ("index.js", LEFT_PAD)]),
    ]
}
