use esmbox_core::core::path::BUNDLE_FILE;
use esmbox_core::EsmResult;
use std::fs;
use std::path::Path;

/// Escape text for embedding in HTML element content or attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

/// Immediate subdirectories of the served root, sorted
///
/// `@scope` directories are expanded one level so scoped packages show up
/// as `@scope/name@version`.
pub fn list_packages(root: &Path) -> EsmResult<Vec<String>> {
    let mut packages = Vec::new();

    for name in sorted_subdirs(root)? {
        if name.starts_with('@') {
            for inner in sorted_subdirs(&root.join(&name))? {
                packages.push(format!("{}/{}", name, inner));
            }
        } else {
            packages.push(name);
        }
    }

    Ok(packages)
}

fn sorted_subdirs(dir: &Path) -> EsmResult<Vec<String>> {
    let mut names: Vec<String> = fs::read_dir(dir)?
        .flatten()
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        // In-progress builds are dot directories
        .filter(|name| !name.starts_with('.'))
        .collect();
    names.sort();
    Ok(names)
}

/// Discovery page listing every package with an import snippet
pub fn render_index(packages: &[String]) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>esmbox packages</title>\n</head>\n<body>\n<h1>Available packages</h1>\n",
    );

    if packages.is_empty() {
        html.push_str("<p>No packages yet. Run <code>esmbox add &lt;package&gt;</code>.</p>\n");
    } else {
        html.push_str("<ul>\n");
        for dir in packages {
            let snippet = format!("import pkg from \"/{}/{}\";", dir, BUNDLE_FILE);
            html.push_str(&format!(
                "<li><strong>{}</strong><pre><code>{}</code></pre></li>\n",
                escape_html(dir),
                escape_html(&snippet)
            ));
        }
        html.push_str("</ul>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}
