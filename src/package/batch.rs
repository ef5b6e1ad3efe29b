use crate::core::{EsmError, EsmResult, ProjectManifest};
use crate::package::converter::{ConversionOutput, PackageConverter};
use crate::package::request::PackageRequest;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

/// Outcome of one package in a batch
#[derive(Debug)]
pub struct BatchResult {
    pub request: PackageRequest,
    pub outcome: EsmResult<ConversionOutput>,
}

/// Requests for every package recorded in the project's esmbox.json, in order
pub fn manifest_requests(project_root: &Path) -> EsmResult<Vec<PackageRequest>> {
    let manifest = ProjectManifest::load(project_root)?.ok_or_else(|| {
        EsmError::Config(format!(
            "No {} in {}",
            crate::core::path::MANIFEST_FILE,
            project_root.display()
        ))
    })?;

    Ok(manifest
        .packages
        .into_iter()
        .map(|(name, version)| PackageRequest::new(name, version))
        .collect())
}

/// Convert packages one at a time; a failure never stops the rest
pub async fn convert_all(
    converter: &PackageConverter,
    requests: Vec<PackageRequest>,
) -> Vec<BatchResult> {
    let pb = ProgressBar::new(requests.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} packages {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let mut results = Vec::with_capacity(requests.len());
    for request in requests {
        pb.set_message(request.to_string());
        let outcome = converter.convert(&request).await;

        match &outcome {
            Ok(output) => pb.println(format!("  ✓ {}@{}", output.name, output.version)),
            Err(e) => pb.println(format!("  ✗ {}: {}", request, e)),
        }
        pb.inc(1);

        results.push(BatchResult { request, outcome });
    }
    pb.finish_with_message("done");

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_manifest_requests_in_lexical_order() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("esmbox.json"),
            r#"{"packages": {"react": "18.2.0", "@babel/core": "7.0.0", "left-pad": "1.3.0"}}"#,
        )
        .unwrap();

        let requests = manifest_requests(temp.path()).unwrap();
        let names: Vec<&str> = requests.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["@babel/core", "left-pad", "react"]);
        assert_eq!(requests[1].version, "1.3.0");
    }

    #[test]
    fn test_manifest_requests_without_manifest() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            manifest_requests(temp.path()),
            Err(EsmError::Config(_))
        ));
    }
}
