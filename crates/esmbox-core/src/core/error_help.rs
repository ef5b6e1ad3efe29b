use crate::core::EsmError;

/// Provides helpful suggestions for common errors
pub trait ErrorHelp {
    fn help(&self) -> Option<String>;
}

impl ErrorHelp for EsmError {
    fn help(&self) -> Option<String> {
        match self {
            EsmError::PackageNotFound(_) => Some(
                "💡 Suggestion: Check the package name spelling, or verify the package exists on the registry"
                    .to_string(),
            ),
            EsmError::VersionNotFound { name, .. } => Some(format!(
                "💡 Suggestion: Use 'latest' or pick a published version (see 'npm view {} versions')",
                name
            )),
            EsmError::RegistryUnreachable(_) | EsmError::DownloadFailed(_) => Some(
                "💡 Suggestion: Check your internet connection, or set ESMBOX_REGISTRY / registry_url to a reachable registry"
                    .to_string(),
            ),
            EsmError::MalformedDocument { .. } => Some(
                "💡 Suggestion: The registry answered with something other than a package document. Check that ESMBOX_REGISTRY / registry_url points at an npm-compatible registry"
                    .to_string(),
            ),
            EsmError::IntegrityMismatch { .. } => Some(
                "💡 Suggestion: The archive did not match the registry checksum. Retry, or check for a proxy rewriting downloads"
                    .to_string(),
            ),
            EsmError::EntryNotFound(_) => Some(
                "💡 Suggestion: The package ships no JavaScript entry point. Drop --strict-entry to copy its assets only"
                    .to_string(),
            ),
            EsmError::BundleFailed(msg) => {
                if msg.contains("TypeScript") || msg.contains("esbuild") {
                    Some(
                        "💡 Suggestion: Install esbuild (npm i -g esbuild) or set esbuild_path in config.yaml"
                            .to_string(),
                    )
                } else if msg.contains("Could not resolve") {
                    Some(
                        "💡 Suggestion: The package imports another package. Only self-contained packages can be bundled"
                            .to_string(),
                    )
                } else {
                    None
                }
            }
            EsmError::BatchFailed { .. } => Some(
                "💡 Suggestion: Fix the failures listed above and run 'esmbox install' again; converted packages are kept"
                    .to_string(),
            ),
            EsmError::ServerBindFailed { .. } => Some(
                "💡 Suggestion: Try a different --host, or a --port above 1024".to_string(),
            ),
            EsmError::Path(msg) => {
                if msg.contains("Could not determine") {
                    Some(
                        "💡 Suggestion: Check your system environment variables (HOME, APPDATA, etc.)"
                            .to_string(),
                    )
                } else {
                    None
                }
            }
            EsmError::Yaml(e) => Some(format!(
                "💡 Suggestion: Check the YAML syntax of your esmbox config.yaml\n\nError details: {}",
                e
            )),
            EsmError::Json(_) => Some(
                "💡 Suggestion: Check that esmbox.json is valid JSON with a \"packages\" object"
                    .to_string(),
            ),
            EsmError::Http(e) => {
                if e.is_timeout() || e.is_connect() {
                    Some(
                        "💡 Suggestion: Check your internet connection and firewall settings"
                            .to_string(),
                    )
                } else {
                    None
                }
            }
            EsmError::Io(e) => {
                if e.kind() == std::io::ErrorKind::PermissionDenied {
                    Some(
                        "💡 Suggestion: Check file permissions, or try running with appropriate permissions"
                            .to_string(),
                    )
                } else if e.kind() == std::io::ErrorKind::NotFound {
                    Some(
                        "💡 Suggestion: The file or directory may not exist. Check the path and try again"
                            .to_string(),
                    )
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

/// Format an error with helpful suggestions
pub fn format_error_with_help(error: &EsmError) -> String {
    let mut output = match error.stage() {
        Some(stage) => format!("❌ Error ({}): {}", stage, error),
        None => format!("❌ Error: {}", error),
    };

    if let Some(help) = error.help() {
        output.push_str("\n\n");
        output.push_str(&help);
    }

    output
}
