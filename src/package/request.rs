use crate::core::{EsmError, EsmResult};
use std::fmt;

/// A package name plus version selector, as typed by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRequest {
    pub name: String,
    /// Concrete version or dist-tag; `latest` when omitted
    pub version: String,
}

impl PackageRequest {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Parse `name`, `name@version`, `@scope/name` or `@scope/name@version`
    pub fn parse(spec: &str) -> EsmResult<Self> {
        let spec = spec.trim();
        let (scope_prefix, rest) = match spec.strip_prefix('@') {
            Some(rest) => ("@", rest),
            None => ("", spec),
        };

        let (name, version) = match rest.split_once('@') {
            Some((name, version)) => (format!("{}{}", scope_prefix, name), version.to_string()),
            None => (format!("{}{}", scope_prefix, rest), "latest".to_string()),
        };

        validate_name(&name)?;
        if version.is_empty() {
            return Err(EsmError::Config(format!(
                "Empty version in package spec '{}'",
                spec
            )));
        }

        Ok(Self { name, version })
    }

    /// Apply an explicit `--version`, which wins over one given inline
    pub fn with_version(mut self, version: Option<String>) -> Self {
        if let Some(v) = version {
            self.version = v;
        }
        self
    }
}

impl fmt::Display for PackageRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

fn validate_name(name: &str) -> EsmResult<()> {
    let invalid = |reason: &str| {
        Err(EsmError::Config(format!(
            "Invalid package name '{}': {}",
            name, reason
        )))
    };

    if name.is_empty() || name == "@" {
        return invalid("name is empty");
    }
    if name.contains("..") || name.contains('\\') {
        return invalid("name may not contain '..' or '\\'");
    }

    match name.strip_prefix('@') {
        Some(scoped) => match scoped.split_once('/') {
            Some((scope, pkg)) if !scope.is_empty() && !pkg.is_empty() && !pkg.contains('/') => {
                Ok(())
            }
            _ => invalid("scoped names look like @scope/name"),
        },
        None if name.contains('/') => invalid("unscoped names may not contain '/'"),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_and_versioned() {
        assert_eq!(
            PackageRequest::parse("left-pad").unwrap(),
            PackageRequest::new("left-pad", "latest")
        );
        assert_eq!(
            PackageRequest::parse("left-pad@1.3.0").unwrap(),
            PackageRequest::new("left-pad", "1.3.0")
        );
    }

    #[test]
    fn test_parse_scoped() {
        assert_eq!(
            PackageRequest::parse("@babel/core").unwrap(),
            PackageRequest::new("@babel/core", "latest")
        );
        assert_eq!(
            PackageRequest::parse("@babel/core@7.0.0").unwrap(),
            PackageRequest::new("@babel/core", "7.0.0")
        );
    }

    #[test]
    fn test_explicit_version_wins() {
        let request = PackageRequest::parse("react@17.0.0")
            .unwrap()
            .with_version(Some("18.2.0".to_string()));
        assert_eq!(request.to_string(), "react@18.2.0");
    }

    #[test]
    fn test_rejects_bad_names() {
        assert!(PackageRequest::parse("").is_err());
        assert!(PackageRequest::parse("@scope").is_err());
        assert!(PackageRequest::parse("a/b").is_err());
        assert!(PackageRequest::parse("../evil").is_err());
        assert!(PackageRequest::parse("pkg@").is_err());
    }
}
