//! Script naming
//!
//! Maps dependency URIs to canonical module names and module names to
//! storage filenames. A remote module's name is the percent-encoded form of
//! its source URI, so its origin can always be recovered from the name and
//! the name is always a valid flat filename.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

use crate::module::traits::ModuleError;

/// Module file suffix, without the dot
pub const MODULE_SUFFIX: &str = "toml";

/// Module file extension, with the dot
pub const MODULE_EXTENSION: &str = ".toml";

/// Everything outside the RFC 3986 unreserved set is escaped
const NAME_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Canonical module name for a dependency URI
pub fn uri_to_name(uri: &str) -> String {
    utf8_percent_encode(uri, NAME_ESCAPE).to_string()
}

/// Inverse of [`uri_to_name`]
pub fn name_to_uri(name: &str) -> String {
    percent_decode_str(name).decode_utf8_lossy().into_owned()
}

/// `/path` or `scheme://...`
pub fn is_absolute_uri(s: &str) -> bool {
    s.starts_with('/') || s.match_indices("://").any(|(i, _)| i > 0)
}

/// A local module's "URI" is its bare name, never absolute
pub fn is_local(name: &str) -> bool {
    !is_absolute_uri(&name_to_uri(name))
}

/// Storage filename for a module name
pub fn module_filename(name: &str) -> String {
    format!("{}{}", name, MODULE_EXTENSION)
}

/// Resolve a dependency declared by `declaring` to the URI it is fetched from.
///
/// Absolute declarations and declarations made by local modules are kept
/// as-is. A remote module's relative declaration names a sibling of the
/// remote module itself: `(https://a/b/c, ./d)` resolves to
/// `https://a/b/d.toml`.
pub fn resolve_dependency_uri(declaring: &str, declared: &str) -> Result<String, ModuleError> {
    if is_absolute_uri(declared) || is_local(declaring) {
        return Ok(declared.to_string());
    }
    let base = name_to_uri(declaring);
    let sibling = resolve_sibling(&base, declared)?;
    Ok(format!("{}{}", sibling, MODULE_EXTENSION))
}

fn resolve_sibling(base: &str, relative: &str) -> Result<String, ModuleError> {
    let invalid = |reason: String| ModuleError::InvalidUri {
        uri: base.to_string(),
        reason,
    };

    // Plain absolute paths round-trip through file:// URLs
    if base.starts_with('/') {
        let base_url = Url::from_file_path(base)
            .map_err(|_| invalid("not an absolute file path".to_string()))?;
        let joined = base_url
            .join(relative)
            .map_err(|e| invalid(e.to_string()))?;
        return joined
            .to_file_path()
            .map(|p| p.to_string_lossy().into_owned())
            .map_err(|_| invalid(format!("{} does not resolve to a file path", relative)));
    }

    let base_url = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
    let joined = base_url
        .join(relative)
        .map_err(|e| invalid(e.to_string()))?;
    Ok(joined.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_name_round_trip() {
        let uri = "https://x/y/util";
        let name = uri_to_name(uri);
        assert_eq!(name, "https%3A%2F%2Fx%2Fy%2Futil");
        assert!(!name.contains('/'));
        assert_eq!(name_to_uri(&name), uri);
    }

    #[test]
    fn test_escape_character_is_escaped() {
        let a = uri_to_name("https://x/a%2Fb");
        let b = uri_to_name("https://x/a/b");
        assert_ne!(a, b);
        assert_eq!(name_to_uri(&a), "https://x/a%2Fb");
    }

    #[test]
    fn test_is_absolute_uri() {
        assert!(is_absolute_uri("/home/user/util"));
        assert!(is_absolute_uri("https://x/y"));
        assert!(is_absolute_uri("file:///tmp/a"));
        assert!(!is_absolute_uri("util"));
        assert!(!is_absolute_uri("./helper"));
        assert!(!is_absolute_uri("://nothing"));
    }

    #[test]
    fn test_is_local() {
        assert!(is_local("foo"));
        assert!(is_local("my-script_2"));
        assert!(!is_local(&uri_to_name("https://x/y/util")));
        assert!(!is_local(&uri_to_name("/opt/scripts/util")));
    }

    #[test]
    fn test_module_filename() {
        assert_eq!(module_filename("foo"), "foo.toml");
    }

    #[test]
    fn test_absolute_declaration_is_unchanged() {
        let remote = uri_to_name("https://x/y/mod");
        assert_eq!(
            resolve_dependency_uri(&remote, "https://z/util").unwrap(),
            "https://z/util"
        );
        assert_eq!(
            resolve_dependency_uri("local", "https://z/util").unwrap(),
            "https://z/util"
        );
    }

    #[test]
    fn test_local_declaration_is_unchanged() {
        assert_eq!(resolve_dependency_uri("foo", "./helper").unwrap(), "./helper");
        assert_eq!(resolve_dependency_uri("foo", "bar").unwrap(), "bar");
    }

    #[test]
    fn test_remote_relative_declaration_resolves_to_sibling() {
        let remote = uri_to_name("https://x/y/mod");
        assert_eq!(
            resolve_dependency_uri(&remote, "./helper").unwrap(),
            "https://x/y/helper.toml"
        );
        assert_eq!(
            resolve_dependency_uri(&remote, "../lib/helper").unwrap(),
            "https://x/lib/helper.toml"
        );
    }

    #[test]
    fn test_remote_path_relative_declaration() {
        let remote = uri_to_name("/srv/scripts/mod.toml");
        assert_eq!(
            resolve_dependency_uri(&remote, "./helper").unwrap(),
            "/srv/scripts/helper.toml"
        );
    }

    #[test]
    fn test_unparseable_base_is_reported() {
        let remote = uri_to_name("not a url ://x");
        let err = resolve_dependency_uri(&remote, "./helper").unwrap_err();
        assert!(matches!(err, ModuleError::InvalidUri { .. }));
    }
}
