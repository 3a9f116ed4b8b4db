/// Derived file naming for bare-URL manifests.
///
/// Mirrors the dataset collection convention: files are named
/// `<prefix>_<8-hex-char-hash>.<ext>`, where the hash comes from the
/// source URL and the extension from the URL path or, failing that,
/// the response content type.

/// First 8 hex chars of the md5 of the URL.
pub fn url_hash(url: &str) -> String {
    let digest = format!("{:x}", md5::compute(url.as_bytes()));
    digest[..8].to_string()
}

/// Extension of the URL's final path segment, lowercased.
///
/// Query string and fragment are stripped first. Returns None when the
/// URL has no path, the segment has no dot, or the candidate does not
/// look like a file extension (empty, longer than 5 chars, or
/// non-alphanumeric).
pub fn ext_from_url(url: &str) -> Option<String> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let after_scheme = without_query
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(without_query);
    let (_, path) = after_scheme.split_once('/')?;
    let segment = path.rsplit('/').next().unwrap_or(path);
    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty()
        || ext.is_empty()
        || ext.len() > 5
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Map a Content-Type header to a file extension for the image types
/// the datasets care about.
pub fn ext_from_content_type(content_type: &str) -> Option<&'static str> {
    let ct = content_type.to_ascii_lowercase();
    if ct.contains("jpeg") || ct.contains("jpg") {
        Some("jpg")
    } else if ct.contains("png") {
        Some("png")
    } else if ct.contains("webp") {
        Some("webp")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_hash_is_stable_and_short() {
        let a = url_hash("http://example.com/cat.jpg");
        let b = url_hash("http://example.com/cat.jpg");
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_different_urls_hash_differently() {
        assert_ne!(
            url_hash("http://example.com/1.jpg"),
            url_hash("http://example.com/2.jpg")
        );
    }

    #[test]
    fn test_ext_from_url_plain() {
        assert_eq!(ext_from_url("http://x.com/pic.JPG"), Some("jpg".into()));
        assert_eq!(ext_from_url("http://x.com/a/b/c.png"), Some("png".into()));
    }

    #[test]
    fn test_ext_from_url_strips_query_and_fragment() {
        assert_eq!(
            ext_from_url("http://x.com/pic.webp?size=large#top"),
            Some("webp".into())
        );
    }

    #[test]
    fn test_ext_from_url_missing() {
        assert_eq!(ext_from_url("http://x.com/picture"), None);
        assert_eq!(ext_from_url("http://x.com/"), None);
        assert_eq!(ext_from_url("http://x.com"), None);
        // a dot in the host must not count as an extension
        assert_eq!(ext_from_url("http://images.example.com"), None);
    }

    #[test]
    fn test_ext_from_url_rejects_garbage() {
        assert_eq!(ext_from_url("http://x.com/archive.tar%20gz"), None);
        assert_eq!(ext_from_url("http://x.com/file.verylongext"), None);
        assert_eq!(ext_from_url("http://x.com/.hidden"), None);
    }

    #[test]
    fn test_ext_from_content_type() {
        assert_eq!(ext_from_content_type("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_content_type("image/png; charset=binary"), Some("png"));
        assert_eq!(ext_from_content_type("image/webp"), Some("webp"));
        assert_eq!(ext_from_content_type("text/html"), None);
    }
}
