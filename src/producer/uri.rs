use std::path::Path;
use url::Url;

/// Parse a resource address into a canonical URL.
///
/// Accepts full URIs (`file:///a.rs`, `untitled:Untitled-1`) and absolute
/// filesystem paths, which become `file://` URLs. Anything else is not
/// addressable.
pub fn canonical_address(address: &str) -> Option<Url> {
    let address = address.trim();
    if address.is_empty() {
        return None;
    }

    let path = Path::new(address);
    if path.is_absolute() {
        return Url::from_file_path(path).ok();
    }

    Url::parse(address).ok()
}
