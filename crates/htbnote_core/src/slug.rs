pub const ASSET_FILENAME_PREFIX: &str = "htb_";
pub const ASSET_FILENAME_EXTENSION: &str = "png";

/// Lowercase the name and drop everything that is not `[a-z0-9]`.
///
/// Both the page URL and the local asset filename are derived from this value,
/// so the existence check for the asset only lines up if every caller goes
/// through here.
pub fn slugify(name: &str) -> String {
    name.chars()
        .flat_map(char::to_lowercase)
        .filter(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit())
        .collect()
}

pub fn page_url(base_url: &str, slug: &str) -> String {
    format!("{}/machines/{slug}", base_url.trim_end_matches('/'))
}

pub fn asset_filename(slug: &str) -> String {
    format!("{ASSET_FILENAME_PREFIX}{slug}.{ASSET_FILENAME_EXTENSION}")
}
