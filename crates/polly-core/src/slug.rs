/// Convert a human-readable name into a filesystem-safe identifier.
///
/// Lower-cases the input and maps spaces and underscores to hyphens. Nothing
/// else is touched: repeated hyphens survive and punctuation is kept, so
/// callers are expected to pass reasonably clean names.
pub fn slugify(name: &str) -> String {
    name.to_lowercase().replace([' ', '_'], "-")
}
