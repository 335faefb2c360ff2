//! Filename helpers.

/// Last path component of a user-supplied filename.
///
/// Both `/` and `\` count as separators, since browsers on Windows may send
/// full paths.
pub fn base_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name).trim()
}

/// Lowercased extension of a filename including the dot, if any.
pub fn extension_of(name: &str) -> Option<String> {
    let base = base_name(name);
    let (stem, ext) = base.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.contains(char::is_whitespace) {
        return None;
    }
    Some(format!(".{}", ext.to_lowercase()))
}

/// Stored form of a filename: path stripped, spaces turned into hyphens,
/// lowercased.
pub fn sanitize_filename(name: &str) -> String {
    base_name(name)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

/// Filename-safe stem for export downloads: ASCII letters, digits, `-` and
/// `_`, everything else replaced by `_`.
pub fn export_stem(original_filename: &str) -> String {
    let base = base_name(original_filename);
    let stem = match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => base,
    };
    stem.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Annual Report 2024.PDF"), "annual-report-2024.pdf");
        assert_eq!(sanitize_filename("C:\\Users\\me\\My Paper.pdf"), "my-paper.pdf");
        assert_eq!(sanitize_filename("../../etc/Thesis  Final.pdf"), "thesis-final.pdf");
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("paper.PDF").as_deref(), Some(".pdf"));
        assert_eq!(extension_of("archive.tar.gz").as_deref(), Some(".gz"));
        assert_eq!(extension_of("README"), None);
        assert_eq!(extension_of(".hidden"), None);
    }

    #[test]
    fn test_export_stem() {
        assert_eq!(export_stem("Q1 report (final).pdf"), "Q1_report__final_");
        assert_eq!(export_stem("plain"), "plain");
    }
}
