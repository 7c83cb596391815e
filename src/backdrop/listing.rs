use std::{
    fs,
    path::{Path, PathBuf},
};

/// Lists every entry of `dir`, sorted byte-wise by path.
///
/// A directory that cannot be opened yields an empty list: a missing backdrop
/// folder just means there is nothing to rotate through.
pub fn list_files_in_dir(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut files = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| dir.join(entry.file_name()))
        .collect::<Vec<_>>();
    // All entries share `dir`, so component ordering is byte ordering of the names.
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directory_is_empty() {
        let tmp = tempfile::TempDir::new().expect("temp dir");
        let files = list_files_in_dir(&tmp.path().join("nope"));
        assert!(files.is_empty());
    }

    #[test]
    fn entries_are_sorted_bytewise() {
        let tmp = tempfile::TempDir::new().expect("temp dir");
        for name in ["b.png", "B.png", "a.png", "_x.jpg"] {
            fs::write(tmp.path().join(name), b"x").expect("write");
        }

        let names = list_files_in_dir(tmp.path())
            .into_iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["B.png", "_x.jpg", "a.png", "b.png"]);
    }

    #[test]
    fn trailing_separator_is_tolerated() {
        let tmp = tempfile::TempDir::new().expect("temp dir");
        fs::write(tmp.path().join("one.png"), b"x").expect("write");

        let with_slash = PathBuf::from(format!("{}/", tmp.path().display()));
        let a = list_files_in_dir(tmp.path());
        let b = list_files_in_dir(&with_slash);
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].file_name(), b[0].file_name());
        assert_eq!(a[0].parent(), b[0].parent());
    }
}
