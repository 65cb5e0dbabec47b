use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Read a file to string, replacing invalid UTF-8 sequences with the replacement character.
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn read_to_string_lossy(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Absolute directory containing `file`.
///
/// Relative paths are anchored at the current working directory. The file
/// itself does not need to exist.
///
/// # Errors
/// Returns an error if the current directory cannot be determined.
pub fn containing_dir(file: &Path) -> io::Result<PathBuf> {
    let absolute = if file.is_absolute() {
        file.to_path_buf()
    } else {
        std::env::current_dir()?.join(file)
    };
    Ok(absolute
        .parent()
        .map_or_else(|| absolute.clone(), Path::to_path_buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_read_to_string_lossy_valid_utf8() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{\"name\": \"demo\"}").unwrap();
        file.flush().unwrap();

        let content = read_to_string_lossy(file.path()).unwrap();
        assert_eq!(content, "{\"name\": \"demo\"}");
    }

    #[test]
    fn test_read_to_string_lossy_invalid_utf8() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0x48, 0x65, 0x6c, 0x6c, 0x6f, 0x80, 0x81])
            .unwrap();
        file.flush().unwrap();

        let content = read_to_string_lossy(file.path()).unwrap();
        assert!(content.starts_with("Hello"));
        assert!(content.contains('\u{FFFD}'));
    }

    #[test]
    fn test_read_missing_file_fails() {
        let dir = tempdir().unwrap();
        assert!(read_to_string_lossy(&dir.path().join("nnp.json")).is_err());
    }

    #[test]
    fn test_containing_dir_absolute() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("nnp.json");
        assert_eq!(containing_dir(&file).unwrap(), dir.path());
    }

    #[test]
    fn test_containing_dir_relative_is_anchored() {
        let dir = containing_dir(Path::new("nnp.json")).unwrap();
        assert!(dir.is_absolute());
    }
}
