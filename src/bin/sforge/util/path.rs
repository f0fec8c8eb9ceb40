use std::path::{Path, PathBuf};

pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path.file_stem().unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}{}.{}", stem.to_string_lossy(), suffix, ext.to_string_lossy()),
        None => format!("{}{}", stem.to_string_lossy(), suffix),
    };
    path.with_file_name(name)
}

/// Output path of the `index`-th reaction: the first keeps `path`, later
/// ones get `_2`, `_3`, ... before the extension.
pub fn numbered(path: &Path, index: usize) -> PathBuf {
    if index == 0 {
        path.to_path_buf()
    } else {
        with_suffix(path, &format!("_{}", index + 1))
    }
}
