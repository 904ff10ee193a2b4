use std::ffi::OsString;
use std::path::{MAIN_SEPARATOR_STR, Path};

/// Directory that `dirname(3)` would return: the root stays the root, a bare name yields `.`.
fn dirname(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Path::new("."),
        Some(parent) => parent,
        None if path.as_os_str().is_empty() => Path::new("."),
        None => path,
    }
}

/// Data root of the runtime for an executable installed at `exe`.
///
/// The executable lives in `<root>/bin/<exe>`, so the depot is the grandparent directory of its
/// path, followed by a path separator.
pub fn depot_path(exe: &Path) -> OsString {
    let root = dirname(dirname(exe));

    let mut depot = root.as_os_str().to_owned();
    if !ends_with_separator(&depot) {
        depot.push(MAIN_SEPARATOR_STR);
    }

    depot
}

fn ends_with_separator(path: &OsString) -> bool {
    path.as_encoded_bytes()
        .last()
        .is_some_and(|&byte| std::path::is_separator(char::from(byte)))
}
