use std::path::{Component, Path};

/// Name used when a peer-supplied filename has no usable component.
pub const DEFAULT_SAVE_NAME: &str = "received_file";

/// Reduces a peer-supplied filename to a safe, bare file name.
///
/// Only the final normal path component survives, so a name can never
/// point outside the download directory. Backslashes count as
/// separators on every platform. Rejected names:
/// - Empty or whitespace-only names
/// - Names made only of `.`/`..`/root/prefix components, including a
///   final component that is `.` or `..` once trimmed
/// - Names containing NUL or other control characters
pub fn sanitize_filename(raw: &str) -> String {
    let unified = raw.replace('\\', "/");
    let last = Path::new(&unified)
        .components()
        .filter_map(|component| match component {
            Component::Normal(name) => Some(name),
            Component::ParentDir
            | Component::CurDir
            | Component::RootDir
            | Component::Prefix(_) => None,
        })
        .next_back()
        .map(|name| name.to_string_lossy().trim().to_string());

    match last {
        Some(name)
            if !matches!(name.as_str(), "" | "." | "..")
                && !name.chars().any(char::is_control) =>
        {
            name
        }
        _ => DEFAULT_SAVE_NAME.to_string(),
    }
}
