/*
 * Text operations on backslash-separated paths. Nothing here touches the
 * file system.
 */

use super::str_utils;

/// Replaces the extension of the file name, or appends one if it has none.
/// The new extension may be given with or without its dot.
pub fn change_extension(file_path: &str, new_extension: &str) -> String {
    let new_extension = new_extension.strip_prefix('.').unwrap_or(new_extension);
    let name_start = file_path.rfind('\\').map_or(0, |i| i + 1);
    let stem = match file_path[name_start..].rfind('.') {
        Some(dot) => &file_path[..name_start + dot],
        None => file_path,
    };
    format!("{stem}.{new_extension}")
}

pub fn file_from(file_path: &str) -> &str {
    match file_path.rfind('\\') {
        Some(i) => &file_path[i + 1..],
        None => file_path,
    }
}

/// The folder part of a path, without trailing backslash.
pub fn folder_from(file_path: &str) -> &str {
    match file_path.rfind('\\') {
        Some(i) => &file_path[..i],
        None => file_path,
    }
}

/// Case-insensitive; the extension may be given with or without its dot.
pub fn has_extension(file_path: &str, extension: &str) -> bool {
    if extension.starts_with('.') {
        str_utils::ends_withi(file_path, extension)
    } else {
        str_utils::ends_withi(file_path, &format!(".{extension}"))
    }
}

pub fn has_any_extension(file_path: &str, extensions: &[&str]) -> bool {
    extensions.iter().any(|ext| has_extension(file_path, ext))
}

/// Case-insensitive text comparison; paths are not normalized.
pub fn is_same(path1: &str, path2: &str) -> bool {
    str_utils::eqi(path1, path2)
}

pub fn trim_backslash(file_path: &str) -> &str {
    file_path.trim_end_matches('\\')
}
