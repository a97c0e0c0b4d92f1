//! `@path` file references in prompt text.
//!
//! `"Summarize @notes.txt"` becomes the prompt with the file body inlined in
//! a fenced block; `@dir` inlines a recursive listing of its text files.
//! Unreadable paths turn into inline error notes rather than failing the
//! request.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

static REFERENCE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([\w/.\-]+)").expect("reference pattern is valid"));

/// Directory listings stop recursing below this depth.
const MAX_DEPTH: usize = 5;

const DEPTH_MARKER: &str = "... [directory too deep, stopping recursion]";

const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "js", "ts", "jsx", "tsx", "py", "java", "json", "yaml", "yml", "md", "html", "css",
    "scss", "sql", "sh", "bash", "rs", "go", "c", "cpp", "h", "hpp", "xml", "toml", "ini", "cfg",
    "log",
];

/// Distinct `@path` tokens in the prompt, longest first so that replacing
/// `@a` can never clobber a later `@ab`.
pub fn extract_references(prompt: &str) -> Vec<String> {
    let mut references: Vec<String> = Vec::new();
    for captures in REFERENCE_PATTERN.captures_iter(prompt) {
        let reference = captures[1].to_string();
        if !references.contains(&reference) {
            references.push(reference);
        }
    }
    references.sort_by(|a, b| b.len().cmp(&a.len()));
    references
}

/// Replace every `@path` token with the referenced content, resolved
/// against `base_dir`.
pub fn resolve_file_references(prompt: &str, base_dir: &Path) -> String {
    let mut resolved_prompt = prompt.to_string();
    for reference in extract_references(prompt) {
        let resolved_path = base_dir.join(&reference);
        let replacement = render_reference(&reference, &resolved_path);
        resolved_prompt = resolved_prompt.replace(&format!("@{reference}"), &replacement);
    }
    resolved_prompt
}

fn render_reference(reference: &str, path: &Path) -> String {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => {
            format!(
                "Contents of directory {reference}:\n{}",
                directory_content(path, 0)
            )
        }
        Ok(_) => match fs::read_to_string(path) {
            Ok(content) => format!("Content of {reference}:\n```\n{content}\n```"),
            Err(err) => unreadable(reference, path, &err),
        },
        Err(err) => unreadable(reference, path, &err),
    }
}

fn unreadable(reference: &str, path: &Path, err: &std::io::Error) -> String {
    warn!(path = %path.display(), error = %err, "could not read file reference");
    format!("Error: Could not read {reference} at {}", path.display())
}

fn directory_content(dir: &Path, depth: usize) -> String {
    if depth > MAX_DEPTH {
        return DEPTH_MARKER.to_string();
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(path = %dir.display(), error = %err, "could not list directory");
            return format!("(could not list {})", dir.display());
        }
    };

    let mut items: Vec<(String, PathBuf)> = entries
        .flatten()
        .map(|entry| (entry.file_name().to_string_lossy().into_owned(), entry.path()))
        .collect();
    // Deterministic listings regardless of readdir order.
    items.sort();

    let mut content = String::new();
    for (name, path) in items {
        if path.is_dir() {
            content.push_str(&format!("\nDirectory: {name}/\n"));
            content.push_str(&directory_content(&path, depth + 1));
        } else if is_text_file(&name) {
            match fs::read_to_string(&path) {
                Ok(file_content) => {
                    content.push_str(&format!("\nFile: {name}\n```\n{file_content}\n```\n"))
                }
                Err(_) => content.push_str(&format!("File: {name} (could not read)\n")),
            }
        } else {
            content.push_str(&format!("File: {name} (binary or non-text file)\n"));
        }
    }
    content
}

/// Extension-allowlist classification; extensionless files count as text.
fn is_text_file(filename: &str) -> bool {
    match Path::new(filename).extension() {
        Some(ext) => {
            let ext = ext.to_string_lossy().to_ascii_lowercase();
            TEXT_EXTENSIONS.contains(&ext.as_str())
        }
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).expect("write fixture");
    }

    #[test]
    fn extracts_distinct_references() {
        let refs = extract_references("Compare @src/a.rs with @src/a.rs and @b.md");
        assert_eq!(refs, vec!["src/a.rs".to_string(), "b.md".to_string()]);
    }

    #[test]
    fn resolves_a_file_reference_into_a_fenced_block() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "notes.txt", "abc");

        let resolved = resolve_file_references("Summarize @notes.txt", dir.path());

        assert_eq!(resolved, "Summarize Content of notes.txt:\n```\nabc\n```");
    }

    #[test]
    fn missing_reference_becomes_an_inline_error_note() {
        let dir = tempfile::tempdir().expect("tempdir");

        let resolved = resolve_file_references("Read @missing.txt please", dir.path());

        assert!(resolved.contains("Error: Could not read missing.txt at"));
        assert!(resolved.ends_with("please"));
    }

    #[test]
    fn directory_reference_lists_text_and_binary_entries() {
        let dir = tempfile::tempdir().expect("tempdir");
        let docs = dir.path().join("docs");
        fs::create_dir(&docs).expect("mkdir");
        write(&docs, "a.md", "hi");
        fs::write(docs.join("img.png"), [0u8, 159, 146, 150]).expect("write binary");

        let resolved = resolve_file_references("Look at @docs", dir.path());

        assert!(resolved.starts_with("Look at Contents of directory docs:"));
        assert!(resolved.contains("\nFile: a.md\n```\nhi\n```\n"));
        assert!(resolved.contains("File: img.png (binary or non-text file)\n"));
    }

    #[test]
    fn deep_nesting_stops_with_a_marker() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut path = dir.path().join("d1");
        for level in 2..=8 {
            path.push(format!("d{level}"));
        }
        fs::create_dir_all(&path).expect("mkdir chain");
        write(&path, "leaf.txt", "bottom");

        let resolved = resolve_file_references("@d1", dir.path());

        assert!(resolved.contains(DEPTH_MARKER));
        assert!(!resolved.contains("bottom"));
    }

    #[test]
    fn longer_tokens_are_replaced_before_their_prefixes() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "a", "A");
        write(dir.path(), "ab", "AB");

        let resolved = resolve_file_references("@a and @ab", dir.path());

        assert!(resolved.contains("Content of a:\n```\nA\n```"));
        assert!(resolved.contains("Content of ab:\n```\nAB\n```"));
    }

    #[test]
    fn extensionless_files_count_as_text() {
        assert!(is_text_file("LICENSE"));
        assert!(is_text_file("main.rs"));
        assert!(!is_text_file("photo.jpeg"));
    }
}
