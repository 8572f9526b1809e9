//! Linux-safe filename sanitization.

/// Sanitizes a candidate filename for safe use on Linux.
///
/// - Replaces NUL, `/`, `\`, and control characters with `_` (this also
///   defeats path traversal in caller-supplied names)
/// - Trims leading/trailing spaces, dots, and underscores
/// - Collapses consecutive underscores
/// - Limits length to 255 bytes (Linux NAME_MAX)
pub fn sanitize_file_name(name: &str) -> String {
    const NAME_MAX: usize = 255;

    let mut out = String::with_capacity(name.len());
    let mut prev_underscore = false;

    for c in name.chars() {
        let replacement = if c == '\0' || c == '/' || c == '\\' || c.is_control() {
            '_'
        } else if c == ' ' || c == '\t' {
            '_'
        } else {
            c
        };

        if replacement == '_' {
            if !prev_underscore {
                out.push('_');
            }
            prev_underscore = true;
        } else {
            out.push(replacement);
            prev_underscore = false;
        }
    }

    let trimmed = out.trim_matches(|c| c == ' ' || c == '\t' || c == '.' || c == '_');

    if trimmed.len() > NAME_MAX {
        let mut take = NAME_MAX;
        while take > 0 && !trimmed.is_char_boundary(take) {
            take -= 1;
        }
        trimmed[..take].to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_slash_and_backslash() {
        assert_eq!(sanitize_file_name("a/b\\c.txt"), "a_b_c.txt");
    }

    #[test]
    fn defeats_path_traversal() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "etc_passwd");
    }

    #[test]
    fn trims_dots_and_spaces() {
        assert_eq!(sanitize_file_name("  ..  clip.mp4  ..  "), "clip.mp4");
    }

    #[test]
    fn collapses_underscores() {
        assert_eq!(sanitize_file_name("file___name"), "file_name");
    }

    #[test]
    fn control_chars() {
        assert_eq!(sanitize_file_name("file\x00name"), "file_name");
    }
}
