use url::Url;

/// Filename used when neither the server nor the URL suggests one.
pub const FALLBACK_FILENAME: &str = "download";

/// Sanitize filename to remove invalid characters
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            _ => c,
        })
        .collect::<String>()
        .trim()
        .trim_matches('.')
        .trim()
        .to_string()
}

/// Extension of the last path component, without the dot. Empty when the
/// component has none, or is a dot-file like `.mp3`.
pub fn path_extension(path: &str) -> &str {
    let last = path.trim_end_matches('/').rsplit('/').next().unwrap_or("");
    match last.rfind('.') {
        Some(0) | None => "",
        Some(index) => &last[index + 1..],
    }
}

/// Turns what the user typed in the address bar into a URL string, adding
/// `http://` when no scheme was given. Empty input yields `None`.
pub fn normalize_browse_input(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if input.starts_with("http://") || input.starts_with("https://") {
        Some(input.to_string())
    } else {
        Some(format!("http://{}", input))
    }
}

/// Extracts the filename from a `Content-Disposition` header value.
/// `filename*=UTF-8''...` wins over a plain `filename=`.
pub fn parse_content_disposition(header: &str) -> Option<String> {
    let mut plain: Option<String> = None;

    for param in split_params(header) {
        let Some((name, value)) = param.trim().split_once('=') else {
            continue;
        };
        let name = name.trim().to_ascii_lowercase();
        let value = value.trim();

        if name == "filename*" {
            if let Some((_, encoded)) = value.split_once("''") {
                if let Ok(decoded) = urlencoding::decode(encoded.trim_matches('"')) {
                    if !decoded.is_empty() {
                        return Some(decoded.into_owned());
                    }
                }
            }
        } else if name == "filename" {
            let unquoted = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value)
                .replace("\\\"", "\"");
            if !unquoted.is_empty() {
                plain = Some(unquoted);
            }
        }
    }

    plain
}

/// Splits header parameters on `;`, skipping any inside a quoted string.
fn split_params(header: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;

    for (i, c) in header.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            ';' if !quoted => {
                params.push(&header[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    params.push(&header[start..]);
    params
}

/// Chooses the on-disk name for a download: the server's suggestion, then the
/// URL's last path segment, then [`FALLBACK_FILENAME`].
pub fn download_filename(suggested: Option<&str>, url: &Url) -> String {
    let from_server = suggested.map(sanitize_filename).filter(|s| !s.is_empty());
    if let Some(name) = from_server {
        return name;
    }

    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .map(|segment| {
            urlencoding::decode(segment)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| segment.to_string())
        })
        .map(|segment| sanitize_filename(&segment))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| FALLBACK_FILENAME.to_string())
}

/// `name.ext` -> `name (n).ext`, used when the plain name is taken.
pub fn numbered_filename(filename: &str, n: u32) -> String {
    match filename.rfind('.') {
        Some(index) if index > 0 => {
            format!("{} ({}){}", &filename[..index], n, &filename[index..])
        }
        _ => format!("{} ({})", filename, n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("test/file.mp3"), "test_file.mp3");
        assert_eq!(sanitize_filename("normal-name.mp3"), "normal-name.mp3");
        assert_eq!(sanitize_filename(" ..hidden.. "), "hidden");
    }

    #[test]
    fn test_path_extension() {
        assert_eq!(path_extension("/books/chapter1.mp3"), "mp3");
        assert_eq!(path_extension("/archive.tar.zip"), "zip");
        assert_eq!(path_extension("/book"), "");
        assert_eq!(path_extension("/.mp3"), "");
        assert_eq!(path_extension("/dir.m4b/"), "m4b");
        assert_eq!(path_extension("/Loud.MP3"), "MP3");
        assert_eq!(path_extension(""), "");
    }

    #[test]
    fn test_normalize_browse_input() {
        assert_eq!(normalize_browse_input(""), None);
        assert_eq!(normalize_browse_input("   "), None);
        assert_eq!(
            normalize_browse_input("librivox.org"),
            Some("http://librivox.org".to_string())
        );
        assert_eq!(
            normalize_browse_input("https://librivox.org"),
            Some("https://librivox.org".to_string())
        );
    }

    #[test]
    fn test_parse_content_disposition() {
        assert_eq!(
            parse_content_disposition("attachment; filename=\"book one.mp3\""),
            Some("book one.mp3".to_string())
        );
        assert_eq!(
            parse_content_disposition("attachment; filename=plain.zip"),
            Some("plain.zip".to_string())
        );
        assert_eq!(
            parse_content_disposition(
                "attachment; filename=\"fallback.mp3\"; filename*=UTF-8''caf%C3%A9.mp3"
            ),
            Some("café.mp3".to_string())
        );
        assert_eq!(
            parse_content_disposition("attachment; filename=\"Part 1; Intro.mp3\"; size=10"),
            Some("Part 1; Intro.mp3".to_string())
        );
        assert_eq!(
            parse_content_disposition(r#"attachment; filename="say \"hi\"; now.mp3""#),
            Some("say \"hi\"; now.mp3".to_string())
        );
        assert_eq!(parse_content_disposition("inline"), None);
    }

    #[test]
    fn test_download_filename() {
        let url = Url::parse("http://example.com/files/My%20Book.m4b?x=1").unwrap();
        assert_eq!(download_filename(None, &url), "My Book.m4b");
        assert_eq!(download_filename(Some("a/b.mp3"), &url), "a_b.mp3");
        assert_eq!(download_filename(Some(""), &url), "My Book.m4b");

        let root = Url::parse("http://example.com/").unwrap();
        assert_eq!(download_filename(None, &root), FALLBACK_FILENAME);
    }

    #[test]
    fn test_numbered_filename() {
        assert_eq!(numbered_filename("book.mp3", 1), "book (1).mp3");
        assert_eq!(numbered_filename("book", 2), "book (2)");
        assert_eq!(numbered_filename(".hidden", 3), ".hidden (3)");
    }
}
