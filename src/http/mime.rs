//! MIME type detection based on file extensions.

use std::path::Path;

use mime_guess::mime;

/// Fallback for unknown or missing extensions.
pub const DEFAULT_MIME: &str = "application/octet-stream";

/// Guesses a `Content-Type` from the extension of `path`.
///
/// Text types are labelled as UTF-8.
///
/// # Example
///
/// ```
/// # use wicket::http::mime::guess;
/// assert_eq!(guess("index.HTML".as_ref()), "text/html; charset=utf-8");
/// assert_eq!(guess("photo.png".as_ref()), "image/png");
/// assert_eq!(guess("archive".as_ref()), "application/octet-stream");
/// ```
pub fn guess(path: &Path) -> String {
    let guessed = mime_guess::from_path(path).first_or_octet_stream();

    if guessed.type_() == mime::TEXT && guessed.get_param(mime::CHARSET).is_none() {
        format!("{}; charset=utf-8", guessed.essence_str())
    } else {
        guessed.to_string()
    }
}
