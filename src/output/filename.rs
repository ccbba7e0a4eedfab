//! Portable file names for page output.

const ILLEGAL: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*', ' ', '&'];

fn is_illegal(ch: char) -> bool {
	ILLEGAL.contains(&ch) || (ch.is_ascii_control() && ch != '\u{7f}')
}

/// Replaces every run of characters that Windows rejects in file names with a single `_`.
///
/// Besides `<>:"/\|?*`, spaces, ampersands and ASCII control characters are replaced. The
/// mapping is idempotent.
pub fn sanitize_filename(name: &str) -> String {
	let mut buf = String::with_capacity(name.len());
	let mut in_run = false;

	for ch in name.chars() {
		if is_illegal(ch) {
			if !in_run {
				buf.push('_');
			}

			in_run = true;
		} else {
			buf.push(ch);

			in_run = false;
		}
	}

	buf
}

/// `<base>_Page_<page>.json`, sanitized.
pub fn page_name(base: &str, page: u64) -> String {
	sanitize_filename(&format!("{base}_Page_{page}.json"))
}

/// `<base>_Page_<page>_of_<total>.json`, sanitized.
pub fn page_of_name(base: &str, page: u64, total: u64) -> String {
	sanitize_filename(&format!("{base}_Page_{page}_of_{total}.json"))
}
