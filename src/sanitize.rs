//! Construction-time hygiene for tags, attribute names, property names and URI-valued attributes.
//!
//! Views are assembled from data that may be user-controlled, so node and fact constructors route their
//! names and values through here. [`load::virtualize`](`crate::load::virtualize`) does not,
//! since it only mirrors what is already live.

/// `<script>` is never created; it degrades to `<p>`.
#[must_use]
pub fn tag(tag: &str) -> &str {
	if tag == "script" {
		"p"
	} else {
		tag
	}
}

/// Inline event handler attributes (`on…`) and `formAction` are defused with a `data-` prefix.
#[must_use]
pub fn attribute_name(name: String) -> String {
	let lower = name.to_ascii_lowercase();
	if lower.starts_with("on") || lower == "formaction" {
		format!("data-{}", name)
	} else {
		name
	}
}

/// `innerHTML` and `formAction` properties are defused with a `data-` prefix.
#[must_use]
pub fn property_name(name: String) -> String {
	if name == "innerHTML" || name == "formAction" {
		format!("data-{}", name)
	} else {
		name
	}
}

/// `javascript:` and `data:text/html` URIs are blanked.
#[must_use]
pub fn attribute_value(value: String) -> String {
	if is_javascript_uri(&value) || is_html_data_uri(&value) {
		String::new()
	} else {
		value
	}
}

/// Browsers ignore whitespace interspersed in a scheme, so the match does too.
fn spaced_prefix<'a>(value: &'a str, pattern: &str) -> Option<&'a str> {
	let mut rest = value;
	for expected in pattern.chars() {
		rest = rest.trim_start();
		let mut chars = rest.chars();
		match chars.next() {
			Some(c) if c.to_ascii_lowercase() == expected => rest = chars.as_str(),
			_ => return None,
		}
	}
	Some(rest)
}

fn is_javascript_uri(value: &str) -> bool {
	spaced_prefix(value, "javascript:").is_some()
}

fn is_html_data_uri(value: &str) -> bool {
	spaced_prefix(value, "data:text/html").map_or(false, |rest| matches!(rest.trim_start().chars().next(), Some(',') | Some(';')))
}
