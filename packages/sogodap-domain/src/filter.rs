use std::collections::HashMap;

use crate::{Error, Result};

pub const TEMPLATE_PLACEHOLDER: &str = "_val_";

const CONTENT_MATCH_PREFIX: &str = "c_content regexp";
const MAX_FILTER_DEPTH: usize = 32;

/// A search filter reduced to the shapes the gateway can translate.
///
/// Equality, substring and presence items all become [`FilterExpr::Leaf`] with wildcard markers
/// removed from the value. Negation, ordering, approximate and extensible items are kept in the
/// tree as [`FilterExpr::Unsupported`] so their position is known, but they never produce a
/// constraint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterExpr {
	And(Vec<FilterExpr>),
	Or(Vec<FilterExpr>),
	Leaf { attribute: String, value: String },
	Unsupported,
}
impl FilterExpr {
	pub fn match_all() -> Self {
		Self::And(Vec::new())
	}

	pub fn leaf(attribute: impl Into<String>, value: &str) -> Self {
		Self::Leaf { attribute: attribute.into(), value: value.replace('*', "") }
	}

	/// Parses RFC 4515 filter text, e.g. `(&(cn=John*)(|(sn=Doe)(o=Acme)))`.
	///
	/// Empty text matches everything. A single item without enclosing parentheses is accepted.
	pub fn parse(raw: &str) -> Result<Self> {
		let trimmed = raw.trim();

		if trimmed.is_empty() {
			return Ok(Self::match_all());
		}
		if !trimmed.starts_with('(') {
			return parse_item(trimmed, 0);
		}

		let mut parser = Parser { input: trimmed, pos: 0 };
		let expr = parser.parse_filter(0)?;

		parser.skip_whitespace();

		if parser.pos != trimmed.len() {
			return Err(parser.error("unexpected trailing input"));
		}

		Ok(expr)
	}
}

/// Per-attribute regexp templates, keyed by lower-cased attribute name.
#[derive(Clone, Debug, Default)]
pub struct FilterTemplates {
	templates: HashMap<String, String>,
}
impl FilterTemplates {
	pub fn new(templates: &HashMap<String, String>) -> Self {
		Self {
			templates: templates
				.iter()
				.map(|(attribute, template)| (attribute.to_ascii_lowercase(), template.clone()))
				.collect(),
		}
	}

	pub fn template(&self, attribute: &str) -> Option<&str> {
		self.templates.get(&attribute.to_ascii_lowercase()).map(String::as_str)
	}

	/// Translates a filter into a `c_content regexp` constraint. An empty string matches
	/// everything.
	pub fn translate(&self, expr: &FilterExpr) -> String {
		self.fragment(expr).map(|fragment| fragment.text).unwrap_or_default()
	}

	fn fragment(&self, expr: &FilterExpr) -> Option<Fragment> {
		match expr {
			FilterExpr::Leaf { attribute, value } => {
				let template = self.template(attribute)?;
				let pattern = template.replace(TEMPLATE_PLACEHOLDER, &escape_literal(value));

				Some(Fragment {
					text: format!("{CONTENT_MATCH_PREFIX} '{pattern}'"),
					compound: false,
				})
			},
			FilterExpr::And(children) => self.group(children, " and "),
			FilterExpr::Or(children) => self.group(children, " or "),
			FilterExpr::Unsupported => None,
		}
	}

	fn group(&self, children: &[FilterExpr], conjunction: &str) -> Option<Fragment> {
		let mut fragments: Vec<Fragment> =
			children.iter().filter_map(|child| self.fragment(child)).collect();

		match fragments.len() {
			0 => None,
			1 => fragments.pop(),
			_ => {
				let text = fragments
					.iter()
					.map(|fragment| {
						if fragment.compound {
							format!("({})", fragment.text)
						} else {
							fragment.text.clone()
						}
					})
					.collect::<Vec<_>>()
					.join(conjunction);

				Some(Fragment { text, compound: true })
			},
		}
	}
}

struct Fragment {
	text: String,
	compound: bool,
}

struct Parser<'a> {
	input: &'a str,
	pos: usize,
}
impl Parser<'_> {
	fn peek(&self) -> Option<u8> {
		self.input.as_bytes().get(self.pos).copied()
	}

	fn skip_whitespace(&mut self) {
		while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
			self.pos += 1;
		}
	}

	fn expect(&mut self, byte: u8) -> Result<()> {
		if self.peek() != Some(byte) {
			return Err(self.error(format!("expected '{}'", byte as char)));
		}

		self.pos += 1;

		Ok(())
	}

	fn error(&self, message: impl Into<String>) -> Error {
		Error::FilterSyntax { position: self.pos, message: message.into() }
	}

	fn parse_filter(&mut self, depth: usize) -> Result<FilterExpr> {
		if depth > MAX_FILTER_DEPTH {
			return Err(self.error("filter nesting is too deep"));
		}

		self.skip_whitespace();
		self.expect(b'(')?;
		self.skip_whitespace();

		let expr = match self.peek() {
			Some(b'&') => {
				self.pos += 1;

				FilterExpr::And(self.parse_list(depth)?)
			},
			Some(b'|') => {
				self.pos += 1;

				FilterExpr::Or(self.parse_list(depth)?)
			},
			Some(b'!') => {
				self.pos += 1;
				self.parse_filter(depth + 1)?;

				FilterExpr::Unsupported
			},
			Some(_) => self.parse_item()?,
			None => return Err(self.error("unexpected end of filter")),
		};

		self.skip_whitespace();
		self.expect(b')')?;

		Ok(expr)
	}

	fn parse_list(&mut self, depth: usize) -> Result<Vec<FilterExpr>> {
		let mut items = Vec::new();

		loop {
			self.skip_whitespace();

			if self.peek() != Some(b'(') {
				break;
			}

			items.push(self.parse_filter(depth + 1)?);
		}

		Ok(items)
	}

	fn parse_item(&mut self) -> Result<FilterExpr> {
		let start = self.pos;

		while let Some(byte) = self.peek() {
			match byte {
				b')' => break,
				b'(' => return Err(self.error("unexpected '(' inside a filter item")),
				_ => self.pos += 1,
			}
		}

		parse_item(self.input[start..self.pos].trim_end(), start)
	}
}

fn parse_item(text: &str, offset: usize) -> Result<FilterExpr> {
	let Some(eq) = text.find('=') else {
		return Err(Error::FilterSyntax {
			position: offset,
			message: "filter item is missing '='".to_string(),
		});
	};
	let (attribute, unsupported) = match text[..eq].as_bytes().last() {
		Some(b'>' | b'<' | b'~' | b':') => (&text[..eq - 1], true),
		_ => (&text[..eq], false),
	};
	let attribute = attribute.trim();

	if attribute.is_empty() {
		return Err(Error::FilterSyntax {
			position: offset,
			message: "filter item is missing an attribute".to_string(),
		});
	}
	if unsupported {
		return Ok(FilterExpr::Unsupported);
	}

	let value = unescape_value(text[eq + 1..].trim(), offset + eq + 1)?;

	Ok(FilterExpr::Leaf { attribute: attribute.to_string(), value })
}

/// Decodes `\XX` escapes and drops `*` wildcard markers.
fn unescape_value(raw: &str, offset: usize) -> Result<String> {
	let bytes = raw.as_bytes();
	let mut out = Vec::with_capacity(bytes.len());
	let mut idx = 0;

	while idx < bytes.len() {
		match bytes[idx] {
			b'*' => idx += 1,
			b'\\' => {
				let decoded = bytes
					.get(idx + 1..idx + 3)
					.and_then(|hex| std::str::from_utf8(hex).ok())
					.and_then(|hex| u8::from_str_radix(hex, 16).ok())
					.ok_or_else(|| Error::FilterSyntax {
						position: offset + idx,
						message: "invalid escape sequence".to_string(),
					})?;

				out.push(decoded);

				idx += 3;
			},
			byte => {
				out.push(byte);

				idx += 1;
			},
		}
	}

	String::from_utf8(out).map_err(|_| Error::FilterSyntax {
		position: offset,
		message: "filter value is not valid UTF-8".to_string(),
	})
}

fn escape_literal(value: &str) -> String {
	value.replace('\\', "\\\\").replace('\'', "''")
}

/// Builds the suffix appended after `where c_deleted is null`.
///
/// The fragment is always parenthesized so a top-level `or` cannot escape the `c_deleted` test.
/// A combined store scopes the constraint to one address book folder. A non-zero `size_limit`
/// becomes a `limit` clause.
pub fn scoped_constraint(fragment: &str, folder_id: Option<i64>, size_limit: u32) -> String {
	let mut sql = match folder_id {
		Some(id) if fragment.is_empty() => format!("c_folder_id = {id}"),
		Some(id) => format!("c_folder_id = {id} and ({fragment})"),
		None if fragment.is_empty() => String::new(),
		None => format!("({fragment})"),
	};

	if !sql.is_empty() {
		sql.insert_str(0, " and ");
	}
	if size_limit > 0 {
		sql.push_str(&format!(" limit {size_limit}"));
	}

	sql
}
