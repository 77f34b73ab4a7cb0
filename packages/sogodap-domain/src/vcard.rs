//! Owned view over a decoded vCard, independent of the parser that produced it.

use ical::VcardParser;

use crate::{Error, Result};

const PARAM_TYPE: &str = "TYPE";
const PARAM_PREF: &str = "PREF";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Card {
	properties: Vec<CardProperty>,
}
impl Card {
	pub fn new(properties: Vec<CardProperty>) -> Self {
		Self { properties }
	}

	pub fn properties<'a, 'n>(
		&'a self,
		name: &'n str,
	) -> impl Iterator<Item = &'a CardProperty> + use<'a, 'n> {
		self.properties.iter().filter(move |property| property.name.eq_ignore_ascii_case(name))
	}

	/// The property with the lowest preference rank, or the first one when none is ranked.
	pub fn preferred(&self, name: &str) -> Option<&CardProperty> {
		let mut best: Option<(&CardProperty, Option<u32>)> = None;

		for property in self.properties(name) {
			let rank = property.preference();

			best = match best {
				None => Some((property, rank)),
				Some((_, None)) if rank.is_some() => Some((property, rank)),
				Some((_, Some(current))) if rank.is_some_and(|rank| rank < current) =>
					Some((property, rank)),
				keep => keep,
			};
		}

		best.map(|(property, _)| property)
	}

	pub fn preferred_text(&self, name: &str) -> Option<String> {
		self.preferred(name).map(CardProperty::text).filter(|text| !text.is_empty())
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CardProperty {
	/// Grouping prefix such as `item1` in `item1.EMAIL`.
	pub group: Option<String>,
	pub name: String,
	pub params: Vec<(String, Vec<String>)>,
	pub value: String,
}
impl CardProperty {
	pub fn new(name: &str, params: Vec<(String, Vec<String>)>, value: &str) -> Self {
		let (group, name) = match name.rsplit_once('.') {
			Some((group, name)) => (Some(group.to_string()), name),
			None => (None, name),
		};

		Self {
			group,
			name: name.to_ascii_uppercase(),
			params: params
				.into_iter()
				.map(|(param, values)| (param.to_ascii_uppercase(), values))
				.collect(),
			value: value.to_string(),
		}
	}

	/// Lower-cased `TYPE` values plus bare vCard 2.1 parameters such as `TEL;CELL:`.
	pub fn type_tags(&self) -> Vec<String> {
		let mut tags = Vec::new();

		for (param, values) in &self.params {
			if param == PARAM_TYPE {
				tags.extend(
					values
						.iter()
						.flat_map(|value| value.split(','))
						.map(|tag| tag.trim().to_ascii_lowercase())
						.filter(|tag| !tag.is_empty()),
				);
			} else if values.iter().all(|value| value.trim().is_empty()) {
				tags.push(param.to_ascii_lowercase());
			}
		}

		tags
	}

	pub fn has_type(&self, tag: &str) -> bool {
		self.type_tags().iter().any(|candidate| candidate.eq_ignore_ascii_case(tag))
	}

	pub fn preference(&self) -> Option<u32> {
		let explicit = self
			.params
			.iter()
			.filter(|(param, _)| param == PARAM_PREF)
			.flat_map(|(_, values)| values.iter())
			.find_map(|value| value.trim().parse::<u32>().ok());

		explicit.or_else(|| self.has_type("pref").then_some(1))
	}

	pub fn text(&self) -> String {
		unescape_text(&self.value)
	}

	/// Splits a structured value (`N`, `ORG`, `ADR`) on unescaped semicolons.
	pub fn components(&self) -> Vec<String> {
		let mut components = Vec::new();
		let mut current = String::new();
		let mut chars = self.value.chars();

		while let Some(ch) = chars.next() {
			match ch {
				'\\' => {
					current.push(ch);

					if let Some(next) = chars.next() {
						current.push(next);
					}
				},
				';' => components.push(unescape_text(&std::mem::take(&mut current))),
				_ => current.push(ch),
			}
		}

		components.push(unescape_text(&current));

		components
	}
}

pub fn decode(raw: &str) -> Result<Card> {
	let raw = qualify_bare_parameters(raw);
	let mut parser = VcardParser::new(raw.as_bytes());
	let contact = match parser.next() {
		Some(Ok(contact)) => contact,
		Some(Err(err)) => return Err(Error::Vcard { message: err.to_string() }),
		None => return Err(Error::Vcard { message: "record contains no vCard.".to_string() }),
	};
	let properties = contact
		.properties
		.into_iter()
		.map(|property| {
			CardProperty::new(
				&property.name,
				property.params.unwrap_or_default(),
				property.value.as_deref().unwrap_or_default(),
			)
		})
		.collect();

	Ok(Card::new(properties))
}

/// Rewrites valueless vCard 2.1 parameters (`TEL;CELL:`) as `TYPE=CELL`, which the parser accepts.
fn qualify_bare_parameters(raw: &str) -> String {
	let mut out = String::with_capacity(raw.len());

	for line in raw.split_inclusive('\n') {
		// Folded continuation lines carry value text only.
		if line.starts_with([' ', '\t']) {
			out.push_str(line);

			continue;
		}

		let Some(colon) = unquoted_positions(line, ':').next() else {
			out.push_str(line);

			continue;
		};
		let (head, rest) = line.split_at(colon);
		let mut start = 0;

		for end in unquoted_positions(head, ';').chain([head.len()]) {
			let segment = &head[start..end];

			if start > 0 && !segment.is_empty() && !segment.contains('=') {
				out.push_str(PARAM_TYPE);
				out.push('=');
			}

			out.push_str(segment);

			if end < head.len() {
				out.push(';');
			}

			start = end + 1;
		}

		out.push_str(rest);
	}

	out
}

fn unquoted_positions(text: &str, target: char) -> impl Iterator<Item = usize> + use<'_> {
	let mut quoted = false;

	text.char_indices().filter_map(move |(idx, ch)| {
		if ch == '"' {
			quoted = !quoted;
		}

		(!quoted && ch == target).then_some(idx)
	})
}

fn unescape_text(raw: &str) -> String {
	let mut out = String::with_capacity(raw.len());
	let mut chars = raw.chars();

	while let Some(ch) = chars.next() {
		if ch != '\\' {
			out.push(ch);

			continue;
		}

		match chars.next() {
			Some('n' | 'N') => out.push('\n'),
			Some(other) => out.push(other),
			None => out.push('\\'),
		}
	}

	out.trim().to_string()
}
