use std::collections::HashMap;

use crate::{Card, Result, vcard};

/// Attributes served when a client asks for every user attribute.
pub const STANDARD_ATTRIBUTES: [&str; 8] =
	["cn", "givenName", "sn", "o", "mail", "telephoneNumber", "homePhone", "mobile"];

/// Pulls one LDAP attribute value out of a decoded card.
pub type Extractor = fn(&Card) -> Option<String>;

/// Decoded attribute values aligned with the requested attribute list.
///
/// An empty string marks an attribute the card does not carry. A contact always has at least one
/// non-empty value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contact {
	values: Vec<String>,
}
impl Contact {
	/// Returns `None` when every value is empty.
	pub fn new(values: Vec<String>) -> Option<Self> {
		values.iter().any(|value| !value.is_empty()).then_some(Self { values })
	}

	pub fn values(&self) -> &[String] {
		&self.values
	}

	pub fn into_values(self) -> Vec<String> {
		self.values
	}
}

/// Maps lower-cased attribute names to extraction functions.
#[derive(Clone, Debug)]
pub struct ExtractorRegistry {
	extractors: HashMap<String, Extractor>,
}
impl ExtractorRegistry {
	pub fn empty() -> Self {
		Self { extractors: HashMap::new() }
	}

	pub fn register(&mut self, attribute: &str, extractor: Extractor) -> &mut Self {
		self.extractors.insert(attribute.to_ascii_lowercase(), extractor);

		self
	}

	pub fn supports(&self, attribute: &str) -> bool {
		self.extractors.contains_key(&attribute.to_ascii_lowercase())
	}

	/// Unknown attributes yield an empty value.
	pub fn extract(&self, attribute: &str, card: &Card) -> String {
		self.extractors
			.get(&attribute.to_ascii_lowercase())
			.and_then(|extractor| extractor(card))
			.unwrap_or_default()
	}

	pub fn decode_contact(&self, card: &Card, attributes: &[String]) -> Option<Contact> {
		Contact::new(attributes.iter().map(|attribute| self.extract(attribute, card)).collect())
	}

	/// Decodes one stored record. `Ok(None)` means the card carries none of the attributes.
	pub fn decode_record(&self, raw: &str, attributes: &[String]) -> Result<Option<Contact>> {
		let card = vcard::decode(raw)?;

		Ok(self.decode_contact(&card, attributes))
	}
}
impl Default for ExtractorRegistry {
	fn default() -> Self {
		let mut registry = Self::empty();

		registry
			.register("cn", formatted_name)
			.register("givenname", given_name)
			.register("sn", family_name)
			.register("o", organization)
			.register("mail", email)
			.register("telephonenumber", work_phone)
			.register("homephone", home_phone)
			.register("mobile", cell_phone);

		registry
	}
}

fn formatted_name(card: &Card) -> Option<String> {
	card.preferred_text("FN")
}

fn given_name(card: &Card) -> Option<String> {
	name_component(card, 1)
}

fn family_name(card: &Card) -> Option<String> {
	name_component(card, 0)
}

fn organization(card: &Card) -> Option<String> {
	card.preferred("ORG")?.components().into_iter().next().filter(|name| !name.is_empty())
}

fn email(card: &Card) -> Option<String> {
	card.preferred_text("EMAIL")
}

fn work_phone(card: &Card) -> Option<String> {
	telephone(card, "work")
}

fn home_phone(card: &Card) -> Option<String> {
	telephone(card, "home")
}

fn cell_phone(card: &Card) -> Option<String> {
	telephone(card, "cell")
}

fn name_component(card: &Card, index: usize) -> Option<String> {
	card.preferred("N")?.components().into_iter().nth(index).filter(|part| !part.is_empty())
}

/// First `TEL` carrying the requested type tag.
fn telephone(card: &Card, tag: &str) -> Option<String> {
	card.properties("TEL")
		.find(|phone| phone.has_type(tag))
		.map(|phone| phone.text())
		.filter(|number| !number.is_empty())
}
