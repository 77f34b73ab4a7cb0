use std::collections::HashMap;

use sogodap_domain::{
	ExtractorRegistry, FilterExpr, FilterTemplates, Scope, SearchSpec, aggregate, filter,
};

const JOHN: &str = "BEGIN:VCARD\r\nVERSION:3.0\r\nFN:John Doe\r\nN:Doe;John;;;\r\nTEL;TYPE=CELL:+44 7700 900001\r\nEND:VCARD\r\n";
const JANE: &str = "BEGIN:VCARD\r\nVERSION:3.0\r\nFN:Jane Doe\r\nN:Doe;Jane;;;\r\nTEL;TYPE=WORK:+44 20 7946 0001\r\nEND:VCARD\r\n";
const ADAM: &str = "BEGIN:VCARD\r\nVERSION:3.0\r\nFN:Adam Ant\r\nN:Ant;Adam;;;\r\nTEL;TYPE=CELL:+44 7700 900003\r\nEND:VCARD\r\n";

fn spec(attributes: &[&str], size_limit: u32) -> SearchSpec {
	SearchSpec {
		base: "uid=alice".to_string(),
		scope: Scope::WholeSubtree,
		filter: FilterExpr::parse("(&(cn=John)(sn=Doe))").expect("filter should parse"),
		size_limit,
		attributes: attributes.iter().map(|name| name.to_string()).collect(),
	}
}

#[test]
fn documented_filter_translation() {
	let templates = FilterTemplates::new(&HashMap::from([
		("cn".to_string(), "_val_".to_string()),
		("sn".to_string(), ".*_val_.*".to_string()),
	]));
	let search = spec(&["cn"], 0);
	let fragment = templates.translate(&search.filter);

	assert_eq!(fragment, "c_content regexp 'John' and c_content regexp '.*Doe.*'");
	assert_eq!(
		filter::scoped_constraint(&fragment, Some(12), 100),
		" and c_folder_id = 12 and (c_content regexp 'John' and c_content regexp '.*Doe.*') limit 100"
	);
}

#[test]
fn records_flow_into_sorted_capped_entries() {
	let registry = ExtractorRegistry::default();
	let search = spec(&["cn", "mobile"], 2);
	let contacts = [JOHN, JANE, ADAM]
		.into_iter()
		.filter_map(|raw| registry.decode_record(raw, &search.attributes).expect("record decodes"))
		.collect::<Vec<_>>();

	assert_eq!(contacts.len(), 3);

	let limit = aggregate::effective_size_limit(search.size_limit, 100);
	let entries = aggregate::compose(contacts, &search, 1, limit);

	assert_eq!(entries.len(), 2);

	for entry in &entries {
		let names: Vec<_> = entry.attributes.iter().map(|(name, _)| name.as_str()).collect();

		assert_eq!(names, vec!["cn", "mobile"]);
	}

	assert_eq!(entries[0].attributes[0].1, "Adam Ant");
	assert_eq!(entries[1].attributes[0].1, "Jane Doe");
	assert_eq!(entries[1].attributes[1].1, "");
}

#[test]
fn mobile_only_request_drops_contacts_without_cell_phone() {
	let registry = ExtractorRegistry::default();
	let attributes = vec!["mobile".to_string()];

	assert_eq!(
		registry
			.decode_record(JOHN, &attributes)
			.expect("record decodes")
			.map(|contact| contact.into_values()),
		Some(vec!["+44 7700 900001".to_string()])
	);
	assert!(registry.decode_record(JANE, &attributes).expect("record decodes").is_none());
}

#[test]
fn grouped_properties_are_extracted() {
	let registry = ExtractorRegistry::default();
	let raw = "BEGIN:VCARD\r\nVERSION:3.0\r\nFN:John Doe\r\nitem1.EMAIL;TYPE=INTERNET:j@x.com\r\nitem2.TEL;TYPE=CELL:555\r\nEND:VCARD\r\n";
	let attributes = vec!["cn".to_string(), "mail".to_string(), "mobile".to_string()];

	assert_eq!(
		registry
			.decode_record(raw, &attributes)
			.expect("record decodes")
			.map(|contact| contact.into_values()),
		Some(vec!["John Doe".to_string(), "j@x.com".to_string(), "555".to_string()])
	);
}

#[test]
fn vcard21_bare_cell_parameter_is_a_mobile() {
	let registry = ExtractorRegistry::default();
	let raw = "BEGIN:VCARD\r\nVERSION:2.1\r\nFN:John\r\nTEL;CELL:123\r\nEND:VCARD\r\n";
	let attributes = vec!["mobile".to_string()];

	assert_eq!(
		registry
			.decode_record(raw, &attributes)
			.expect("record decodes")
			.map(|contact| contact.into_values()),
		Some(vec!["123".to_string()])
	);
}
