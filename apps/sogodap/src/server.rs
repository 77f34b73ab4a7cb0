//! LDAP front end: one task per client, requests handled in order.

use std::{iter, net::SocketAddr, sync::Arc};

use futures_util::{SinkExt, StreamExt};
use ldap3_proto::{
	LdapCodec,
	proto::{
		LdapBindCred, LdapBindRequest, LdapBindResponse, LdapFilter, LdapMsg, LdapOp,
		LdapPartialAttribute, LdapResult, LdapResultCode, LdapSearchRequest,
		LdapSearchResultEntry, LdapSearchScope, LdapSubstringFilter,
	},
};
use tokio::{
	net::{TcpListener, TcpStream, tcp::OwnedWriteHalf},
	sync::watch,
};
use tokio_util::codec::{FramedRead, FramedWrite};

use sogodap_domain::{FilterExpr, OutputEntry, Scope, SearchSpec, contact::STANDARD_ATTRIBUTES};
use sogodap_service::{BindOutcome, DirectoryService, SearchOutcome, SearchStatus};

const ALL_USER_ATTRIBUTES: &str = "*";
const ALL_OPERATIONAL_ATTRIBUTES: &str = "+";

/// Accepts clients until `shutdown` flips to `true` or its sender goes away.
///
/// Connections already accepted keep running on their own tasks.
pub async fn serve(
	listener: TcpListener,
	service: Arc<DirectoryService>,
	mut shutdown: watch::Receiver<bool>,
) {
	loop {
		tokio::select! {
			changed = shutdown.changed() => {
				if changed.is_err() || *shutdown.borrow() {
					break;
				}
			},
			accepted = listener.accept() => match accepted {
				Ok((stream, peer)) => {
					tokio::spawn(handle_connection(stream, peer, Arc::clone(&service)));
				},
				Err(err) => tracing::warn!(error = %err, "Failed to accept connection."),
			},
		}
	}
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, service: Arc<DirectoryService>) {
	let (reader, writer) = stream.into_split();
	let mut requests = FramedRead::new(reader, LdapCodec::new(None));
	let mut responses = FramedWrite::new(writer, LdapCodec::new(None));

	tracing::debug!(%peer, "Accepted connection.");

	while let Some(frame) = requests.next().await {
		let request = match frame {
			Ok(request) => request,
			Err(err) => {
				tracing::debug!(error = %err, %peer, "Dropping undecodable request.");

				break;
			},
		};
		let msgid = request.msgid;
		let replies = match request.op {
			LdapOp::BindRequest(bind) => vec![bind_reply(&service, msgid, bind)],
			LdapOp::SearchRequest(search) => {
				let spec = search_spec(search);

				tracing::info!(base = %spec.base, subtree = spec.is_subtree(), %peer, "Handling search.");

				search_replies(msgid, service.search(&spec).await)
			},
			LdapOp::UnbindRequest => break,
			LdapOp::AbandonRequest(_) => continue,
			_ => {
				tracing::warn!(%peer, msgid, "Unsupported operation on a read-only directory.");

				break;
			},
		};

		if let Err(err) = send_all(&mut responses, replies).await {
			tracing::debug!(error = %err, %peer, "Failed to write response.");

			break;
		}
	}

	tracing::info!(%peer, "Closing connection.");
}

async fn send_all(
	responses: &mut FramedWrite<OwnedWriteHalf, LdapCodec>,
	replies: Vec<LdapMsg>,
) -> std::io::Result<()> {
	for reply in replies {
		responses.feed(reply).await?;
	}

	responses.flush().await
}

fn bind_reply(service: &DirectoryService, msgid: i32, request: LdapBindRequest) -> LdapMsg {
	let code = match request.cred {
		LdapBindCred::Simple(password) => match service.bind(&request.dn, &password) {
			BindOutcome::Success => LdapResultCode::Success,
			BindOutcome::InvalidCredentials => LdapResultCode::InvalidCredentials,
		},
		_ => LdapResultCode::AuthMethodNotSupported,
	};

	message(msgid, LdapOp::BindResponse(LdapBindResponse { res: result(code), saslcreds: None }))
}

pub fn search_spec(request: LdapSearchRequest) -> SearchSpec {
	SearchSpec {
		scope: scope(&request.scope),
		filter: filter_expr(&request.filter),
		// Negative limits are treated as "no limit requested".
		size_limit: u32::try_from(request.sizelimit).unwrap_or(0),
		attributes: requested_attributes(&request.attrs),
		base: request.base,
	}
}

/// Entries first, then exactly one `SearchResultDone`.
pub fn search_replies(msgid: i32, outcome: SearchOutcome) -> Vec<LdapMsg> {
	let code = match outcome.status {
		SearchStatus::Success => LdapResultCode::Success,
		SearchStatus::NoSuchObject => LdapResultCode::NoSuchObject,
		SearchStatus::OperationsError => LdapResultCode::OperationsError,
	};

	outcome
		.entries
		.into_iter()
		.map(|entry| message(msgid, LdapOp::SearchResultEntry(result_entry(entry))))
		.chain(iter::once(message(msgid, LdapOp::SearchResultDone(result(code)))))
		.collect()
}

pub fn filter_expr(filter: &LdapFilter) -> FilterExpr {
	match filter {
		LdapFilter::And(children) => FilterExpr::And(children.iter().map(filter_expr).collect()),
		LdapFilter::Or(children) => FilterExpr::Or(children.iter().map(filter_expr).collect()),
		LdapFilter::Equality(attribute, value) => FilterExpr::leaf(attribute.as_str(), value),
		LdapFilter::Substring(attribute, substring) =>
			FilterExpr::leaf(attribute.as_str(), &substring_value(substring)),
		LdapFilter::Present(attribute) => FilterExpr::leaf(attribute.as_str(), ""),
		_ => FilterExpr::Unsupported,
	}
}

/// Expands `*` (or an empty list) to the standard attributes and drops duplicates.
pub fn requested_attributes(attrs: &[String]) -> Vec<String> {
	let mut requested: Vec<String> = Vec::new();
	let expanded: Vec<&str> = if attrs.is_empty() {
		STANDARD_ATTRIBUTES.to_vec()
	} else {
		attrs
			.iter()
			.flat_map(|attr| match attr.as_str() {
				ALL_USER_ATTRIBUTES => STANDARD_ATTRIBUTES.to_vec(),
				ALL_OPERATIONAL_ATTRIBUTES => Vec::new(),
				name => vec![name],
			})
			.collect()
	};

	for name in expanded {
		if !requested.iter().any(|known| known.eq_ignore_ascii_case(name)) {
			requested.push(name.to_string());
		}
	}

	requested
}

fn scope(scope: &LdapSearchScope) -> Scope {
	match scope {
		LdapSearchScope::Base => Scope::BaseObject,
		LdapSearchScope::OneLevel => Scope::SingleLevel,
		_ => Scope::WholeSubtree,
	}
}

fn substring_value(filter: &LdapSubstringFilter) -> String {
	let mut value = filter.initial.clone().unwrap_or_default();

	for part in &filter.any {
		value.push_str(part);
	}
	if let Some(last) = &filter.final_ {
		value.push_str(last);
	}

	value
}

fn result_entry(entry: OutputEntry) -> LdapSearchResultEntry {
	LdapSearchResultEntry {
		dn: entry.dn,
		attributes: entry
			.attributes
			.into_iter()
			.map(|(atype, value)| LdapPartialAttribute { atype, vals: vec![value.into_bytes()] })
			.collect(),
	}
}

fn result(code: LdapResultCode) -> LdapResult {
	LdapResult { code, matcheddn: String::new(), message: String::new(), referral: Vec::new() }
}

fn message(msgid: i32, op: LdapOp) -> LdapMsg {
	LdapMsg { msgid, op, ctrl: Vec::new() }
}
