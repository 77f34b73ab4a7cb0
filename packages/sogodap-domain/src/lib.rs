pub mod aggregate;
pub mod contact;
pub mod filter;
pub mod search;
pub mod vcard;

mod error;

pub use aggregate::OutputEntry;
pub use contact::{Contact, ExtractorRegistry};
pub use error::{Error, Result};
pub use filter::{FilterExpr, FilterTemplates};
pub use search::{Scope, SearchSpec};
pub use vcard::Card;
