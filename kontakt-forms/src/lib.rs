//! Contact-form discovery and resilient filling.
//!
//! The crate is driver-agnostic: everything that touches a live page goes
//! through [`page::PageTarget`]. Matching runs on static HTML snapshots.
//!
//! - [`heuristic::match_document`]: deterministic role matching over one document
//! - [`oracle::OracleMatcher`]: language-model proposal when the heuristics find nothing
//! - [`fill::FillEngine`]: direct → frame → label → placeholder fill per role
//! - [`submit::trigger`] and [`consent::dismiss`]: ordered probe clicks
//! - [`site_override`]: fixed scripts for sites generic matching cannot handle
//! - [`pipeline::Pipeline`]: one URL end to end, producing a [`report::UrlReport`]
//!
//! # Examples
//!
//! ```rust
//! use kontakt_forms::{heuristic, FormField, Vocabulary};
//!
//! let html = r#"<form><input name="vorname"><input type="email" id="mail"></form>"#;
//! let mapping = heuristic::match_document(html, &Vocabulary::builtin()).unwrap();
//! assert_eq!(mapping.selector(FormField::FirstName), Some("input[name='vorname']"));
//! assert_eq!(mapping.selector(FormField::Email), Some("#mail"));
//! assert!(!mapping.is_filled(FormField::Name));
//! ```
pub mod catalog;
pub mod consent;
pub mod dom;
pub mod fill;
pub mod heuristic;
pub mod mapping;
pub mod oracle;
pub mod page;
pub mod pipeline;
pub mod probe;
pub mod record;
pub mod report;
pub mod role;
pub mod semantic;
pub mod site_override;
pub mod submit;

pub use catalog::{Vocabulary, VocabularyEntry};
pub use fill::{FillEngine, FillOutcome, Strategy};
pub use mapping::{FieldDescriptor, FieldMapping, MatchedBy, SourceAttributes};
pub use page::{OptionChoice, PageTarget, Scope};
pub use pipeline::{Batch, Pipeline, PipelineOptions};
pub use record::{ApplicantProfile, ApplicantRecord};
pub use report::{BatchReport, MappingSource, UrlReport};
pub use role::FormField;
