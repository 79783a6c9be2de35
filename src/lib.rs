//! # formbase
//!
//! Turns submitted form data into typed documents and writes them to a
//! document database through its N1QL query endpoint.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use formbase::prelude::*;
//!
//! let schema = Schema::from_specs(["aid", "name", "age:int", "nick,omitempty"])?;
//! let form = FormValues::from_urlencoded("aid=u%3A%3A1&name=Al&age=42&nick=");
//!
//! let db = DocDb::connect(FormbaseConfig::discover(None)?.connection)?;
//! let result = db.insert(&form, &schema).await?;
//! // => INSERT INTO users (KEY, VALUE) VALUES ("u::1", {"aid":"u::1","name":"Al","age":42}) RETURNING *
//! ```
//!
//! ## Pipeline
//!
//! | Stage        | Module        | Output             |
//! |--------------|---------------|--------------------|
//! | Schema       | [`schema`]    | `Schema`           |
//! | Omission     | [`omission`]  | `OmissionSet`      |
//! | Projection   | [`projector`] | `Vec<RawField>`    |
//! | Coercion     | [`coerce`]    | `ProjectedRecord`  |
//! | Statement    | [`statement`] | statement text     |

pub mod coerce;
pub mod config;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod form;
pub mod omission;
pub mod parser;
pub mod projector;
pub mod schema;
pub mod statement;

pub use coerce::{CoercionMode, ProjectedRecord, Value};
pub use engine::DocDb;
pub use envelope::ResultEnvelope;
pub use error::{FormbaseError, FormbaseResult};
pub use form::FormValues;
pub use schema::{FieldDescriptor, FieldKind, FormRecord, Schema};

pub mod prelude {
    pub use crate::coerce::{CoercionMode, ProjectedEntry, ProjectedRecord, Value};
    pub use crate::config::{ConnectionConfig, FormbaseConfig};
    pub use crate::engine::{DocDb, probe_reachable};
    pub use crate::envelope::{Metrics, QueryErrorEntry, ResultEnvelope};
    pub use crate::error::*;
    pub use crate::form::FormValues;
    pub use crate::omission::{OmissionSet, omission_set};
    pub use crate::schema::{FieldDescriptor, FieldKind, FormRecord, Schema};
    pub use crate::statement::{
        Mutation, MutationKind, StatementEnvelope, ToStatement, build_insert_statement,
        build_upsert_statement,
    };
}

/// Project a form onto a typed record.
///
/// # Example
///
/// ```
/// use formbase::{CoercionMode, FieldDescriptor, FormRecord, FormValues, Schema};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Login {
///     aid: String,
///     attempts: i32,
/// }
///
/// impl FormRecord for Login {
///     fn schema() -> Schema {
///         Schema::new(vec![FieldDescriptor::string("aid"), FieldDescriptor::int("attempts")]).unwrap()
///     }
/// }
///
/// let form = FormValues::new().with("aid", "l::7").with("attempts", "3");
/// let login: Login = formbase::process(&form, CoercionMode::Lenient).unwrap();
/// assert_eq!(login.attempts, 3);
/// ```
pub fn process<T: FormRecord>(form: &FormValues, mode: CoercionMode) -> FormbaseResult<T> {
    ProjectedRecord::from_form(&T::schema(), form, mode)?.populate()
}
