//! Drug label lookup against openFDA.

pub mod openfda;
pub mod query;

pub use openfda::{project_label, OpenFdaClient, OPENFDA_BASE_URL};
pub use query::{build_query, LookupQuery};
