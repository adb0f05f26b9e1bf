pub mod session;
pub mod sqlite_store;
pub mod store;

pub use session::{SessionStore, CREDENTIAL_KEY, SESSION_KEY};
pub use sqlite_store::SqliteStore;
pub use store::{InMemoryStore, KeyValueStore};
