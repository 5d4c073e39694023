pub(crate) mod connection;
pub(crate) mod cursor;
pub(crate) mod store;

pub use connection::{Connection, ConnectionConfig};
pub use cursor::DocumentCursor;
pub use store::{Collection, DocumentStore};
