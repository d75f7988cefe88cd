pub mod connection;
pub mod datastore;
pub(crate) mod rpc_error;
pub mod serializer;

pub use connection::{Connection, ConnectionBuilder, RequestContext};
pub use serializer::JsonSerializer;
