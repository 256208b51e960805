// unleashed-api: Async client for the Ruckus Unleashed management interface
//
// Covers the transport half of a scrape: building HTTP clients for
// self-signed devices, the three-step form login that yields a session
// record, fetching the `_cmdstat.jsp` status documents, and turning the
// XML replies into a generic `Node` tree.

pub mod client;
pub mod error;
pub mod query;
pub mod session;
pub mod transport;
pub mod xml;

pub use client::DeviceClient;
pub use error::Error;
pub use query::StatQuery;
pub use session::{CookieSet, SessionRecord};
pub use transport::{TlsMode, TransportConfig};
pub use xml::{Node, Record, find_all};
