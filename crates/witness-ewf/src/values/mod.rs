//! Metadata value subsystem
//!
//! Everything textual in an EWF image flows through here: the header value
//! tables and their seven on-disk layouts, the hash value codecs, date
//! string conversion, and the serialized string / field reader pair used
//! by logical evidence file entries.

pub mod date;
pub mod hash;
pub mod header;
pub mod reader;
pub mod string;
pub mod table;
pub(crate) mod xml;

pub use hash::MediaDigest;
pub use reader::{ValueDataType, ValueReader};
pub use string::SerializedString;
pub use table::ValueTable;
