/*!
 * Persistence
 *
 * Durable snapshot of the process table and the key/blob stores it is written
 * to. The kernel writes a snapshot only when the host asks for one.
 */

pub mod snapshot;
pub mod store;

pub use snapshot::{ProcessDescriptor, RestoreSummary, Snapshot};
pub use store::{FileStore, MemoryStore, SnapshotStore};
