/*!
 * Data Structures
 *
 * Small-string storage for process type names, stable keys and error text.
 * Most of these fit inline (≤23 bytes) and never touch the heap.
 */

mod inline_string;

pub use inline_string::InlineString;
