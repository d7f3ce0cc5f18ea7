//! Line-delimited JSON chat stream: framing, record parsing, and the
//! cancellable pump that ties them to a byte source.

pub mod event;
pub mod lines;
pub mod reader;

pub use event::{EventKind, StreamEvent, parse_line};
pub use lines::LineFramer;
pub use reader::{StreamOutcome, StreamSlot, pump};
