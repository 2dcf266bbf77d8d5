pub mod bin;
pub mod close_day;
pub mod serial;

pub use bin::{Bin, Pack};
pub use close_day::{BinClosed, CloseDayRequest, ClosingLine, EntryMethod, ReconciliationSummary};
pub use serial::{ParsedSerial, ScannedClosing};
