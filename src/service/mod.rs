pub mod committer;
pub mod index;
pub mod intake;
pub mod notifier;
pub mod parser;
pub mod report;
pub mod session;
pub mod station;
pub mod validation;

pub use committer::ReconciliationCommitter;
pub use index::BinIndex;
pub use intake::ScanIntakeBuffer;
pub use notifier::{Notifier, TracingNotifier};
pub use parser::{parse_serial, SERIAL_CODE_LEN};
pub use session::{ClosingStore, MemoryStore, ScanSession, SessionEvent, SessionState};
pub use station::{ScanOutcome, ScanStation, StationHandle, StationSnapshot};
pub use validation::{validate, Verdict};
