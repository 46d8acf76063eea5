pub mod error;
pub mod varint;
pub mod message;
pub mod parser;
pub mod framing;
pub mod transport;
pub mod retry;
pub mod signer;
pub mod vesting;
pub mod session;
pub mod batch;
pub mod report;

pub use error::{ClaimError, ClaimResult, TransportError, WireError};
pub use parser::{parse_message, FieldKey, ParsedMessage, WireValue};
pub use transport::{HttpTransport, ReqwestTransport};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use signer::WalletSigner;
pub use session::{ClaimSession, SessionState, WalletOutcome};
pub use batch::{BatchEvent, BatchReport, BatchRunner, BatchSummary, WalletResult, WalletStatus};
