//! trx-services: the state a transceiver context owns: the channel
//! directory, the message log, the session record, and the external
//! collaborators (content safety, summarization) the protocol consults.

pub mod directory;
pub mod message_store;
pub mod safety;
pub mod session;
pub mod summary;

pub use directory::{ChannelDirectory, ChannelStatus};
pub use message_store::MessageLog;
pub use safety::{AllowAll, Blocklist, ContentSafety};
pub use session::{Role, Session, SessionState};
pub use summary::{DigestSummarizer, Summarizer};
