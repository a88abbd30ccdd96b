//! clawdash-core: shared protocol library for the clawdash gateway client.
//!
//! Provides the JSON-RPC call envelopes, text frame codec, the message
//! normalizer, and the channel status map.

pub mod codec;
pub mod error;
pub mod normalize;
pub mod rpc;
pub mod status;

// Re-export commonly used items at crate root.
pub use codec::{decode_frame, decode_request, encode_request};
pub use error::{DashError, DashResult};
pub use normalize::{is_message_event, normalize, Direction, Message, MessageId};
pub use rpc::{methods, CallId, Frame, FrameKind, Request, RpcError, AUTH_CALL_ID};
pub use status::{status_update, ChannelStatusMap};
