//! Types shared between the NexaFlow server, services and CLI.

pub mod approval;
pub mod messages;
pub mod models;

pub use approval::{
    approval_request_message, generate_approval_token, parse_approval_reply, ApprovalAction,
    ApprovalReply,
};
pub use messages::*;
pub use models::*;
