//! Interview session data
//!
//! This module provides the read-only view of a candidate's session as the
//! session access gateway describes it:
//! - Campaign title and description
//! - The ordered question list with per-question timing
//! - Status and single-use flag checked before the interview may start

mod descriptor;

pub use descriptor::{Campaign, Question, SessionDescriptor, SessionStatus, StartReceipt};
