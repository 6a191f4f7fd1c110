//! Workflow Module
//!
//! Verification requests and the end-to-end [`Verifier`].

pub mod request;
pub mod verifier;

pub use request::{DoseInput, MentionInput, VerificationRequest};
pub use verifier::Verifier;
