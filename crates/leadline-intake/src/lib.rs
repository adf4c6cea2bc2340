//! Slot-filling state machine for lead intake.
//!
//! Every field moves through `Unset -> PendingConfirm -> Confirmed`, or
//! through `Extracted` first when the caller volunteers it while another
//! read-back is outstanding. Exactly one read-back is pending at a time,
//! and the next question is always the earliest unset required field in
//! canonical order, so volunteered values never reorder the conversation.
//!
//! The machine does no I/O; callers persist [`IntakeState`] as JSON after
//! every change and serialize access to it themselves.

pub mod field;
pub mod normalize;
pub mod prompts;
pub mod state;

pub use field::Field;
pub use normalize::ValidationError;
pub use prompts::Guidance;
pub use state::{
    Candidate, IntakeError, IntakeState, Origin, PendingConfirmation, SaveOutcome, Slot,
    CONFIRMATION_FIELD, VEHICLE_FIELD,
};
