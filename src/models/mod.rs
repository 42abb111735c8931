pub mod entry;

pub use entry::{
    CheckIn, QueueEntry, QueueSnapshot, QueueStatus, SelectedService, VerificationReason,
};
