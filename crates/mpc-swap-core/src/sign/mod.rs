//! Two-party threshold signing
//!
//! Signing starts once both parties hold a key share and the initiator has
//! built the unsigned trade transaction. Four wire messages:
//!
//! | # | Sender | Producer |
//! |---|--------|----------|
//! | 1 | I→R | `I.step1()` |
//! | 2 | R→I | `R.step1(msg1)` |
//! | 3 | I→R | `I.step2(msg2)` |
//! | 4 | R→I | `R.step2(msg3)` |
//!
//! The initiator finishes with `I.step3(msg4)` and exports `(r, s, v)`. The
//! responder is done once message 4 is sent.

mod coordinator;
pub(crate) mod dsg;

pub use coordinator::{
    InitiatorSigning, InitiatorSigningState, ResponderSigning, ResponderSigningState,
};
pub use dsg::{ReferenceInitiatorSign, ReferenceResponderSign};
