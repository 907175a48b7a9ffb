//! Per-role key-generation state machines

use super::KeygenResult;
use crate::mpc::{InitiatorDkg, ResponderDkg, ThresholdEngine};
use crate::protocol::HandshakeStep;
use crate::transport::ProtocolMessage;
use crate::{Error, Result};
use tracing::debug;

/// Initiator keygen state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitiatorKeygenState {
    Start,
    AwaitingKeygen2,
    Done,
    Aborted,
}

/// Drives the initiator through Keygen1, Keygen2 and Keygen3
pub struct InitiatorKeygen {
    context: Option<Box<dyn InitiatorDkg>>,
    state: InitiatorKeygenState,
}

impl InitiatorKeygen {
    pub fn new(engine: &dyn ThresholdEngine) -> Self {
        Self {
            context: Some(engine.initiator_dkg()),
            state: InitiatorKeygenState::Start,
        }
    }

    pub fn state(&self) -> InitiatorKeygenState {
        self.state
    }

    /// Produce Keygen1
    pub fn start(&mut self) -> Result<ProtocolMessage> {
        if self.state != InitiatorKeygenState::Start {
            return Err(self.fail(Error::order_violation("Start", format!("{:?}", self.state))));
        }
        let result = self.context_mut()?.step1();
        let msg = self.guard(result)?;
        self.state = InitiatorKeygenState::AwaitingKeygen2;
        debug!(step = %HandshakeStep::Keygen1, "Keygen message produced");
        Ok(msg.into())
    }

    /// Consume Keygen2 and produce Keygen3
    pub fn handle(&mut self, step: HandshakeStep, message: ProtocolMessage) -> Result<ProtocolMessage> {
        match (self.state, step) {
            (InitiatorKeygenState::AwaitingKeygen2, HandshakeStep::Keygen2) => {
                let result = self.context_mut()?.step2(message.as_bytes());
                let reply = self.guard(result)?;
                self.state = InitiatorKeygenState::Done;
                debug!(step = %HandshakeStep::Keygen3, "Keygen message produced");
                Ok(reply.into())
            }
            (state, step) => Err(self.fail(Error::order_violation(format!("{:?}", state), step))),
        }
    }

    /// Export the key share once Keygen3 has been produced
    pub fn finish(&mut self) -> Result<KeygenResult> {
        if self.state != InitiatorKeygenState::Done {
            return Err(Error::EngineMisuse(format!(
                "keygen not complete: {:?}",
                self.state
            )));
        }
        let share = self.context_mut()?.export_share()?;
        self.context = None;
        KeygenResult::new(share)
    }

    /// Drop the engine context; never fails
    pub fn abort(&mut self) {
        self.context = None;
        self.state = InitiatorKeygenState::Aborted;
    }

    fn context_mut(&mut self) -> Result<&mut Box<dyn InitiatorDkg>> {
        self.context
            .as_mut()
            .ok_or_else(|| Error::EngineMisuse("keygen context released".into()))
    }

    fn guard<T>(&mut self, result: Result<T>) -> Result<T> {
        result.map_err(|e| self.fail(e))
    }

    fn fail(&mut self, error: Error) -> Error {
        self.abort();
        error
    }
}

/// Responder keygen state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponderKeygenState {
    AwaitingKeygen1,
    AwaitingKeygen3,
    Done,
    Aborted,
}

/// Drives the responder through Keygen1, Keygen2 and Keygen3
pub struct ResponderKeygen {
    context: Option<Box<dyn ResponderDkg>>,
    state: ResponderKeygenState,
}

impl ResponderKeygen {
    pub fn new(engine: &dyn ThresholdEngine) -> Self {
        Self {
            context: Some(engine.responder_dkg()),
            state: ResponderKeygenState::AwaitingKeygen1,
        }
    }

    pub fn state(&self) -> ResponderKeygenState {
        self.state
    }

    /// Consume an inbound keygen message
    ///
    /// Keygen1 yields Keygen2; Keygen3 completes the sub-protocol and yields
    /// nothing.
    pub fn handle(
        &mut self,
        step: HandshakeStep,
        message: ProtocolMessage,
    ) -> Result<Option<ProtocolMessage>> {
        match (self.state, step) {
            (ResponderKeygenState::AwaitingKeygen1, HandshakeStep::Keygen1) => {
                let result = self.context_mut()?.step1(message.as_bytes());
                let reply = self.guard(result)?;
                self.state = ResponderKeygenState::AwaitingKeygen3;
                debug!(step = %HandshakeStep::Keygen2, "Keygen message produced");
                Ok(Some(reply.into()))
            }
            (ResponderKeygenState::AwaitingKeygen3, HandshakeStep::Keygen3) => {
                let result = self.context_mut()?.step2(message.as_bytes());
                self.guard(result)?;
                self.state = ResponderKeygenState::Done;
                Ok(None)
            }
            (state, step) => Err(self.fail(Error::order_violation(format!("{:?}", state), step))),
        }
    }

    /// Export the key share once Keygen3 has been consumed
    pub fn finish(&mut self) -> Result<KeygenResult> {
        if self.state != ResponderKeygenState::Done {
            return Err(Error::EngineMisuse(format!(
                "keygen not complete: {:?}",
                self.state
            )));
        }
        let share = self.context_mut()?.export_share()?;
        self.context = None;
        KeygenResult::new(share)
    }

    /// Drop the engine context; never fails
    pub fn abort(&mut self) {
        self.context = None;
        self.state = ResponderKeygenState::Aborted;
    }

    fn context_mut(&mut self) -> Result<&mut Box<dyn ResponderDkg>> {
        self.context
            .as_mut()
            .ok_or_else(|| Error::EngineMisuse("keygen context released".into()))
    }

    fn guard<T>(&mut self, result: Result<T>) -> Result<T> {
        result.map_err(|e| self.fail(e))
    }

    fn fail(&mut self, error: Error) -> Error {
        self.abort();
        error
    }
}
