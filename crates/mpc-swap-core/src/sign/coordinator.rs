//! Per-role signing state machines

use crate::mpc::{InitiatorSign, ResponderSign, ThresholdEngine};
use crate::protocol::HandshakeStep;
use crate::transport::ProtocolMessage;
use crate::{Error, KeyShare, Result, Signature};
use tracing::debug;

/// Initiator signing state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitiatorSigningState {
    Start,
    AwaitingSign2,
    AwaitingSign4,
    Done,
    Aborted,
}

/// Drives the initiator through Sign1 to Sign4
pub struct InitiatorSigning {
    context: Option<Box<dyn InitiatorSign>>,
    state: InitiatorSigningState,
}

impl InitiatorSigning {
    /// Seed a signing context with the key share and the transaction hash
    pub fn new(engine: &dyn ThresholdEngine, share: &KeyShare, message_hash: [u8; 32]) -> Result<Self> {
        Ok(Self {
            context: Some(engine.initiator_sign(share, message_hash)?),
            state: InitiatorSigningState::Start,
        })
    }

    pub fn state(&self) -> InitiatorSigningState {
        self.state
    }

    /// Produce Sign1
    pub fn start(&mut self) -> Result<ProtocolMessage> {
        if self.state != InitiatorSigningState::Start {
            return Err(self.fail(Error::order_violation("Start", format!("{:?}", self.state))));
        }
        let result = self.context_mut()?.step1();
        let msg = self.guard(result)?;
        self.state = InitiatorSigningState::AwaitingSign2;
        debug!(step = %HandshakeStep::Sign1, "Signing message produced");
        Ok(msg.into())
    }

    /// Consume Sign2 (yields Sign3) or Sign4 (yields nothing)
    pub fn handle(
        &mut self,
        step: HandshakeStep,
        message: ProtocolMessage,
    ) -> Result<Option<ProtocolMessage>> {
        match (self.state, step) {
            (InitiatorSigningState::AwaitingSign2, HandshakeStep::Sign2) => {
                let result = self.context_mut()?.step2(message.as_bytes());
                let reply = self.guard(result)?;
                self.state = InitiatorSigningState::AwaitingSign4;
                debug!(step = %HandshakeStep::Sign3, "Signing message produced");
                Ok(Some(reply.into()))
            }
            (InitiatorSigningState::AwaitingSign4, HandshakeStep::Sign4) => {
                let result = self.context_mut()?.step3(message.as_bytes());
                self.guard(result)?;
                self.state = InitiatorSigningState::Done;
                Ok(None)
            }
            (state, step) => Err(self.fail(Error::order_violation(format!("{:?}", state), step))),
        }
    }

    /// Export `(r, s, v)` and release the context
    pub fn finish(&mut self) -> Result<Signature> {
        if self.state != InitiatorSigningState::Done {
            return Err(Error::SignatureExport(format!(
                "signing not complete: {:?}",
                self.state
            )));
        }
        let result = self.context_mut()?.export_signature();
        let signature = self.guard(result)?;
        self.context = None;
        Ok(signature)
    }

    /// Drop the engine context; never fails
    pub fn abort(&mut self) {
        self.context = None;
        self.state = InitiatorSigningState::Aborted;
    }

    fn context_mut(&mut self) -> Result<&mut Box<dyn InitiatorSign>> {
        self.context
            .as_mut()
            .ok_or_else(|| Error::EngineMisuse("signing context released".into()))
    }

    fn guard<T>(&mut self, result: Result<T>) -> Result<T> {
        result.map_err(|e| self.fail(e))
    }

    fn fail(&mut self, error: Error) -> Error {
        self.abort();
        error
    }
}

/// Responder signing state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponderSigningState {
    AwaitingSign1,
    AwaitingSign3,
    Done,
    Aborted,
}

/// Drives the responder through Sign1 to Sign4
pub struct ResponderSigning {
    context: Option<Box<dyn ResponderSign>>,
    state: ResponderSigningState,
}

impl ResponderSigning {
    /// Seed a signing context with the key share and the transaction hash
    pub fn new(engine: &dyn ThresholdEngine, share: &KeyShare, message_hash: [u8; 32]) -> Result<Self> {
        Ok(Self {
            context: Some(engine.responder_sign(share, message_hash)?),
            state: ResponderSigningState::AwaitingSign1,
        })
    }

    pub fn state(&self) -> ResponderSigningState {
        self.state
    }

    /// Consume Sign1 (yields Sign2) or Sign3 (yields Sign4)
    pub fn handle(&mut self, step: HandshakeStep, message: ProtocolMessage) -> Result<ProtocolMessage> {
        match (self.state, step) {
            (ResponderSigningState::AwaitingSign1, HandshakeStep::Sign1) => {
                let result = self.context_mut()?.step1(message.as_bytes());
                let reply = self.guard(result)?;
                self.state = ResponderSigningState::AwaitingSign3;
                debug!(step = %HandshakeStep::Sign2, "Signing message produced");
                Ok(reply.into())
            }
            (ResponderSigningState::AwaitingSign3, HandshakeStep::Sign3) => {
                let result = self.context_mut()?.step2(message.as_bytes());
                let reply = self.guard(result)?;
                self.state = ResponderSigningState::Done;
                self.context = None;
                debug!(step = %HandshakeStep::Sign4, "Signing message produced");
                Ok(reply.into())
            }
            (state, step) => Err(self.fail(Error::order_violation(format!("{:?}", state), step))),
        }
    }

    /// Drop the engine context; never fails
    pub fn abort(&mut self) {
        self.context = None;
        self.state = ResponderSigningState::Aborted;
    }

    fn context_mut(&mut self) -> Result<&mut Box<dyn ResponderSign>> {
        self.context
            .as_mut()
            .ok_or_else(|| Error::EngineMisuse("signing context released".into()))
    }

    fn guard<T>(&mut self, result: Result<T>) -> Result<T> {
        result.map_err(|e| self.fail(e))
    }

    fn fail(&mut self, error: Error) -> Error {
        self.abort();
        error
    }
}
