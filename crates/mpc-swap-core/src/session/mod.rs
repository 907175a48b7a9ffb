//! # Session Driver
//!
//! One [`Session`] per trade attempt. It owns the message channel, checks
//! every inbound message against the role's position in the handshake, and
//! tears everything down on the first error.
//!
//! ## Lifecycle
//!
//! ```text
//! Keygen ──► Approval ──► Building ──► Signing ──► Done
//!    │           │            │           │
//!    └───────────┴────────────┴───────────┴──────► Aborted
//! ```
//!
//! The responder skips `Building`: only the initiator assembles the
//! transaction. Sessions are single-use and never resumed.

mod initiator;
mod responder;

pub use initiator::{InitiatorOutcome, run_initiator};
pub use responder::{ResponderOutcome, run_responder};

use crate::chain::{ChainProvider, ChainSigner};
use crate::mpc::{ReferenceEngine, ThresholdEngine};
use crate::protocol::{HandshakeStep, InboundSequence};
use crate::trade::{AtomicSwapContract, ContractAssembler};
use crate::transport::{DEFAULT_MAX_FRAME_LEN, MessageChannel, OutboundGauge, ProtocolMessage};
use crate::types::{Role, SessionId};
use crate::{Error, Result};
use alloy_primitives::U256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

/// Default amount sent to the funding address before building (0.02 ETH)
pub const DEFAULT_BOOTSTRAP_FUNDING_WEI: u64 = 20_000_000_000_000_000;

// ============================================================================
// Configuration
// ============================================================================

/// Per-session settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Wei the initiator sends to the funding address to cover deployment gas
    #[serde(default = "default_bootstrap_funding")]
    pub bootstrap_funding: U256,

    /// Give up on a silent peer after this many milliseconds
    #[serde(default)]
    pub inbound_timeout_ms: Option<u64>,

    /// Largest inbound frame accepted
    #[serde(default = "default_max_frame_len")]
    pub max_frame_len: usize,
}

fn default_bootstrap_funding() -> U256 {
    U256::from(DEFAULT_BOOTSTRAP_FUNDING_WEI)
}

fn default_max_frame_len() -> usize {
    DEFAULT_MAX_FRAME_LEN
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bootstrap_funding: default_bootstrap_funding(),
            inbound_timeout_ms: None,
            max_frame_len: default_max_frame_len(),
        }
    }
}

impl SessionConfig {
    pub fn with_bootstrap_funding(mut self, wei: U256) -> Self {
        self.bootstrap_funding = wei;
        self
    }

    pub fn with_inbound_timeout(mut self, timeout: Duration) -> Self {
        self.inbound_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    pub fn inbound_timeout(&self) -> Option<Duration> {
        self.inbound_timeout_ms.map(Duration::from_millis)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_frame_len == 0 {
            return Err(Error::InvalidConfig("max_frame_len must be positive".into()));
        }
        if self.inbound_timeout_ms == Some(0) {
            return Err(Error::InvalidConfig(
                "inbound_timeout_ms must be positive when set".into(),
            ));
        }
        Ok(())
    }
}

/// Collaborators a session runs against
///
/// Shared across sessions; none of them hold per-session state.
#[derive(Clone)]
pub struct TradeContext {
    pub provider: Arc<dyn ChainProvider>,
    pub signer: Arc<dyn ChainSigner>,
    pub engine: Arc<dyn ThresholdEngine>,
    pub assembler: Arc<dyn ContractAssembler>,
    pub config: SessionConfig,
}

impl TradeContext {
    /// Context with the reference engine and the atomic swap contract
    pub fn new(provider: Arc<dyn ChainProvider>, signer: Arc<dyn ChainSigner>) -> Self {
        Self {
            provider,
            signer,
            engine: Arc::new(ReferenceEngine::new()),
            assembler: Arc::new(AtomicSwapContract::new()),
            config: SessionConfig::default(),
        }
    }

    pub fn with_engine(mut self, engine: Arc<dyn ThresholdEngine>) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_assembler(mut self, assembler: Arc<dyn ContractAssembler>) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }
}

impl fmt::Debug for TradeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TradeContext")
            .field("signer", &self.signer.address())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Session
// ============================================================================

/// Coarse progress marker, used for logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Keygen,
    Approval,
    Building,
    Signing,
    Done,
    Aborted,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Keygen => "keygen",
            SessionPhase::Approval => "approval",
            SessionPhase::Building => "building",
            SessionPhase::Signing => "signing",
            SessionPhase::Done => "done",
            SessionPhase::Aborted => "aborted",
        };
        write!(f, "{}", name)
    }
}

/// One side of one trade attempt
pub struct Session<S> {
    id: SessionId,
    role: Role,
    started_at: DateTime<Utc>,
    phase: SessionPhase,
    channel: MessageChannel<S>,
    inbound: InboundSequence,
    timeout: Option<Duration>,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Open a session over `stream`
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(role: Role, stream: S, config: &SessionConfig) -> Result<Self> {
        config.validate()?;
        let session = Self {
            id: SessionId::new_v4(),
            role,
            started_at: Utc::now(),
            phase: SessionPhase::Keygen,
            channel: MessageChannel::with_max_frame_len(stream, config.max_frame_len),
            inbound: InboundSequence::new(role),
            timeout: config.inbound_timeout(),
        };
        debug!(session_id = %session.id, role = %role, "Session opened");
        Ok(session)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Outbound backlog gauge; stays valid after the session ends
    pub fn outbound_gauge(&self) -> OutboundGauge {
        self.channel.gauge()
    }

    pub(crate) fn enter(&mut self, phase: SessionPhase) {
        debug!(session_id = %self.id, from = %self.phase, to = %phase, "Phase change");
        self.phase = phase;
    }

    /// Queue the message for `step`
    pub(crate) fn send(&self, step: HandshakeStep, message: impl Into<ProtocolMessage>) -> Result<()> {
        if step.sender() != self.role {
            return Err(Error::Internal(format!("{} cannot send {}", self.role, step)));
        }
        let message = message.into();
        debug!(session_id = %self.id, %step, len = message.len(), "Outbound message");
        self.channel.send(message)
    }

    /// Pull the message for `step`
    ///
    /// `step` must be the role's next inbound position. A closed stream or an
    /// expired timeout is fatal, like any malformed message.
    pub(crate) async fn recv(&mut self, step: HandshakeStep) -> Result<ProtocolMessage> {
        match self.inbound.expected() {
            Some(expected) if expected == step => {}
            Some(expected) => return Err(Error::order_violation(expected, step)),
            None => return Err(Error::order_violation("end of stream", step)),
        }

        let next = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.channel.recv())
                .await
                .map_err(|_| Error::Timeout(step.to_string()))?,
            None => self.channel.recv().await,
        };

        match next? {
            Some(message) => {
                self.inbound.advance(step)?;
                Ok(message)
            }
            None => Err(Error::StreamClosed(step.to_string())),
        }
    }

    /// Require the peer to end its stream now that every inbound step is in
    pub(crate) async fn expect_end(&mut self) -> Result<()> {
        let next = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.channel.recv())
                .await
                .map_err(|_| Error::Timeout("end of stream".into()))?,
            None => self.channel.recv().await,
        };
        match next? {
            None => Ok(()),
            Some(_) => self.inbound.reject_extra(),
        }
    }

    /// Flush outbound messages and close the stream
    pub async fn complete(mut self) -> Result<()> {
        self.enter(SessionPhase::Done);
        let elapsed_ms = (Utc::now() - self.started_at).num_milliseconds();
        let (id, role) = (self.id, self.role);
        self.channel.finish().await?;
        info!(session_id = %id, role = %role, elapsed_ms, "Session complete");
        Ok(())
    }

    /// Discard queued messages and close the stream; never fails
    ///
    /// Returns how many outbound messages were dropped unwritten.
    pub fn abort(mut self, error: &Error) -> usize {
        let failed_in = self.phase;
        self.enter(SessionPhase::Aborted);
        warn!(
            session_id = %self.id,
            role = %self.role,
            phase = %failed_in,
            kind = ?error.kind(),
            error = %error,
            "Session aborted"
        );
        self.channel.abort()
    }
}
