//! Reference two-party DKG contexts

use crate::mpc::reference::{commit, scalar_from_slice};
use crate::mpc::{EngineMessage, EngineRound, InitiatorDkg, ResponderDkg};
use crate::types::{decode_point, encode_point};
use crate::{Error, KeyShare, Result, Role};
use k256::{ProjectivePoint, Scalar, elliptic_curve::Field};
use rand::rngs::OsRng;
use tracing::debug;
use zeroize::Zeroize;

enum InitiatorState {
    Start,
    Committed {
        secret: Scalar,
        public_share: ProjectivePoint,
        blinding: [u8; 32],
    },
    Complete(KeyShare),
    Failed,
}

impl Zeroize for InitiatorState {
    fn zeroize(&mut self) {
        match self {
            InitiatorState::Committed {
                secret, blinding, ..
            } => {
                secret.zeroize();
                blinding.zeroize();
            }
            InitiatorState::Complete(share) => share.zeroize(),
            InitiatorState::Start | InitiatorState::Failed => {}
        }
    }
}

impl Drop for InitiatorState {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// Initiator DKG context
///
/// 1. Commits to `Q1 = x1·G`
/// 2. On receiving `Q2`, opens the commitment and hands over its material
pub struct ReferenceInitiatorDkg {
    state: InitiatorState,
}

impl ReferenceInitiatorDkg {
    pub fn new() -> Self {
        Self {
            state: InitiatorState::Start,
        }
    }
}

impl Default for ReferenceInitiatorDkg {
    fn default() -> Self {
        Self::new()
    }
}

impl InitiatorDkg for ReferenceInitiatorDkg {
    fn step1(&mut self) -> Result<Vec<u8>> {
        if !matches!(self.state, InitiatorState::Start) {
            self.state = InitiatorState::Failed;
            return Err(Error::EngineMisuse("initiator keygen step1 already run".into()));
        }

        let secret = Scalar::random(&mut OsRng);
        let public_share = ProjectivePoint::GENERATOR * secret;
        let blinding: [u8; 32] = rand::random();
        let commitment = commit(&encode_point(&public_share), &blinding);

        debug!("Keygen: committed to initiator public share");
        self.state = InitiatorState::Committed {
            secret,
            public_share,
            blinding,
        };

        EngineMessage::KeygenCommit { commitment }.encode()
    }

    fn step2(&mut self, message: &[u8]) -> Result<Vec<u8>> {
        let InitiatorState::Committed {
            secret,
            public_share,
            blinding,
        } = std::mem::replace(&mut self.state, InitiatorState::Failed)
        else {
            return Err(Error::EngineMisuse(
                "initiator keygen step2 requires step1".into(),
            ));
        };

        let EngineMessage::KeygenShare {
            public_share: counterparty_share,
        } = EngineMessage::decode(message, EngineRound::KeygenShare)?
        else {
            return Err(Error::Internal("decoded unexpected keygen round".into()));
        };

        let q2 = decode_point(&counterparty_share)?;
        if q2 == ProjectivePoint::IDENTITY {
            return Err(Error::VerificationFailed(
                "Responder public share is the identity".into(),
            ));
        }
        let joint = public_share + q2;

        let reveal = EngineMessage::KeygenReveal {
            public_share: encode_point(&public_share),
            blinding,
            material: secret.to_bytes().to_vec(),
        }
        .encode()?;

        self.state = InitiatorState::Complete(KeyShare {
            role: Role::Initiator,
            secret_share: secret,
            public_key: encode_point(&joint),
            counterparty_material: counterparty_share,
        });

        debug!("Keygen: initiator share complete");
        Ok(reveal)
    }

    fn export_share(&self) -> Result<KeyShare> {
        match &self.state {
            InitiatorState::Complete(share) => Ok(share.clone()),
            _ => Err(Error::EngineMisuse(
                "initiator key share exported before completion".into(),
            )),
        }
    }
}

enum ResponderState {
    Start,
    AwaitingReveal {
        commitment: [u8; 32],
        secret: Scalar,
        public_share: ProjectivePoint,
    },
    Complete(KeyShare),
    Failed,
}

impl Zeroize for ResponderState {
    fn zeroize(&mut self) {
        match self {
            ResponderState::AwaitingReveal { secret, .. } => secret.zeroize(),
            ResponderState::Complete(share) => share.zeroize(),
            ResponderState::Start | ResponderState::Failed => {}
        }
    }
}

impl Drop for ResponderState {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// Responder DKG context
///
/// 1. Stores the initiator's commitment and answers with `Q2 = x2·G`
/// 2. Checks the opening and the initiator's material against `Q1`
pub struct ReferenceResponderDkg {
    state: ResponderState,
}

impl ReferenceResponderDkg {
    pub fn new() -> Self {
        Self {
            state: ResponderState::Start,
        }
    }
}

impl Default for ReferenceResponderDkg {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponderDkg for ReferenceResponderDkg {
    fn step1(&mut self, message: &[u8]) -> Result<Vec<u8>> {
        if !matches!(self.state, ResponderState::Start) {
            self.state = ResponderState::Failed;
            return Err(Error::EngineMisuse("responder keygen step1 already run".into()));
        }
        self.state = ResponderState::Failed;

        let EngineMessage::KeygenCommit { commitment } =
            EngineMessage::decode(message, EngineRound::KeygenCommit)?
        else {
            return Err(Error::Internal("decoded unexpected keygen round".into()));
        };

        let secret = Scalar::random(&mut OsRng);
        let public_share = ProjectivePoint::GENERATOR * secret;

        self.state = ResponderState::AwaitingReveal {
            commitment,
            secret,
            public_share,
        };

        debug!("Keygen: responder public share generated");
        EngineMessage::KeygenShare {
            public_share: encode_point(&public_share),
        }
        .encode()
    }

    fn step2(&mut self, message: &[u8]) -> Result<()> {
        let ResponderState::AwaitingReveal {
            commitment,
            secret,
            public_share,
        } = std::mem::replace(&mut self.state, ResponderState::Failed)
        else {
            return Err(Error::EngineMisuse(
                "responder keygen step2 requires step1".into(),
            ));
        };

        let EngineMessage::KeygenReveal {
            public_share: q1_bytes,
            blinding,
            material,
        } = EngineMessage::decode(message, EngineRound::KeygenReveal)?
        else {
            return Err(Error::Internal("decoded unexpected keygen round".into()));
        };

        if commit(&q1_bytes, &blinding) != commitment {
            return Err(Error::VerificationFailed(
                "Initiator public share does not match commitment".into(),
            ));
        }

        let q1 = decode_point(&q1_bytes)?;
        let x1 = scalar_from_slice(&material)?;
        if ProjectivePoint::GENERATOR * x1 != q1 {
            return Err(Error::VerificationFailed(
                "Initiator material does not match its public share".into(),
            ));
        }

        let joint = q1 + public_share;
        self.state = ResponderState::Complete(KeyShare {
            role: Role::Responder,
            secret_share: secret,
            public_key: encode_point(&joint),
            counterparty_material: material,
        });

        debug!("Keygen: responder share complete");
        Ok(())
    }

    fn export_share(&self) -> Result<KeyShare> {
        match &self.state {
            ResponderState::Complete(share) => Ok(share.clone()),
            _ => Err(Error::EngineMisuse(
                "responder key share exported before completion".into(),
            )),
        }
    }
}
