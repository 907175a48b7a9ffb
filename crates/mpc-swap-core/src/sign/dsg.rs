//! Reference two-party signing contexts

use crate::mpc::reference::{commit, scalar_from_slice};
use crate::mpc::{EngineMessage, EngineRound, InitiatorSign, ResponderSign};
use crate::types::{decode_point, encode_point};
use crate::{Error, KeyShare, Result, Role, Signature};
use k256::{
    ProjectivePoint, Scalar,
    ecdsa::{self, RecoveryId, VerifyingKey},
    elliptic_curve::{Field, bigint::U256, ops::Reduce, sec1::ToEncodedPoint},
};
use rand::rngs::OsRng;
use tracing::debug;
use zeroize::Zeroize;

enum InitiatorState {
    Start,
    Committed {
        nonce: Scalar,
        nonce_point: ProjectivePoint,
        blinding: [u8; 32],
    },
    Revealed {
        nonce: Scalar,
        joint_nonce: ProjectivePoint,
    },
    Complete(Signature),
    Failed,
}

impl Zeroize for InitiatorState {
    fn zeroize(&mut self) {
        match self {
            InitiatorState::Committed {
                nonce, blinding, ..
            } => {
                nonce.zeroize();
                blinding.zeroize();
            }
            InitiatorState::Revealed { nonce, .. } => nonce.zeroize(),
            InitiatorState::Start | InitiatorState::Complete(_) | InitiatorState::Failed => {}
        }
    }
}

impl Drop for InitiatorState {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// Initiator signing context
///
/// 1. Commits to `R1 = k1·G`
/// 2. On receiving `R2`, computes `R = k1·R2` and opens the commitment
/// 3. Finishes the responder's partial with `s = k1⁻¹·s'`
pub struct ReferenceInitiatorSign {
    verifying_key: VerifyingKey,
    message_hash: [u8; 32],
    state: InitiatorState,
}

impl ReferenceInitiatorSign {
    pub fn new(share: &KeyShare, message_hash: [u8; 32]) -> Result<Self> {
        if share.role != Role::Initiator {
            return Err(Error::EngineMisuse(format!(
                "initiator signing context seeded with {} share",
                share.role
            )));
        }
        Ok(Self {
            verifying_key: share.verifying_key()?,
            message_hash,
            state: InitiatorState::Start,
        })
    }

    fn finalize(&self, r: Scalar, s: Scalar) -> Result<Signature> {
        let signature = ecdsa::Signature::from_scalars(r.to_bytes(), s.to_bytes())
            .map_err(|e| Error::SignatureExport(e.to_string()))?;
        let signature = signature.normalize_s().unwrap_or(signature);

        // Recovering against the joint key also verifies the signature
        let recovery_id = RecoveryId::trial_recovery_from_prehash(
            &self.verifying_key,
            &self.message_hash,
            &signature,
        )
        .map_err(|_| Error::SignatureExport("signature does not verify against joint key".into()))?;

        let bytes = signature.to_bytes();
        let mut r_bytes = [0u8; 32];
        let mut s_bytes = [0u8; 32];
        r_bytes.copy_from_slice(&bytes[..32]);
        s_bytes.copy_from_slice(&bytes[32..]);

        Ok(Signature::new(r_bytes, s_bytes, recovery_id.to_byte()))
    }
}

impl InitiatorSign for ReferenceInitiatorSign {
    fn step1(&mut self) -> Result<Vec<u8>> {
        if !matches!(self.state, InitiatorState::Start) {
            self.state = InitiatorState::Failed;
            return Err(Error::EngineMisuse("initiator sign step1 already run".into()));
        }

        let nonce = Scalar::random(&mut OsRng);
        let nonce_point = ProjectivePoint::GENERATOR * nonce;
        let blinding: [u8; 32] = rand::random();
        let commitment = commit(&encode_point(&nonce_point), &blinding);

        self.state = InitiatorState::Committed {
            nonce,
            nonce_point,
            blinding,
        };
        debug!("Sign: committed to initiator nonce");

        EngineMessage::SignCommit { commitment }.encode()
    }

    fn step2(&mut self, message: &[u8]) -> Result<Vec<u8>> {
        let InitiatorState::Committed {
            nonce,
            nonce_point,
            blinding,
        } = std::mem::replace(&mut self.state, InitiatorState::Failed)
        else {
            return Err(Error::EngineMisuse("initiator sign step2 requires step1".into()));
        };

        let EngineMessage::SignNonce {
            nonce_point: counterparty_nonce,
        } = EngineMessage::decode(message, EngineRound::SignNonce)?
        else {
            return Err(Error::Internal("decoded unexpected signing round".into()));
        };

        let r2 = decode_point(&counterparty_nonce)?;
        let joint_nonce = r2 * nonce;
        if joint_nonce == ProjectivePoint::IDENTITY {
            return Err(Error::VerificationFailed("Joint nonce is the identity".into()));
        }

        self.state = InitiatorState::Revealed { nonce, joint_nonce };
        debug!("Sign: revealing initiator nonce");

        EngineMessage::SignReveal {
            nonce_point: encode_point(&nonce_point),
            blinding,
        }
        .encode()
    }

    fn step3(&mut self, message: &[u8]) -> Result<()> {
        let InitiatorState::Revealed { nonce, joint_nonce } =
            std::mem::replace(&mut self.state, InitiatorState::Failed)
        else {
            return Err(Error::EngineMisuse("initiator sign step3 requires step2".into()));
        };

        let EngineMessage::SignPartial { partial } =
            EngineMessage::decode(message, EngineRound::SignPartial)?
        else {
            return Err(Error::Internal("decoded unexpected signing round".into()));
        };

        let partial = scalar_from_slice(&partial)?;
        let nonce_inv = Option::<Scalar>::from(nonce.invert())
            .ok_or_else(|| Error::SignatureExport("nonce not invertible".into()))?;
        let r = x_coordinate(&joint_nonce)?;
        let s = nonce_inv * partial;

        let signature = self.finalize(r, s)?;
        debug!(r = hex::encode(signature.r), "Sign: signature finalized");
        self.state = InitiatorState::Complete(signature);
        Ok(())
    }

    fn export_signature(&self) -> Result<Signature> {
        match &self.state {
            InitiatorState::Complete(signature) => Ok(*signature),
            _ => Err(Error::SignatureExport(
                "signature exported before step3".into(),
            )),
        }
    }
}

enum ResponderState {
    Start,
    AwaitingReveal {
        commitment: [u8; 32],
        nonce: Scalar,
    },
    Done,
    Failed,
}

impl Zeroize for ResponderState {
    fn zeroize(&mut self) {
        if let ResponderState::AwaitingReveal { nonce, .. } = self {
            nonce.zeroize();
        }
    }
}

impl Drop for ResponderState {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// Responder signing context
///
/// 1. Stores the nonce commitment and answers with `R2 = k2·G`
/// 2. Checks the opening, computes `R = k2·R1` and the partial
///    `s' = k2⁻¹·(m + r·(x1 + x2))`
pub struct ReferenceResponderSign {
    secret_share: Scalar,
    counterparty_share: Scalar,
    message: Scalar,
    state: ResponderState,
}

impl ReferenceResponderSign {
    pub fn new(share: &KeyShare, message_hash: [u8; 32]) -> Result<Self> {
        if share.role != Role::Responder {
            return Err(Error::EngineMisuse(format!(
                "responder signing context seeded with {} share",
                share.role
            )));
        }
        Ok(Self {
            secret_share: share.secret_share,
            counterparty_share: scalar_from_slice(&share.counterparty_material)?,
            message: <Scalar as Reduce<U256>>::reduce_bytes(&message_hash.into()),
            state: ResponderState::Start,
        })
    }
}

impl Drop for ReferenceResponderSign {
    fn drop(&mut self) {
        self.secret_share.zeroize();
        self.counterparty_share.zeroize();
    }
}

impl ResponderSign for ReferenceResponderSign {
    fn step1(&mut self, message: &[u8]) -> Result<Vec<u8>> {
        if !matches!(self.state, ResponderState::Start) {
            self.state = ResponderState::Failed;
            return Err(Error::EngineMisuse("responder sign step1 already run".into()));
        }
        self.state = ResponderState::Failed;

        let EngineMessage::SignCommit { commitment } =
            EngineMessage::decode(message, EngineRound::SignCommit)?
        else {
            return Err(Error::Internal("decoded unexpected signing round".into()));
        };

        let nonce = Scalar::random(&mut OsRng);
        let nonce_point = ProjectivePoint::GENERATOR * nonce;
        self.state = ResponderState::AwaitingReveal { commitment, nonce };
        debug!("Sign: responder nonce generated");

        EngineMessage::SignNonce {
            nonce_point: encode_point(&nonce_point),
        }
        .encode()
    }

    fn step2(&mut self, message: &[u8]) -> Result<Vec<u8>> {
        let ResponderState::AwaitingReveal { commitment, nonce } =
            std::mem::replace(&mut self.state, ResponderState::Failed)
        else {
            return Err(Error::EngineMisuse("responder sign step2 requires step1".into()));
        };

        let EngineMessage::SignReveal {
            nonce_point,
            blinding,
        } = EngineMessage::decode(message, EngineRound::SignReveal)?
        else {
            return Err(Error::Internal("decoded unexpected signing round".into()));
        };

        if commit(&nonce_point, &blinding) != commitment {
            return Err(Error::VerificationFailed(
                "Initiator nonce does not match commitment".into(),
            ));
        }

        let r1 = decode_point(&nonce_point)?;
        let joint_nonce = r1 * nonce;
        let r = x_coordinate(&joint_nonce)?;

        let nonce_inv = Option::<Scalar>::from(nonce.invert())
            .ok_or_else(|| Error::Crypto("nonce not invertible".into()))?;
        let joint_secret = self.counterparty_share + self.secret_share;
        let partial = nonce_inv * (self.message + r * joint_secret);

        self.state = ResponderState::Done;
        debug!("Sign: responder partial produced");

        EngineMessage::SignPartial {
            partial: partial.to_bytes().to_vec(),
        }
        .encode()
    }
}

/// `r` value of a nonce point: its x-coordinate reduced modulo n
fn x_coordinate(point: &ProjectivePoint) -> Result<Scalar> {
    if *point == ProjectivePoint::IDENTITY {
        return Err(Error::Crypto("nonce point is the identity".into()));
    }
    let encoded = point.to_affine().to_encoded_point(false);
    let x: [u8; 32] = encoded.as_bytes()[1..33]
        .try_into()
        .map_err(|_| Error::Internal("Invalid R coordinate".into()))?;
    Ok(<Scalar as Reduce<U256>>::reduce_bytes(&x.into()))
}
