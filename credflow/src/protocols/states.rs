//! Exchange state enums. The coordinators advance state as messages are
//! produced and consumed; a terminal state accepts no further transitions.

use crate::errors::{CredflowError, CredflowErrorKind, CredflowResult};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CredentialState {
    ProposalSent,
    ProposalReceived,
    OfferSent,
    OfferReceived,
    RequestSent,
    RequestReceived,
    CredentialIssued,
    CredentialReceived,
}

impl CredentialState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CredentialState::CredentialIssued | CredentialState::CredentialReceived
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProofState {
    ProposalSent,
    ProposalReceived,
    RequestSent,
    RequestReceived,
    PresentationSent,
    PresentationReceived,
    Acknowledged,
}

impl ProofState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProofState::Acknowledged)
    }
}

/// Rejects any transition out of a terminal state.
pub(crate) fn ensure_not_terminal(terminal: bool, state: impl std::fmt::Debug) -> CredflowResult<()> {
    if terminal {
        Err(CredflowError::from_msg(
            CredflowErrorKind::InvalidState,
            format!("Exchange already completed in state {state:?}"),
        ))
    } else {
        Ok(())
    }
}
