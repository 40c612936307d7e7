use std::fmt;

use serde::Serialize;

/// Where a provisioning session is in its handshake.
///
/// The happy path visits every state in declaration order. `Failed` can be
/// entered from any non-terminal state; `Succeeded` only after confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProvisioningState {
    Idle,
    Discovering,
    ReadingIdentity,
    CheckingNetwork,
    SendingCredentials,
    AwaitingConfirmation,
    Succeeded,
    Failed,
}

impl ProvisioningState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// The next state on the happy path.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::Discovering),
            Self::Discovering => Some(Self::ReadingIdentity),
            Self::ReadingIdentity => Some(Self::CheckingNetwork),
            Self::CheckingNetwork => Some(Self::SendingCredentials),
            Self::SendingCredentials => Some(Self::AwaitingConfirmation),
            Self::AwaitingConfirmation => Some(Self::Succeeded),
            Self::Succeeded | Self::Failed => None,
        }
    }

    pub fn can_transition_to(self, to: Self) -> bool {
        !self.is_terminal() && (to == Self::Failed || self.next() == Some(to))
    }
}

impl fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Idle => "idle",
            Self::Discovering => "discovering services",
            Self::ReadingIdentity => "reading identity",
            Self::CheckingNetwork => "checking network",
            Self::SendingCredentials => "sending credentials",
            Self::AwaitingConfirmation => "awaiting confirmation",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(text)
    }
}
