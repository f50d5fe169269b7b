use std::fmt;

/// Which phase of the session failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    Resolution,
    Connect,
    Join,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidUrl => "invalid url",
            Self::Resolution => "resolution",
            Self::Connect => "connect",
            Self::Join => "join",
        }
    }
}

/// Why a session ended in [`SessionState::Failed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReason {
    pub kind: FailureKind,
    pub message: String,
}

impl FailureReason {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.kind.as_str(), self.message)
    }
}

/// Session lifecycle.
///
/// `Idle -> Resolving -> Connecting -> Joining -> Active -> Closing -> Closed`,
/// with `Failed` reachable from every non-terminal state. A stop request
/// before `Active` goes straight to `Closing`; a transport close while
/// `Active` goes straight to `Closed`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Resolving,
    Connecting,
    Joining,
    Active,
    Closing,
    Closed,
    Failed(FailureReason),
}

impl SessionState {
    /// `Closed` and `Failed` end the session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Failed(_))
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(&self, next: &SessionState) -> bool {
        use SessionState::*;

        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (_, Failed(_)) => true,
            (Idle, Resolving)
            | (Resolving, Connecting)
            | (Connecting, Joining)
            | (Joining, Active)
            | (Active, Closed)
            | (Closing, Closed) => true,
            (Resolving | Connecting | Joining | Active, Closing) => true,
            _ => false,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Resolving => "resolving",
            Self::Connecting => "connecting",
            Self::Joining => "joining",
            Self::Active => "active",
            Self::Closing => "closing",
            Self::Closed => "closed",
            Self::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(reason) => write!(f, "failed ({reason})"),
            other => f.write_str(other.name()),
        }
    }
}
