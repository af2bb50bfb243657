//! Session role and lifecycle state machine.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SessionRole
// ---------------------------------------------------------------------------

/// Which side of a two-player match a session plays. Fixed for the
/// session's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionRole {
    /// Creates the match and joins as the first roster entry.
    Host,
    /// Joins the host's match as the second roster entry.
    Joiner,
}

impl SessionRole {
    /// Index of this role's entry in the roster.
    pub fn roster_index(self) -> usize {
        match self {
            Self::Host => 0,
            Self::Joiner => 1,
        }
    }

    /// The setup state this role goes through.
    pub fn setup_state(self) -> SessionState {
        match self {
            Self::Host => SessionState::HostSetup,
            Self::Joiner => SessionState::JoinSetup,
        }
    }
}

impl fmt::Display for SessionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => write!(f, "host"),
            Self::Joiner => write!(f, "joiner"),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// The lifecycle state of a session.
///
/// ```text
/// Idle → Connected → HostSetup | JoinSetup → Looping → Ended → LeftMatch
///                          ↑                                       │
///                          └────────────── next match ─────────────┘
/// ```
///
/// The setup state is chosen by the session's [`SessionRole`]. After
/// `LeftMatch` the same connection may set up another match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Connected,
    HostSetup,
    JoinSetup,
    Looping,
    Ended,
    LeftMatch,
}

impl SessionState {
    /// Returns the state that follows this one for `role`, or `None` if
    /// there is none.
    pub fn next(self, role: SessionRole) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::Connected),
            Self::Connected | Self::LeftMatch => Some(role.setup_state()),
            Self::HostSetup | Self::JoinSetup => Some(Self::Looping),
            Self::Looping => Some(Self::Ended),
            Self::Ended => Some(Self::LeftMatch),
        }
    }

    /// Returns `true` if moving to `target` is valid for `role`.
    pub fn can_transition_to(self, target: Self, role: SessionRole) -> bool {
        self.next(role) == Some(target)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Connected => write!(f, "Connected"),
            Self::HostSetup => write!(f, "HostSetup"),
            Self::JoinSetup => write!(f, "JoinSetup"),
            Self::Looping => write!(f, "Looping"),
            Self::Ended => write!(f, "Ended"),
            Self::LeftMatch => write!(f, "LeftMatch"),
        }
    }
}
