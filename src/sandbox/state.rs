use std::fmt;

/// Lifecycle of a `VirtualFilesystem`.
///
/// `Uninitialized -> Materialized -> TornDown`. Only `materialize` is valid
/// outside `Materialized`, and it always starts a fresh session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Materialized,
    TornDown,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionState::Uninitialized => "not materialized",
            SessionState::Materialized => "materialized",
            SessionState::TornDown => "torn down",
        };
        f.write_str(label)
    }
}
