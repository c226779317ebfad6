//! The display surface the controller drives.
//!
//! Every method is called from the controller's own task, so implementations
//! never see concurrent mutation.

use async_trait::async_trait;

use crate::render::DisplayFields;

/// User-visible messages raised outside of rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// Short-lived confirmation after the user allowed location access.
    PermissionGranted,
    /// Stays on screen; the run does nothing further.
    PermissionDenied,
}

impl Notice {
    pub fn message(&self) -> &'static str {
        match self {
            Notice::PermissionGranted => "Location permission granted",
            Notice::PermissionDenied => {
                "Location permission denied. Weather updates are disabled until access is granted."
            }
        }
    }

    pub fn is_persistent(&self) -> bool {
        matches!(self, Notice::PermissionDenied)
    }
}

#[async_trait]
pub trait Screen: Send {
    /// Opens the in-progress indicator. The user cannot dismiss it.
    fn show_in_progress(&mut self);

    fn dismiss_in_progress(&mut self);

    /// Replaces every displayed field with `fields`.
    fn apply(&mut self, fields: &DisplayFields);

    fn notify(&mut self, notice: Notice);

    /// Explains why location access is needed; resolves to `true` once the
    /// user acknowledges, `false` if the prompt is dismissed.
    async fn show_rationale(&mut self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_denial_is_persistent() {
        assert!(Notice::PermissionDenied.is_persistent());
        assert!(!Notice::PermissionGranted.is_persistent());
        assert!(Notice::PermissionDenied.message().contains("denied"));
    }
}
