use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    model::PermissionState,
    screen::{Notice, Screen},
};

/// Access to the platform's coarse-location permission.
#[async_trait]
pub trait PermissionSystem: Send + Sync {
    fn check(&self) -> PermissionState;

    /// Whether the user should see an explanation before being asked.
    fn should_show_rationale(&self) -> bool;

    /// Issues the actual permission request; resolves to the grant result.
    async fn request(&self) -> bool;
}

#[async_trait]
impl<T: PermissionSystem + ?Sized> PermissionSystem for Arc<T> {
    fn check(&self) -> PermissionState {
        (**self).check()
    }

    fn should_show_rationale(&self) -> bool {
        (**self).should_show_rationale()
    }

    async fn request(&self) -> bool {
        (**self).request().await
    }
}

/// Decides whether polling may start.
pub struct PermissionGate<'a, P: ?Sized> {
    permissions: &'a P,
}

impl<'a, P: PermissionSystem + ?Sized> PermissionGate<'a, P> {
    pub fn new(permissions: &'a P) -> Self {
        Self { permissions }
    }

    /// Returns `Granted` without prompting when access is already held.
    /// Otherwise prompts (via the rationale first if the platform says so) and
    /// reports the outcome on `screen`. Denial is terminal for this run.
    pub async fn check_and_request<S: Screen + ?Sized>(&self, screen: &mut S) -> PermissionState {
        if self.permissions.check().is_granted() {
            debug!("location permission already granted");
            return PermissionState::Granted;
        }

        if self.permissions.should_show_rationale() {
            debug!("showing location permission rationale");
            if !screen.show_rationale().await {
                warn!("location rationale dismissed; not requesting permission");
                screen.notify(Notice::PermissionDenied);
                return PermissionState::Denied;
            }
        }

        if self.permissions.request().await {
            info!("location permission granted");
            screen.notify(Notice::PermissionGranted);
            PermissionState::Granted
        } else {
            warn!("location permission denied");
            screen.notify(Notice::PermissionDenied);
            PermissionState::Denied
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::render::DisplayFields;
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    pub(crate) struct FakePermissions {
        pub state: Mutex<PermissionState>,
        pub rationale: bool,
        pub grant: bool,
        pub requests: AtomicUsize,
    }

    impl FakePermissions {
        pub fn new(state: PermissionState, rationale: bool, grant: bool) -> Self {
            Self {
                state: Mutex::new(state),
                rationale,
                grant,
                requests: AtomicUsize::new(0),
            }
        }

        pub fn granted() -> Self {
            Self::new(PermissionState::Granted, false, true)
        }

        pub fn set(&self, state: PermissionState) {
            *self.state.lock().unwrap() = state;
        }
    }

    #[async_trait]
    impl PermissionSystem for FakePermissions {
        fn check(&self) -> PermissionState {
            *self.state.lock().unwrap()
        }

        fn should_show_rationale(&self) -> bool {
            self.rationale
        }

        async fn request(&self) -> bool {
            self.requests.fetch_add(1, Ordering::SeqCst);
            let state = if self.grant { PermissionState::Granted } else { PermissionState::Denied };
            self.set(state);
            self.grant
        }
    }

    #[derive(Default)]
    struct NoticeScreen {
        notices: Vec<Notice>,
        rationale_shown: usize,
        acknowledge: bool,
    }

    #[async_trait]
    impl Screen for NoticeScreen {
        fn show_in_progress(&mut self) {}
        fn dismiss_in_progress(&mut self) {}
        fn apply(&mut self, _fields: &DisplayFields) {}

        fn notify(&mut self, notice: Notice) {
            self.notices.push(notice);
        }

        async fn show_rationale(&mut self) -> bool {
            self.rationale_shown += 1;
            self.acknowledge
        }
    }

    #[tokio::test]
    async fn already_granted_returns_without_prompting() {
        let perms = FakePermissions::granted();
        let mut screen = NoticeScreen::default();

        let state = PermissionGate::new(&perms).check_and_request(&mut screen).await;

        assert_eq!(state, PermissionState::Granted);
        assert_eq!(perms.requests.load(Ordering::SeqCst), 0);
        assert_eq!(screen.rationale_shown, 0);
        assert!(screen.notices.is_empty());
    }

    #[tokio::test]
    async fn not_determined_requests_directly() {
        for state in [PermissionState::NotDetermined, PermissionState::Denied] {
            let perms = FakePermissions::new(state, false, true);
            let mut screen = NoticeScreen::default();

            let result = PermissionGate::new(&perms).check_and_request(&mut screen).await;

            assert_eq!(result, PermissionState::Granted);
            assert_eq!(perms.requests.load(Ordering::SeqCst), 1);
            assert_eq!(screen.rationale_shown, 0);
            assert_eq!(screen.notices, vec![Notice::PermissionGranted]);
        }
    }

    #[tokio::test]
    async fn rationale_acknowledged_then_requested() {
        let perms = FakePermissions::new(PermissionState::Denied, true, true);
        let mut screen = NoticeScreen {
            acknowledge: true,
            ..Default::default()
        };

        let result = PermissionGate::new(&perms).check_and_request(&mut screen).await;

        assert_eq!(result, PermissionState::Granted);
        assert_eq!(screen.rationale_shown, 1);
        assert_eq!(perms.requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rationale_dismissed_never_requests() {
        let perms = FakePermissions::new(PermissionState::Denied, true, true);
        let mut screen = NoticeScreen::default();

        let result = PermissionGate::new(&perms).check_and_request(&mut screen).await;

        assert_eq!(result, PermissionState::Denied);
        assert_eq!(perms.requests.load(Ordering::SeqCst), 0);
        assert_eq!(screen.notices, vec![Notice::PermissionDenied]);
    }

    #[tokio::test]
    async fn denial_surfaces_persistent_notice() {
        let perms = FakePermissions::new(PermissionState::NotDetermined, false, false);
        let mut screen = NoticeScreen::default();

        let result = PermissionGate::new(&perms).check_and_request(&mut screen).await;

        assert_eq!(result, PermissionState::Denied);
        assert_eq!(screen.notices, vec![Notice::PermissionDenied]);
        assert!(screen.notices[0].is_persistent());
    }
}
