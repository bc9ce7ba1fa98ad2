use std::sync::{Arc, Mutex};

use portal_core::Clock;
use portal_core::model::{Session, TutorialId, User, UserId};
use storage::repository::{ProgressRepository, Storage};
use storage::{ProgressApi, RemoteProgressRepository, SafeStorage};

use crate::catalog::TutorialCatalog;
use crate::credential_service::CredentialService;
use crate::error::{AuthError, PortalError};
use crate::progress_service::{ProgressScope, ProgressService};
use crate::quiz::QuizEngine;
use crate::session_service::SessionManager;

/// Composes the credential store, session manager, and progress store behind
/// the one contract the UI consumes.
///
/// Constructed once at application start and passed by reference; there is
/// no ambient global session state. The active `ProgressService` is swapped
/// whenever the identity changes (login, logout); that is the only place
/// the local-vs-remote decision is made.
pub struct PortalServices {
    catalog: TutorialCatalog,
    credentials: CredentialService,
    sessions: SessionManager,
    local_progress: Arc<dyn ProgressRepository>,
    remote_progress: Option<Arc<dyn ProgressRepository>>,
    progress: ProgressService,
    completions: Arc<Mutex<Vec<TutorialId>>>,
}

impl PortalServices {
    /// Builds the facade over a key/value store and an optional remote API.
    ///
    /// When a session record already exists (a previous run), the matching
    /// progress backend is opened; otherwise browsing starts anonymous.
    pub async fn open(kv: SafeStorage, api: Option<ProgressApi>, clock: Clock) -> Self {
        let storage = Storage::local(&kv);
        let remote = api.map(|api| {
            let repo: Arc<dyn ProgressRepository> = Arc::new(RemoteProgressRepository::new(api));
            repo
        });
        Self::with_backends(storage, remote, kv, clock).await
    }

    /// Builds the facade from explicit backends; used by tests to observe
    /// which path persistence takes.
    pub async fn with_backends(
        storage: Storage,
        remote_progress: Option<Arc<dyn ProgressRepository>>,
        session_kv: SafeStorage,
        clock: Clock,
    ) -> Self {
        let credentials = CredentialService::new(clock, Arc::clone(&storage.users));
        let sessions = SessionManager::new(session_kv);
        let local_progress = Arc::clone(&storage.local_progress);

        let scope = sessions
            .current()
            .map_or(ProgressScope::Anonymous, |s| ProgressScope::for_session(&s));
        let repo = progress_repo_for(&scope, &local_progress, remote_progress.as_ref());
        let progress = ProgressService::open(scope, repo).await;

        Self {
            catalog: TutorialCatalog::seeded(),
            credentials,
            sessions,
            local_progress,
            remote_progress,
            progress,
            completions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &TutorialCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn current_user(&self) -> Option<Session> {
        self.sessions.current()
    }

    #[must_use]
    pub fn progress_service(&self) -> &ProgressService {
        &self.progress
    }

    //
    // ─── AUTH ──────────────────────────────────────────────────────────────
    //

    /// Registers a new account. Does not sign the user in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::DuplicateEmail` or validation/storage errors.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<User, AuthError> {
        self.credentials.register(email, password, name).await
    }

    /// Authenticates, establishes the session, and switches the progress
    /// store to the account's backend.
    ///
    /// Anonymous progress is deliberately left behind in local storage: it
    /// is not merged into the account record. It becomes active again after
    /// logout.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` on a failed check.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<Session, AuthError> {
        let user = self.credentials.authenticate(email, password).await?;
        let session = Session::for_user(&user);
        self.sessions.set_current(&session);

        let scope = ProgressScope::for_session(&session);
        let repo = progress_repo_for(&scope, &self.local_progress, self.remote_progress.as_ref());
        self.progress = ProgressService::open(scope, repo).await;

        Ok(session)
    }

    /// Clears the session and reverts to the anonymous progress record.
    ///
    /// Idempotent: logging out without a session is safe.
    pub async fn logout(&mut self) {
        self.sessions.clear();
        self.progress = ProgressService::open(
            ProgressScope::Anonymous,
            Arc::clone(&self.local_progress),
        )
        .await;
    }

    /// Issues a password-reset token; always reports success.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` only for persistence failures.
    pub async fn request_password_reset(&self, email: &str) -> Result<Option<String>, AuthError> {
        self.credentials.request_password_reset(email).await
    }

    /// Consumes a reset token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` / `AuthError::TokenExpired`.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        self.credentials.reset_password(token, new_password).await
    }

    /// Updates name/avatar and refreshes the session record when the change
    /// affects the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` or validation errors.
    pub async fn update_profile(
        &self,
        user_id: &UserId,
        name: Option<&str>,
        avatar: Option<&str>,
    ) -> Result<User, AuthError> {
        let updated = self.credentials.update_profile(user_id, name, avatar).await?;
        if let Some(current) = self.sessions.current()
            && &current.user_id == user_id
        {
            self.sessions.set_current(&Session::for_user(&updated));
        }
        Ok(updated)
    }

    /// Changes the password after verifying the current one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` / `AuthError::IncorrectPassword`.
    pub async fn change_password(
        &self,
        user_id: &UserId,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        self.credentials
            .change_password(user_id, current_password, new_password)
            .await
    }

    //
    // ─── PROGRESS ──────────────────────────────────────────────────────────
    //

    /// Marks a tutorial complete for the current identity. Idempotent.
    pub async fn complete_tutorial(&mut self, tutorial_id: TutorialId) -> bool {
        self.progress.mark_completed(tutorial_id).await
    }

    /// Records tutorial navigation.
    pub async fn visit_tutorial(&mut self, tutorial_id: TutorialId) {
        self.progress.mark_visited(tutorial_id).await;
    }

    #[must_use]
    pub fn is_completed(&self, tutorial_id: TutorialId) -> bool {
        self.progress.is_completed(tutorial_id)
    }

    /// Completion percentage over the seeded catalog.
    #[must_use]
    pub fn progress_percentage(&self) -> u8 {
        self.progress.percentage(self.catalog.total())
    }

    //
    // ─── QUIZ ──────────────────────────────────────────────────────────────
    //

    /// Builds the quiz engine for a tutorial, wiring its completion hook to
    /// this facade's completion queue.
    ///
    /// The single-threaded flow is: the UI drives the engine; a passing
    /// attempt enqueues the tutorial id exactly once; the driver then calls
    /// [`Self::apply_quiz_completions`] to mark and persist.
    ///
    /// # Errors
    ///
    /// Returns `PortalError::NoQuiz` when the tutorial has no quiz.
    pub fn start_quiz(&self, tutorial_id: TutorialId) -> Result<QuizEngine, PortalError> {
        let questions = self
            .catalog
            .quiz_for(tutorial_id)
            .ok_or(PortalError::NoQuiz(tutorial_id))?
            .to_vec();

        let queue = Arc::clone(&self.completions);
        let engine = QuizEngine::new(tutorial_id, questions)?.with_completion(move |id| {
            queue
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(id);
        });
        Ok(engine)
    }

    /// Applies queued quiz completions to the progress store.
    ///
    /// Returns how many tutorials were newly marked complete; repeats are
    /// absorbed by the idempotent mark.
    pub async fn apply_quiz_completions(&mut self) -> usize {
        let pending: Vec<TutorialId> = {
            let mut queue = self
                .completions
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            queue.drain(..).collect()
        };

        let mut newly_completed = 0;
        for tutorial_id in pending {
            if self.progress.mark_completed(tutorial_id).await {
                newly_completed += 1;
            }
        }
        newly_completed
    }
}

fn progress_repo_for(
    scope: &ProgressScope,
    local: &Arc<dyn ProgressRepository>,
    remote: Option<&Arc<dyn ProgressRepository>>,
) -> Arc<dyn ProgressRepository> {
    match (scope.is_remote(), remote) {
        (true, Some(remote)) => Arc::clone(remote),
        // No API configured: registered accounts degrade to local-only
        // persistence rather than failing.
        _ => Arc::clone(local),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_core::time::fixed_clock;

    async fn facade() -> PortalServices {
        PortalServices::with_backends(
            Storage::in_memory(),
            None,
            SafeStorage::in_memory(),
            fixed_clock(),
        )
        .await
    }

    #[tokio::test]
    async fn quiz_completion_flows_into_progress() {
        let mut portal = facade().await;
        let mut engine = portal.start_quiz(TutorialId::new(1)).unwrap();

        while let Some(question) = engine.current_question() {
            let correct = question.correct_answer();
            engine.select_option(correct);
            engine.submit_answer().unwrap();
            engine.next().unwrap();
        }
        assert!(engine.report().unwrap().passed);

        assert!(!portal.is_completed(TutorialId::new(1)));
        assert_eq!(portal.apply_quiz_completions().await, 1);
        assert!(portal.is_completed(TutorialId::new(1)));

        // Nothing left queued.
        assert_eq!(portal.apply_quiz_completions().await, 0);
    }

    #[tokio::test]
    async fn failing_quiz_leaves_no_trace() {
        let mut portal = facade().await;
        let mut engine = portal.start_quiz(TutorialId::new(2)).unwrap();

        while let Some(question) = engine.current_question() {
            let wrong = (question.correct_answer() + 1) % question.options().len();
            engine.select_option(wrong);
            engine.submit_answer().unwrap();
            engine.next().unwrap();
        }
        assert!(!engine.report().unwrap().passed);

        assert_eq!(portal.apply_quiz_completions().await, 0);
        assert!(!portal.is_completed(TutorialId::new(2)));
    }

    #[tokio::test]
    async fn tutorials_without_a_quiz_are_rejected() {
        let portal = facade().await;
        let err = portal.start_quiz(TutorialId::new(6)).unwrap_err();
        assert!(matches!(err, PortalError::NoQuiz(_)));
    }

    #[tokio::test]
    async fn profile_update_refreshes_the_session() {
        let mut portal = facade().await;
        let session = portal.login("demo@portal.dev", "demo123").await.unwrap();

        portal
            .update_profile(&session.user_id, Some("Demo Renamed"), None)
            .await
            .unwrap();
        assert_eq!(portal.current_user().unwrap().name, "Demo Renamed");
    }
}
