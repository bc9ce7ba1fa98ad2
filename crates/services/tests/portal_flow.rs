use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use portal_core::model::{Progress, TutorialId};
use portal_core::time::fixed_clock;
use services::{PortalServices, QuizEngine};
use storage::SafeStorage;
use storage::repository::{ProgressOwner, ProgressRepository, Storage, StorageError};

/// Remote double that counts traffic so tests can observe which persistence
/// path a write took.
#[derive(Default)]
struct CountingRemote {
    fetches: AtomicUsize,
    saves: AtomicUsize,
    records: Mutex<HashMap<ProgressOwner, Progress>>,
}

#[async_trait]
impl ProgressRepository for CountingRemote {
    async fn get_progress(&self, owner: &ProgressOwner) -> Result<Progress, StorageError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(owner)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_progress(
        &self,
        owner: &ProgressOwner,
        progress: &Progress,
    ) -> Result<(), StorageError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.records
            .lock()
            .unwrap()
            .insert(owner.clone(), progress.clone());
        Ok(())
    }
}

async fn portal_with_remote(remote: Arc<CountingRemote>) -> PortalServices {
    PortalServices::with_backends(
        Storage::in_memory(),
        Some(remote),
        SafeStorage::in_memory(),
        fixed_clock(),
    )
    .await
}

fn pass_quiz(engine: &mut QuizEngine) {
    while let Some(question) = engine.current_question() {
        let correct = question.correct_answer();
        engine.select_option(correct);
        engine.submit_answer().unwrap();
        engine.next().unwrap();
    }
    assert!(engine.report().unwrap().passed);
}

#[tokio::test]
async fn registered_learner_completes_a_tutorial_end_to_end() {
    let remote = Arc::new(CountingRemote::default());
    let mut portal = portal_with_remote(remote.clone()).await;

    portal.register("a@x.com", "pw1", "Ann").await.unwrap();
    let session = portal.login("a@x.com", "pw1").await.unwrap();
    assert_eq!(session.name, "Ann");
    assert!(!session.is_demo);

    let mut engine = portal.start_quiz(TutorialId::new(3)).unwrap();
    pass_quiz(&mut engine);
    assert_eq!(engine.report().unwrap().score, 3);

    assert_eq!(portal.apply_quiz_completions().await, 1);
    assert!(portal.is_completed(TutorialId::new(3)));

    // 1 of 6 tutorials -> round(16.67) = 17.
    assert_eq!(portal.progress_percentage(), 17);

    // The registered identity persisted through the remote path.
    assert!(remote.saves.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn login_accepts_any_email_casing() {
    let mut portal = portal_with_remote(Arc::new(CountingRemote::default())).await;
    portal.register("a@x.com", "pw1", "Ann").await.unwrap();

    let session = portal.login("A@X.COM", "pw1").await.unwrap();
    assert_eq!(session.email, "a@x.com");
}

#[tokio::test]
async fn logout_without_a_session_is_a_no_op() {
    let mut portal = portal_with_remote(Arc::new(CountingRemote::default())).await;
    assert!(portal.current_user().is_none());

    portal.logout().await;
    portal.logout().await;
    assert!(portal.current_user().is_none());
}

#[tokio::test]
async fn demo_progress_never_touches_the_network() {
    let remote = Arc::new(CountingRemote::default());
    let mut portal = portal_with_remote(remote.clone()).await;

    let session = portal.login("demo@portal.dev", "demo123").await.unwrap();
    assert!(session.is_demo);

    portal.complete_tutorial(TutorialId::new(1)).await;
    portal.visit_tutorial(TutorialId::new(2)).await;

    assert_eq!(remote.fetches.load(Ordering::SeqCst), 0);
    assert_eq!(remote.saves.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn registered_progress_always_attempts_the_network() {
    let remote = Arc::new(CountingRemote::default());
    let mut portal = portal_with_remote(remote.clone()).await;

    portal.register("b@x.com", "pw", "Ben").await.unwrap();
    portal.login("b@x.com", "pw").await.unwrap();
    assert_eq!(remote.fetches.load(Ordering::SeqCst), 1);

    portal.complete_tutorial(TutorialId::new(2)).await;
    assert_eq!(remote.saves.load(Ordering::SeqCst), 1);

    // Idempotent repeat: no new write is issued.
    portal.complete_tutorial(TutorialId::new(2)).await;
    assert_eq!(remote.saves.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn anonymous_progress_is_parked_during_a_session() {
    let mut portal = portal_with_remote(Arc::new(CountingRemote::default())).await;

    // Browse anonymously first.
    portal.complete_tutorial(TutorialId::new(1)).await;
    assert!(portal.is_completed(TutorialId::new(1)));

    // Logging in switches to the account's record; the anonymous work is
    // not merged into it.
    portal.login("demo@portal.dev", "demo123").await.unwrap();
    assert!(!portal.is_completed(TutorialId::new(1)));

    // Logging out brings the anonymous record back untouched.
    portal.logout().await;
    assert!(portal.is_completed(TutorialId::new(1)));
}

#[tokio::test]
async fn session_and_demo_progress_survive_a_restart() {
    let kv = SafeStorage::in_memory();

    {
        let mut portal = PortalServices::open(kv.clone(), None, fixed_clock()).await;
        portal.login("demo@portal.dev", "demo123").await.unwrap();
        portal.complete_tutorial(TutorialId::new(2)).await;
    }

    // Same storage, fresh facade: the session record resumes the identity
    // and its progress backend.
    let portal = PortalServices::open(kv, None, fixed_clock()).await;
    let session = portal.current_user().expect("session resumed");
    assert!(session.is_demo);
    assert!(portal.is_completed(TutorialId::new(2)));
}

#[tokio::test]
async fn retried_quiz_completion_stays_idempotent() {
    let mut portal = portal_with_remote(Arc::new(CountingRemote::default())).await;
    let mut engine = portal.start_quiz(TutorialId::new(1)).unwrap();

    pass_quiz(&mut engine);
    engine.retry().unwrap();
    pass_quiz(&mut engine);

    // Two passing attempts queued two reports; only one mark is new.
    assert_eq!(portal.apply_quiz_completions().await, 1);
    assert!(portal.is_completed(TutorialId::new(1)));
}
