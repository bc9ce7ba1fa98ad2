use std::sync::Arc;

use portal_core::model::{Progress, Session, TutorialId, UserId};
use storage::repository::{ProgressOwner, ProgressRepository};
use tracing::warn;

/// Which identity a progress record belongs to, and therefore which backend
/// it persists through.
///
/// The backend is chosen once when the service is constructed; call sites
/// never re-check the demo flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressScope {
    /// Unauthenticated browsing; one shared local record.
    Anonymous,
    /// Seeded demo account; per-user local record, never the network.
    Demo(UserId),
    /// Registered account; per-user record behind the remote API.
    Registered(UserId),
}

impl ProgressScope {
    /// Maps a session to its scope using the demo flag.
    #[must_use]
    pub fn for_session(session: &Session) -> Self {
        if session.is_demo {
            Self::Demo(session.user_id.clone())
        } else {
            Self::Registered(session.user_id.clone())
        }
    }

    #[must_use]
    pub fn owner(&self) -> ProgressOwner {
        match self {
            Self::Anonymous => ProgressOwner::Anonymous,
            Self::Demo(id) | Self::Registered(id) => ProgressOwner::User(id.clone()),
        }
    }

    /// True when persistence should go through the remote API.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Registered(_))
    }
}

/// Per-identity progress store.
///
/// Holds the authoritative in-memory record and mirrors every mutation to
/// the backing repository. Load and save failures are absorbed and logged:
/// the learning experience is never blocked by infrastructure issues, and
/// the in-memory state the UI reflects is never rolled back.
pub struct ProgressService {
    scope: ProgressScope,
    repo: Arc<dyn ProgressRepository>,
    progress: Progress,
}

impl ProgressService {
    /// Opens the progress record for `scope`, reading through `repo`.
    ///
    /// Any read failure degrades to the empty record.
    pub async fn open(scope: ProgressScope, repo: Arc<dyn ProgressRepository>) -> Self {
        let progress = match repo.get_progress(&scope.owner()).await {
            Ok(progress) => progress,
            Err(err) => {
                warn!(%err, "progress load failed, starting from empty record");
                Progress::default()
            }
        };
        Self {
            scope,
            repo,
            progress,
        }
    }

    #[must_use]
    pub fn scope(&self) -> &ProgressScope {
        &self.scope
    }

    #[must_use]
    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    #[must_use]
    pub fn is_completed(&self, tutorial_id: TutorialId) -> bool {
        self.progress.is_completed(tutorial_id)
    }

    #[must_use]
    pub fn percentage(&self, total_tutorials: usize) -> u8 {
        self.progress.percentage(total_tutorials)
    }

    /// Marks a tutorial complete and persists the record.
    ///
    /// Idempotent: an already-completed tutorial changes nothing and issues
    /// no save. Returns whether the record changed.
    pub async fn mark_completed(&mut self, tutorial_id: TutorialId) -> bool {
        if !self.progress.mark_completed(tutorial_id) {
            return false;
        }
        self.save().await;
        true
    }

    /// Overwrites the last-visited tutorial and persists the record.
    pub async fn mark_visited(&mut self, tutorial_id: TutorialId) {
        self.progress.mark_visited(tutorial_id);
        self.save().await;
    }

    /// Writes the full record through the repository.
    ///
    /// A failed save is logged and dropped; the in-memory record stays
    /// authoritative until the next mutation triggers another attempt.
    async fn save(&self) {
        if let Err(err) = self
            .repo
            .save_progress(&self.scope.owner(), &self.progress)
            .await
        {
            warn!(%err, "progress save failed, keeping local state");
        }
    }
}
