//! Wall-clock supervision of reasoning runs.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{ReasonerError, ReasonerResult};

use super::lifecycle::Reasoner;

pub type SharedReasoner = Arc<Mutex<Reasoner>>;

const RUNNING: u8 = 0;
const FINISHED: u8 = 1;
const ABANDONED: u8 = 2;

/// Decides whether a supervised run finished or was given up on.
///
/// Exactly one of [`finish`](Self::finish) and [`abandon`](Self::abandon)
/// succeeds for a run.
#[derive(Debug, Clone, Default)]
pub(crate) struct RunTicket(Arc<AtomicU8>);

impl RunTicket {
    /// Called by the reasoner when materialisation returns. False if the
    /// supervisor abandoned the run first.
    pub(crate) fn finish(&self) -> bool {
        self.0
            .compare_exchange(RUNNING, FINISHED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Called by the supervisor on timeout. False if the run already finished.
    pub(crate) fn abandon(&self) -> bool {
        self.0
            .compare_exchange(RUNNING, ABANDONED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Run [`Reasoner::reason`] on a worker thread and wait at most `limit`.
///
/// On timeout the worker keeps running and holds the reasoner lock until the
/// backend returns. Whatever the backend reports then, the run is recorded as
/// incomplete: the reasoner stays in `AFTER_REASONING` with materialisation
/// `INCOMPLETE` and is not reset.
pub fn reason_supervised(reasoner: &SharedReasoner, limit: Duration) -> ReasonerResult<bool> {
    let (tx, rx) = mpsc::channel();
    let worker = Arc::clone(reasoner);
    let ticket = RunTicket::default();
    let worker_ticket = ticket.clone();

    std::thread::Builder::new()
        .name("chaseward-reason".into())
        .spawn(move || {
            let mut reasoner = worker.lock().expect("reasoner lock poisoned");
            reasoner.set_supervision(Some(worker_ticket));
            let result = reasoner.reason();
            reasoner.set_supervision(None);
            drop(reasoner);
            // The supervisor may have given up already.
            let _ = tx.send(result);
        })
        .map_err(|e| ReasonerError::Backend {
            message: format!("failed to spawn reasoning thread: {e}"),
        })?;

    match rx.recv_timeout(limit) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) if ticket.abandon() => {
            tracing::warn!(?limit, "reasoning exceeded its time limit");
            Err(ReasonerError::Supervision { limit })
        }
        // Materialisation finished just as the limit elapsed.
        Err(RecvTimeoutError::Timeout) => rx.recv().unwrap_or_else(|_| Err(worker_gone())),
        Err(RecvTimeoutError::Disconnected) => Err(worker_gone()),
    }
}

fn worker_gone() -> ReasonerError {
    ReasonerError::Backend {
        message: "reasoning thread terminated without a result".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge_base::KnowledgeBase;
    use crate::model::{Atom, Fact, Term};
    use crate::reasoner::{Correctness, MaterialisationState, ReasonerState, RecordingBackend};

    fn shared(backend: RecordingBackend) -> SharedReasoner {
        let mut kb = KnowledgeBase::new();
        kb.add_statement(Fact::from_constants("p", &["a"]).unwrap());
        Arc::new(Mutex::new(Reasoner::new(kb.into_shared(), Box::new(backend))))
    }

    #[test]
    fn finishes_within_limit() {
        let reasoner = shared(RecordingBackend::new());
        assert!(reason_supervised(&reasoner, Duration::from_secs(5)).unwrap());
        assert_eq!(
            reasoner.lock().unwrap().state(),
            ReasonerState::AfterReasoning
        );
    }

    #[test]
    fn slow_run_is_abandoned_without_reset() {
        let reasoner =
            shared(RecordingBackend::new().with_materialize_delay(Duration::from_millis(600)));
        let err = reason_supervised(&reasoner, Duration::from_millis(100)).unwrap_err();
        assert!(matches!(err, ReasonerError::Supervision { .. }));

        // Blocks until the abandoned worker releases the reasoner.
        let reasoner = reasoner.lock().unwrap();
        assert_eq!(reasoner.state(), ReasonerState::AfterReasoning);
        assert_eq!(
            reasoner.materialisation_state(),
            MaterialisationState::Incomplete
        );
        assert!(!reasoner.reasoning_completed());

        let answers = reasoner
            .answer_query(&Atom::new("p", vec![Term::universal("X")]).unwrap(), true)
            .unwrap();
        assert_eq!(answers.correctness(), Correctness::SoundButIncomplete);
    }

    #[test]
    fn later_unsupervised_run_is_complete_again() {
        let reasoner =
            shared(RecordingBackend::new().with_materialize_delay(Duration::from_millis(300)));
        assert!(reason_supervised(&reasoner, Duration::from_millis(50)).is_err());

        let mut reasoner = reasoner.lock().unwrap();
        assert!(reasoner.reason().unwrap());
        assert_eq!(
            reasoner.materialisation_state(),
            MaterialisationState::Complete
        );
    }

    #[test]
    fn ticket_settles_once() {
        let ticket = RunTicket::default();
        assert!(ticket.abandon());
        assert!(!ticket.finish());
        assert!(!ticket.abandon());

        let ticket = RunTicket::default();
        assert!(ticket.finish());
        assert!(!ticket.abandon());
    }
}
