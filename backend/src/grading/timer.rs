// src/grading/timer.rs

use std::{future::Future, sync::Arc, time::Duration};

use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};

use super::session::{ExamSession, Submission, Tick};

pub type SessionHandle = Arc<Mutex<ExamSession>>;

/// Spawns the one-second countdown for a started session.
///
/// `on_expire` runs at most once, with the submission captured by the tick
/// that reached zero. The task exits as soon as the session leaves
/// `InProgress` for any reason.
pub fn spawn_countdown<F, Fut>(session: SessionHandle, on_expire: F) -> JoinHandle<()>
where
    F: FnOnce(Submission) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of an interval completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let outcome = session.lock().await.tick();
            match outcome {
                Tick::Running { .. } => continue,
                Tick::Expired(submission) => {
                    tracing::info!("Exam time expired, submitting automatically");
                    on_expire(submission).await;
                    break;
                }
                Tick::Idle => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grading::session::{SessionState, SubmitTrigger};
    use crate::grading::testing::question;
    use crate::models::{exam::ExamConfig, question::QuestionKind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn session() -> SessionHandle {
        let exam = ExamConfig {
            id: "timed".into(),
            course_id: "cs141".into(),
            exam_title: "Timed".into(),
            duration_minutes: 1,
            passing_score: 70.0,
            allow_review: true,
            questions: vec![question(1, 10, QuestionKind::Boolean { correct_index: 0 })],
        };
        let mut session = ExamSession::new(Arc::new(exam), None);
        session.start().unwrap();
        Arc::new(Mutex::new(session))
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_submits_once_when_time_runs_out() {
        let handle = session();
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&fired);
        let task = spawn_countdown(Arc::clone(&handle), move |submission| async move {
            assert_eq!(submission.trigger, SubmitTrigger::Timeout);
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(handle.lock().await.state(), SessionState::InProgress);
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        task.await.unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(handle.lock().await.state(), SessionState::Submitted);

        // A stray tick after submission changes nothing.
        assert!(matches!(handle.lock().await.tick(), Tick::Idle));
    }

    #[tokio::test(start_paused = true)]
    async fn manual_submit_stops_the_countdown_without_firing() {
        let handle = session();
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&fired);
        let task = spawn_countdown(Arc::clone(&handle), move |_| async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(5)).await;
        handle.lock().await.submit(SubmitTrigger::Manual).unwrap();

        task.await.unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
