//! Periodic loop driver shared by the clock and the controllers

use std::future::Future;
use tracing::{debug, error};

use crate::clock::{SimClock, SimSpan};
use crate::error::{AgentResult, EngineResult};
use crate::gate::RunGate;

/// Run `tick` every `span` of simulated time while the gate is open.
///
/// A failing iteration is logged and the loop carries on. The loop never
/// returns on its own; it ends when its task is aborted.
pub(crate) async fn every<F, Fut>(
    task: &'static str,
    gate: &RunGate,
    clock: &SimClock,
    span: SimSpan,
    jitter: bool,
    mut tick: F,
) -> EngineResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AgentResult<()>>,
{
    debug!(task, ?span, "Starting periodic task");
    loop {
        gate.wait_open().await;
        clock.wait(span, jitter).await;
        // paused while suspended
        gate.wait_open().await;

        if let Err(e) = tick().await {
            error!(task, error = %e, "Iteration failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn clock() -> Arc<SimClock> {
        let start = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        Arc::new(SimClock::new(start, 3600.0).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_iteration_does_not_end_loop() {
        let gate = RunGate::new();
        let clock = clock();
        let calls = Arc::new(AtomicUsize::new(0));

        let task = {
            let (gate, clock, calls) = (gate.clone(), clock.clone(), calls.clone());
            tokio::spawn(async move {
                let calls = &calls;
                every("flaky", &gate, &clock, SimSpan::Minutes(1.0), false, move || async move {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(AgentError::Other("first iteration fails".to_string()))
                    } else {
                        Ok(())
                    }
                })
                .await
            })
        };

        gate.start().unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(calls.load(Ordering::SeqCst) >= 3);
        assert!(!task.is_finished());
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_gate_holds_ticks() {
        let gate = RunGate::new();
        let clock = clock();
        let calls = Arc::new(AtomicUsize::new(0));

        let task = {
            let (gate, clock, calls) = (gate.clone(), clock.clone(), calls.clone());
            tokio::spawn(async move {
                let calls = &calls;
                every("counter", &gate, &clock, SimSpan::Minutes(1.0), false, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .await
            })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        gate.start().unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        gate.stop().unwrap();
        let seen = calls.load(Ordering::SeqCst);
        assert!(seen > 0);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), seen);
        task.abort();
    }
}
