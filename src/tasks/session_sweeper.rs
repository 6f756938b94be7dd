use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::core::state::AppState;

pub(crate) fn spawn(state: AppState, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(sweep_idle_loop(state, shutdown))
}

/// Periodically unmounts tabs that stopped sending requests.
async fn sweep_idle_loop(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let session = state.settings().session();
    let max_idle = Duration::from_secs(session.idle_timeout_seconds);
    let mut tick = interval(Duration::from_secs(session.sweep_interval_seconds));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                state.sessions().sweep_idle(max_idle).await;
            }
        }
    }
    tracing::debug!("Session sweeper stopped");
}
