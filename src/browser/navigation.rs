use crate::core::BrowserTrait;
use crate::utils::JavaScriptRunner;
use std::time::{Duration, Instant};
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Load finished and no animation frame is pending a layout change.
const SETTLED_SCRIPT: &str = r#"
() => new Promise((resolve) => {
    if (document.readyState !== 'complete') {
        resolve(false);
        return;
    }
    requestAnimationFrame(() => requestAnimationFrame(() => resolve(true)));
})
"#;

pub struct NavigationManager;

impl NavigationManager {
    /// Waits for the page to settle after navigation or an action.
    ///
    /// Best-effort: running out of time or failing to evaluate is logged and
    /// reported in the result, never raised.
    pub async fn wait_for_settle<B: BrowserTrait>(
        browser: &B,
        tab: &B::TabHandle,
        timeout: Duration,
    ) -> NavigationResult {
        let start_time = Instant::now();

        let settled = match JavaScriptRunner::wait_for_condition(
            browser,
            tab,
            SETTLED_SCRIPT,
            timeout,
            POLL_INTERVAL,
        )
        .await
        {
            Ok(settled) => settled,
            Err(e) => {
                debug!(error = %e, "settle check failed");
                false
            }
        };

        let duration_ms = start_time.elapsed().as_millis() as u64;
        if !settled {
            debug!(duration_ms, "page did not settle in time, continuing");
        }

        NavigationResult {
            settled,
            duration_ms,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NavigationResult {
    pub settled: bool,
    pub duration_ms: u64,
}
