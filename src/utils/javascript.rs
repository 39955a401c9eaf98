use crate::core::BrowserTrait;
use crate::errors::Result;
use serde_json::Value;
use std::time::{Duration, Instant};

pub struct JavaScriptRunner;

impl JavaScriptRunner {
    /// Evaluates `function` and reads the result as a boolean; anything that
    /// is not `true` counts as false.
    pub async fn evaluate_bool<B: BrowserTrait>(
        browser: &B,
        tab: &B::TabHandle,
        function: &str,
        args: Value,
        timeout: Duration,
    ) -> Result<bool> {
        let result = browser.evaluate(tab, function, args, timeout).await?;
        Ok(result.as_bool().unwrap_or(false))
    }

    /// Polls `condition` until it returns true or `timeout` elapses.
    /// Evaluation errors while polling are treated as "not yet".
    pub async fn wait_for_condition<B: BrowserTrait>(
        browser: &B,
        tab: &B::TabHandle,
        condition: &str,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<bool> {
        let start_time = Instant::now();

        while start_time.elapsed() < timeout {
            let remaining = timeout.saturating_sub(start_time.elapsed());
            let per_call = remaining.min(poll_interval.max(Duration::from_millis(500)));
            if let Ok(true) =
                Self::evaluate_bool(browser, tab, condition, Value::Null, per_call).await
            {
                return Ok(true);
            }

            tokio::time::sleep(poll_interval).await;
        }

        Ok(false)
    }
}
