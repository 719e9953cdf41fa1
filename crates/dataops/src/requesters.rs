//! Fallback across the connections known to reach a resource.

use crate::attributes::Requester;
use formainframe_core::{Error, Result};
use std::future::Future;

/// Run `call` with each requester in order until one succeeds.
///
/// Returns the first success. When every attempt fails the error of the
/// last attempt is returned; with no requesters at all nothing is called
/// and a not-found error names `target`. Cancellation ends the loop at once.
///
/// # Errors
///
/// See above.
pub async fn first_successful<T, F, Fut>(
    requesters: &[Requester],
    target: &str,
    mut call: F,
) -> Result<T>
where
    F: FnMut(Requester) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error = None;
    for requester in requesters {
        tracing::debug!(requester = %requester, target, "Trying a call");
        match call(requester.clone()).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                tracing::debug!(requester = %requester, error = %e, "Call failed");
                last_error = Some(e);
            }
        }
    }
    Err(last_error
        .unwrap_or_else(|| Error::not_found(format!("connection able to reach {target}"))))
}
