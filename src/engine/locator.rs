use log::{debug, trace};
use std::time::{Duration, Instant};

use crate::driver::{ElementHandle, LocatorStrategy};
use crate::runner::context::SessionContext;

/// Resolve an element through an ordered list of locator strategies.
///
/// For each strategy in declared order the backend is polled until at least
/// one candidate appears or `timeout` elapses, then candidates are filtered
/// to the currently interactable ones. A candidate whose interactable state
/// cannot be determined (typically because it went stale between the query
/// and the check) is retained as interactable-unknown rather than discarded.
///
/// The first strategy that yields a viable candidate wins; later strategies
/// are never consulted in that pass, even if the winning candidate later
/// proves unusable — the caller retries through `min_passes` or its own
/// attempt loop instead. `None` is an ordinary outcome, not an error.
pub async fn resolve(
    ctx: &SessionContext,
    strategies: &[LocatorStrategy],
    timeout: Duration,
    min_passes: u32,
) -> Option<ElementHandle> {
    let passes = min_passes.max(1);
    for pass in 0..passes {
        for strategy in strategies {
            trace!("resolve pass {} trying {}", pass + 1, strategy.describe());
            if let Some(handle) = resolve_one(ctx, strategy, timeout).await {
                debug!("resolved element via {}", strategy.describe());
                return Some(handle);
            }
        }
    }
    debug!(
        "no element resolved after {} passes over {} strategies",
        passes,
        strategies.len()
    );
    None
}

/// Resolve with the context's configured timeout and pass count.
pub async fn resolve_default(
    ctx: &SessionContext,
    strategies: &[LocatorStrategy],
) -> Option<ElementHandle> {
    let timing = ctx.timing();
    resolve(
        ctx,
        strategies,
        timing.resolve_timeout(),
        timing.min_resolve_passes,
    )
    .await
}

/// Poll one strategy until a viable candidate appears or the budget runs out.
async fn resolve_one(
    ctx: &SessionContext,
    strategy: &LocatorStrategy,
    timeout: Duration,
) -> Option<ElementHandle> {
    let deadline = Instant::now() + timeout;
    loop {
        match ctx.backend().query(strategy).await {
            Ok(candidates) if !candidates.is_empty() => {
                if let Some(handle) = first_viable(ctx, candidates).await {
                    return Some(handle);
                }
                // Candidates present but none interactable yet; keep polling.
            }
            Ok(_) => {}
            Err(e) => {
                // Transient query failures count the same as an empty result.
                trace!("query {} failed: {}", strategy.describe(), e);
            }
        }
        if Instant::now() >= deadline {
            return None;
        }
        tokio::time::sleep(ctx.timing().poll_interval()).await;
    }
}

/// First candidate that is interactable or interactable-unknown.
async fn first_viable(
    ctx: &SessionContext,
    candidates: Vec<ElementHandle>,
) -> Option<ElementHandle> {
    for handle in candidates {
        match ctx.backend().is_interactable(&handle).await {
            Ok(Some(true)) => return Some(handle),
            Ok(Some(false)) => continue,
            // Unknown state is retained: discarding it would turn transient
            // staleness into a false negative.
            Ok(None) => return Some(handle),
            Err(_) => return Some(handle),
        }
    }
    None
}
