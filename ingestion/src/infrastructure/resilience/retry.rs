// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Bounded exponential backoff nested inside a single [`super::ParkingLotResilienceService::execute`]
//! call (DESIGN.md open question (c): retry is distinct from, and sits
//! inside, the circuit breaker - the breaker's sliding window only ever
//! sees the call's final outcome).

use std::future::Future;
use std::time::Duration;

use ingestion_domain::error::IngestionError;

const MAX_ATTEMPTS: u32 = 3;
const BASE_DELAY: Duration = Duration::from_millis(50);

/// Retries `op` up to [`MAX_ATTEMPTS`] times with a `BASE_DELAY * 2^attempt`
/// backoff between attempts. Only [`IngestionError::is_recoverable`] errors
/// are retried; anything else (e.g. a `Transform`/`Validation` error) is
/// returned to the caller on the first attempt. Takes an `FnMut` rather than
/// `FnOnce` since a retry loop needs a fresh future per attempt - callers
/// pass a closure that can cheaply reconstruct its operation future (e.g. a
/// `sqlx` query closure).
pub async fn retry_with_backoff<F, Fut, T>(mut op: F) -> Result<T, IngestionError>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<T, IngestionError>> + Send,
    T: Send,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt + 1 < MAX_ATTEMPTS && err.is_recoverable() => {
                let delay = BASE_DELAY * 2u32.pow(attempt);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_recoverable_errors_up_to_the_attempt_cap() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, IngestionError> = retry_with_backoff(|| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(IngestionError::persistence("transient"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_non_recoverable_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, IngestionError> = retry_with_backoff(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(IngestionError::Transform("bad rule".to_string())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
