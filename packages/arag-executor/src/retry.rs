use std::future::Future;

use crate::error::{Stage, StageError};

/// Runs `op` up to `max_attempts` times, retrying only retryable failures.
pub(crate) async fn with_retry<T, F, Fut>(
	node: Stage,
	max_attempts: u32,
	mut op: F,
) -> Result<T, StageError>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T, StageError>>,
{
	let max_attempts = max_attempts.max(1);
	let mut attempt = 1;

	loop {
		match op().await {
			Ok(value) => return Ok(value),
			Err(err) if err.retryable && attempt < max_attempts => {
				tracing::warn!(
					node = node.as_str(),
					attempt,
					max_attempts,
					error = %err.message,
					"Stage failed. Retrying."
				);

				attempt += 1;
			},
			Err(err) => {
				tracing::warn!(
					node = node.as_str(),
					attempt,
					kind = err.kind.as_str(),
					error = %err.message,
					"Stage failed."
				);

				return Err(err);
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use super::*;

	fn block_on<F: Future>(future: F) -> F::Output {
		tokio::runtime::Builder::new_current_thread()
			.build()
			.expect("Failed to build runtime.")
			.block_on(future)
	}

	#[test]
	fn retries_retryable_errors_until_success() {
		let calls = AtomicUsize::new(0);
		let result = block_on(with_retry(Stage::RunRetrieval, 3, || {
			let call = calls.fetch_add(1, Ordering::SeqCst);

			async move {
				if call < 2 { Err(StageError::runtime(Stage::RunRetrieval, "flaky")) } else { Ok(call) }
			}
		}));

		assert_eq!(result, Ok(2));
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[test]
	fn gives_up_after_max_attempts() {
		let calls = AtomicUsize::new(0);
		let result: Result<(), _> = block_on(with_retry(Stage::RunRetrieval, 2, || {
			calls.fetch_add(1, Ordering::SeqCst);

			async { Err(StageError::runtime(Stage::RunRetrieval, "down")) }
		}));

		assert!(result.is_err());
		assert_eq!(calls.load(Ordering::SeqCst), 2);
	}

	#[test]
	fn never_retries_schema_errors() {
		let calls = AtomicUsize::new(0);
		let result: Result<(), _> = block_on(with_retry(Stage::RunRetrieval, 5, || {
			calls.fetch_add(1, Ordering::SeqCst);

			async { Err(StageError::schema_validation(Stage::RunRetrieval, "empty")) }
		}));

		assert!(result.is_err());
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn zero_attempts_still_runs_once() {
		let calls = AtomicUsize::new(0);
		let _: Result<(), _> = block_on(with_retry(Stage::RunRetrieval, 0, || {
			calls.fetch_add(1, Ordering::SeqCst);

			async { Err(StageError::runtime(Stage::RunRetrieval, "down")) }
		}));

		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}
}
