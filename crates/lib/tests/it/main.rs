/*! Integration tests for Tagwatch.
 *
 * This test suite is organized as a single integration test binary.
 * The module structure mirrors the main library structure:
 * - pipeline: End-to-end tests for the event pipeline against injected events
 * - stream: Tests for the streaming consumer against a live NDJSON feed
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("tagwatch=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

mod helpers;
mod pipeline;
