// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! OS signal handling (`spec.md` §5 graceful shutdown). Listens for
//! SIGTERM/SIGINT/SIGHUP on Unix (Ctrl-C only on Windows, matching
//! `platform`'s split) and drives the process's [`crate::shutdown::ShutdownCoordinator`].

use crate::shutdown::ShutdownCoordinator;

/// Waits for the first shutdown-triggering signal, then calls
/// `coordinator.initiate_shutdown()`. Intended to be spawned once at
/// startup and left running for the life of the process.
pub async fn wait_and_initiate_shutdown(coordinator: ShutdownCoordinator) {
    wait_for_signal().await;
    tracing::info!("shutdown signal received");
    coordinator.initiate_shutdown();
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut sighup = signal(SignalKind::hangup()).expect("failed to install SIGHUP handler");

    tokio::select! {
        _ = sigterm.recv() => tracing::debug!("received SIGTERM"),
        _ = sigint.recv() => tracing::debug!("received SIGINT"),
        _ = sighup.recv() => tracing::debug!("received SIGHUP"),
    }
}

#[cfg(windows)]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::debug!("received Ctrl-C");
}
