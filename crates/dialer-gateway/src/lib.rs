// SPDX-FileCopyrightText: 2026 Dialer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP trigger surface for the dispatcher.
//!
//! Exposes `POST /process-queue` and `GET /queue/stats` behind bearer auth,
//! plus unauthenticated `GET /health` and `GET /metrics`.

pub mod auth;
pub mod handlers;
pub mod server;

pub use auth::AuthConfig;
pub use server::{GatewayState, HealthState, ServerConfig, build_router, start_server};
