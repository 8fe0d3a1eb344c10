//! Host surface of the facecast worker.
//!
//! - [`config`] -- bind address, request timeout and one-shot input file.
//! - [`routes`] -- `GET /health` and `POST /runsync`.
//! - [`router`] -- the axum application with its middleware stack.
//! - [`oneshot`] -- run a single event file and exit.
//! - [`state`] -- shared handler state.

pub mod config;
pub mod oneshot;
pub mod router;
pub mod routes;
pub mod state;
