// SPDX-License-Identifier: MPL-2.0
//! `cine_lens` is the viewport orchestration core of a multi-slot medical
//! image viewer.
//!
//! It keeps an ordered image sequence, a grid of rendering slots, one shared
//! display transform, one active interaction tool, cine playback and the
//! measurements drawn on the slots consistent with each other. Pixels are
//! left to a [`RenderBackend`](application::port::RenderBackend)
//! implementation; studies come from a
//! [`StudySource`](application::port::StudySource).
//!
//! - [`domain`]: Value types with no I/O
//! - [`application`]: The viewer core and its components
//! - [`runtime`]: The tokio task driving a core
//! - [`infrastructure`]: Headless adapters for tests and the demo binary
//! - [`config`]: `settings.toml` handling

#![doc(html_root_url = "https://docs.rs/cine_lens/0.1.0")]

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod runtime;

#[cfg(test)]
pub(crate) mod test_utils;
