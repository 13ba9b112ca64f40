// SPDX-License-Identifier: MPL-2.0
//! Domain layer - Value types and pure state of the viewer.
//!
//! Nothing in here performs I/O or talks to a rendering surface; the
//! application layer wires these types to the ports.
//!
//! # Modules
//!
//! - [`sequence`]: Image sequence navigation ([`SequenceNavigator`](sequence::SequenceNavigator),
//!   [`ImageId`](sequence::ImageId))
//! - [`transform`]: Shared viewport transform ([`TransformState`](transform::TransformState),
//!   [`TransformOp`](transform::TransformOp))
//! - [`tool`]: Interactive tools ([`Tool`](tool::Tool))
//! - [`layout`]: Grid layout ([`GridLayout`](layout::GridLayout))
//! - [`measurement`]: Annotation records ([`MeasurementSnapshot`](measurement::MeasurementSnapshot))
//! - [`study`]: Study metadata and media kind ([`StudyMetadata`](study::StudyMetadata),
//!   [`MediaKind`](study::MediaKind))
//! - [`playback`]: Cine value types ([`FrameRate`](playback::FrameRate),
//!   [`CineState`](playback::CineState))

pub mod layout;
pub mod measurement;
pub mod playback;
pub mod sequence;
pub mod study;
pub mod tool;
pub mod transform;
