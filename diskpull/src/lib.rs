//! Exactly-once traversal of an infinitely-scrolling photo timeline.
//!
//! The timeline exposes no pagination, no random access and no stable ids,
//! only a rendered window, "scroll by N pixels" and ordinary input events.
//! This crate drives it over the Chrome DevTools Protocol: locate the
//! topmost date group in the window, select it, start its download,
//! deselect, then scroll the group out of the scan band so it can never be
//! visited again. An inclusive date range can restrict the walk, and every
//! failure is classified transient (continue) or fatal (abort with a
//! report).
//!
//! The engine only ever talks to the page through the [`Surface`] trait;
//! [`DiskSurface`] is the live implementation and tests substitute a
//! scripted one.

pub mod auth;
pub mod cdp;
pub mod config;
pub mod daterange;
pub mod detect;
pub mod disk;
pub mod engine;
pub mod errors;
pub mod locator;
pub mod report;
pub mod scripts;
pub mod scroll;
pub mod selection;
pub mod surface;
pub mod types;

pub use cdp::CdpSession;
pub use config::{EngineConfig, EngineLimits, SessionConfig};
pub use daterange::{DateRange, RangePosition};
pub use disk::{DiskSurface, PHOTOS_URL};
pub use engine::{Outcome, TraversalEngine, TraversalState};
pub use errors::{FaultKind, SurfaceError};
pub use locator::GroupLocator;
pub use report::{FailureRecord, ReportBuilder, RunReport};
pub use scroll::ScrollCursor;
pub use selection::{ProcessResult, SelectStrategy, SelectionController, SELECT_LADDER};
pub use surface::Surface;
pub use types::{Group, Pacing, Point, RetryPolicy, ScanBand};
