//! Detection of dangerous bends in OpenStreetMap road networks.
//!
//! A dangerous bend is a node of a road at which the road changes its
//! direction sharply within a short distance. See [`BendDetector`] for the
//! detection itself and [`reader::process_pbf`] for feeding it from an OSM PBF
//! file.

pub mod bend;
pub mod config;
pub mod error;
pub mod geo;
pub mod ids;
pub mod osmpbf;
pub mod output;
pub mod parallel;
pub mod reader;
pub mod stats;
pub mod way;

pub use crate::bend::{BendDetector, Finding, WayConsumer};
pub use crate::config::Config;
pub use crate::error::{Error, Result};
pub use crate::geo::GeoPoint;
pub use crate::stats::Stats;
pub use crate::way::{Node, Tags, Way};
