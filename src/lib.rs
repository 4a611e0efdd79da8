#![deny(future_incompatible)]
#![deny(nonstandard_style)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::many_single_char_names,
    clippy::module_name_repetitions,
    clippy::similar_names
)]

//! Offline Monte-Carlo path tracer core for triangle-mesh scenes.
//!
//! `cpupt` holds the three tightly-coupled subsystems that do the actual
//! rendering work: the BVH, the camera/sampling layer, and the
//! path-tracing integrator. Everything else in this crate (`loader`,
//! `scene`, `api`, `pass`) is the host-facing shell around that core:
//! wavefront parsing, texture decoding, JSON wire schemas, and the
//! pixel-loop driver.

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use log::{debug, info};
use nalgebra as na;
use serde::{Deserialize, Serialize};

mod math;

pub mod api;
pub mod cpupt;
pub mod error;
pub mod loader;
pub mod material;
pub mod pass;
pub mod progress;
pub mod ray;
pub mod scene;
pub mod texture;
pub mod triangle;

pub use error::{Error, Result};
pub use material::Material;
pub use math::*;
pub use ray::Ray;
pub use scene::Scene;
pub use texture::Texture;
pub use triangle::Triangle;

pub const PI: f32 = std::f32::consts::PI;
pub const TAU: f32 = std::f32::consts::TAU;
