//! Gallery DB Library
//!
//! Persistence seam for gallery records. Handlers only ever talk to the
//! [`ImageRepository`] trait; the in-process implementation is what the
//! binary ships with.

pub mod db;

pub use db::image::{ImageRepository, InMemoryImageRepository};
