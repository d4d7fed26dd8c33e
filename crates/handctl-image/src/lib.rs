//! Frame decoding and image manipulation for the gesture server.
//!
//! # Overview
//!
//! [`Image`] is an owned 8-bit RGB image. Clients submit frames as base64 data URLs, which are
//! turned into [`Image`]s by [`decode_frame`]. Decoding is the only place where client input is
//! interpreted, so all of its failure modes are collected in [`DecodeError`].
//!
//! [`Rect`] and [`Resolution`] describe regions of interest and network input sizes.
//! [`Image::crop_resize`] samples a region of a frame into a fixed-size network input.

pub mod rect;

mod decode;
mod image;
mod resolution;


pub use crate::image::Image;
pub use decode::{decode_frame, DecodeError, ImageFormat};
pub use rect::Rect;
pub use resolution::{AspectRatio, Resolution};
