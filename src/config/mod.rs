// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 genoflow contributors

//! Pipeline documents
//!
//! Loading, property substitution, and run settings for the declarative
//! configuration tree the object registry is built from.

mod document;
mod properties;

pub use document::*;
pub use properties::Properties;
