// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 genoflow contributors

//! Terminal helpers shared by the engine and the CLI

pub mod progress;

pub use progress::*;
