// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Layout
//!
//! Placement records, overrides and the padded storage plan derived from them.

pub mod placement;
pub mod plan;

pub use placement::{MechanismLayout, MechanismOverrides};
pub use plan::{index_into, round_up, LayoutPlan};
