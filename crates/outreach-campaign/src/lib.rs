// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Batch-call campaigns for Outreach.
//!
//! [`BatchTracker`] owns the per-group lifecycle record, [`ProgressMonitor`]
//! polls the call provider for running batches, and [`CampaignService`] ties
//! both to provider submission.

pub mod follow_up;
pub mod monitor;
pub mod service;
pub mod tracker;

pub use follow_up::{FollowUpHook, NoopFollowUp};
pub use monitor::{MonitorExit, MonitorHandle, MonitorSettings, ProgressMonitor};
pub use service::{BatchSummary, CampaignService};
pub use tracker::BatchTracker;
