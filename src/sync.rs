//! Bookkeeping of the sync gatekeeper.
//!
//! The phases a canvas editor moves through:
//! ```text
//! ┌───────────────┐  surface ready  ┌────────┐  begin_apply  ┌────────────┐
//! │ AwaitingReady ├────────────────►│  Idle  ├──────────────►│  Applying  │
//! └───────────────┘                 │        │◄──────────────┤            │
//!                                   └────────┘  last finish  └──────┬─────┘
//!                                                                   │ ▲
//!                                                                   └─┘ overlapping apply
//! ```
//!
//! Every apply gets a generation number. Only the newest generation may commit
//! into the registry, so when two applies overlap the later-started one wins
//! no matter which finishes loading first.

use log::{debug, warn};

use crate::payload::{CanvasDataPayload, Fingerprint};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// The surface has not signalled readiness yet
    AwaitingReady,
    Idle,
    /// At least one reset-and-apply is loading assets
    Applying,
}

impl SyncPhase {
    pub fn can_transition_to(&self, next: SyncPhase) -> bool {
        matches!(
            (self, next),
            (SyncPhase::AwaitingReady, SyncPhase::Idle)
                | (SyncPhase::Idle, SyncPhase::Applying)
                | (SyncPhase::Applying, SyncPhase::Applying)
                | (SyncPhase::Applying, SyncPhase::Idle)
        )
    }
}

/// What to do with an incoming payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDecision {
    /// Clear everything and rebuild from the payload
    ResetAndApply,
    /// Same content is already shown; only remember it
    RecordOnly,
}

/// A payload that arrived before it could be applied
#[derive(Debug, Clone, PartialEq)]
pub struct PendingPayload {
    pub payload: CanvasDataPayload,
    pub force_reset: bool,
}

#[derive(Debug, Clone)]
pub struct SyncState {
    phase: SyncPhase,
    last_fingerprint: Option<Fingerprint>,
    current_payload: Option<CanvasDataPayload>,
    pending: Option<PendingPayload>,
    generation: u64,
    in_flight: usize,
}

impl Default for SyncState {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncState {
    pub fn new() -> Self {
        Self {
            phase: SyncPhase::AwaitingReady,
            last_fingerprint: None,
            current_payload: None,
            pending: None,
            generation: 0,
            in_flight: 0,
        }
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn is_ready(&self) -> bool {
        self.phase != SyncPhase::AwaitingReady
    }

    pub fn last_fingerprint(&self) -> Option<&Fingerprint> {
        self.last_fingerprint.as_ref()
    }

    pub fn current_payload(&self) -> Option<&CanvasDataPayload> {
        self.current_payload.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn mark_ready(&mut self) {
        if self.phase == SyncPhase::AwaitingReady {
            self.transition(SyncPhase::Idle);
        }
    }

    /// Reset when nothing is shown, or when the content differs from what was applied last
    pub fn decide(&self, fingerprint: &Fingerprint, registry_empty: bool) -> SyncDecision {
        let unchanged = self.current_payload.is_some()
            && self.last_fingerprint.as_ref() == Some(fingerprint);
        if registry_empty || !unchanged {
            SyncDecision::ResetAndApply
        } else {
            SyncDecision::RecordOnly
        }
    }

    /// Remember a payload as the shown content without touching the canvas
    pub fn record(&mut self, payload: &CanvasDataPayload, fingerprint: Fingerprint) {
        self.last_fingerprint = Some(fingerprint);
        self.current_payload = Some(payload.clone());
    }

    /// Starts an apply and hands out its generation
    pub fn begin_apply(&mut self, payload: &CanvasDataPayload, fingerprint: Fingerprint) -> u64 {
        self.record(payload, fingerprint);
        self.generation += 1;
        self.in_flight += 1;
        self.transition(SyncPhase::Applying);
        self.generation
    }

    /// Only the newest apply may commit
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    pub fn finish_apply(&mut self, generation: u64) {
        self.in_flight = self.in_flight.saturating_sub(1);
        debug!(
            "apply #{generation} finished, {} still loading",
            self.in_flight
        );
        if self.in_flight == 0 {
            self.transition(SyncPhase::Idle);
        }
    }

    /// Parks a payload until the editor can apply it. A newer payload replaces
    /// an older one but inherits its forced reset.
    pub fn park(&mut self, payload: CanvasDataPayload, force_reset: bool) {
        let force_reset = force_reset || self.pending.as_ref().is_some_and(|p| p.force_reset);
        self.pending = Some(PendingPayload {
            payload,
            force_reset,
        });
    }

    pub fn take_pending(&mut self) -> Option<PendingPayload> {
        self.pending.take()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The next payload will reset the canvas no matter its fingerprint
    pub fn forget_payload(&mut self) {
        self.last_fingerprint = None;
        self.current_payload = None;
    }

    fn transition(&mut self, next: SyncPhase) {
        if self.phase.can_transition_to(next) {
            self.phase = next;
        } else {
            warn!("ignoring sync transition {:?} -> {:?}", self.phase, next);
        }
    }
}
