//! Reconciliation of resolved machines into the object store.
//!
//! Two strategies are available and selected by `ReconcileMode`:
//! - `endpoint`: upsert the machine's `Endpoint` (address owned elsewhere)
//! - `reservation`: own the machine's `IPReservation`, replacing it on change

pub mod endpoint;
pub mod reservation;

pub use endpoint::EndpointReconciler;
pub use reservation::{ORIGIN, ReservationReconciler};

use crate::error::ReconcileError;
use crate::resolver::Binding;

/// Result of a successful reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Record did not exist and was created
    Created,
    /// Record existed and was updated in place
    Updated,
    /// Record existed with different content and was deleted then recreated
    Replaced,
    /// Record already matched
    Unchanged,
    /// Create lost a race with a concurrent writer; treated as success
    Conflict,
}

/// A reconciler strategy
#[async_trait::async_trait]
pub trait Reconcile: Send + Sync + std::fmt::Debug {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Bring the store in line with `binding`
    async fn reconcile(&self, binding: &Binding) -> Result<ReconcileOutcome, ReconcileError>;
}
