use chrono::{DateTime, Utc};

use crate::{
    db_types::{Donation, NewDonation, PaymentStatus},
    traits::StoreError,
};

/// Donation records and their payment status life cycle.
///
/// A donation is created PENDING by the initiation flow and moves exactly once to a terminal status (COMPLETED or
/// FAILED). The transition is a compare-and-set, which is what makes settlement idempotent under redelivered and
/// concurrently delivered notifications.
#[allow(async_fn_in_trait)]
pub trait DonationManagement {
    /// Inserts a new PENDING donation. Fails with [`StoreError::DonationAlreadyExists`] if the id or payment reference
    /// is already taken.
    async fn insert_donation(&self, donation: NewDonation) -> Result<Donation, StoreError>;

    async fn fetch_donation(&self, id: &str) -> Result<Option<Donation>, StoreError>;

    async fn fetch_donation_by_payment_ref(&self, payment_ref: &str) -> Result<Option<Donation>, StoreError>;

    /// Moves a PENDING donation to `status`, stamping its settlement time.
    ///
    /// Returns `None` when the donation is not PENDING any more (it was settled by someone else, possibly a concurrent
    /// delivery of the same notification). In that case nothing is written.
    async fn transition_pending_donation(
        &self,
        id: &str,
        status: PaymentStatus,
    ) -> Result<Option<Donation>, StoreError>;

    async fn fetch_completed_donations_for_donor(&self, donor_id: &str) -> Result<Vec<Donation>, StoreError>;

    /// Records that every aggregate effect of the donation has been applied.
    async fn mark_donation_propagated(&self, id: &str) -> Result<(), StoreError>;

    /// COMPLETED donations that were settled before `settled_before` but never marked as propagated.
    async fn fetch_unpropagated_donations(&self, settled_before: DateTime<Utc>) -> Result<Vec<Donation>, StoreError>;
}
