//! Sharing-grant records and the vault-membership workflow.
//!
//! A [`DataShare`] records which activity kinds a data owner has shared
//! with a counterpart. The record itself is stored in the clear (it is the
//! index other principals query before they can decrypt anything); the
//! actual access change happens on the vault service, whose membership
//! must be adjusted *before* the grant record is updated.

use crate::error::{CloudError, CloudResult};
use crate::record::{FieldValue, RecordQuery, RemoteDatabase, RemoteRecord, SavePolicy};
use crate::UserVaults;
use careplan_types::{RecordName, SharingGrant, UserId};
use careplan_vault::{CryptoError, VaultAdmin, VaultId};
use std::sync::Arc;
use tracing::info;

/// Remote record type for sharing grants.
pub const SHARE_RECORD_TYPE: &str = "DataShare";

/// Clear field names on share records.
pub mod fields {
    /// The data owner.
    pub const OWNER_ID: &str = "ownerId";
    /// The counterpart the data is shared with.
    pub const PARTNER_ID: &str = "partnerId";
    /// Whether intervention-kind data is shared (0/1).
    pub const INTERVENTIONS_SHARED: &str = "interventionsShared";
    /// Whether assessment-kind data is shared (0/1).
    pub const ASSESSMENTS_SHARED: &str = "assessmentsShared";
}

/// Sharing state between a data owner and one counterpart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataShare {
    /// The data owner.
    pub owner: UserId,
    /// The counterpart user.
    pub partner: UserId,
    /// Whether intervention-kind data is shared.
    pub interventions_shared: bool,
    /// Whether assessment-kind data is shared.
    pub assessments_shared: bool,
}

impl DataShare {
    /// Creates an unshared grant between two users.
    pub fn new(owner: UserId, partner: UserId) -> Self {
        Self {
            owner,
            partner,
            interventions_shared: false,
            assessments_shared: false,
        }
    }

    /// Deterministic record name for the (owner, partner) pair.
    #[must_use]
    pub fn record_name(owner: &UserId, partner: &UserId) -> RecordName {
        RecordName::new(format!("{SHARE_RECORD_TYPE}_{owner}_{partner}"))
    }

    /// The read-only grant projection the sync engine consumes.
    #[must_use]
    pub fn grant(&self) -> SharingGrant {
        SharingGrant::new(self.interventions_shared, self.assessments_shared)
    }

    fn to_record(&self) -> RemoteRecord {
        RemoteRecord::new(SHARE_RECORD_TYPE, Self::record_name(&self.owner, &self.partner))
            .with_field(fields::OWNER_ID, FieldValue::Text(self.owner.to_string()))
            .with_field(fields::PARTNER_ID, FieldValue::Text(self.partner.to_string()))
            .with_field(
                fields::INTERVENTIONS_SHARED,
                FieldValue::Integer(i64::from(self.interventions_shared)),
            )
            .with_field(
                fields::ASSESSMENTS_SHARED,
                FieldValue::Integer(i64::from(self.assessments_shared)),
            )
    }

    fn from_record(record: &RemoteRecord) -> CloudResult<Self> {
        let text = |field: &str| -> CloudResult<UserId> {
            record
                .get(field)
                .and_then(FieldValue::as_text)
                .map(UserId::new)
                .ok_or_else(|| {
                    CloudError::Inconsistency(format!(
                        "share record {} carries no {field} field",
                        record.record_name()
                    ))
                })
        };
        let flag = |field: &str| -> CloudResult<bool> {
            record
                .get(field)
                .and_then(FieldValue::as_integer)
                .map(|v| v != 0)
                .ok_or_else(|| {
                    CloudError::Inconsistency(format!(
                        "share record {} carries no {field} field",
                        record.record_name()
                    ))
                })
        };
        Ok(Self {
            owner: text(fields::OWNER_ID)?,
            partner: text(fields::PARTNER_ID)?,
            interventions_shared: flag(fields::INTERVENTIONS_SHARED)?,
            assessments_shared: flag(fields::ASSESSMENTS_SHARED)?,
        })
    }
}

/// Adjusts vault membership and persists the matching grant record.
pub struct ShareManager {
    db: Arc<dyn RemoteDatabase>,
    admin: Arc<dyn VaultAdmin>,
    vaults: UserVaults,
}

impl ShareManager {
    /// Creates a manager for the owner's vault pair.
    pub fn new(db: Arc<dyn RemoteDatabase>, admin: Arc<dyn VaultAdmin>, vaults: UserVaults) -> Self {
        Self { db, admin, vaults }
    }

    /// Fetches the share record for an (owner, partner) pair.
    ///
    /// A missing record means nothing was ever shared and yields
    /// `Ok(None)`, not an error.
    pub async fn fetch_share(
        &self,
        owner: &UserId,
        partner: &UserId,
    ) -> CloudResult<Option<DataShare>> {
        let query = RecordQuery::new(SHARE_RECORD_TYPE)
            .filter_eq(fields::OWNER_ID, FieldValue::Text(owner.to_string()))
            .filter_eq(fields::PARTNER_ID, FieldValue::Text(partner.to_string()));
        let records = self.db.query(&query).await?;
        records.first().map(DataShare::from_record).transpose()
    }

    /// All shares granted by `owner`.
    pub async fn shares_of_owner(&self, owner: &UserId) -> CloudResult<Vec<DataShare>> {
        let query = RecordQuery::new(SHARE_RECORD_TYPE)
            .filter_eq(fields::OWNER_ID, FieldValue::Text(owner.to_string()));
        let records = self.db.query(&query).await?;
        records.iter().map(DataShare::from_record).collect()
    }

    /// All shares granted *to* `partner`.
    pub async fn shares_with_partner(&self, partner: &UserId) -> CloudResult<Vec<DataShare>> {
        let query = RecordQuery::new(SHARE_RECORD_TYPE)
            .filter_eq(fields::PARTNER_ID, FieldValue::Text(partner.to_string()));
        let records = self.db.query(&query).await?;
        records.iter().map(DataShare::from_record).collect()
    }

    /// Shares or unshares intervention-kind data, updating vault
    /// membership first and persisting the grant record on success.
    pub async fn set_interventions_shared(
        &self,
        share: &mut DataShare,
        shared: bool,
    ) -> CloudResult<()> {
        self.set_shared(&self.vaults.interventions, &share.partner, shared)
            .await?;
        share.interventions_shared = shared;
        self.persist(share).await
    }

    /// Shares or unshares assessment-kind data.
    pub async fn set_assessments_shared(
        &self,
        share: &mut DataShare,
        shared: bool,
    ) -> CloudResult<()> {
        self.set_shared(&self.vaults.assessments, &share.partner, shared)
            .await?;
        share.assessments_shared = shared;
        self.persist(share).await
    }

    /// Removes the grant record entirely. Vault membership is expected to
    /// have been revoked through the per-kind setters first.
    pub async fn remove_share(&self, share: &DataShare) -> CloudResult<()> {
        self.db
            .delete_record(
                SHARE_RECORD_TYPE,
                &DataShare::record_name(&share.owner, &share.partner),
            )
            .await
    }

    async fn set_shared(&self, vault: &VaultId, partner: &UserId, shared: bool) -> CloudResult<()> {
        let result = if shared {
            self.admin.share_vault(vault, partner).await
        } else {
            self.admin.revoke_vault(vault, partner).await
        };
        match result {
            Ok(()) => {
                info!(%vault, %partner, shared, "vault membership updated");
                Ok(())
            }
            Err(CryptoError::AdminCall(message)) => Err(CloudError::AdminCall(message)),
            Err(other) => Err(CloudError::Crypto(other)),
        }
    }

    async fn persist(&self, share: &DataShare) -> CloudResult<()> {
        self.db
            .save_records(vec![share.to_record()], SavePolicy::ReplaceAllFields)
            .await
    }
}
