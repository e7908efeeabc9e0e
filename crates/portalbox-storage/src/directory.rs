//! Authorization directory backed by the SQLite database.

use crate::connection::Database;
use crate::error::{StorageError, StorageResult};
use crate::models::{CardHolder, CardType, EquipmentProfile, PolicyDefaults};
use crate::repositories::{
    CardRepository, EquipmentRepository, SqliteCardRepository, SqliteEquipmentRepository,
};
use portalbox_core::{AuthorizationClient, AuthorizationResult, Badge, DenialReason};
use tracing::{debug, warn};

/// Decides whether a badge may use the equipment this box controls.
///
/// Rules, in order:
/// 1. the card must exist and be a user card registered to an active user;
/// 2. the box must be in service;
/// 3. if the equipment type requires training, the user must hold an
///    authorization for that type;
/// 4. if the equipment is charged, the user's balance must be positive.
///
/// A database failure is never a denial: [`AuthorizationClient::authorize`]
/// maps it to [`AuthorizationResult::Unreachable`].
pub struct SqliteDirectory<C = SqliteCardRepository> {
    cards: C,
    equipment: EquipmentProfile,
    defaults: PolicyDefaults,
}

impl SqliteDirectory {
    /// Directory for an already loaded equipment profile.
    pub fn new(db: &Database, equipment: EquipmentProfile, defaults: PolicyDefaults) -> Self {
        Self::with_repository(
            SqliteCardRepository::new(db.pool().clone()),
            equipment,
            defaults,
        )
    }

    /// Load the profile registered for `mac` and build a directory for it.
    ///
    /// # Errors
    /// `StorageError::NotFound` if the box is not registered.
    pub async fn for_box(db: &Database, mac: &str, defaults: PolicyDefaults) -> StorageResult<Self> {
        let equipment = SqliteEquipmentRepository::new(db.pool().clone())
            .find_by_mac(mac)
            .await?
            .ok_or_else(|| StorageError::not_found("equipment", "mac_address", mac))?;
        Ok(Self::new(db, equipment, defaults))
    }
}

impl<C: CardRepository> SqliteDirectory<C> {
    pub fn with_repository(cards: C, equipment: EquipmentProfile, defaults: PolicyDefaults) -> Self {
        Self {
            cards,
            equipment,
            defaults,
        }
    }

    pub fn equipment(&self) -> &EquipmentProfile {
        &self.equipment
    }

    pub fn defaults(&self) -> &PolicyDefaults {
        &self.defaults
    }

    /// User the badge is registered to, if any.
    pub async fn user_for_card(&self, badge: &Badge) -> StorageResult<Option<CardHolder>> {
        self.cards.holder(badge.card_id()).await
    }

    /// Apply the access rules, surfacing database errors.
    pub async fn decide(&self, badge: &Badge) -> StorageResult<AuthorizationResult> {
        let card_id = badge.card_id();

        let Some(type_id) = self.cards.card_type_id(card_id).await? else {
            return Ok(AuthorizationResult::denied(DenialReason::UnknownCard));
        };
        if !CardType::from_id(type_id).is_some_and(CardType::is_user) {
            return Ok(AuthorizationResult::denied(DenialReason::NotUserCard));
        }

        let Some(holder) = self.cards.holder(card_id).await? else {
            return Ok(AuthorizationResult::denied(DenialReason::UnknownCard));
        };
        if !holder.is_active {
            return Ok(AuthorizationResult::denied(DenialReason::NotAuthorized));
        }

        if !self.equipment.in_service {
            return Ok(AuthorizationResult::denied(DenialReason::Other(
                "equipment out of service".into(),
            )));
        }

        if self.equipment.requires_training
            && !self
                .cards
                .is_authorized_for(holder.user_id, self.equipment.type_id)
                .await?
        {
            return Ok(AuthorizationResult::denied(DenialReason::NotAuthorized));
        }

        if self.equipment.requires_payment() && !holder.has_positive_balance() {
            return Ok(AuthorizationResult::denied(
                DenialReason::InsufficientBalance,
            ));
        }

        Ok(AuthorizationResult::granted(
            self.equipment.policy(&self.defaults),
        ))
    }
}

impl<C: CardRepository> AuthorizationClient for SqliteDirectory<C> {
    async fn authorize(&mut self, badge: &Badge) -> AuthorizationResult {
        match self.decide(badge).await {
            Ok(result) => {
                debug!(badge = %badge, %result, "Directory decision");
                result
            }
            Err(err) => {
                warn!(badge = %badge, error = %err, "Directory lookup failed");
                AuthorizationResult::Unreachable
            }
        }
    }
}
