//! Accounts and the account directory.
//!
//! An account's role is chosen at sign-up and immutable afterwards in the
//! normal flow; profile edits may change contact fields and, for admins,
//! the institution binding that decides which partition they may address.
//! The backend record is the single source of truth; there is no
//! client-local cache layer in front of it.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use siren_core::error::{Error, Result};
use siren_core::id::AccountId;
use siren_core::keys;
use siren_core::service::ServiceKind;
use siren_core::storage::{DocumentBackend, WritePrecondition, WriteResult};

/// Attempts for a contended profile update before reporting failure.
const MAX_UPDATE_ATTEMPTS: u32 = 5;

/// Account role, fixed at sign-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A citizen reporting incidents.
    User,
    /// An institution operator triaging requests.
    Admin,
}

/// The institution type an admin account acts for.
///
/// Determines which request partition the admin may address. Wire names
/// match the portal's historical values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstituteKind {
    /// Addresses ambulance bookings.
    Hospital,
    /// Addresses fire reports.
    #[serde(rename = "Fire Brigade")]
    FireBrigade,
    /// Addresses crime reports.
    #[serde(rename = "Police Station")]
    PoliceStation,
}

impl InstituteKind {
    /// Returns the service partition this institution type operates on.
    #[must_use]
    pub const fn service_kind(self) -> ServiceKind {
        match self {
            Self::Hospital => ServiceKind::Ambulance,
            Self::FireBrigade => ServiceKind::Fire,
            Self::PoliceStation => ServiceKind::Crime,
        }
    }
}

/// A registered person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Unique account id.
    pub id: AccountId,
    /// Display name.
    pub name: String,
    /// Contact email, unique across the directory.
    pub email: String,
    /// Contact phone, if provided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Account role, immutable after creation.
    pub role: Role,
    /// Marketing opt-in collected at sign-up.
    #[serde(default)]
    pub agreed_to_offers: bool,
    /// Institution name, admins only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,
    /// Institution type, admins only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institute_type: Option<InstituteKind>,
}

impl Account {
    /// Returns true for admin accounts.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    /// Returns true when this account may address requests in `kind`.
    #[must_use]
    pub fn may_address(&self, kind: ServiceKind) -> bool {
        self.is_admin()
            && self
                .institute_type
                .is_some_and(|institute| institute.service_kind() == kind)
    }
}

/// Fields collected at sign-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Contact phone, if provided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Chosen role.
    pub role: Role,
    /// Marketing opt-in.
    #[serde(default)]
    pub agreed_to_offers: bool,
}

/// Profile fields an account holder may edit.
///
/// The role is deliberately absent; it cannot change through this path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    /// New display name, if changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New contact phone, if changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// New institution name (admins only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,
    /// New institution type (admins only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institute_type: Option<InstituteKind>,
}

/// Directory of registered accounts over the shared backend.
pub struct AccountDirectory {
    backend: Arc<dyn DocumentBackend>,
}

impl AccountDirectory {
    /// Creates a directory over the given backend.
    #[must_use]
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self { backend }
    }

    /// Registers a new account.
    pub async fn create(&self, new_account: NewAccount) -> Result<Account> {
        if new_account.name.trim().is_empty() {
            return Err(Error::validation("name must not be empty"));
        }
        if new_account.email.trim().is_empty() {
            return Err(Error::validation("email must not be empty"));
        }
        if self.find_by_email(&new_account.email).await?.is_some() {
            return Err(Error::validation(format!(
                "email {} is already registered",
                new_account.email
            )));
        }

        let account = Account {
            id: AccountId::generate(),
            name: new_account.name,
            email: new_account.email,
            phone: new_account.phone,
            role: new_account.role,
            agreed_to_offers: new_account.agreed_to_offers,
            institution: None,
            institute_type: None,
        };

        let key = keys::account_key(account.id);
        let data = Bytes::from(serde_json::to_vec(&account)?);
        match self
            .backend
            .put(&key, data, WritePrecondition::DoesNotExist)
            .await?
        {
            WriteResult::Success { .. } => Ok(account),
            WriteResult::PreconditionFailed { .. } => Err(Error::internal(format!(
                "generated account id {} collided",
                account.id
            ))),
        }
    }

    /// Fetches an account by id.
    pub async fn get(&self, id: AccountId) -> Result<Account> {
        let (account, _) = self.get_versioned(id).await?;
        Ok(account)
    }

    /// Finds an account by email, scanning the directory.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let metas = self.backend.list(keys::account_prefix()).await?;
        for meta in metas {
            match self.backend.get(&meta.key).await {
                Ok(doc) => {
                    let account: Account = serde_json::from_slice(&doc.data)?;
                    if account.email.eq_ignore_ascii_case(email) {
                        return Ok(Some(account));
                    }
                }
                Err(Error::NotFound { .. }) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(None)
    }

    /// Applies a profile update and returns the stored result.
    ///
    /// Institution fields are accepted only on admin accounts, and must be
    /// set together so the partition binding is never half-configured.
    pub async fn update_profile(&self, id: AccountId, update: ProfileUpdate) -> Result<Account> {
        let key = keys::account_key(id);

        for _attempt in 0..MAX_UPDATE_ATTEMPTS {
            let (mut account, version) = self.get_versioned(id).await?;
            apply_update(&mut account, &update)?;

            let data = Bytes::from(serde_json::to_vec(&account)?);
            match self
                .backend
                .put(&key, data, WritePrecondition::MatchesVersion(version))
                .await?
            {
                WriteResult::Success { .. } => return Ok(account),
                WriteResult::PreconditionFailed { .. } => {}
            }
        }

        Err(Error::storage(format!(
            "profile update for account {id} kept losing to concurrent writers"
        )))
    }

    async fn get_versioned(&self, id: AccountId) -> Result<(Account, String)> {
        let key = keys::account_key(id);
        let doc = match self.backend.get(&key).await {
            Ok(doc) => doc,
            Err(Error::NotFound { .. }) => return Err(Error::not_found("account", id)),
            Err(err) => return Err(err),
        };
        let account: Account = serde_json::from_slice(&doc.data)?;
        Ok((account, doc.version))
    }
}

fn apply_update(account: &mut Account, update: &ProfileUpdate) -> Result<()> {
    if let Some(name) = &update.name {
        if name.trim().is_empty() {
            return Err(Error::validation("name must not be empty"));
        }
        account.name = name.clone();
    }
    if let Some(phone) = &update.phone {
        account.phone = Some(phone.clone());
    }

    if update.institution.is_some() || update.institute_type.is_some() {
        if !account.is_admin() {
            return Err(Error::forbidden(
                "institution fields are limited to admin accounts",
            ));
        }
        if let Some(institution) = &update.institution {
            if institution.trim().is_empty() {
                return Err(Error::validation("institution must not be empty"));
            }
            account.institution = Some(institution.clone());
        }
        if let Some(institute_type) = update.institute_type {
            account.institute_type = Some(institute_type);
        }
        if account.institution.is_some() != account.institute_type.is_some() {
            return Err(Error::validation(
                "institution and instituteType must be set together",
            ));
        }
    }

    Ok(())
}
