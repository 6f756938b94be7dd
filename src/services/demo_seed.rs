use serde::Serialize;
use uuid::Uuid;

use crate::db::types::AppRole;
use crate::repositories::{ProfileUpdate, RecordStore};
use crate::services::identity::{IdentityConnector, IdentityError};

pub(crate) struct DemoAccount {
    pub(crate) email: &'static str,
    pub(crate) password: &'static str,
    pub(crate) full_name: &'static str,
    pub(crate) role: AppRole,
}

pub(crate) const DEMO_ACCOUNTS: [DemoAccount; 3] = [
    DemoAccount {
        email: "admin@example.com",
        password: "admin123",
        full_name: "Admin User",
        role: AppRole::Admin,
    },
    DemoAccount {
        email: "student@example.com",
        password: "student123",
        full_name: "Student User",
        role: AppRole::User,
    },
    DemoAccount {
        email: "assessor@example.com",
        password: "assessor123",
        full_name: "Assessor User",
        role: AppRole::Assessor,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum SeedStatus {
    Created,
    Existing,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SeedOutcome {
    pub(crate) email: &'static str,
    pub(crate) role: AppRole,
    pub(crate) status: SeedStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
}

/// Creates the demo accounts, or reuses them when they already exist.
///
/// Each account goes through its own identity client so no mounted tab is touched.
pub(crate) async fn seed_demo_accounts(
    connector: &dyn IdentityConnector,
    records: &dyn RecordStore,
) -> Vec<SeedOutcome> {
    let mut outcomes = Vec::with_capacity(DEMO_ACCOUNTS.len());
    for account in &DEMO_ACCOUNTS {
        let outcome = match seed_account(connector, records, account).await {
            Ok(status) => SeedOutcome { email: account.email, role: account.role, status, error: None },
            Err(err) => {
                tracing::warn!(email = account.email, error = %err, "Failed to seed demo account");
                SeedOutcome {
                    email: account.email,
                    role: account.role,
                    status: SeedStatus::Failed,
                    error: Some(err),
                }
            }
        };
        outcomes.push(outcome);
    }
    outcomes
}

async fn seed_account(
    connector: &dyn IdentityConnector,
    records: &dyn RecordStore,
    account: &DemoAccount,
) -> Result<SeedStatus, String> {
    let identity = connector.connect(None);

    let (user_id, status): (Uuid, SeedStatus) =
        match identity.sign_up(account.email, account.password, account.full_name).await {
            Ok(outcome) => (outcome.user.id, SeedStatus::Created),
            Err(IdentityError::AlreadyRegistered(_)) => {
                let session = identity
                    .sign_in_with_password(account.email, account.password)
                    .await
                    .map_err(|err| err.to_string())?;
                (session.user.id, SeedStatus::Existing)
            }
            Err(err) => return Err(err.to_string()),
        };

    records
        .upsert_profile(
            user_id,
            ProfileUpdate { full_name: Some(account.full_name.to_string()), avatar_url: None },
        )
        .await
        .map_err(|err| err.to_string())?;
    records.replace_role(user_id, account.role).await.map_err(|err| err.to_string())?;

    if let Err(err) = identity.sign_out().await {
        tracing::debug!(email = account.email, error = %err, "Demo seed sign-out failed");
    }

    tracing::info!(email = account.email, role = account.role.as_str(), ?status, "Seeded demo account");
    Ok(status)
}
