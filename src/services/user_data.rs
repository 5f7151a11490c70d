//! Fills in checkout contact details the caller left out.

use crate::{
    entities::{account, user},
    errors::ServiceError,
};
use sea_orm::{ConnectionTrait, EntityTrait};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Contact fields as supplied by the caller; any of them may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactInput {
    pub email: Option<String>,
    pub fullname: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

/// Contact fields with every value present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    pub email: String,
    pub fullname: String,
    pub address: String,
    pub phone: String,
}

/// What the account has on file.
#[derive(Debug, Clone, Default)]
pub struct StoredContact {
    pub email: Option<String>,
    pub fullname: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

impl StoredContact {
    fn from_models(account: account::Model, user: Option<user::Model>) -> Self {
        Self {
            email: user.and_then(|u| u.email),
            fullname: account.fullname,
            address: account.address,
            phone: account.phone,
        }
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn pick(field: &str, supplied: Option<String>, stored: Option<String>) -> Result<String, ServiceError> {
    present(supplied)
        .or_else(|| present(stored))
        .ok_or_else(|| ServiceError::ValidationError(format!("{} is required", field)))
}

/// Merges supplied values over stored ones. Fields are checked in the order
/// email, fullname, address, phone and the first missing one is reported.
pub fn merge_contact(
    supplied: ContactInput,
    stored: StoredContact,
) -> Result<ContactDetails, ServiceError> {
    Ok(ContactDetails {
        email: pick("email", supplied.email, stored.email)?,
        fullname: pick("fullname", supplied.fullname, stored.fullname)?,
        address: pick("address", supplied.address, stored.address)?,
        phone: pick("phone", supplied.phone, stored.phone)?,
    })
}

/// Reads the account once on `conn` and resolves the contact details.
///
/// Runs on any connection so checkout can call it inside its transaction.
pub async fn resolve_contact<C>(
    conn: &C,
    account_id: i32,
    supplied: ContactInput,
) -> Result<ContactDetails, ServiceError>
where
    C: ConnectionTrait,
{
    let (account, user) = account::Entity::find_by_id(account_id)
        .find_also_related(user::Entity)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("account {} not found", account_id)))?;

    debug!(account_id, "resolving checkout contact details");
    merge_contact(supplied, StoredContact::from_models(account, user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn stored() -> StoredContact {
        StoredContact {
            email: Some("jane@example.com".into()),
            fullname: Some("Jane Doe".into()),
            address: Some("12 Bean Street".into()),
            phone: Some("081234567890".into()),
        }
    }

    #[test]
    fn supplied_values_win() {
        let supplied = ContactInput {
            fullname: Some("John Roe".into()),
            ..Default::default()
        };
        let resolved = merge_contact(supplied, stored()).unwrap();
        assert_eq!(resolved.fullname, "John Roe");
        assert_eq!(resolved.email, "jane@example.com");
    }

    #[test]
    fn missing_fullname_falls_back_to_account() {
        let resolved = merge_contact(ContactInput::default(), stored()).unwrap();
        assert_eq!(resolved.fullname, "Jane Doe");
    }

    #[test]
    fn blank_values_count_as_missing() {
        let supplied = ContactInput {
            address: Some("   ".into()),
            ..Default::default()
        };
        let resolved = merge_contact(supplied, stored()).unwrap();
        assert_eq!(resolved.address, "12 Bean Street");
    }

    #[test]
    fn missing_everywhere_names_the_field() {
        let mut on_file = stored();
        on_file.email = None;
        let err = merge_contact(ContactInput::default(), on_file).unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(msg) if msg == "email is required");
    }

    #[test]
    fn first_missing_field_short_circuits() {
        let err = merge_contact(ContactInput::default(), StoredContact::default()).unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(msg) if msg == "email is required");

        let only_email = StoredContact {
            email: Some("a@b.co".into()),
            ..Default::default()
        };
        let err = merge_contact(ContactInput::default(), only_email).unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(msg) if msg == "fullname is required");
    }
}
