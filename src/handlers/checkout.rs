use crate::handlers::common::{
    map_service_error, non_blank, success_response, validate_input, JsonOrForm,
};
use crate::{
    auth::AuthUser,
    errors::rule_violation,
    services::{
        checkout::{CheckoutInput, OrderReceipt},
        user_data::ContactInput,
    },
    ApiResult, AppState,
};
use axum::{
    extract::{Extension, State},
    routing::post,
    Router,
};
use serde::Deserialize;
use validator::{Validate, ValidationError};

pub fn checkout_routes() -> Router<AppState> {
    Router::new().route("/", post(create_transaction))
}

/// Checkout body. Contact fields fall back to the account when omitted.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[serde(default)]
    #[validate(length(max = 30))]
    pub fullname: Option<String>,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub address: Option<String>,
    #[serde(default)]
    #[validate(custom = "validate_phone")]
    pub phone: Option<String>,
    #[serde(default)]
    #[validate(email)]
    pub email: Option<String>,
    #[serde(rename = "id_paymentMethod", alias = "id_payment_method", default)]
    #[validate(required, range(min = 1))]
    pub payment_method_id: Option<i32>,
    #[serde(rename = "id_delivery", default)]
    #[validate(required, range(min = 1))]
    pub delivery_id: Option<i32>,
}

impl CheckoutRequest {
    fn normalized(self) -> Self {
        Self {
            fullname: non_blank(self.fullname),
            address: non_blank(self.address),
            phone: non_blank(self.phone),
            email: non_blank(self.email),
            ..self
        }
    }
}

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if phone.len() == 12 && phone.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(rule_violation("phone", "phone must be exactly 12 digits"))
    }
}

/// Place an order from the caller's cart
async fn create_transaction(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonOrForm(payload): JsonOrForm<CheckoutRequest>,
) -> ApiResult<OrderReceipt> {
    let payload = payload.normalized();
    validate_input(&payload)?;

    let input = CheckoutInput {
        contact: ContactInput {
            email: payload.email,
            fullname: payload.fullname,
            address: payload.address,
            phone: payload.phone,
        },
        payment_method_id: payload.payment_method_id.unwrap_or_default(),
        delivery_id: payload.delivery_id.unwrap_or_default(),
    };

    let receipt = state
        .services
        .checkout
        .checkout(user.account_id, input)
        .await
        .map_err(map_service_error)?;

    Ok(success_response("Transaction completed successfully", receipt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::validation_messages;

    fn valid() -> CheckoutRequest {
        CheckoutRequest {
            payment_method_id: Some(1),
            delivery_id: Some(1),
            ..Default::default()
        }
    }

    #[test]
    fn ids_are_required() {
        let errors = CheckoutRequest::default().validate().unwrap_err();
        assert_eq!(
            validation_messages(&errors),
            vec![
                "id_delivery is required".to_string(),
                "id_paymentMethod is required".to_string(),
            ]
        );
    }

    #[test]
    fn contact_fields_are_optional() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn field_rules_are_enforced() {
        let req = CheckoutRequest {
            fullname: Some("x".repeat(31)),
            phone: Some("0812-345".into()),
            email: Some("nope".into()),
            ..valid()
        };
        let messages = validation_messages(&req.validate().unwrap_err());
        assert_eq!(
            messages,
            vec![
                "invalid email format".to_string(),
                "fullname must be at most 30 characters".to_string(),
                "phone must be exactly 12 digits".to_string(),
            ]
        );
    }

    #[test]
    fn blank_contact_fields_are_dropped_before_validation() {
        let req = CheckoutRequest {
            email: Some("".into()),
            ..valid()
        }
        .normalized();
        assert!(req.email.is_none());
        assert!(req.validate().is_ok());
    }
}
