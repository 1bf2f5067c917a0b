use axum::Json;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::error::AppError;

/// JSON body extractor that also runs the body's `validator` rules.
///
/// Malformed JSON and failed rules both reject with 400.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(format!("Invalid JSON: {}", e.body_text())))?;

        value
            .validate()
            .map_err(|errors| AppError::BadRequest(describe(&errors)))?;

        Ok(Self(value))
    }
}

fn describe(errors: &ValidationErrors) -> String {
    let mut messages = Vec::new();
    collect(None, errors, &mut messages);
    messages.sort();
    if messages.is_empty() {
        return "Validation failed".to_string();
    }
    format!("Validation failed: {}", messages.join(", "))
}

/// Flatten nested errors into `path: message` lines, e.g. `plans[1].price: ...`.
fn collect(prefix: Option<&str>, errors: &ValidationErrors, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let path = prefix.map_or_else(|| field.to_string(), |p| format!("{p}.{field}"));
        match kind {
            ValidationErrorsKind::Field(errs) => {
                out.extend(errs.iter().map(|err| {
                    let msg = err
                        .message
                        .as_ref()
                        .map_or_else(|| err.code.to_string(), ToString::to_string);
                    format!("{path}: {msg}")
                }));
            }
            ValidationErrorsKind::Struct(inner) => collect(Some(&path), inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect(Some(&format!("{path}[{index}]")), inner, out);
                }
            }
        }
    }
}

/// Custom `validator` rules shared by the request DTOs.
pub mod rules {
    use rust_decimal::Decimal;
    use serde_json::Value;
    use validator::ValidationError;

    use crate::entities::status::{
        DiscountType, PackageStatus, PlanStatus, PlanType, ProjectStatus, PurchaseStatus,
    };

    fn invalid(code: &'static str, message: String) -> ValidationError {
        ValidationError::new(code).with_message(message.into())
    }

    fn listing<T: std::fmt::Display>(all: &[T]) -> String {
        all.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
    }

    /// # Errors
    /// Fails unless the value is a known package status.
    pub fn package_status(value: &str) -> Result<(), ValidationError> {
        PackageStatus::from_str(value).map(|_| ()).ok_or_else(|| {
            invalid("status", format!("Status must be one of: {}", listing(PackageStatus::ALL)))
        })
    }

    /// # Errors
    /// Fails unless the value is a known plan status.
    pub fn plan_status(value: &str) -> Result<(), ValidationError> {
        PlanStatus::from_str(value).map(|_| ()).ok_or_else(|| {
            invalid("status", format!("Status must be one of: {}", listing(PlanStatus::ALL)))
        })
    }

    /// # Errors
    /// Fails unless the value is a known purchase status.
    pub fn purchase_status(value: &str) -> Result<(), ValidationError> {
        PurchaseStatus::from_str(value).map(|_| ()).ok_or_else(|| {
            invalid("status", format!("Status must be one of: {}", listing(PurchaseStatus::ALL)))
        })
    }

    /// # Errors
    /// Fails unless the value is a known project status.
    pub fn project_status(value: &str) -> Result<(), ValidationError> {
        ProjectStatus::from_str(value).map(|_| ()).ok_or_else(|| {
            invalid("status", format!("Status must be one of: {}", listing(ProjectStatus::ALL)))
        })
    }

    /// # Errors
    /// Fails unless the value is a plan type (or the `6_months` alias).
    pub fn plan_type(value: &str) -> Result<(), ValidationError> {
        PlanType::parse_lenient(value).map(|_| ()).ok_or_else(|| {
            invalid("plan_type", format!("Plan type must be one of: {}", listing(PlanType::ALL)))
        })
    }

    /// # Errors
    /// Fails unless the value is `fixed` or `percentage`.
    pub fn discount_type(value: &str) -> Result<(), ValidationError> {
        DiscountType::from_str(value).map(|_| ()).ok_or_else(|| {
            invalid(
                "discount_type",
                format!("Discount type must be one of: {}", listing(DiscountType::ALL)),
            )
        })
    }

    /// # Errors
    /// Fails for negative amounts.
    pub fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(invalid("non_negative", "Amount must not be negative".to_string()));
        }
        Ok(())
    }

    /// # Errors
    /// Fails unless the value is a JSON object or array.
    pub fn json_document(value: &Value) -> Result<(), ValidationError> {
        if value.is_object() || value.is_array() {
            return Ok(());
        }
        Err(invalid("json_document", "Must be a JSON object or array".to_string()))
    }

    /// # Errors
    /// Fails unless the name starts with a letter and holds only letters, digits and `_`.
    pub fn identifier(value: &str) -> Result<(), ValidationError> {
        let mut chars = value.chars();
        let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if valid {
            return Ok(());
        }
        Err(invalid(
            "identifier",
            "Must start with a letter and contain only letters, digits and underscores".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, Validate)]
    struct Item {
        #[validate(range(min = 0))]
        qty: i32,
    }

    #[derive(Deserialize, Validate)]
    struct Body {
        #[validate(length(min = 1, message = "name is required"))]
        name: String,
        #[validate(range(min = 1))]
        count: i32,
        #[validate(nested)]
        items: Vec<Item>,
    }

    #[test]
    fn test_describe_lists_every_field() {
        let body = Body {
            name: String::new(),
            count: 0,
            items: vec![Item { qty: 1 }, Item { qty: -1 }],
        };
        let errors = body.validate().err().unwrap_or_default();
        let text = describe(&errors);
        assert!(text.contains("name: name is required"), "{text}");
        assert!(text.contains("count: range"), "{text}");
        assert!(text.contains("items[1].qty: range"), "{text}");
    }

    #[test]
    fn test_rules() {
        assert!(rules::package_status("archived").is_ok());
        assert!(rules::package_status("gone").is_err());
        assert!(rules::plan_type("6_months").is_ok());
        assert!(rules::discount_type("bogus").is_err());
        assert!(rules::non_negative(&rust_decimal::Decimal::new(-1, 2)).is_err());
        assert!(rules::non_negative(&rust_decimal::Decimal::ZERO).is_ok());
        assert!(rules::json_document(&serde_json::json!({"id": "int"})).is_ok());
        assert!(rules::json_document(&serde_json::json!("text")).is_err());
        assert!(rules::identifier("orders_2026").is_ok());
        assert!(rules::identifier("2026_orders").is_err());
        assert!(rules::identifier("drop table").is_err());
    }
}
