//! Request validation and sanitization
//!
//! Every check here runs before any upstream call. Messages are the
//! user-facing strings the site's forms display, so they stay in Spanish.

use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;

/// Maximum name length after trimming
pub const NAME_MAX_CHARS: usize = 100;
/// Maximum email length after trimming, also the sanitize truncation point
pub const EMAIL_MAX_CHARS: usize = 255;

const SANITIZE_MAX_CHARS: usize = 255;

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

pub const MSG_NAME_REQUIRED: &str = "El nombre es obligatorio";
pub const MSG_NAME_TOO_LONG: &str = "El nombre no puede exceder 100 caracteres";
pub const MSG_EMAIL_REQUIRED: &str = "El email es obligatorio";
pub const MSG_EMAIL_FORMAT: &str = "El formato del email no es válido";
pub const MSG_EMAIL_TOO_LONG: &str = "El email no puede exceder 255 caracteres";
pub const MSG_CONTACT_MISSING: &str = "Faltan campos obligatorios.";

fn email_regex() -> &'static Regex {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern compiles"))
}

/// Outcome of `validate_subscription`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    /// All messages in one line, the way the form shows them
    pub fn joined(&self) -> String {
        self.errors.join(", ")
    }
}

/// Newsletter form as received; fields stay untyped until validated
#[derive(Debug, Default)]
pub struct SubscriptionInput {
    pub name: Option<Value>,
    pub email: Option<Value>,
}

impl SubscriptionInput {
    /// Non-object bodies yield no fields at all
    pub fn from_json(body: &Value) -> Self {
        Self {
            name: body.get("name").cloned(),
            email: body.get("email").cloned(),
        }
    }
}

/// A subscription that passed validation and sanitization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRequest {
    pub name: String,
    pub email: String,
}

/// Non-blank string content, trimmed
fn trimmed_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Check name and email, reporting every violation
pub fn validate_subscription(input: &SubscriptionInput) -> ValidationResult {
    let mut errors = Vec::new();

    match trimmed_str(input.name.as_ref()) {
        None => errors.push(MSG_NAME_REQUIRED.to_string()),
        Some(name) if name.chars().count() > NAME_MAX_CHARS => {
            errors.push(MSG_NAME_TOO_LONG.to_string());
        }
        Some(_) => {}
    }

    match trimmed_str(input.email.as_ref()) {
        None => errors.push(MSG_EMAIL_REQUIRED.to_string()),
        Some(email) if !email_regex().is_match(email) => {
            errors.push(MSG_EMAIL_FORMAT.to_string());
        }
        Some(email) if email.chars().count() > EMAIL_MAX_CHARS => {
            errors.push(MSG_EMAIL_TOO_LONG.to_string());
        }
        Some(_) => {}
    }

    ValidationResult {
        valid: errors.is_empty(),
        errors,
    }
}

/// Validate then sanitize, yielding the values forwarded upstream.
///
/// The sanitized values are checked again: a name made only of `<` and `>`
/// would otherwise reach the list empty.
pub fn prepare_subscription(input: &SubscriptionInput) -> Result<SubscriptionRequest, ValidationResult> {
    let result = validate_subscription(input);
    if !result.valid {
        return Err(result);
    }
    let raw = |v: &Option<Value>| v.as_ref().and_then(Value::as_str).unwrap_or_default().to_string();
    let request = SubscriptionRequest {
        name: sanitize(&raw(&input.name)),
        email: sanitize(&raw(&input.email)),
    };

    let result = validate_subscription(&SubscriptionInput {
        name: Some(Value::from(request.name.as_str())),
        email: Some(Value::from(request.email.as_str())),
    });
    if result.valid {
        Ok(request)
    } else {
        Err(result)
    }
}

/// Trim, drop `<` and `>`, cap at 255 characters
pub fn sanitize(text: &str) -> String {
    text.trim()
        .chars()
        .filter(|c| *c != '<' && *c != '>')
        .take(SANITIZE_MAX_CHARS)
        .collect()
}

/// Contact form as received
#[derive(Debug, Default)]
pub struct ContactInput {
    pub asunto: Option<Value>,
    pub descripcion: Option<Value>,
    pub email: Option<Value>,
}

impl ContactInput {
    pub fn from_json(body: &Value) -> Self {
        Self {
            asunto: body.get("asunto").cloned(),
            descripcion: body.get("descripcion").cloned(),
            email: body.get("email").cloned(),
        }
    }
}

/// A contact message ready to relay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactMessage {
    pub subject: String,
    pub description: String,
    pub reply_to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub &'static str);

/// Presence check only: absent, null, empty or falsy values are missing
pub fn validate_contact(input: &ContactInput) -> Result<ContactMessage, ValidationError> {
    match (
        present_text(input.asunto.as_ref()),
        present_text(input.descripcion.as_ref()),
        present_text(input.email.as_ref()),
    ) {
        (Some(subject), Some(description), Some(reply_to)) => Ok(ContactMessage {
            subject,
            description,
            reply_to,
        }),
        _ => Err(ValidationError(MSG_CONTACT_MISSING)),
    }
}

/// Truthy JSON value rendered as text
fn present_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64().is_some_and(|f| f != 0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        Value::Array(_) | Value::Object(_) => value.map(Value::to_string),
        _ => None,
    }
}

/// Purchasable mentorship plans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckoutPlan {
    Monthly,
    Quarterly,
    Annual,
}

impl CheckoutPlan {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Monthly => "mensual",
            Self::Quarterly => "trimestral",
            Self::Annual => "anual",
        }
    }
}

impl fmt::Display for CheckoutPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exactly one of the plan wire names, nothing else
pub fn validate_checkout_plan(plan: Option<&Value>) -> Option<CheckoutPlan> {
    match plan?.as_str()? {
        "mensual" => Some(CheckoutPlan::Monthly),
        "trimestral" => Some(CheckoutPlan::Quarterly),
        "anual" => Some(CheckoutPlan::Annual),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(name: Value, email: Value) -> SubscriptionInput {
        SubscriptionInput {
            name: Some(name),
            email: Some(email),
        }
    }

    #[test]
    fn test_valid_subscription() {
        let result = validate_subscription(&input(json!("Ana"), json!("ana@example.com")));
        assert!(result.valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_missing_fields_report_both() {
        let result = validate_subscription(&SubscriptionInput::default());
        assert!(!result.valid);
        assert_eq!(result.errors, vec![MSG_NAME_REQUIRED, MSG_EMAIL_REQUIRED]);
        assert_eq!(result.joined(), "El nombre es obligatorio, El email es obligatorio");
    }

    #[test]
    fn test_blank_and_non_string_are_missing() {
        let result = validate_subscription(&input(json!("   "), json!(42)));
        assert_eq!(result.errors, vec![MSG_NAME_REQUIRED, MSG_EMAIL_REQUIRED]);
    }

    #[test]
    fn test_name_bounds() {
        let ok = "a".repeat(100);
        let too_long = "a".repeat(101);
        assert!(validate_subscription(&input(json!(ok), json!("a@b.co"))).valid);
        // surrounding whitespace does not count
        assert!(validate_subscription(&input(json!(format!("  {ok}  ")), json!("a@b.co"))).valid);
        let result = validate_subscription(&input(json!(too_long), json!("a@b.co")));
        assert_eq!(result.errors, vec![MSG_NAME_TOO_LONG]);
    }

    #[test]
    fn test_email_pattern() {
        for bad in ["plain", "a@b", "@b.com", "a@.com x", "a b@c.com", "a@@b.com"] {
            let result = validate_subscription(&input(json!("Ana"), json!(bad)));
            assert_eq!(result.errors, vec![MSG_EMAIL_FORMAT], "accepted {bad}");
        }
        for good in ["a@b.co", "first.last@sub.domain.es", "  x@y.z  "] {
            assert!(validate_subscription(&input(json!("Ana"), json!(good))).valid, "rejected {good}");
        }
    }

    #[test]
    fn test_email_too_long() {
        let email = format!("{}@example.com", "a".repeat(250));
        let result = validate_subscription(&input(json!("Ana"), json!(email)));
        assert_eq!(result.errors, vec![MSG_EMAIL_TOO_LONG]);
    }

    #[test]
    fn test_sanitize() {
        let out = sanitize("  <b>Bob</b>  ");
        assert_eq!(out, "bBob/b");
        assert!(!out.contains('<') && !out.contains('>'));
        assert_eq!(sanitize(&"x".repeat(300)).chars().count(), 255);
        assert_eq!(sanitize("ñandú"), "ñandú");
    }

    #[test]
    fn test_prepare_subscription_sanitizes() {
        let req = prepare_subscription(&input(json!(" <i>Ana</i> "), json!(" ana@example.com ")))
            .unwrap();
        assert_eq!(req.name, "iAna/i");
        assert_eq!(req.email, "ana@example.com");

        let err = prepare_subscription(&SubscriptionInput::default()).unwrap_err();
        assert!(!err.valid);
    }

    #[test]
    fn test_prepare_subscription_rejects_what_sanitizing_empties() {
        let err = prepare_subscription(&input(json!("<>"), json!("ana@example.com"))).unwrap_err();
        assert_eq!(err.errors, vec![MSG_NAME_REQUIRED]);

        let err = prepare_subscription(&input(json!(" <<>> "), json!("<@<.<"))).unwrap_err();
        assert_eq!(err.errors, vec![MSG_NAME_REQUIRED, MSG_EMAIL_FORMAT]);
    }

    #[test]
    fn test_inputs_from_json() {
        let sub = SubscriptionInput::from_json(&json!({"name": "Ana", "email": "a@b.co", "x": 1}));
        assert!(validate_subscription(&sub).valid);
        let none = SubscriptionInput::from_json(&json!(["Ana"]));
        assert!(none.name.is_none() && none.email.is_none());

        let contact = ContactInput::from_json(&json!({"asunto": "Hola"}));
        assert!(contact.asunto.is_some());
        assert!(contact.descripcion.is_none());
    }

    #[test]
    fn test_validate_contact() {
        let ok = ContactInput {
            asunto: Some(json!("Hola")),
            descripcion: Some(json!("Test")),
            email: Some(json!("a@b.com")),
        };
        let msg = validate_contact(&ok).unwrap();
        assert_eq!(msg.subject, "Hola");
        assert_eq!(msg.reply_to, "a@b.com");

        let missing = ContactInput {
            asunto: Some(json!("Hola")),
            descripcion: Some(json!("")),
            email: Some(json!("a@b.com")),
        };
        assert_eq!(
            validate_contact(&missing).unwrap_err().to_string(),
            MSG_CONTACT_MISSING
        );

        let null_email = ContactInput {
            asunto: Some(json!("Hola")),
            descripcion: Some(json!("Test")),
            email: Some(Value::Null),
        };
        assert!(validate_contact(&null_email).is_err());
    }

    #[test]
    fn test_validate_checkout_plan() {
        assert_eq!(validate_checkout_plan(Some(&json!("mensual"))), Some(CheckoutPlan::Monthly));
        assert_eq!(validate_checkout_plan(Some(&json!("trimestral"))), Some(CheckoutPlan::Quarterly));
        assert_eq!(validate_checkout_plan(Some(&json!("anual"))), Some(CheckoutPlan::Annual));
        assert_eq!(validate_checkout_plan(Some(&json!("semanal"))), None);
        assert_eq!(validate_checkout_plan(Some(&json!("Mensual"))), None);
        assert_eq!(validate_checkout_plan(Some(&json!(1))), None);
        assert_eq!(validate_checkout_plan(None), None);
    }
}
