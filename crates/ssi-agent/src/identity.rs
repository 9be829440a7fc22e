//! Synthetic identity generation for registration forms. Replaces a Faker
//! microservice call with a local, curated-table generator — the same
//! "static table + `rand::choose`" idiom already used for browser
//! fingerprinting.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

const FIRST_NAMES: &[&str] = &[
    "James", "Mary", "Robert", "Patricia", "John", "Jennifer", "Michael", "Linda",
    "David", "Barbara", "Daniel", "Susan", "Matthew", "Karen", "Anthony", "Nancy",
];

const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis",
    "Rodriguez", "Martinez", "Wilson", "Anderson", "Taylor", "Thomas", "Moore", "Jackson",
];

const EMAIL_DOMAINS: &[&str] = &["protonmail.com", "outlook.com", "gmail.com", "yahoo.com"];

const STREET_NAMES: &[&str] = &["Maple", "Oak", "Cedar", "Pine", "Elm", "Washington", "Lincoln", "Park"];
const STREET_SUFFIXES: &[&str] = &["St", "Ave", "Dr", "Ln", "Rd", "Blvd"];

const CITY_STATE_ZIP: &[(&str, &str, &str)] = &[
    ("Austin", "TX", "73301"),
    ("Columbus", "OH", "43004"),
    ("Denver", "CO", "80201"),
    ("Tampa", "FL", "33601"),
    ("Portland", "OR", "97201"),
    ("Raleigh", "NC", "27601"),
];

/// Password variants keyed by the format constraint a registration form may
/// impose on a given field, distinguished by placeholder text (e.g. "8-12
/// digits", "digits only").
#[derive(Debug, Clone, Serialize)]
pub struct PasswordVariants {
    pub default: String,
    pub digits_8: String,
    pub digits_12: String,
    pub simple_10: String,
}

/// A synthetic identity profile used to fill out scam registration forms.
/// Never corresponds to a real person — all fields are generated from
/// curated tables plus random digits.
#[derive(Debug, Clone, Serialize)]
pub struct IdentityProfile {
    pub full_name: String,
    pub email: String,
    pub username: String,
    pub phone: String,
    pub address: String,
    pub date_of_birth: String,
    pub ssn: String,
    pub credit_card: String,
    pub password_variants: PasswordVariants,
}

impl IdentityProfile {
    /// Renders the identity as pretty JSON for injection into the LLM
    /// prompt. Drops `password_variants` once a password has already been
    /// chosen and submitted, so the model does not rotate variants after a
    /// successful fill.
    pub fn to_prompt_json(&self, include_password_variants: bool) -> String {
        if include_password_variants {
            serde_json::to_string_pretty(self).unwrap_or_default()
        } else {
            let mut value = serde_json::to_value(self).unwrap_or_default();
            if let Some(obj) = value.as_object_mut() {
                obj.remove("password_variants");
            }
            serde_json::to_string_pretty(&value).unwrap_or_default()
        }
    }
}

/// Generates synthetic identities for form filling.
#[derive(Debug, Default)]
pub struct IdentityVault;

impl IdentityVault {
    pub fn new() -> Self {
        IdentityVault
    }

    pub fn generate(&self) -> IdentityProfile {
        let mut rng = rand::thread_rng();

        let first = *FIRST_NAMES.choose(&mut rng).unwrap();
        let last = *LAST_NAMES.choose(&mut rng).unwrap();
        let full_name = format!("{first} {last}");

        let email_tag: u32 = rng.gen_range(100..9999);
        let domain = *EMAIL_DOMAINS.choose(&mut rng).unwrap();
        let email = format!("{}.{}{}@{}", first.to_lowercase(), last.to_lowercase(), email_tag, domain);
        let username = format!("{}{}{}", first.to_lowercase(), last.to_lowercase(), rng.gen_range(10..999));

        let area_code = rng.gen_range(200..999);
        let phone = format!("{area_code}-555-{:04}", rng.gen_range(0..10000));

        let street_number = rng.gen_range(100..9999);
        let street = *STREET_NAMES.choose(&mut rng).unwrap();
        let suffix = *STREET_SUFFIXES.choose(&mut rng).unwrap();
        let (city, state, zip) = *CITY_STATE_ZIP.choose(&mut rng).unwrap();
        let address = format!("{street_number} {street} {suffix}, {city}, {state} {zip}");

        let year = rng.gen_range(1965..2002);
        let month = rng.gen_range(1..13);
        let day = rng.gen_range(1..28);
        let date_of_birth = format!("{year:04}-{month:02}-{day:02}");

        let ssn = format!("900-{:02}-{:04}", rng.gen_range(0..100), rng.gen_range(0..10000));
        let credit_card = format!("4111 1111 1111 {:04}", rng.gen_range(0..10000));

        let password_variants = PasswordVariants {
            default: format!("Tmp!{}{}", last, rng.gen_range(100..999)),
            digits_8: format!("{:08}", rng.gen_range(0..100_000_000u64)),
            digits_12: format!("{:012}", rng.gen_range(0..1_000_000_000_000u64)),
            simple_10: format!("pass{}", rng.gen_range(100000..999999)),
        };

        IdentityProfile {
            full_name,
            email,
            username,
            phone,
            address,
            date_of_birth,
            ssn,
            credit_card,
            password_variants,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_identity_has_non_empty_fields() {
        let profile = IdentityVault::new().generate();
        assert!(!profile.full_name.is_empty());
        assert!(profile.email.contains('@'));
        assert_eq!(profile.password_variants.digits_8.len(), 8);
        assert_eq!(profile.password_variants.digits_12.len(), 12);
    }

    #[test]
    fn prompt_json_omits_password_variants_when_pinned() {
        let profile = IdentityVault::new().generate();
        let full = profile.to_prompt_json(true);
        let pinned = profile.to_prompt_json(false);
        assert!(full.contains("password_variants"));
        assert!(!pinned.contains("password_variants"));
        assert!(pinned.contains("full_name"));
    }
}
