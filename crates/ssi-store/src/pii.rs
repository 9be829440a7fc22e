//! Classifies an HTML form field into a [`PiiCategory`], grounded on
//! `_classify_form_field`/`_FIELD_TYPE_MAP`: a direct type match for
//! `email`/`password`/`tel`, otherwise the first keyword that appears as a
//! substring of the field's name or label, in the map's declared order.

use ssi_common::PiiCategory;

const FIELD_TYPE_MAP: &[(&str, PiiCategory)] = &[
    ("email", PiiCategory::Email),
    ("password", PiiCategory::Password),
    ("tel", PiiCategory::Phone),
    ("phone", PiiCategory::Phone),
    ("name", PiiCategory::Name),
    ("first_name", PiiCategory::Name),
    ("last_name", PiiCategory::Name),
    ("full_name", PiiCategory::Name),
    ("address", PiiCategory::Address),
    ("street", PiiCategory::Address),
    ("city", PiiCategory::Address),
    ("zip", PiiCategory::Address),
    ("postal", PiiCategory::Address),
    ("ssn", PiiCategory::Ssn),
    ("social", PiiCategory::Ssn),
    ("tax", PiiCategory::IdNumber),
    ("id_number", PiiCategory::IdNumber),
    ("passport", PiiCategory::IdNumber),
    ("credit_card", PiiCategory::Financial),
    ("card_number", PiiCategory::Financial),
    ("cvv", PiiCategory::Financial),
    ("expiry", PiiCategory::Financial),
    ("bank", PiiCategory::Financial),
    ("iban", PiiCategory::Financial),
    ("routing", PiiCategory::Financial),
    ("account_number", PiiCategory::Financial),
];

/// Classifies a form field described by its HTML `type`, `name`, and
/// (optional) visible `label`.
pub fn classify_form_field(field_type: &str, name: &str, label: &str) -> PiiCategory {
    let input_type = field_type.to_lowercase();
    let name = name.to_lowercase();
    let label = label.to_lowercase();

    if matches!(input_type.as_str(), "email" | "password" | "tel") {
        return FIELD_TYPE_MAP
            .iter()
            .find(|(keyword, _)| *keyword == input_type)
            .map(|(_, category)| *category)
            .unwrap_or(PiiCategory::Other);
    }

    for (keyword, category) in FIELD_TYPE_MAP {
        if name.contains(keyword) || label.contains(keyword) {
            return *category;
        }
    }

    PiiCategory::Other
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_by_type() {
        assert_eq!(classify_form_field("email", "user_email", ""), PiiCategory::Email);
    }

    #[test]
    fn password_by_type() {
        assert_eq!(classify_form_field("password", "pwd", ""), PiiCategory::Password);
    }

    #[test]
    fn phone_by_name() {
        assert_eq!(classify_form_field("text", "phone_number", ""), PiiCategory::Phone);
    }

    #[test]
    fn name_by_label() {
        assert_eq!(classify_form_field("text", "field1", "Full Name"), PiiCategory::Name);
    }

    #[test]
    fn financial_by_name() {
        assert_eq!(classify_form_field("text", "credit_card_number", ""), PiiCategory::Financial);
    }

    #[test]
    fn unknown_field_is_other() {
        assert_eq!(classify_form_field("text", "preferences", ""), PiiCategory::Other);
    }
}
