//! Template variable resolution for playbook step values, grounded on
//! `executor.py::resolve_template`. Variables are resolved against a JSON
//! view of the identity rather than `ssi_agent::IdentityProfile` directly,
//! to keep this crate from depending back on `ssi-agent`.

use regex::Regex;
use std::sync::OnceLock;

fn template_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{(\w+(?:\.\w+)*)\}").unwrap())
}

/// Resolves `{identity.<field>}`, `{password_variants.<variant>}`, and bare
/// `{<field>}` placeholders against `identity` (the JSON value produced by
/// `serde_json::to_value(&IdentityProfile)`). Unresolved placeholders are
/// left in place and logged.
pub fn resolve_template(template: &str, identity: &serde_json::Value) -> String {
    if !template.contains('{') {
        return template.to_string();
    }

    let password_variants = identity.get("password_variants");

    template_re()
        .replace_all(template, |caps: &regex::Captures| {
            let key = &caps[1];

            if let Some(field) = key.strip_prefix("identity.") {
                return lookup(identity, field).unwrap_or_else(|| {
                    tracing::warn!(key, "unresolved template variable");
                    caps[0].to_string()
                });
            }

            if let Some(variant) = key.strip_prefix("password_variants.") {
                return password_variants
                    .and_then(|v| lookup(v, variant))
                    .unwrap_or_else(|| {
                        tracing::warn!(variant, "unresolved password variant");
                        caps[0].to_string()
                    });
            }

            lookup(identity, key).unwrap_or_else(|| {
                tracing::warn!(key, "unresolved template variable");
                caps[0].to_string()
            })
        })
        .into_owned()
}

fn lookup(value: &serde_json::Value, field: &str) -> Option<String> {
    value.get(field).map(|v| match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_identity_field() {
        let identity = serde_json::json!({"email": "a@b.com"});
        assert_eq!(resolve_template("{identity.email}", &identity), "a@b.com");
    }

    #[test]
    fn resolves_password_variant() {
        let identity = serde_json::json!({"password_variants": {"digits_8": "12345678"}});
        assert_eq!(resolve_template("{password_variants.digits_8}", &identity), "12345678");
    }

    #[test]
    fn leaves_unresolved_placeholder_untouched() {
        let identity = serde_json::json!({"email": "a@b.com"});
        assert_eq!(resolve_template("{identity.missing}", &identity), "{identity.missing}");
    }

    #[test]
    fn plain_string_with_no_braces_is_unchanged() {
        let identity = serde_json::json!({});
        assert_eq!(resolve_template("#submit-button", &identity), "#submit-button");
    }
}
