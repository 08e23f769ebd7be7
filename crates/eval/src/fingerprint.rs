//! SHA-256 fingerprints used in cache keys.

use sha2::{Digest, Sha256};

use crate::context::{Parameters, Scope};

/// Hex-encoded SHA-256 of the given parts, each length-prefixed.
pub fn digest<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part.as_bytes());
    }
    let digest = hasher.finalize();
    format!("{digest:x}")
}

/// Fingerprint of resolved parameters. Parameters are ordered by name.
pub fn parameters(params: &Parameters) -> String {
    let encoded: Vec<String> = params
        .iter()
        .map(|(name, value)| format!("{}={}", name, value.canonical()))
        .collect();
    digest(encoded.iter().map(String::as_str))
}

/// Fingerprint of an evaluation scope and evaluation date.
pub fn scope(scope: &Scope, evaluation_date: Option<chrono::NaiveDate>) -> String {
    let members = match scope {
        Scope::All => "all".to_string(),
        Scope::Subjects(cohort) => {
            let ids: Vec<String> = cohort.members.iter().map(|m| m.to_string()).collect();
            format!("subjects:{}", ids.join(","))
        }
    };
    let date = evaluation_date
        .map(|d| d.to_string())
        .unwrap_or_default();
    digest([members.as_str(), date.as_str()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::{Cohort, Value};

    #[test]
    fn digest_is_hex_sha256() {
        let d = digest(["a"]);
        assert_eq!(d.len(), 64);
        assert!(d.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn length_prefix_prevents_concatenation_collisions() {
        assert_ne!(digest(["ab", "c"]), digest(["a", "bc"]));
    }

    #[test]
    fn parameter_fingerprint_is_type_sensitive() {
        let mut a = Parameters::new();
        a.insert("p".to_string(), Value::Integer(7));
        let mut b = Parameters::new();
        b.insert("p".to_string(), Value::from("7"));
        assert_ne!(parameters(&a), parameters(&b));
        assert_eq!(parameters(&a), parameters(&a.clone()));
    }

    #[test]
    fn scope_fingerprint_ignores_member_insertion_order() {
        let a = Scope::Subjects(Cohort::new([3, 1, 2]));
        let b = Scope::Subjects(Cohort::new([1, 2, 3]));
        assert_eq!(scope(&a, None), scope(&b, None));
        assert_ne!(scope(&a, None), scope(&Scope::All, None));
    }
}
