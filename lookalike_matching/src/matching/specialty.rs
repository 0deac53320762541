// src/matching/specialty.rs
//! Fuzzy equivalence between two free-text medical specialties.
//!
//! Two stages: a curated root table catches clinical synonyms that plain
//! substring checks miss (cardiologist vs. cardiology), then a conservative
//! token-overlap fallback that ignores short and generic tokens.

/// Tokens shorter than this never take part in the overlap check
/// ("ent" would otherwise match inside "dental").
pub const MIN_OVERLAP_TOKEN_LENGTH: usize = 4;

/// Canonical root → surface forms that belong to it.
const SPECIALTY_ROOTS: [(&str, &[&str]); 21] = [
    ("cardio", &["cardiology", "cardiologist", "cardiac"]),
    ("pediatr", &["pediatrics", "pediatrician", "pediatric"]),
    ("orthoped", &["orthopedics", "orthopedic", "orthopaedic"]),
    ("dermat", &["dermatology", "dermatologist", "dermatological"]),
    ("neurol", &["neurology", "neurologist", "neurological"]),
    ("oncol", &["oncology", "oncologist"]),
    ("gastro", &["gastroenterology", "gastroenterologist"]),
    ("pulmon", &["pulmonology", "pulmonologist", "pulmonary"]),
    ("nephr", &["nephrology", "nephrologist"]),
    ("endocrin", &["endocrinology", "endocrinologist"]),
    ("rheumat", &["rheumatology", "rheumatologist"]),
    ("urol", &["urology", "urologist"]),
    ("ophthal", &["ophthalmology", "ophthalmologist"]),
    (
        "psych",
        &["psychiatry", "psychiatrist", "psychiatric", "psychology", "psychologist"],
    ),
    ("anesth", &["anesthesiology", "anesthesiologist"]),
    ("radiol", &["radiology", "radiologist", "radiological"]),
    ("pathol", &["pathology", "pathologist"]),
    ("emergency", &["emergency medicine", "emergency", "er"]),
    ("family", &["family medicine", "family practice", "family physician"]),
    ("internal", &["internal medicine", "internist"]),
    ("surgery", &["surgery", "surgeon", "surgical"]),
];

/// Filler words shared by many unrelated specialties.
const GENERIC_TOKENS: [&str; 10] = [
    "medicine", "medical", "practice", "general", "clinic", "group", "center", "health", "care",
    "services",
];

/// True when the two specialties are equivalent for matching purposes.
pub fn is_related(specialty_a: &str, specialty_b: &str) -> bool {
    let a = specialty_a.trim().to_lowercase();
    let b = specialty_b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return false;
    }
    shares_root(&a, &b) || shares_token(&a, &b)
}

/// Name of the first root both inputs have a variant of, if any.
pub fn shared_root(specialty_a: &str, specialty_b: &str) -> Option<&'static str> {
    let a = specialty_a.trim().to_lowercase();
    let b = specialty_b.trim().to_lowercase();
    SPECIALTY_ROOTS
        .iter()
        .find(|(_, variants)| {
            variants.iter().any(|v| contains_variant(&a, v))
                && variants.iter().any(|v| contains_variant(&b, v))
        })
        .map(|(root, _)| *root)
}

fn shares_root(a: &str, b: &str) -> bool {
    shared_root(a, b).is_some()
}

/// Short variants ("er") must be a whole token; longer ones may appear anywhere.
fn contains_variant(text: &str, variant: &str) -> bool {
    if variant.len() < MIN_OVERLAP_TOKEN_LENGTH {
        tokens(text).any(|t| t == variant)
    } else {
        text.contains(variant)
    }
}

fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|t| !t.is_empty())
}

fn overlap_tokens(text: &str) -> Vec<&str> {
    tokens(text)
        .filter(|t| t.len() >= MIN_OVERLAP_TOKEN_LENGTH && !GENERIC_TOKENS.contains(t))
        .collect()
}

fn shares_token(a: &str, b: &str) -> bool {
    let words_a = overlap_tokens(a);
    let words_b = overlap_tokens(b);
    words_a
        .iter()
        .any(|w1| words_b.iter().any(|w2| w1.contains(w2) || w2.contains(w1)))
}
