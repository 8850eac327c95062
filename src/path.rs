//! Form key composition: dotted segments for nested fields, bracketed indices
//! for repeated elements.

use crate::FormSource;

/// Where a field is read from, and the prefix its own fields are nested under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    /// The key looked up in the form values for this field.
    pub key: String,
    /// The prefix handed to the fields of this field's value when it is a struct.
    pub child_prefix: String,
}

/// Computes the form key for a field named `name` found under `prefix`.
///
/// Flattened fields are not prefixed and pass `prefix` through unchanged to
/// their own fields, so the fields of a flattened struct are addressed at the
/// level of the struct that embeds it.
///
/// ```
/// use facet_form::resolve_key;
///
/// assert_eq!(resolve_key("city", "user.address", false).key, "user.address.city");
/// assert_eq!(resolve_key("meta", "user", true).child_prefix, "user");
/// ```
pub fn resolve_key(name: &str, prefix: &str, flatten: bool) -> FieldPath {
    if prefix.is_empty() {
        let child_prefix = if flatten { String::new() } else { name.to_owned() };
        return FieldPath {
            key: name.to_owned(),
            child_prefix,
        };
    }

    if flatten {
        return FieldPath {
            key: name.to_owned(),
            child_prefix: prefix.to_owned(),
        };
    }

    let key = format!("{prefix}.{name}");
    FieldPath {
        child_prefix: key.clone(),
        key,
    }
}

/// The prefix of the `index`th element of the repeated field at `base`.
pub fn element_prefix(base: &str, index: usize) -> String {
    format!("{base}[{index}]")
}

/// Counts the repeated struct elements submitted under `base`.
///
/// Indices are probed from zero; an index is present when some key starts with
/// `base[index].`. Probing stops at the first missing index, so elements after
/// a gap are never seen.
pub fn probe_count<S: FormSource + ?Sized>(values: &S, base: &str) -> usize {
    let mut count = 0;
    loop {
        let needle = format!("{}.", element_prefix(base, count));
        if !values.keys().any(|key| key.starts_with(&needle)) {
            log::trace!("Probed {count} element(s) under '{base}'");
            return count;
        }
        count += 1;
    }
}
