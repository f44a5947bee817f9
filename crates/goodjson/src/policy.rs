//! Field inclusion policy.
//!
//! Pure predicates over a field's [`FieldPolicy`]. Applied the same way to
//! top-level and embedded documents; each embedded document is checked
//! against its own schema's descriptors.

use crate::model::{FieldDescriptor, FieldPolicy};

/// Returns true if the field is emitted when encoding.
pub fn should_encode(field: &FieldDescriptor) -> bool {
    encodes(&field.policy)
}

/// Returns true if the field's key is read when decoding.
pub fn should_decode(field: &FieldDescriptor) -> bool {
    decodes(&field.policy)
}

/// Policy-level form of [`should_encode`].
pub fn encodes(policy: &FieldPolicy) -> bool {
    !(policy.exclude_encode || policy.exclude_both)
}

/// Policy-level form of [`should_decode`].
pub fn decodes(policy: &FieldPolicy) -> bool {
    !(policy.exclude_decode || policy.exclude_both)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldType;

    fn field(policy: FieldPolicy) -> FieldDescriptor {
        FieldDescriptor::new("secret", FieldType::String).with_policy(policy)
    }

    #[test]
    fn test_default_includes_both_directions() {
        let f = field(FieldPolicy::INCLUDE);
        assert!(should_encode(&f));
        assert!(should_decode(&f));
    }

    #[test]
    fn test_directions_are_independent() {
        let f = field(FieldPolicy::exclude_encode());
        assert!(!should_encode(&f));
        assert!(should_decode(&f));

        let f = field(FieldPolicy::exclude_decode());
        assert!(should_encode(&f));
        assert!(!should_decode(&f));
    }

    #[test]
    fn test_exclude_both_is_shorthand() {
        let shorthand = field(FieldPolicy::exclude_both());
        let explicit = field(FieldPolicy {
            exclude_encode: true,
            exclude_decode: true,
            exclude_both: false,
        });
        assert_eq!(should_encode(&shorthand), should_encode(&explicit));
        assert_eq!(should_decode(&shorthand), should_decode(&explicit));
        assert!(!should_encode(&shorthand));
        assert!(!should_decode(&shorthand));
    }
}
