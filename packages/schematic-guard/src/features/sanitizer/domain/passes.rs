//! Recursive tree passes

use super::policy::SanitizePolicy;
use crate::config::KeywordPolicy;
use crate::features::nbt::{NbtCompound, Tag};

/// Remove disallowed children of every reserved slot, at any depth.
///
/// Returns true if anything was removed. Every child of every compound and
/// list is visited even after the first removal.
pub fn prune_reserved_slots(compound: &mut NbtCompound, policy: &SanitizePolicy) -> bool {
    let mut modified = false;

    if let Some(Tag::Compound(slot)) = compound.get_mut(policy.reserved_slot()) {
        modified |= slot.retain(|key, _| policy.is_allowed(key)) > 0;
    }

    for (_, child) in compound.iter_mut() {
        modified |= prune_tag(child, policy);
    }
    modified
}

fn prune_tag(tag: &mut Tag, policy: &SanitizePolicy) -> bool {
    match tag {
        Tag::Compound(compound) => prune_reserved_slots(compound, policy),
        Tag::List(list) => {
            let mut modified = false;
            for item in list.iter_mut() {
                modified |= prune_tag(item, policy);
            }
            modified
        }
        Tag::Byte(_)
        | Tag::Short(_)
        | Tag::Int(_)
        | Tag::Long(_)
        | Tag::Float(_)
        | Tag::Double(_)
        | Tag::ByteArray(_)
        | Tag::String(_)
        | Tag::IntArray(_)
        | Tag::LongArray(_) => false,
    }
}

/// True if any string tag contains a banned keyword (case-insensitive).
///
/// Short-circuits to false when the policy is disabled or empty.
pub fn contains_banned_keyword(compound: &NbtCompound, policy: &KeywordPolicy) -> bool {
    if !policy.is_active() {
        return false;
    }
    compound
        .iter()
        .any(|(_, child)| tag_contains_keyword(child, policy.keywords()))
}

fn tag_contains_keyword(tag: &Tag, keywords: &[String]) -> bool {
    match tag {
        Tag::Compound(compound) => compound
            .iter()
            .any(|(_, child)| tag_contains_keyword(child, keywords)),
        Tag::List(list) => list.iter().any(|item| tag_contains_keyword(item, keywords)),
        Tag::String(value) => {
            let value = value.to_lowercase();
            keywords.iter().any(|k| value.contains(k.as_str()))
        }
        Tag::Byte(_)
        | Tag::Short(_)
        | Tag::Int(_)
        | Tag::Long(_)
        | Tag::Float(_)
        | Tag::Double(_)
        | Tag::ByteArray(_)
        | Tag::IntArray(_)
        | Tag::LongArray(_) => false,
    }
}
