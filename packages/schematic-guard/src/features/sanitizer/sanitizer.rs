//! Sanitizer - runs both passes with a fresh keyword policy per document

use super::domain::{contains_banned_keyword, prune_reserved_slots, SanitizePolicy, SanitizeVerdict};
use crate::config::KeywordPolicySource;
use crate::features::nbt::NbtDocument;
use std::sync::Arc;

pub struct Sanitizer {
    policy: SanitizePolicy,
    keywords: Arc<dyn KeywordPolicySource>,
}

impl Sanitizer {
    pub fn new(policy: SanitizePolicy, keywords: Arc<dyn KeywordPolicySource>) -> Self {
        Self { policy, keywords }
    }

    /// Prune in place, then scan the pruned tree. Both passes always run.
    pub fn sanitize(&self, document: &mut NbtDocument) -> SanitizeVerdict {
        let structurally_modified = prune_reserved_slots(&mut document.root, &self.policy);
        let keyword_policy = self.keywords.keyword_policy();
        let banned_content_found = contains_banned_keyword(&document.root, &keyword_policy);

        SanitizeVerdict {
            structurally_modified,
            banned_content_found,
        }
    }
}
