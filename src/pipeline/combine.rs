//! Per-option-type combining (SPEC_FULL.md §4.4, §9). Several handlers may
//! each want to contribute to the same singleton option on the response
//! (e.g. two DNS extensions both wanting to list recursive name servers);
//! the Option Combiner is the seam where their contributions are merged
//! instead of one silently overwriting the other.

use crate::wire::{DhcpOption, Message};

use super::bundle::TransactionBundle;
use super::handler::{Handler, HandlerResult};

/// Order-preserving, de-duplicating concatenation: everything already on the
/// response, followed by this handler's own contribution, with repeats
/// dropped after their first occurrence.
pub fn dedup_concat<T: PartialEq + Clone>(existing: &[T], own: &[T]) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(existing.len() + own.len());
    for item in existing.iter().chain(own.iter()) {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}

/// A handler that contributes to, and knows how to merge into, one
/// singleton option code on the response. Combining handlers for distinct
/// option types are independent of one another; only same-code contributions
/// are combined.
pub trait OptionContributor: Send + Sync {
    fn option_code(&self) -> u16;

    /// This handler's own contribution for this bundle, if any.
    fn contribution(&self, bundle: &crate::pipeline::bundle::TransactionBundle) -> Option<DhcpOption>;

    /// Merge `existing` (already on the response, if some earlier contributor
    /// put it there) with `own`. Must return an option of the same code as
    /// `option_code()`.
    fn combine(&self, existing: Option<&DhcpOption>, own: DhcpOption) -> DhcpOption;
}

/// Read, then overwrite, the single option of `code` on a message's
/// top-level option list.
pub fn replace_singleton(message: &mut Message, new_option: DhcpOption) {
    let code = new_option.code();
    message.options.retain(|o| o.code() != code);
    message.options.push(new_option);
}

/// Lifts an [`OptionContributor`] into a plain [`Handler`]: during `handle`,
/// if the contributor has something to add this bundle, merge it with
/// whatever is already on the response and replace the singleton.
pub struct CombiningHandler<T>(pub T);

impl<T: OptionContributor> Handler for CombiningHandler<T> {
    fn handle(&self, bundle: &mut TransactionBundle) -> HandlerResult {
        let Some(own) = self.0.contribution(bundle) else {
            return Ok(());
        };
        let code = self.0.option_code();
        let Some(response) = bundle.response_message_mut() else {
            return Ok(());
        };
        let existing = response.get_option(code).cloned();
        let combined = self.0.combine(existing.as_ref(), own);
        replace_singleton(response, combined);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_concat_drops_repeats_but_keeps_order() {
        let existing = vec![1, 2, 3];
        let own = vec![3, 4, 2, 5];
        assert_eq!(dedup_concat(&existing, &own), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn dedup_concat_with_nothing_existing_is_just_own_deduped() {
        let existing: Vec<&str> = Vec::new();
        let own = vec!["a", "b", "a"];
        assert_eq!(dedup_concat(&existing, &own), vec!["a", "b"]);
    }
}
