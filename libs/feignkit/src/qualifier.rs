//! Registry aliases of a built client.

use std::collections::BTreeSet;

use crate::descriptor::ClientDescriptor;

/// Computes the aliases a client is published under.
pub struct QualifierResolver;

impl QualifierResolver {
    /// Alias set of `descriptor`:
    /// - the trimmed, non-blank `qualifiers` if any remain;
    /// - else the trimmed `qualifier` if non-blank;
    /// - else a name derived from the context id (`<id>FeignClient`, or
    ///   `<id>AsyncFeignClient` for async targets).
    #[must_use]
    pub fn aliases_for(descriptor: &ClientDescriptor) -> BTreeSet<String> {
        let explicit: BTreeSet<String> = descriptor
            .qualifiers()
            .iter()
            .map(|q| q.trim())
            .filter(|q| !q.is_empty())
            .map(str::to_owned)
            .collect();
        if !explicit.is_empty() {
            return explicit;
        }

        if let Some(qualifier) = descriptor.qualifier().map(str::trim)
            && !qualifier.is_empty()
        {
            return BTreeSet::from([qualifier.to_owned()]);
        }

        BTreeSet::from([Self::derived_name(descriptor)])
    }

    /// Fallback alias used when no qualifier is declared.
    #[must_use]
    pub fn derived_name(descriptor: &ClientDescriptor) -> String {
        let suffix = if descriptor.is_async() {
            "AsyncFeignClient"
        } else {
            "FeignClient"
        };
        format!("{}{suffix}", descriptor.context_id())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::{AsyncDynamicClient, DynamicClient};

    fn aliases(d: &ClientDescriptor) -> Vec<String> {
        QualifierResolver::aliases_for(d).into_iter().collect()
    }

    #[test]
    fn qualifiers_win_over_everything() {
        let d = ClientDescriptor::for_async_type::<AsyncDynamicClient>("localapp")
            .with_qualifier("q3")
            .with_qualifiers(["q1", "q2", "q1"]);
        assert_eq!(aliases(&d), ["q1", "q2"]);
    }

    #[test]
    fn single_qualifier_when_qualifiers_empty() {
        let d = ClientDescriptor::for_async_type::<AsyncDynamicClient>("localapp")
            .with_qualifier("q4")
            .with_qualifiers(Vec::<String>::new());
        assert_eq!(aliases(&d), ["q4"]);
    }

    #[test]
    fn blank_qualifiers_fall_back_to_qualifier() {
        let d = ClientDescriptor::for_type::<DynamicClient>("localapp")
            .with_qualifier(" q5 ")
            .with_qualifiers(["  ", ""]);
        assert_eq!(aliases(&d), ["q5"]);
    }

    #[test]
    fn blank_everything_derives_from_context_id() {
        let d = ClientDescriptor::for_async_type::<AsyncDynamicClient>("localapp")
            .with_context_id("local")
            .with_qualifier(" ")
            .with_qualifiers([" "]);
        assert_eq!(aliases(&d), ["localAsyncFeignClient"]);

        let d = ClientDescriptor::for_type::<DynamicClient>("localapp");
        assert_eq!(aliases(&d), ["localappFeignClient"]);
    }
}
