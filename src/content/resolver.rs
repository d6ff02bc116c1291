//! The central decision procedure: classify a content request into an
//! access tier and produce signed locations, or reject.

use std::sync::Arc;

use super::locator::{ContentLocator, LocatedContent};
use super::types::{AccessContext, AccessTier, AssociatedMedia};
use super::whitelist::is_whitelisted_before_paywall;
use super::ContentError;
use crate::entitlement::EntitlementOracle;
use crate::permissions::AccessPolicyStore;
use crate::storage::{ContentSigner, SignerError};

/// Results of the three access checks, joined once after concurrent
/// fan-out. Named fields rather than positional results: the tie order
/// lives in `decide_tier`, not in array indices.
#[derive(Debug, Clone, Copy)]
pub struct AccessChecks {
    pub open_access: bool,
    pub free_access: bool,
    pub licensed: bool,
}

impl AccessChecks {
    /// First-true-wins in fixed order: openAccess, then freeAccess, then
    /// licensed. Pure data decision over already-gathered results.
    pub fn decide_tier(&self) -> Option<AccessTier> {
        if self.open_access {
            Some(AccessTier::OpenAccess)
        } else if self.free_access {
            Some(AccessTier::FreeAccess)
        } else if self.licensed {
            Some(AccessTier::Licensed)
        } else {
            None
        }
    }
}

/// Access-tier resolver. Collaborators are injected so tests can substitute
/// in-memory fakes for every seam.
pub struct AccessResolver {
    locator: ContentLocator,
    oracle: Arc<dyn EntitlementOracle>,
    policies: Arc<dyn AccessPolicyStore>,
    signer: Arc<dyn ContentSigner>,
}

impl AccessResolver {
    pub fn new(
        locator: ContentLocator,
        oracle: Arc<dyn EntitlementOracle>,
        policies: Arc<dyn AccessPolicyStore>,
        signer: Arc<dyn ContentSigner>,
    ) -> Self {
        Self {
            locator,
            oracle,
            policies,
            signer,
        }
    }

    /// Entitlement-gated resolution.
    ///
    /// Content whose located set is entirely before-paywall-whitelisted, and
    /// requests carrying the privileged skip flag, ride free as
    /// `unrestricted` without consulting any predicate. Everything else must
    /// win one of open-access, free-access or a commercial entitlement, in
    /// that order, or the request is rejected as `Forbidden`.
    pub async fn resolve_for_entitlement(
        &self,
        product_id: &str,
        parent_id: Option<&str>,
        ctx: &AccessContext,
    ) -> Result<Vec<AssociatedMedia>, ContentError> {
        let located = self.locator.locate(product_id, &ctx.type_filter).await?;

        if self.is_free_ride(&located, ctx) {
            return self.sign_all(located.media, AccessTier::Unrestricted, ctx).await;
        }

        let checks = self.run_checks(&located, product_id, parent_id, ctx).await?;
        let tier = checks.decide_tier().ok_or(ContentError::Forbidden)?;

        tracing::debug!(product_id, ?tier, "access tier resolved");
        self.sign_all(located.media, tier, ctx).await
    }

    /// Resolve an external identifier to a product id via the locator's
    /// preferred-record tie-break.
    pub async fn resolve_product_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<String>, ContentError> {
        self.locator.resolve_parent_by_external_id(external_id).await
    }

    /// Open-access-or-before-paywall resolution for anonymous flows.
    ///
    /// Only the open-access predicate is ever consulted; there is no token
    /// in this flow. Non-OA gated content is a bad request here, not an
    /// auth failure.
    pub async fn resolve_oa_or_before_paywall(
        &self,
        product_id: &str,
        ctx: &AccessContext,
    ) -> Result<Vec<AssociatedMedia>, ContentError> {
        let located = self.locator.locate(product_id, &ctx.type_filter).await?;

        if self.is_free_ride(&located, ctx) {
            return self.sign_all(located.media, AccessTier::Unrestricted, ctx).await;
        }

        let open_access = self
            .policies
            .is_open_access(located.product.product_type, product_id)
            .await?;
        if !open_access {
            return Err(ContentError::NotOpenAccess);
        }

        self.sign_all(located.media, AccessTier::OpenAccess, ctx).await
    }

    /// The "free ride" gate: nothing in the located set sits behind the
    /// paywall, or the caller holds the privileged skip flag.
    fn is_free_ride(&self, located: &LocatedContent, ctx: &AccessContext) -> bool {
        if ctx.skip_entitlement_check {
            return true;
        }
        located
            .media
            .iter()
            .all(|m| is_whitelisted_before_paywall(m.content_type))
    }

    /// Issue the three checks concurrently and join once.
    ///
    /// The fan-out is deliberately unconditional: all three calls go out
    /// even when open-access alone would already decide the tier. This
    /// preserves the call volume the entitlement service is provisioned
    /// for; short-circuiting would change it.
    async fn run_checks(
        &self,
        located: &LocatedContent,
        product_id: &str,
        parent_id: Option<&str>,
        ctx: &AccessContext,
    ) -> Result<AccessChecks, ContentError> {
        let open_fut = self
            .policies
            .is_open_access(located.product.product_type, product_id);

        // Free-access only applies inside a named parent context
        let free_fut = async {
            match parent_id {
                Some(parent) => self.policies.is_accessible_for_free(parent, product_id).await,
                None => Ok(false),
            }
        };

        let licensed_fut = self.oracle.is_entitled(product_id, ctx);

        let (open_access, free_access, licensed) = tokio::join!(open_fut, free_fut, licensed_fut);

        Ok(AccessChecks {
            open_access: open_access?,
            free_access: free_access?,
            licensed,
        })
    }

    /// Sign every located item concurrently, preserving input order, and
    /// stamp the winning tier on each.
    ///
    /// A missing storage object degrades that item's location to `None`;
    /// the broken-sentinel signing failure aborts the whole batch.
    async fn sign_all(
        &self,
        media: Vec<AssociatedMedia>,
        tier: AccessTier,
        ctx: &AccessContext,
    ) -> Result<Vec<AssociatedMedia>, ContentError> {
        let signed = futures::future::join_all(
            media.into_iter().map(|item| self.signer.sign(item, ctx)),
        )
        .await;

        let mut out = Vec::with_capacity(signed.len());
        for result in signed {
            let mut item = result.map_err(|e| match e {
                SignerError::BrokenSentinel(url) => ContentError::SigningFailure(url),
                SignerError::Transport(msg) => ContentError::Store(msg),
            })?;
            item.access_tier = Some(tier);
            out.push(item);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checks(open_access: bool, free_access: bool, licensed: bool) -> AccessChecks {
        AccessChecks {
            open_access,
            free_access,
            licensed,
        }
    }

    #[test]
    fn test_tier_decision_order() {
        assert_eq!(
            checks(true, true, true).decide_tier(),
            Some(AccessTier::OpenAccess)
        );
        assert_eq!(
            checks(false, true, true).decide_tier(),
            Some(AccessTier::FreeAccess)
        );
        assert_eq!(
            checks(false, false, true).decide_tier(),
            Some(AccessTier::Licensed)
        );
        assert_eq!(checks(false, false, false).decide_tier(), None);
    }
}
