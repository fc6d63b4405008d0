// ─── Environment Resolution ───
// Decides whether a mod belongs on the current side (client or server).

use tracing::debug;

use crate::core::sync_info::{Environment, ModDescriptor, SupportLevel};

/// Mods split by whether they apply to the active environment, in manifest order.
#[derive(Debug, Default)]
pub struct Resolution<'a> {
    pub included: Vec<&'a ModDescriptor>,
    pub excluded: Vec<&'a ModDescriptor>,
}

pub struct EnvironmentResolver;

impl EnvironmentResolver {
    /// Required mods are always included and unsupported ones never are.
    /// Optional mods follow the per-mod override when set, otherwise the
    /// global policy.
    pub fn should_include(
        descriptor: &ModDescriptor,
        environment: Environment,
        global_optional_policy: bool,
    ) -> bool {
        match descriptor.support_for(environment) {
            SupportLevel::Required => true,
            SupportLevel::Unsupported => false,
            SupportLevel::Optional => descriptor.sync_optional.unwrap_or(global_optional_policy),
        }
    }

    pub fn resolve(
        mods: &[ModDescriptor],
        environment: Environment,
        global_optional_policy: bool,
    ) -> Resolution<'_> {
        let mut resolution = Resolution::default();
        for descriptor in mods {
            if Self::should_include(descriptor, environment, global_optional_policy) {
                resolution.included.push(descriptor);
            } else {
                debug!(
                    "Skipping {} on {} ({:?})",
                    descriptor.display_name(),
                    environment,
                    descriptor.support_for(environment)
                );
                resolution.excluded.push(descriptor);
            }
        }
        resolution
    }
}
