/// Security level, in bits, targeted by BLS12-381.
pub const CURVE_SECURITY_BITS: u32 = 128;

/// Default bound on the nesting depth of an access policy.
pub const DEFAULT_MAX_POLICY_DEPTH: usize = 32;

/// Runtime parameters of the scheme.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Requested security level. Setup fails if the curve cannot provide it.
    pub security_bits: u32,

    /// Access trees nesting deeper than this are rejected.
    ///
    /// A tree consisting of a single leaf has depth 1.
    pub max_policy_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            security_bits: CURVE_SECURITY_BITS,
            max_policy_depth: DEFAULT_MAX_POLICY_DEPTH,
        }
    }
}
