use tracing_subscriber::{
    EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Default directives when `RUST_LOG` is unset. Cache and singleflight
/// chatter stays at `info`; override via `RUST_LOG` to see it.
pub const DEFAULT_DIRECTIVES: &str =
    "info,galleria_core::cache=info,galleria_core::prefetch=info,gallery::invalidation=info";

/// Install a global fmt subscriber filtered by `RUST_LOG`, falling back to
/// `default_directives`.
///
/// Returns `false` when a global subscriber was already installed, which
/// lets tests and embedding applications call this unconditionally.
pub fn init_tracing(default_directives: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_is_a_no_op() {
        let first = init_tracing(DEFAULT_DIRECTIVES);
        assert!(!init_tracing(DEFAULT_DIRECTIVES));
        assert!(first);
    }
}
