//! Subscriber setup for binaries

use std::sync::Once;

use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// How log output is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Pretty text on stderr, operation starts included
    Development,
    /// One JSON object per line on stderr, ends and errors only
    Production,
    /// Nothing installed beyond a bare registry; see `init_test_capture`
    Test,
}

impl Profile {
    /// Directive applied when `RUST_LOG` is unset
    pub fn default_filter(&self) -> &'static str {
        match self {
            Self::Development => "mvdb=debug",
            Self::Production => "mvdb=info",
            Self::Test => "off",
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.default_filter()))
    }
}

static INSTALLED: Once = Once::new();

/// Install the global subscriber for `profile`
///
/// The first call wins; later calls, and calls made after another subscriber
/// was set (the test capture layer, say), do nothing.
///
/// ```
/// use mvdb_core::logging_facility::{init, Profile};
///
/// init(Profile::Production);
/// ```
pub fn init(profile: Profile) {
    INSTALLED.call_once(|| {
        let builder = tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(profile.filter());
        let outcome = match profile {
            Profile::Development => builder.finish().try_init(),
            Profile::Production => builder.json().finish().try_init(),
            Profile::Test => tracing_subscriber::registry().try_init(),
        };
        if outcome.is_err() {
            tracing::trace!("subscriber already installed");
        }
    });
}
