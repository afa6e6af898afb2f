/// The environment variable read by [`Config::from_env`].
pub const DIAGNOSTICS_ENV: &str = "MEMOSLOT_DIAGNOSTICS";

/// Runtime configuration.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Config {
    /// Whether call-order violations are detected.
    ///
    /// When disabled, no slot count or call-site checks happen. A render
    /// routine that breaks the call-order invariant then silently reads
    /// stale or misplaced slots: extra calls append fresh slots, missing calls
    /// leave old slots around, and a slot holding a payload of another type is
    /// recomputed. The damage stays within the offending instance.
    pub diagnostics: bool,
}

impl Config {
    /// The default configuration, with diagnostics following
    /// `debug_assertions`.
    pub const fn new() -> Self {
        Self { diagnostics: cfg!(debug_assertions) }
    }

    /// Set whether call-order violations are detected.
    pub const fn with_diagnostics(mut self, diagnostics: bool) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// The default configuration, overridden by `MEMOSLOT_DIAGNOSTICS`.
    ///
    /// Accepts `1`, `true`, `on`, `0`, `false` and `off`. Other values are
    /// ignored with a warning.
    pub fn from_env() -> Self {
        let config = Self::new();
        match std::env::var(DIAGNOSTICS_ENV) {
            Ok(value) => match parse_switch(&value) {
                Some(diagnostics) => config.with_diagnostics(diagnostics),
                None => {
                    tracing::warn!(
                        "ignoring invalid {DIAGNOSTICS_ENV} value {value:?}"
                    );
                    config
                }
            },
            Err(_) => config,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse an on/off switch.
fn parse_switch(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" => Some(true),
        "0" | "false" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_switch() {
        assert_eq!(parse_switch("1"), Some(true));
        assert_eq!(parse_switch(" ON "), Some(true));
        assert_eq!(parse_switch("False"), Some(false));
        assert_eq!(parse_switch("off"), Some(false));
        assert_eq!(parse_switch("maybe"), None);
    }

    #[test]
    fn test_builder() {
        assert!(Config::new().with_diagnostics(true).diagnostics);
        assert!(!Config::new().with_diagnostics(false).diagnostics);
        assert_eq!(Config::default(), Config::new());
    }

    // The only test in this binary that touches the variable.
    #[test]
    fn test_from_env() {
        let set = |value: &str| unsafe { std::env::set_var(DIAGNOSTICS_ENV, value) };

        set("off");
        assert!(!Config::from_env().diagnostics);
        set("on");
        assert!(Config::from_env().diagnostics);
        set("maybe");
        assert_eq!(Config::from_env(), Config::new());

        unsafe { std::env::remove_var(DIAGNOSTICS_ENV) };
        assert_eq!(Config::from_env(), Config::new());
    }
}
