//! Runtime Configuration
//!
//! Per-thread settings and host hooks consumed by the reactivity core.
//!
//! The core is single-threaded: every observed value, publisher and
//! subscriber belongs to the thread that created it. Configuration follows
//! the same rule and is stored in thread-locals rather than process-wide
//! globals, so two threads never see each other's settings.
//!
//! # Hooks
//!
//! - The warn hook receives [`Diagnostic`]s (usage warnings). The default
//!   emits them as `tracing` warnings.
//! - The error hook receives [`ReactivityError`]s (failed subscribers).
//!   The default emits them as `tracing` errors.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::{Diagnostic, ReactivityError};

/// Settings that change how the core behaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactivityConfig {
    /// When `false`, `notify()` sorts subscribers by id before firing them.
    /// When `true`, ordering and deduplication belong to a host scheduler
    /// and subscribers fire in collection order.
    pub async_scheduling: bool,

    /// Suppress usage warnings.
    pub silent: bool,
}

impl Default for ReactivityConfig {
    fn default() -> Self {
        Self {
            async_scheduling: false,
            silent: false,
        }
    }
}

impl ReactivityConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ReactivityError> {
        Ok(serde_json::from_str(json)?)
    }
}

type WarnHandler = Rc<dyn Fn(&Diagnostic)>;
type ErrorHandler = Rc<dyn Fn(&ReactivityError)>;

thread_local! {
    static CONFIG: RefCell<ReactivityConfig> = RefCell::new(ReactivityConfig::default());
    static OBSERVING: Cell<bool> = const { Cell::new(true) };
    static WARN_HANDLER: RefCell<Option<WarnHandler>> = const { RefCell::new(None) };
    static ERROR_HANDLER: RefCell<Option<ErrorHandler>> = const { RefCell::new(None) };
}

/// Install a config for the current thread.
pub fn configure(config: ReactivityConfig) {
    CONFIG.with(|c| *c.borrow_mut() = config);
}

/// The config active on the current thread.
pub fn config() -> ReactivityConfig {
    CONFIG.with(|c| c.borrow().clone())
}

pub(crate) fn async_scheduling() -> bool {
    CONFIG.with(|c| c.borrow().async_scheduling)
}

/// Enable or disable observation of new values.
///
/// While disabled, `observe` returns existing markers but never creates new
/// ones. Hosts use this to keep values passed down from elsewhere from being
/// instrumented a second time.
pub fn set_observing(enabled: bool) {
    OBSERVING.with(|o| o.set(enabled));
}

pub fn is_observing() -> bool {
    OBSERVING.with(|o| o.get())
}

/// Replace the warn hook. `None` restores the `tracing` default.
pub fn set_warn_handler(handler: Option<Rc<dyn Fn(&Diagnostic)>>) {
    WARN_HANDLER.with(|h| *h.borrow_mut() = handler);
}

/// Replace the error hook. `None` restores the `tracing` default.
pub fn set_error_handler(handler: Option<Rc<dyn Fn(&ReactivityError)>>) {
    ERROR_HANDLER.with(|h| *h.borrow_mut() = handler);
}

/// Report a usage warning through the warn hook.
pub fn warn(diagnostic: Diagnostic) {
    if CONFIG.with(|c| c.borrow().silent) {
        return;
    }
    // Clone out so the hook may replace itself.
    let handler = WARN_HANDLER.with(|h| h.borrow().clone());
    match handler {
        Some(handler) => handler(&diagnostic),
        None => tracing::warn!(target: "trellis", "{diagnostic}"),
    }
}

/// Report an error through the error hook.
pub fn report_error(error: ReactivityError) {
    let handler = ERROR_HANDLER.with(|h| h.borrow().clone());
    match handler {
        Some(handler) => handler(&error),
        None => tracing::error!(target: "trellis", error = %error, "reactive update failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_from_json_fills_defaults() {
        let cfg = ReactivityConfig::from_json(r#"{ "silent": true }"#).unwrap();
        assert!(cfg.silent);
        assert!(!cfg.async_scheduling);

        assert!(ReactivityConfig::from_json("{ not json").is_err());
    }

    #[test]
    fn configure_is_visible_on_this_thread() {
        configure(ReactivityConfig {
            async_scheduling: true,
            silent: false,
        });
        assert!(async_scheduling());
        configure(ReactivityConfig::default());
        assert!(!async_scheduling());
    }

    #[test]
    fn warn_goes_through_handler_unless_silent() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        set_warn_handler(Some(Rc::new(move |d: &Diagnostic| {
            sink.borrow_mut().push(d.clone())
        })));

        warn(Diagnostic::Custom("first".into()));
        configure(ReactivityConfig {
            silent: true,
            ..ReactivityConfig::default()
        });
        warn(Diagnostic::Custom("second".into()));
        configure(ReactivityConfig::default());
        set_warn_handler(None);

        assert_eq!(*seen.borrow(), vec![Diagnostic::Custom("first".into())]);
    }

    #[test]
    fn observing_toggle() {
        assert!(is_observing());
        set_observing(false);
        assert!(!is_observing());
        set_observing(true);
    }
}
