//! Per-event channel selection from recipient preferences.

use serde::{Deserialize, Serialize};

use herald_entity::notification::{DisplayMode, Severity};
use herald_entity::preference::DeliveryPreference;

/// Facts the gate decides on.
#[derive(Debug, Clone, Copy)]
pub struct GateInput<'a> {
    /// Recipient preferences (defaults when none are saved).
    pub preference: &'a DeliveryPreference,
    /// Event severity.
    pub severity: Severity,
    /// Requested display mode.
    pub display_mode: DisplayMode,
    /// Whether the recipient has a live connection.
    pub online: bool,
    /// Whether an email sender is registered.
    pub email_configured: bool,
}

/// Which channels an event goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryPlan {
    /// Push over the live connection.
    pub live: bool,
    /// Write the inbox entry. Always true.
    pub inbox: bool,
    /// Queue an email.
    pub email: bool,
}

/// Stateless routing policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreferenceGate;

impl PreferenceGate {
    /// Create the gate.
    pub fn new() -> Self {
        Self
    }

    /// Decide the channels for one event.
    pub fn evaluate(&self, input: GateInput<'_>) -> DeliveryPlan {
        let pref = input.preference;

        let live = pref.live_enabled && pref.display_mode_enabled(input.display_mode);

        let email_possible = input.email_configured && pref.usable_email().is_some();
        let email = email_possible && (input.severity.is_urgent() || !input.online);

        DeliveryPlan {
            live,
            inbox: true,
            email,
        }
    }
}

#[cfg(test)]
mod tests {
    use herald_core::Recipient;

    use super::*;

    fn preference() -> DeliveryPreference {
        let mut pref = DeliveryPreference::default_for(Recipient::User(1));
        pref.email_address = Some("ada@example.com".to_string());
        pref
    }

    fn input(pref: &DeliveryPreference, severity: Severity, online: bool) -> GateInput<'_> {
        GateInput {
            preference: pref,
            severity,
            display_mode: DisplayMode::Toast,
            online,
            email_configured: true,
        }
    }

    #[test]
    fn test_disabled_display_mode_suppresses_live_but_keeps_inbox() {
        let mut pref = preference();
        pref.toast_enabled = false;
        let plan = PreferenceGate::new().evaluate(input(&pref, Severity::Info, true));
        assert!(!plan.live);
        assert!(plan.inbox);

        pref.toast_enabled = true;
        pref.live_enabled = false;
        let plan = PreferenceGate::new().evaluate(input(&pref, Severity::Info, true));
        assert!(!plan.live);
        assert!(plan.inbox);
    }

    #[test]
    fn test_email_never_used_without_transport_or_address() {
        let pref = preference();
        let mut gate_input = input(&pref, Severity::Critical, false);
        gate_input.email_configured = false;
        assert!(!PreferenceGate::new().evaluate(gate_input).email);

        let no_address = DeliveryPreference::default_for(Recipient::User(1));
        let plan = PreferenceGate::new().evaluate(input(&no_address, Severity::Critical, false));
        assert!(!plan.email);

        let mut opted_out = preference();
        opted_out.email_enabled = false;
        let plan = PreferenceGate::new().evaluate(input(&opted_out, Severity::Error, false));
        assert!(!plan.email);
    }

    #[test]
    fn test_urgent_severity_emails_even_when_online() {
        let pref = preference();
        for severity in [Severity::Error, Severity::Critical] {
            let plan = PreferenceGate::new().evaluate(input(&pref, severity, true));
            assert!(plan.live);
            assert!(plan.email);
        }
    }

    #[test]
    fn test_routine_severity_emails_only_when_offline() {
        let pref = preference();
        for severity in [Severity::Info, Severity::Success, Severity::Warning] {
            assert!(!PreferenceGate::new().evaluate(input(&pref, severity, true)).email);
            assert!(PreferenceGate::new().evaluate(input(&pref, severity, false)).email);
        }
    }
}
