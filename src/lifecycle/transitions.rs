use super::domain::{ActorRole, GuaranteeStatus};

/// Notification shape attached to an edge of the lifecycle graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationShape {
    None,
    Lightweight(&'static str),
    FullSnapshot(&'static str),
}

/// One legal edge of the lifecycle graph.
#[derive(Debug, Clone, Copy)]
pub struct TransitionRule {
    pub from: GuaranteeStatus,
    pub to: GuaranteeStatus,
    pub action: &'static str,
    pub roles: &'static [ActorRole],
    pub notification: NotificationShape,
}

use ActorRole::{Analyst, Automation, Finance, RealtyAgency, Tenant};
use GuaranteeStatus as S;
use NotificationShape::{FullSnapshot, Lightweight, None as NoNotice};

/// The full forward-only transition graph. Guards that depend on request
/// data (score/rate present, non-empty reason, lease elapsed) live in the
/// service operations; this table owns legality, audit labels, permitted
/// roles, and notification shapes.
pub const TRANSITIONS: &[TransitionRule] = &[
    TransitionRule {
        from: S::UnderReview,
        to: S::Approved,
        action: "approved",
        roles: &[Analyst],
        notification: NoNotice,
    },
    TransitionRule {
        from: S::UnderReview,
        to: S::Rejected,
        action: "rejected",
        roles: &[Analyst],
        notification: NoNotice,
    },
    TransitionRule {
        from: S::Approved,
        to: S::SentToFinance,
        action: "sent to finance",
        roles: &[RealtyAgency],
        notification: NoNotice,
    },
    TransitionRule {
        from: S::SentToFinance,
        to: S::PaymentLinkAvailable,
        action: "payment link attached",
        roles: &[Finance],
        notification: Lightweight("payment_link_available"),
    },
    TransitionRule {
        from: S::PaymentLinkAvailable,
        to: S::ProofSubmitted,
        action: "proof submitted",
        roles: &[Tenant, RealtyAgency],
        notification: NoNotice,
    },
    TransitionRule {
        from: S::PaymentLinkAvailable,
        to: S::PaymentConfirmed,
        action: "payment confirmed",
        roles: &[Finance],
        notification: FullSnapshot("payment_confirmed"),
    },
    TransitionRule {
        from: S::ProofSubmitted,
        to: S::PaymentConfirmed,
        action: "payment confirmed",
        roles: &[Finance],
        notification: FullSnapshot("payment_confirmed"),
    },
    TransitionRule {
        from: S::PaymentConfirmed,
        to: S::AwaitingRealtorSignature,
        action: "sent for realtor signature",
        roles: &[Finance, Automation],
        notification: FullSnapshot("awaiting_realtor_signature"),
    },
    TransitionRule {
        from: S::AwaitingRealtorSignature,
        to: S::Active,
        action: "activated",
        roles: &[Automation],
        notification: NoNotice,
    },
    TransitionRule {
        from: S::Active,
        to: S::Expired,
        action: "expired",
        roles: &[Automation],
        notification: NoNotice,
    },
];

/// Look up the rule for a (from, to) pair. `None` means the transition is
/// undefined, including self-loops.
pub fn rule_for(from: GuaranteeStatus, to: GuaranteeStatus) -> Option<&'static TransitionRule> {
    TRANSITIONS
        .iter()
        .find(|rule| rule.from == from && rule.to == to)
}
