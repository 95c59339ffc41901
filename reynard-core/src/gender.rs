//! Gender identity, expression and support.
//!
//! Every mutation goes through [`GenderComponent`] so the append-only logs
//! and the cached wellbeing score stay consistent with the profile.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::config::GenderConfig;
use crate::types::{AgentId, SimTime};

/// Wellbeing with no support, no disclosures and zero confidence.
const WELLBEING_BASE: f32 = 0.4;
/// Weight of a full support network.
const SUPPORT_WEIGHT: f32 = 0.2;
/// Weight of the disclosure score.
const DISCLOSURE_WEIGHT: f32 = 0.2;
/// Weight of full expression confidence.
const CONFIDENCE_WEIGHT: f32 = 0.2;
/// Share of the disclosure score earned by being out to supporters.
const SUPPORTED_DISCLOSURE_SHARE: f32 = 0.8;
/// Disclosures outside the support network at which their share is half earned.
const OTHER_DISCLOSURE_HALF_SATURATION: f32 = 2.0;

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Self-described gender identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GenderIdentity {
    /// Man.
    Male,
    /// Woman.
    Female,
    /// Outside the binary.
    NonBinary,
    /// Changes over time.
    Genderfluid,
    /// No gender.
    Agender,
    /// Two genders.
    Bigender,
    /// Still exploring.
    Questioning,
}

/// Outward presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GenderExpression {
    /// Masculine presentation.
    Masculine,
    /// Feminine presentation.
    Feminine,
    /// Mixed presentation.
    Androgynous,
    /// Deliberately shifting presentation.
    Fluid,
    /// Unmarked presentation.
    Neutral,
}

impl GenderExpression {
    /// Next expression on the drift cycle Masculine, Androgynous, Feminine,
    /// Androgynous. `toward_feminine` tracks which way the cycle is heading
    /// when leaving Androgynous.
    #[must_use]
    pub fn drift_step(self, toward_feminine: bool) -> Self {
        match self {
            Self::Androgynous if toward_feminine => Self::Feminine,
            Self::Androgynous => Self::Masculine,
            _ => Self::Androgynous,
        }
    }
}

/// A set of pronouns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PronounSet {
    /// e.g. "they".
    pub subject: String,
    /// e.g. "them".
    pub object: String,
    /// e.g. "their".
    pub possessive: String,
    /// e.g. "themself".
    pub reflexive: String,
}

impl PronounSet {
    /// Build a pronoun set.
    #[must_use]
    pub fn new(subject: &str, object: &str, possessive: &str, reflexive: &str) -> Self {
        Self {
            subject: subject.to_string(),
            object: object.to_string(),
            possessive: possessive.to_string(),
            reflexive: reflexive.to_string(),
        }
    }

    /// they/them/their/themself.
    #[must_use]
    pub fn they() -> Self {
        Self::new("they", "them", "their", "themself")
    }

    /// she/her/her/herself.
    #[must_use]
    pub fn she() -> Self {
        Self::new("she", "her", "her", "herself")
    }

    /// he/him/his/himself.
    #[must_use]
    pub fn he() -> Self {
        Self::new("he", "him", "his", "himself")
    }
}

// ---------------------------------------------------------------------------
// Log entries
// ---------------------------------------------------------------------------

/// One identity change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityChange {
    /// Previous identity.
    pub from: GenderIdentity,
    /// New identity.
    pub to: GenderIdentity,
    /// When it changed.
    pub at: SimTime,
}

/// One expression change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionChange {
    /// Previous expression.
    pub from: GenderExpression,
    /// New expression.
    pub to: GenderExpression,
    /// Whether this came from fluidity drift rather than an explicit request.
    pub drifted: bool,
    /// When it changed.
    pub at: SimTime,
}

/// One disclosure decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComingOutEvent {
    /// Who the decision concerns.
    pub peer: AgentId,
    /// Whether the agent is out to them.
    pub disclosed: bool,
    /// When it was recorded.
    pub at: SimTime,
}

/// One support network change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportNetworkChange {
    /// The supporter.
    pub peer: AgentId,
    /// Added (`true`) or removed.
    pub added: bool,
    /// When it changed.
    pub at: SimTime,
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// An agent's gender profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenderProfile {
    /// Primary identity.
    pub primary_identity: GenderIdentity,
    /// Current expression.
    pub expression: GenderExpression,
    /// Pronoun sets in order of preference.
    pub pronoun_sets: Vec<PronounSet>,
    /// Supportive agents.
    pub support_network: BTreeSet<AgentId>,
    /// Whether the agent is out to each peer.
    pub coming_out_status: BTreeMap<AgentId, bool>,
    /// Cached wellbeing in `[0.0, 1.0]`.
    pub gender_wellbeing: f32,
    /// Confidence in expression, in `[0.0, 1.0]`.
    pub expression_confidence: f32,
    /// Tendency for expression to drift, in `[0.0, 1.0]`.
    pub gender_fluidity: f32,
    /// Affirmation built up through mutual support, in `[0.0, 1.0]`.
    #[serde(default)]
    pub gender_euphoria: f32,
    /// Accumulated drift toward the next expression step.
    #[serde(default)]
    pub drift_phase: f32,
    /// Drift direction when leaving Androgynous.
    #[serde(default)]
    pub drift_toward_feminine: bool,
    /// Identity changes, oldest first.
    pub identity_change_history: Vec<IdentityChange>,
    /// Expression changes, oldest first.
    pub expression_changes: Vec<ExpressionChange>,
    /// Disclosure decisions, oldest first.
    pub coming_out_events: Vec<ComingOutEvent>,
    /// Support network changes, oldest first.
    pub support_network_changes: Vec<SupportNetworkChange>,
}

impl Default for GenderProfile {
    fn default() -> Self {
        Self {
            primary_identity: GenderIdentity::NonBinary,
            expression: GenderExpression::Androgynous,
            pronoun_sets: Vec::new(),
            support_network: BTreeSet::new(),
            coming_out_status: BTreeMap::new(),
            gender_wellbeing: 0.5,
            expression_confidence: 0.5,
            gender_fluidity: 0.0,
            gender_euphoria: 0.0,
            drift_phase: 0.0,
            drift_toward_feminine: false,
            identity_change_history: Vec::new(),
            expression_changes: Vec::new(),
            coming_out_events: Vec::new(),
            support_network_changes: Vec::new(),
        }
    }
}

/// Wellbeing in `[0.0, 1.0]` for a profile.
///
/// ```text
/// wellbeing  = 0.4
///            + 0.2 × min(|support|, cap) / cap
///            + 0.2 × disclosure
///            + 0.2 × expression_confidence
/// disclosure = 0.8 × out_to_supporters / max(|support|, 1)
///            + 0.2 × out_to_others / (out_to_others + 2)
/// ```
///
/// Every new disclosure raises the score: to a supporter through the first
/// term, to anyone else through the saturating second term.
#[must_use]
pub fn calculate_gender_wellbeing(profile: &GenderProfile, support_cap: usize) -> f32 {
    let cap = support_cap.max(1);
    let support = profile.support_network.len().min(cap) as f32 / cap as f32;

    let (to_supporters, to_others) = profile
        .coming_out_status
        .iter()
        .filter(|(_, out)| **out)
        .fold((0usize, 0usize), |(s, o), (peer, _)| {
            if profile.support_network.contains(peer) {
                (s + 1, o)
            } else {
                (s, o + 1)
            }
        });
    let supported = to_supporters as f32 / profile.support_network.len().max(1) as f32;
    let others = to_others as f32 / (to_others as f32 + OTHER_DISCLOSURE_HALF_SATURATION);
    let disclosure =
        SUPPORTED_DISCLOSURE_SHARE * supported + (1.0 - SUPPORTED_DISCLOSURE_SHARE) * others;

    (WELLBEING_BASE
        + SUPPORT_WEIGHT * support
        + DISCLOSURE_WEIGHT * disclosure
        + CONFIDENCE_WEIGHT * profile.expression_confidence.clamp(0.0, 1.0))
    .clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// GenderComponent
// ---------------------------------------------------------------------------

/// Per-agent gender state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenderComponent {
    /// The profile.
    pub profile: GenderProfile,
    /// Supporters beyond this add no wellbeing.
    pub support_cap: usize,
}

impl Default for GenderComponent {
    fn default() -> Self {
        Self::from_config(&GenderConfig::default())
    }
}

impl GenderComponent {
    /// A default profile tuned by `config`.
    #[must_use]
    pub fn from_config(config: &GenderConfig) -> Self {
        let mut component = Self {
            profile: GenderProfile::default(),
            support_cap: config.support_cap,
        };
        component.refresh_wellbeing();
        component
    }

    /// Recompute and cache wellbeing.
    pub fn refresh_wellbeing(&mut self) -> f32 {
        self.profile.gender_wellbeing = calculate_gender_wellbeing(&self.profile, self.support_cap);
        self.profile.gender_wellbeing
    }

    /// Change primary identity. Returns `false` (and logs nothing) if unchanged.
    pub fn update_identity(&mut self, identity: GenderIdentity, now: SimTime) -> bool {
        if self.profile.primary_identity == identity {
            return false;
        }
        self.profile.identity_change_history.push(IdentityChange {
            from: self.profile.primary_identity,
            to: identity,
            at: now,
        });
        self.profile.primary_identity = identity;
        self.refresh_wellbeing();
        true
    }

    /// Change expression. Returns `false` if unchanged.
    pub fn set_expression(&mut self, expression: GenderExpression, drifted: bool, now: SimTime) -> bool {
        if self.profile.expression == expression {
            return false;
        }
        self.profile.expression_changes.push(ExpressionChange {
            from: self.profile.expression,
            to: expression,
            drifted,
            at: now,
        });
        self.profile.expression = expression;
        self.refresh_wellbeing();
        true
    }

    /// Set the preferred pronoun set, moving it to the front.
    pub fn prefer_pronouns(&mut self, pronouns: PronounSet) {
        self.profile.pronoun_sets.retain(|p| *p != pronouns);
        self.profile.pronoun_sets.insert(0, pronouns);
    }

    /// Preferred pronouns, if any are set.
    #[must_use]
    pub fn preferred_pronouns(&self) -> Option<&PronounSet> {
        self.profile.pronoun_sets.first()
    }

    /// Add a supporter. Returns `false` if already present.
    pub fn add_support_agent(&mut self, peer: AgentId, now: SimTime) -> bool {
        if !self.profile.support_network.insert(peer) {
            return false;
        }
        self.profile.support_network_changes.push(SupportNetworkChange {
            peer,
            added: true,
            at: now,
        });
        self.refresh_wellbeing();
        true
    }

    /// Remove a supporter. Returns `false` if absent.
    pub fn remove_support_agent(&mut self, peer: &AgentId, now: SimTime) -> bool {
        if !self.profile.support_network.remove(peer) {
            return false;
        }
        self.profile.support_network_changes.push(SupportNetworkChange {
            peer: *peer,
            added: false,
            at: now,
        });
        self.refresh_wellbeing();
        true
    }

    /// Record whether the agent is out to `peer`. Always logged.
    pub fn update_coming_out_status(&mut self, peer: AgentId, disclosed: bool, now: SimTime) {
        self.profile.coming_out_status.insert(peer, disclosed);
        self.profile.coming_out_events.push(ComingOutEvent {
            peer,
            disclosed,
            at: now,
        });
        self.refresh_wellbeing();
    }

    /// Advance fluidity drift by `amount`. Returns the new expression if it shifted.
    ///
    /// Identity is never altered by drift.
    pub fn advance_drift(&mut self, amount: f32, now: SimTime) -> Option<GenderExpression> {
        if self.profile.gender_fluidity <= 0.0 || amount <= 0.0 {
            return None;
        }
        self.profile.drift_phase += amount;
        let mut shifted = None;
        while self.profile.drift_phase >= 1.0 {
            self.profile.drift_phase -= 1.0;
            let current = self.profile.expression;
            let next = current.drift_step(self.profile.drift_toward_feminine);
            match next {
                GenderExpression::Feminine => self.profile.drift_toward_feminine = false,
                GenderExpression::Masculine => self.profile.drift_toward_feminine = true,
                _ => {}
            }
            if self.set_expression(next, true, now) {
                shifted = Some(next);
            }
        }
        shifted
    }

    /// Nudge expression confidence by `delta`. Decreases stop at `floor`.
    pub fn adjust_confidence(&mut self, delta: f32, floor: f32) {
        let floor = floor.clamp(0.0, 1.0);
        self.profile.expression_confidence =
            (self.profile.expression_confidence + delta).clamp(floor.min(self.profile.expression_confidence), 1.0);
        self.refresh_wellbeing();
    }

    /// Raise euphoria by `delta`, clamped to `[0.0, 1.0]`.
    pub fn lift_euphoria(&mut self, delta: f32) {
        self.profile.gender_euphoria = (self.profile.gender_euphoria + delta).clamp(0.0, 1.0);
    }

    /// Summary for reporting.
    #[must_use]
    pub fn stats(&self) -> GenderStats {
        GenderStats {
            primary_identity: self.profile.primary_identity,
            expression: self.profile.expression,
            preferred_pronouns: self.preferred_pronouns().cloned(),
            gender_wellbeing: self.profile.gender_wellbeing,
            expression_confidence: self.profile.expression_confidence,
            gender_fluidity: self.profile.gender_fluidity,
            gender_euphoria: self.profile.gender_euphoria,
            support_network_size: self.profile.support_network.len(),
            coming_out_status: self.profile.coming_out_status.clone(),
            identity_changes: self.profile.identity_change_history.len(),
            expression_changes: self.profile.expression_changes.len(),
        }
    }
}

/// Point-in-time summary of a [`GenderComponent`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenderStats {
    /// Primary identity.
    pub primary_identity: GenderIdentity,
    /// Current expression.
    pub expression: GenderExpression,
    /// Preferred pronouns.
    pub preferred_pronouns: Option<PronounSet>,
    /// Cached wellbeing.
    pub gender_wellbeing: f32,
    /// Expression confidence.
    pub expression_confidence: f32,
    /// Fluidity.
    pub gender_fluidity: f32,
    /// Euphoria.
    pub gender_euphoria: f32,
    /// Number of supporters.
    pub support_network_size: usize,
    /// Disclosure map.
    pub coming_out_status: BTreeMap<AgentId, bool>,
    /// Logged identity changes.
    pub identity_changes: usize,
    /// Logged expression changes.
    pub expression_changes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component() -> GenderComponent {
        GenderComponent::from_config(&GenderConfig::default())
    }

    #[test]
    fn defaults_are_neutral() {
        let c = component();
        assert_eq!(c.profile.primary_identity, GenderIdentity::NonBinary);
        assert_eq!(c.profile.expression, GenderExpression::Androgynous);
        assert!(c.profile.pronoun_sets.is_empty());
        assert!((c.profile.gender_wellbeing - 0.5).abs() < 1e-6);
    }

    #[test]
    fn support_and_disclosure_raise_wellbeing() {
        let mut c = component();
        let (a, b) = (AgentId::new(), AgentId::new());
        c.add_support_agent(a, SimTime::zero());
        c.add_support_agent(b, SimTime::zero());
        let supported = c.profile.gender_wellbeing;
        assert!(supported > 0.5);
        c.update_coming_out_status(a, true, SimTime::zero());
        assert!(c.profile.gender_wellbeing > supported);
    }

    #[test]
    fn logs_are_append_only() {
        let mut c = component();
        let peer = AgentId::new();
        c.update_identity(GenderIdentity::Female, SimTime::at(1.0));
        c.update_identity(GenderIdentity::Genderfluid, SimTime::at(2.0));
        assert!(!c.update_identity(GenderIdentity::Genderfluid, SimTime::at(3.0)));
        assert_eq!(c.profile.identity_change_history.len(), 2);
        assert_eq!(c.profile.identity_change_history[0].to, GenderIdentity::Female);

        c.add_support_agent(peer, SimTime::zero());
        assert!(!c.add_support_agent(peer, SimTime::zero()));
        assert!(c.remove_support_agent(&peer, SimTime::zero()));
        assert!(!c.remove_support_agent(&peer, SimTime::zero()));
        assert_eq!(c.profile.support_network_changes.len(), 2);
    }

    #[test]
    fn preferred_pronouns_move_to_front() {
        let mut c = component();
        c.prefer_pronouns(PronounSet::they());
        c.prefer_pronouns(PronounSet::she());
        c.prefer_pronouns(PronounSet::they());
        assert_eq!(c.profile.pronoun_sets.len(), 2);
        assert_eq!(c.preferred_pronouns(), Some(&PronounSet::they()));
    }

    #[test]
    fn drift_needs_fluidity_and_keeps_identity() {
        let mut c = component();
        assert!(c.advance_drift(5.0, SimTime::zero()).is_none());

        c.profile.gender_fluidity = 0.8;
        let shifted = c.advance_drift(1.0, SimTime::at(1.0));
        assert_eq!(shifted, Some(GenderExpression::Masculine));
        assert_eq!(c.profile.primary_identity, GenderIdentity::NonBinary);
        assert!(c.profile.expression_changes[0].drifted);

        assert_eq!(c.advance_drift(1.0, SimTime::at(2.0)), Some(GenderExpression::Androgynous));
        assert_eq!(c.advance_drift(1.0, SimTime::at(3.0)), Some(GenderExpression::Feminine));
    }

    #[test]
    fn wellbeing_is_bounded() {
        let mut profile = GenderProfile {
            expression_confidence: 1.0,
            ..GenderProfile::default()
        };
        for _ in 0..10 {
            let peer = AgentId::new();
            profile.support_network.insert(peer);
            profile.coming_out_status.insert(peer, true);
        }
        for _ in 0..50 {
            profile.coming_out_status.insert(AgentId::new(), true);
        }
        let wellbeing = calculate_gender_wellbeing(&profile, 5);
        assert!(wellbeing <= 1.0);
        assert!(wellbeing > 0.95);
    }

    #[test]
    fn each_disclosure_to_a_supporter_counts() {
        let mut c = component();
        let supporters: Vec<AgentId> = (0..3).map(|_| AgentId::new()).collect();
        for peer in &supporters {
            c.add_support_agent(*peer, SimTime::zero());
        }
        let mut previous = c.profile.gender_wellbeing;
        for peer in &supporters {
            c.update_coming_out_status(*peer, true, SimTime::zero());
            assert!(c.profile.gender_wellbeing > previous);
            previous = c.profile.gender_wellbeing;
        }
    }

    #[test]
    fn disclosure_outside_support_never_lowers() {
        let mut c = component();
        let friend = AgentId::new();
        c.add_support_agent(friend, SimTime::zero());
        c.update_coming_out_status(friend, true, SimTime::zero());
        let before = c.profile.gender_wellbeing;

        c.update_coming_out_status(AgentId::new(), true, SimTime::zero());
        assert!(c.profile.gender_wellbeing > before);
        let after_stranger = c.profile.gender_wellbeing;

        c.update_coming_out_status(AgentId::new(), false, SimTime::zero());
        assert!((c.profile.gender_wellbeing - after_stranger).abs() < f32::EPSILON);
    }
}
