// SPDX-FileCopyrightText: 2026 Guiche Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Guiche workspace.
//!
//! Queue classes are the cross product of [`Origin`] and [`Tier`], written
//! as two-letter codes (`EN`, `EP`, `MN`, `MP`). Ticket numbering is scoped
//! per class per calendar day.

use std::fmt;

use chrono::{DateTime, Local, Timelike};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::GuicheError;

/// Where a ticket holder comes from. First letter of the class code.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Estadual,
    Municipal,
}

impl Origin {
    /// Single-letter code used in the wire form of a queue class.
    pub fn code(self) -> char {
        match self {
            Origin::Estadual => 'E',
            Origin::Municipal => 'M',
        }
    }

    fn from_code(code: char) -> Option<Self> {
        match code {
            'E' => Some(Origin::Estadual),
            'M' => Some(Origin::Municipal),
            _ => None,
        }
    }
}

/// Service tier. Second letter of the class code. Only the Normal tier is
/// subject to rate caps.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Normal,
    Priority,
}

impl Tier {
    pub fn code(self) -> char {
        match self {
            Tier::Normal => 'N',
            Tier::Priority => 'P',
        }
    }

    fn from_code(code: char) -> Option<Self> {
        match code {
            'N' => Some(Tier::Normal),
            'P' => Some(Tier::Priority),
            _ => None,
        }
    }
}

/// One of the four ticket queues: origin crossed with tier.
///
/// Serializes as its two-letter code, e.g. `"EN"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueueClass {
    pub origin: Origin,
    pub tier: Tier,
}

impl QueueClass {
    /// Every class the system knows about, in display order.
    pub const ALL: [QueueClass; 4] = [
        QueueClass { origin: Origin::Estadual, tier: Tier::Normal },
        QueueClass { origin: Origin::Estadual, tier: Tier::Priority },
        QueueClass { origin: Origin::Municipal, tier: Tier::Normal },
        QueueClass { origin: Origin::Municipal, tier: Tier::Priority },
    ];

    pub fn new(origin: Origin, tier: Tier) -> Self {
        Self { origin, tier }
    }

    /// Two-letter code, e.g. `EN` for Estadual/Normal.
    pub fn code(self) -> String {
        let mut code = String::with_capacity(2);
        code.push(self.origin.code());
        code.push(self.tier.code());
        code
    }

    /// Parses a two-letter class code. Case-insensitive, surrounding
    /// whitespace ignored; anything else is rejected with the raw input.
    pub fn from_code(code: &str) -> Result<Self, GuicheError> {
        let normalized = code.trim().to_ascii_uppercase();
        let mut chars = normalized.chars();
        let (Some(o), Some(t), None) = (chars.next(), chars.next(), chars.next()) else {
            return Err(GuicheError::UnknownClass { code: code.to_string() });
        };
        match (Origin::from_code(o), Tier::from_code(t)) {
            (Some(origin), Some(tier)) => Ok(Self { origin, tier }),
            _ => Err(GuicheError::UnknownClass { code: code.to_string() }),
        }
    }
}

impl fmt::Display for QueueClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.origin.code(), self.tier.code())
    }
}

impl std::str::FromStr for QueueClass {
    type Err = GuicheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s)
    }
}

impl Serialize for QueueClass {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.code())
    }
}

impl<'de> Deserialize<'de> for QueueClass {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        QueueClass::from_code(&code).map_err(serde::de::Error::custom)
    }
}

/// The queue classes enabled for a deployment. Origins come from
/// configuration; both tiers always exist for each enabled origin.
#[derive(Debug, Clone)]
pub struct ClassSet {
    classes: Vec<QueueClass>,
}

impl ClassSet {
    pub fn from_origins(origins: &[Origin]) -> Self {
        let mut classes = Vec::with_capacity(origins.len() * 2);
        for &origin in origins {
            let normal = QueueClass::new(origin, Tier::Normal);
            if !classes.contains(&normal) {
                classes.push(normal);
                classes.push(QueueClass::new(origin, Tier::Priority));
            }
        }
        Self { classes }
    }

    /// A set containing all four classes.
    pub fn all() -> Self {
        Self { classes: QueueClass::ALL.to_vec() }
    }

    pub fn contains(&self, class: QueueClass) -> bool {
        self.classes.contains(&class)
    }

    pub fn classes(&self) -> &[QueueClass] {
        &self.classes
    }

    /// Rejects classes outside the enabled set with the offending code.
    pub fn ensure(&self, class: QueueClass) -> Result<(), GuicheError> {
        if self.contains(class) {
            Ok(())
        } else {
            Err(GuicheError::UnknownClass { code: class.code() })
        }
    }
}

/// Identifier of a counter operator, as known to the operator directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperatorId(pub String);

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where an operator sits: the room and desk shown on wall displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    pub room: String,
    pub desk: String,
}

/// Half-day used by the secondary rate ceiling. The boundary is local noon.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum Shift {
    #[strum(serialize = "am")]
    #[serde(rename = "am")]
    Morning,
    #[strum(serialize = "pm")]
    #[serde(rename = "pm")]
    Afternoon,
}

impl Shift {
    pub fn from_hour(hour: u32) -> Self {
        if hour < 12 { Shift::Morning } else { Shift::Afternoon }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Shift::Morning => "am",
            Shift::Afternoon => "pm",
        }
    }
}

/// A capture of "now" taken once per operation: the local calendar day
/// (`YYYY-MM-DD`), the shift, and an RFC 3339 timestamp. All day, shift,
/// and timestamp derivation goes through here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueStamp {
    pub day: String,
    pub shift: Shift,
    pub at: String,
}

impl IssueStamp {
    pub fn capture(now: DateTime<Local>) -> Self {
        Self {
            day: now.format("%Y-%m-%d").to_string(),
            shift: Shift::from_hour(now.hour()),
            at: now.to_rfc3339(),
        }
    }
}

/// A stored queue ticket. `id` is the ledger rowid and doubles as the
/// global arrival order; `number` is the per-class, per-day sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub class: QueueClass,
    pub number: u32,
    pub issued_on: String,
    pub issued_at: String,
    pub shift: Shift,
    pub called: bool,
    pub called_by: Option<OperatorId>,
    pub called_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Insert payload for a ticket row.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub class: QueueClass,
    pub number: u32,
    pub issued_on: String,
    pub issued_at: String,
    pub shift: Shift,
}

impl NewTicket {
    pub fn new(class: QueueClass, number: u32, stamp: &IssueStamp) -> Self {
        Self {
            class,
            number,
            issued_on: stamp.day.clone(),
            issued_at: stamp.at.clone(),
            shift: stamp.shift,
        }
    }
}

/// What wall displays render when a ticket is called or re-announced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallEvent {
    pub class: QueueClass,
    pub number: u32,
    pub station: Station,
}

/// Normal-tier issuance counts inside the limiter's scope: the whole
/// current day and the current shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    pub day_count: u64,
    pub shift_count: u64,
}

/// Which population the rate caps count over.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
pub enum RateScope {
    /// One shared Normal-tier budget across all origins.
    #[default]
    #[strum(serialize = "global")]
    #[serde(rename = "global")]
    Global,
    /// Each origin gets its own daily and shift budget.
    #[strum(serialize = "per-origin")]
    #[serde(rename = "per-origin")]
    PerOrigin,
}

/// Which ceiling a capacity rejection hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum CapKind {
    #[strum(serialize = "daily")]
    #[serde(rename = "daily")]
    Daily,
    #[strum(serialize = "morning shift")]
    #[serde(rename = "morning_shift")]
    MorningShift,
    #[strum(serialize = "afternoon shift")]
    #[serde(rename = "afternoon_shift")]
    AfternoonShift,
}

impl CapKind {
    pub fn shift(shift: Shift) -> Self {
        match shift {
            Shift::Morning => CapKind::MorningShift,
            Shift::Afternoon => CapKind::AfternoonShift,
        }
    }
}

/// Opaque claim token minted by a receipt collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReceiptToken(pub String);

impl fmt::Display for ReceiptToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of a single issuance: the stored ticket plus the optional
/// print-claim token the receipt sink handed back.
#[derive(Debug, Clone)]
pub struct IssueOutcome {
    pub ticket: Ticket,
    pub receipt: Option<ReceiptToken>,
}

/// Result of an idempotent manual insert.
#[derive(Debug, Clone, PartialEq)]
pub enum ManualOutcome {
    /// The number was free and a ticket was created.
    Issued(Ticket),
    /// The number already existed for the class and day; nothing changed.
    AlreadyExists,
}

/// What a span insert actually did: rows created and numbers skipped
/// because they already existed.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanReport {
    pub issued: Vec<Ticket>,
    pub skipped: u32,
}

/// Result of a range issuance, including the receipt claim token when a
/// sink produced one.
#[derive(Debug, Clone)]
pub struct RangeOutcome {
    pub issued: Vec<Ticket>,
    pub skipped: u32,
    pub receipt: Option<ReceiptToken>,
}

/// Uncalled tickets for one class, issued today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCount {
    pub class: QueueClass,
    pub pending: u64,
}

/// Health status reported by ledger health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Ledger is fully operational.
    Healthy,
    /// Ledger is operational but experiencing issues.
    Degraded(String),
    /// Ledger is not operational.
    Unhealthy(String),
}
