//! `storsync-model` — canonical record model for the storage registry sync.
//!
//! Pure data crate: the persisted record shape, the technology and market
//! segment enums, and the classification side-context. No IO dependencies.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Technology
// ---------------------------------------------------------------------------

/// Storage technology of a registry unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Technology {
    Battery,
    PumpedHydro,
    Flywheel,
    CompressedAir,
    Hydrogen,
    Other,
}

impl Technology {
    /// Parse a source technology label. Accepts both the canonical
    /// snake_case names and the raw registry labels; anything
    /// unrecognized maps to `Other`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "battery" | "batterie" => Self::Battery,
            "pumped_hydro" | "pumpspeicher" => Self::PumpedHydro,
            "flywheel" | "schwungrad" => Self::Flywheel,
            "compressed_air" | "druckluft" => Self::CompressedAir,
            "hydrogen" | "wasserstoffspeicher" => Self::Hydrogen,
            _ => Self::Other,
        }
    }

    /// The fixed category for non-battery technologies.
    ///
    /// Batteries return `None`: their category is decided by the
    /// plausibility pipeline, not by the technology tag.
    pub fn as_category(self) -> Option<Category> {
        match self {
            Self::Battery => None,
            Self::PumpedHydro => Some(Category::PumpedHydro),
            Self::Flywheel => Some(Category::Flywheel),
            Self::CompressedAir => Some(Category::CompressedAir),
            Self::Hydrogen => Some(Category::Hydrogen),
            Self::Other => Some(Category::Other),
        }
    }
}

impl std::fmt::Display for Technology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Battery => write!(f, "battery"),
            Self::PumpedHydro => write!(f, "pumped_hydro"),
            Self::Flywheel => write!(f, "flywheel"),
            Self::CompressedAir => write!(f, "compressed_air"),
            Self::Hydrogen => write!(f, "hydrogen"),
            Self::Other => write!(f, "other"),
        }
    }
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Market segment (batteries) or technology pass-through (everything else).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Residential,
    Commercial,
    UtilityScale,
    PumpedHydro,
    Flywheel,
    CompressedAir,
    Hydrogen,
    Other,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Residential => write!(f, "residential"),
            Self::Commercial => write!(f, "commercial"),
            Self::UtilityScale => write!(f, "utility_scale"),
            Self::PumpedHydro => write!(f, "pumped_hydro"),
            Self::Flywheel => write!(f, "flywheel"),
            Self::CompressedAir => write!(f, "compressed_air"),
            Self::Hydrogen => write!(f, "hydrogen"),
            Self::Other => write!(f, "other"),
        }
    }
}

// ---------------------------------------------------------------------------
// StorageRecord
// ---------------------------------------------------------------------------

/// One storage unit in the shape written to the destination store.
///
/// Field order is the serialization order of the destination payload.
/// Absent fields serialize as explicit nulls so an update clears stale
/// values in the destination. `category` is `None` until assigned by the
/// plausibility pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageRecord {
    pub id: String,
    pub name: Option<String>,
    pub status: Option<String>,
    pub technology: Technology,
    pub battery_technology: Option<String>,
    pub usable_capacity_kwh: Option<f64>,
    pub power_kw: Option<f64>,
    pub commissioning_date: Option<NaiveDate>,
    pub shutdown_date: Option<NaiveDate>,
    pub last_update: Option<NaiveDateTime>,
    pub grid_review_status: Option<String>,
    pub country: Option<String>,
    pub federal_state: Option<String>,
    pub district: Option<String>,
    pub municipality: Option<String>,
    pub region: Option<String>,
    pub postcode: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub category: Option<Category>,
}

impl StorageRecord {
    /// A record with identity and technology set, everything else absent.
    pub fn new(id: impl Into<String>, technology: Technology) -> Self {
        Self {
            id: id.into(),
            name: None,
            status: None,
            technology,
            battery_technology: None,
            usable_capacity_kwh: None,
            power_kw: None,
            commissioning_date: None,
            shutdown_date: None,
            last_update: None,
            grid_review_status: None,
            country: None,
            federal_state: None,
            district: None,
            municipality: None,
            region: None,
            postcode: None,
            lat: None,
            lon: None,
            category: None,
        }
    }

    /// Energy-to-power ratio in hours of full-load duration.
    ///
    /// `None` when either dimension is absent or power is zero (a missing
    /// operand is a data-quality question, never an arithmetic error).
    pub fn ep_ratio(&self) -> Option<f64> {
        let capacity = self.usable_capacity_kwh?;
        let power = self.power_kw?;
        if power == 0.0 {
            return None;
        }
        Some(capacity / power)
    }

    /// Commissioning month as `YYYY-MM`, the correction bucket key.
    pub fn commissioning_month(&self) -> Option<String> {
        self.commissioning_date
            .map(|d| d.format("%Y-%m").to_string())
    }
}

// ---------------------------------------------------------------------------
// Classification context
// ---------------------------------------------------------------------------

/// Pipeline-internal context derived from operator and grid-connection
/// lookups. Kept off `StorageRecord` so it can never leak into the
/// destination payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassificationContext {
    /// Operator is a private individual rather than an organisation.
    pub is_natural_person: bool,
    /// Raw voltage level of the grid connection, when known.
    pub voltage_level: Option<String>,
}

/// A registry unit as ingested: persisted record plus side-context.
#[derive(Debug, Clone)]
pub struct SourceRecord {
    pub record: StorageRecord,
    pub ctx: ClassificationContext,
}

impl SourceRecord {
    pub fn new(record: StorageRecord) -> Self {
        Self {
            record,
            ctx: ClassificationContext::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
