//! The dashboard JSON document.
//!
//! Only the fields the workbook mapping reads are modelled. Every field is
//! optional so absent keys are simply skipped. Leaf values stay as raw JSON,
//! so numbers remain numbers and a key holding an unexpected type only
//! affects that key.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DashboardData {
    pub last_updated: Option<Value>,
    pub summary: Option<Vec<SummaryCard>>,
    pub global_risk: Option<GlobalRisk>,
    pub countries: Option<Vec<Country>>,
}

/// One headline card on the overview strip.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SummaryCard {
    pub title: Option<Value>,
    pub value: Option<Value>,
    pub note: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GlobalRisk {
    pub status: Option<Value>,
    pub note: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Country {
    pub name: Option<Value>,
    pub blocks: Option<Vec<Block>>,
}

/// A single indicator panel within a country.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Block {
    pub label: Option<Value>,
    pub status: Option<Value>,
    pub detail: Option<Value>,
    pub sources: Option<Vec<Source>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Source {
    pub url: Option<Value>,
}

impl DashboardData {
    /// Read the fields of interest out of an already parsed document.
    pub fn from_value(value: &Value) -> serde_json::Result<Self> {
        DashboardData::deserialize(value)
    }

    pub fn summary(&self) -> &[SummaryCard] {
        self.summary.as_deref().unwrap_or_default()
    }

    pub fn countries(&self) -> &[Country] {
        self.countries.as_deref().unwrap_or_default()
    }
}

impl SummaryCard {
    pub fn title(&self) -> Option<&str> {
        self.title.as_ref().and_then(Value::as_str)
    }
}

impl Country {
    /// Sheet name, when `name` is a string.
    pub fn name(&self) -> Option<&str> {
        self.name.as_ref().and_then(Value::as_str)
    }

    pub fn blocks(&self) -> &[Block] {
        self.blocks.as_deref().unwrap_or_default()
    }
}

impl Block {
    pub fn label(&self) -> Option<&str> {
        self.label.as_ref().and_then(Value::as_str)
    }

    pub fn first_source(&self) -> Option<&Source> {
        self.sources.as_deref().and_then(<[Source]>::first)
    }
}
