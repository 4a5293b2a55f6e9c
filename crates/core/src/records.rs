//! Domain records flowing through the condition pipeline.
//!
//! These mirror the shapes returned by Landivo (properties, buyers) and the
//! Mailivo campaign API (campaigns, templates). Field names follow the
//! upstream camelCase JSON.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::payment_plan::PaymentPlan;
use crate::types::{BuyerId, PropertyId, Timestamp};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: PropertyId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub county: String,
    #[serde(default)]
    pub area: String,
    #[serde(default)]
    pub zip: String,
    #[serde(default)]
    pub land_type: Vec<String>,
    #[serde(default)]
    pub asking_price: Option<f64>,
    #[serde(default)]
    pub acre: Option<f64>,
    #[serde(default)]
    pub sqft: Option<f64>,
    #[serde(default)]
    pub financing: bool,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub payment_plans: Vec<PaymentPlan>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

impl Property {
    /// Minimal property used by loaders and tests.
    pub fn new(id: impl Into<PropertyId>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            status: String::new(),
            state: String::new(),
            city: String::new(),
            county: String::new(),
            area: String::new(),
            zip: String::new(),
            land_type: Vec::new(),
            asking_price: None,
            acre: None,
            sqft: None,
            financing: false,
            featured: false,
            payment_plans: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }
}

/// Per-buyer email engagement, as tracked by the delivery layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailEngagement {
    #[serde(default)]
    pub opens: u64,
    #[serde(default)]
    pub clicks: u64,
    #[serde(default)]
    pub last_opened_at: Option<Timestamp>,
    #[serde(default)]
    pub last_clicked_at: Option<Timestamp>,
    #[serde(default)]
    pub delivery_status: Option<String>,
}

fn default_subscribed() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buyer {
    pub id: BuyerId,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub buyer_type: Option<String>,
    #[serde(default)]
    pub preferred_areas: Vec<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default = "default_subscribed")]
    pub subscribed: bool,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub engagement: EmailEngagement,
}

impl Buyer {
    pub fn new(id: impl Into<BuyerId>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            first_name: None,
            last_name: None,
            buyer_type: None,
            preferred_areas: Vec::new(),
            source: None,
            subscribed: true,
            created_at: None,
            engagement: EmailEngagement::default(),
        }
    }
}

/// A previously created campaign, as seen by `campaign_data` conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub campaign_type: Option<String>,
    #[serde(default)]
    pub open_rate: Option<f64>,
    #[serde(default)]
    pub click_rate: Option<f64>,
    #[serde(default)]
    pub total_sent: Option<u64>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub sent_at: Option<Timestamp>,
    #[serde(default)]
    pub property_ids: Vec<PropertyId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailTemplate {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_subscribed")]
    pub is_active: bool,
}

// ---------------------------------------------------------------------------
// RecordSet
// ---------------------------------------------------------------------------

/// The in-memory collection narrowed by the condition pipeline.
///
/// `audience` maps each loaded property to the buyers interested in it. It is
/// never narrowed; recipients are computed as the audience of the surviving
/// properties intersected with the surviving buyers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    pub properties: Vec<Property>,
    pub buyers: Vec<Buyer>,
    pub campaigns: Vec<CampaignRecord>,
    pub templates: Vec<EmailTemplate>,
    pub audience: BTreeMap<PropertyId, Vec<BuyerId>>,
}

impl RecordSet {
    /// Nothing to act on: no property survived.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Surviving buyers interested in any of `properties`, deduplicated,
    /// in first-seen order.
    pub fn recipients_for<'a, I>(&'a self, properties: I) -> Vec<&'a Buyer>
    where
        I: IntoIterator<Item = &'a Property>,
    {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut recipients = Vec::new();

        for property in properties {
            let Some(ids) = self.audience.get(&property.id) else {
                continue;
            };
            for id in ids {
                if !seen.insert(id.as_str()) {
                    continue;
                }
                if let Some(buyer) = self.buyers.iter().find(|b| &b.id == id) {
                    recipients.push(buyer);
                }
            }
        }

        recipients
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
