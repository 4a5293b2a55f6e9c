//! Condition categories and the sequential filter pipeline.
//!
//! Every [`Condition`] narrows exactly one collection of a [`RecordSet`].
//! Conditions are applied in list order; each stage is a pure function of
//! the previous stage's output, so the same input always produces the same
//! output.

use serde::{Deserialize, Serialize};

use crate::filters::{any_of, combine, flag, one_of, DateFilter, LogicalOperator, NumericFilter, NumericOperator};
use crate::payment_plan::lowest_monthly_payment;
use crate::records::{Buyer, CampaignRecord, EmailTemplate, Property, RecordSet};
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// ConditionCategory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionCategory {
    PropertyData,
    CampaignData,
    EmailTracking,
    EmailTemplates,
    BuyerData,
}

impl ConditionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PropertyData => "property_data",
            Self::CampaignData => "campaign_data",
            Self::EmailTracking => "email_tracking",
            Self::EmailTemplates => "email_templates",
            Self::BuyerData => "buyer_data",
        }
    }
}

impl std::fmt::Display for ConditionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Record filters
// ---------------------------------------------------------------------------

/// Per-category filter object evaluated against one record type.
pub trait RecordFilter {
    type Record;

    /// One entry per field filter; `None` for inactive filters.
    fn checks(&self, record: &Self::Record, now: Timestamp) -> Vec<Option<bool>>;

    /// Structural problems, one message each.
    fn errors(&self) -> Vec<String>;
}

fn range_errors<N, D>(numeric: &[NumericFilter<N>], dates: &[DateFilter<D>]) -> Vec<String>
where
    N: std::fmt::Debug,
    D: std::fmt::Debug,
{
    numeric
        .iter()
        .filter_map(|f| f.error())
        .chain(dates.iter().filter_map(|f| f.error()))
        .collect()
}

// -- property_data ----------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyNumericField {
    #[serde(alias = "askingprice")]
    AskingPrice,
    Acre,
    Sqft,
    #[serde(alias = "monthlypayment")]
    MonthlyPayment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyDateField {
    CreatedAt,
    UpdatedAt,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PropertyFilters {
    #[serde(default)]
    pub numeric: Vec<NumericFilter<PropertyNumericField>>,
    #[serde(default)]
    pub dates: Vec<DateFilter<PropertyDateField>>,
    #[serde(default)]
    pub status: Vec<String>,
    #[serde(default)]
    pub state: Vec<String>,
    #[serde(default)]
    pub city: Vec<String>,
    #[serde(default)]
    pub county: Vec<String>,
    #[serde(default)]
    pub area: Vec<String>,
    #[serde(default)]
    pub land_type: Vec<String>,
    #[serde(default)]
    pub zip: Vec<String>,
    #[serde(default)]
    pub financing: Option<bool>,
    #[serde(default)]
    pub featured: Option<bool>,
}

impl PropertyFilters {
    /// Price bounds that can never hold together in an AND condition, e.g.
    /// `askingPrice > 90000` with `askingPrice < 50000`.
    fn conflicting_price_bounds(&self) -> Option<String> {
        let prices = || {
            self.numeric
                .iter()
                .filter(|f| f.field == PropertyNumericField::AskingPrice)
        };
        let lower = prices()
            .filter(|f| f.operator == NumericOperator::Gt)
            .map(|f| f.value)
            .reduce(f64::max)?;
        let upper = prices()
            .filter(|f| f.operator == NumericOperator::Lt)
            .map(|f| f.value)
            .reduce(f64::min)?;
        (lower >= upper).then(|| {
            format!("Conflicting price filters: askingPrice > {lower} and askingPrice < {upper}")
        })
    }
}

impl RecordFilter for PropertyFilters {
    type Record = Property;

    fn checks(&self, p: &Property, now: Timestamp) -> Vec<Option<bool>> {
        let mut checks: Vec<Option<bool>> = self
            .numeric
            .iter()
            .map(|f| {
                let actual = match f.field {
                    PropertyNumericField::AskingPrice => p.asking_price,
                    PropertyNumericField::Acre => p.acre,
                    PropertyNumericField::Sqft => p.sqft,
                    PropertyNumericField::MonthlyPayment => lowest_monthly_payment(&p.payment_plans),
                };
                Some(f.matches(actual))
            })
            .collect();

        checks.extend(self.dates.iter().map(|f| {
            let actual = match f.field {
                PropertyDateField::CreatedAt => p.created_at,
                PropertyDateField::UpdatedAt => p.updated_at,
            };
            Some(f.matches(actual, now))
        }));

        checks.extend([
            one_of(&self.status, Some(p.status.as_str())),
            one_of(&self.state, Some(p.state.as_str())),
            one_of(&self.city, Some(p.city.as_str())),
            one_of(&self.county, Some(p.county.as_str())),
            one_of(&self.area, Some(p.area.as_str())),
            any_of(&self.land_type, &p.land_type),
            one_of(&self.zip, Some(p.zip.as_str())),
            flag(self.financing, p.financing),
            flag(self.featured, p.featured),
        ]);
        checks
    }

    fn errors(&self) -> Vec<String> {
        range_errors(&self.numeric, &self.dates)
    }
}

// -- campaign_data ----------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CampaignNumericField {
    OpenRate,
    ClickRate,
    TotalSent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CampaignDateField {
    CreatedAt,
    SentAt,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CampaignFilters {
    #[serde(default)]
    pub numeric: Vec<NumericFilter<CampaignNumericField>>,
    #[serde(default)]
    pub dates: Vec<DateFilter<CampaignDateField>>,
    #[serde(default)]
    pub status: Vec<String>,
    #[serde(default)]
    pub campaign_type: Vec<String>,
}

impl RecordFilter for CampaignFilters {
    type Record = CampaignRecord;

    fn checks(&self, c: &CampaignRecord, now: Timestamp) -> Vec<Option<bool>> {
        let mut checks: Vec<Option<bool>> = self
            .numeric
            .iter()
            .map(|f| {
                let actual = match f.field {
                    CampaignNumericField::OpenRate => c.open_rate,
                    CampaignNumericField::ClickRate => c.click_rate,
                    CampaignNumericField::TotalSent => c.total_sent.map(|n| n as f64),
                };
                Some(f.matches(actual))
            })
            .collect();
        checks.extend(self.dates.iter().map(|f| {
            let actual = match f.field {
                CampaignDateField::CreatedAt => c.created_at,
                CampaignDateField::SentAt => c.sent_at,
            };
            Some(f.matches(actual, now))
        }));
        checks.push(one_of(&self.status, Some(c.status.as_str())));
        checks.push(one_of(&self.campaign_type, c.campaign_type.as_deref()));
        checks
    }

    fn errors(&self) -> Vec<String> {
        range_errors(&self.numeric, &self.dates)
    }
}

// -- email_tracking ---------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EngagementNumericField {
    Opens,
    Clicks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EngagementDateField {
    LastOpenedAt,
    LastClickedAt,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EngagementFilters {
    #[serde(default)]
    pub numeric: Vec<NumericFilter<EngagementNumericField>>,
    #[serde(default)]
    pub dates: Vec<DateFilter<EngagementDateField>>,
    #[serde(default)]
    pub delivery_status: Vec<String>,
}

impl RecordFilter for EngagementFilters {
    type Record = Buyer;

    fn checks(&self, b: &Buyer, now: Timestamp) -> Vec<Option<bool>> {
        let e = &b.engagement;
        let mut checks: Vec<Option<bool>> = self
            .numeric
            .iter()
            .map(|f| {
                let actual = match f.field {
                    EngagementNumericField::Opens => e.opens,
                    EngagementNumericField::Clicks => e.clicks,
                };
                Some(f.matches(Some(actual as f64)))
            })
            .collect();
        checks.extend(self.dates.iter().map(|f| {
            let actual = match f.field {
                EngagementDateField::LastOpenedAt => e.last_opened_at,
                EngagementDateField::LastClickedAt => e.last_clicked_at,
            };
            Some(f.matches(actual, now))
        }));
        checks.push(one_of(&self.delivery_status, e.delivery_status.as_deref()));
        checks
    }

    fn errors(&self) -> Vec<String> {
        range_errors(&self.numeric, &self.dates)
    }
}

// -- email_templates --------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TemplateFilters {
    #[serde(default)]
    pub template_id: Vec<String>,
    #[serde(default)]
    pub category: Vec<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl RecordFilter for TemplateFilters {
    type Record = EmailTemplate;

    fn checks(&self, t: &EmailTemplate, _now: Timestamp) -> Vec<Option<bool>> {
        vec![
            one_of(&self.template_id, Some(t.id.as_str())),
            one_of(&self.category, t.category.as_deref()),
            flag(self.is_active, t.is_active),
        ]
    }

    fn errors(&self) -> Vec<String> {
        Vec::new()
    }
}

// -- buyer_data -------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BuyerDateField {
    CreatedAt,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BuyerFilters {
    #[serde(default)]
    pub dates: Vec<DateFilter<BuyerDateField>>,
    #[serde(default)]
    pub buyer_type: Vec<String>,
    #[serde(default)]
    pub preferred_areas: Vec<String>,
    #[serde(default)]
    pub source: Vec<String>,
    #[serde(default)]
    pub subscribed: Option<bool>,
}

impl RecordFilter for BuyerFilters {
    type Record = Buyer;

    fn checks(&self, b: &Buyer, now: Timestamp) -> Vec<Option<bool>> {
        let mut checks: Vec<Option<bool>> = self
            .dates
            .iter()
            .map(|f| match f.field {
                BuyerDateField::CreatedAt => Some(f.matches(b.created_at, now)),
            })
            .collect();
        checks.extend([
            one_of(&self.buyer_type, b.buyer_type.as_deref()),
            any_of(&self.preferred_areas, &b.preferred_areas),
            one_of(&self.source, b.source.as_deref()),
            flag(self.subscribed, b.subscribed),
        ]);
        checks
    }

    fn errors(&self) -> Vec<String> {
        self.dates.iter().filter_map(|f| f.error()).collect()
    }
}

// ---------------------------------------------------------------------------
// Condition
// ---------------------------------------------------------------------------

/// `{ "category": ..., "operator": "AND"|"OR", "filters": {...} }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum Condition {
    PropertyData {
        #[serde(default)]
        operator: LogicalOperator,
        #[serde(default)]
        filters: PropertyFilters,
    },
    CampaignData {
        #[serde(default)]
        operator: LogicalOperator,
        #[serde(default)]
        filters: CampaignFilters,
    },
    EmailTracking {
        #[serde(default)]
        operator: LogicalOperator,
        #[serde(default)]
        filters: EngagementFilters,
    },
    EmailTemplates {
        #[serde(default)]
        operator: LogicalOperator,
        #[serde(default)]
        filters: TemplateFilters,
    },
    BuyerData {
        #[serde(default)]
        operator: LogicalOperator,
        #[serde(default)]
        filters: BuyerFilters,
    },
}

fn narrow<F: RecordFilter>(
    records: &[F::Record],
    filters: &F,
    operator: LogicalOperator,
    now: Timestamp,
) -> Vec<F::Record>
where
    F::Record: Clone,
{
    records
        .iter()
        .filter(|r| combine(operator, filters.checks(r, now)))
        .cloned()
        .collect()
}

impl Condition {
    pub fn category(&self) -> ConditionCategory {
        match self {
            Self::PropertyData { .. } => ConditionCategory::PropertyData,
            Self::CampaignData { .. } => ConditionCategory::CampaignData,
            Self::EmailTracking { .. } => ConditionCategory::EmailTracking,
            Self::EmailTemplates { .. } => ConditionCategory::EmailTemplates,
            Self::BuyerData { .. } => ConditionCategory::BuyerData,
        }
    }

    /// Structural problems with this condition's filters.
    pub fn errors(&self) -> Vec<String> {
        match self {
            Self::PropertyData { operator, filters } => {
                let mut errors = filters.errors();
                if *operator == LogicalOperator::And {
                    errors.extend(filters.conflicting_price_bounds());
                }
                errors
            }
            Self::CampaignData { filters, .. } => filters.errors(),
            Self::EmailTracking { filters, .. } => filters.errors(),
            Self::EmailTemplates { filters, .. } => filters.errors(),
            Self::BuyerData { filters, .. } => filters.errors(),
        }
    }

    /// Narrow this condition's collection, leaving the others untouched.
    ///
    /// Returns the new set and the number of records left in the narrowed
    /// collection.
    pub fn apply(&self, data: &RecordSet, now: Timestamp) -> (RecordSet, usize) {
        let mut next = data.clone();
        let remaining = match self {
            Self::PropertyData { operator, filters } => {
                next.properties = narrow(&data.properties, filters, *operator, now);
                next.properties.len()
            }
            Self::CampaignData { operator, filters } => {
                next.campaigns = narrow(&data.campaigns, filters, *operator, now);
                next.campaigns.len()
            }
            Self::EmailTracking { operator, filters } => {
                next.buyers = narrow(&data.buyers, filters, *operator, now);
                next.buyers.len()
            }
            Self::EmailTemplates { operator, filters } => {
                next.templates = narrow(&data.templates, filters, *operator, now);
                next.templates.len()
            }
            Self::BuyerData { operator, filters } => {
                next.buyers = narrow(&data.buyers, filters, *operator, now);
                next.buyers.len()
            }
        };
        (next, remaining)
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Result of running the condition pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOutcome {
    /// Every condition left at least one record in its collection.
    Matched(RecordSet),
    /// The condition at `stopped_at` emptied its collection; the remaining
    /// conditions were skipped.
    NoMatches {
        stopped_at: usize,
        category: ConditionCategory,
    },
}

impl FilterOutcome {
    /// The matched set, or an empty one for [`FilterOutcome::NoMatches`].
    pub fn into_records(self) -> RecordSet {
        match self {
            Self::Matched(records) => records,
            Self::NoMatches { .. } => RecordSet::default(),
        }
    }
}

/// Apply `conditions` to `initial` sequentially, in list order.
///
/// Each stage narrows (never widens) one collection. Once a stage leaves its
/// collection empty the pipeline stops with [`FilterOutcome::NoMatches`].
pub fn apply_conditions(initial: RecordSet, conditions: &[Condition], now: Timestamp) -> FilterOutcome {
    conditions
        .iter()
        .enumerate()
        .try_fold(initial, |data, (index, condition)| {
            let (next, remaining) = condition.apply(&data, now);
            if remaining == 0 {
                Err(FilterOutcome::NoMatches {
                    stopped_at: index,
                    category: condition.category(),
                })
            } else {
                Ok(next)
            }
        })
        .map_or_else(|no_matches| no_matches, FilterOutcome::Matched)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
