//! SimBrief operational flight plan source.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use super::{FlightPlan, FlightPlanError, FlightPlanSource, FuelUnit};

/// Endpoint returning the latest plan of a user as JSON.
pub const SIMBRIEF_FETCH_URL: &str = "https://www.simbrief.com/api/xml.fetcher.php";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Fetches the latest plan of one SimBrief user.
pub struct SimbriefSource {
    client: reqwest::Client,
    url: String,
    user_id: String,
}

impl SimbriefSource {
    pub fn new(user_id: impl Into<String>) -> Result<Self, FlightPlanError> {
        Self::with_url(SIMBRIEF_FETCH_URL, user_id)
    }

    /// Use a different endpoint (mirrors, tests).
    pub fn with_url(url: &str, user_id: impl Into<String>) -> Result<Self, FlightPlanError> {
        let user_id = user_id.into();
        if user_id.trim().is_empty() {
            return Err(FlightPlanError::NotConfigured);
        }
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FlightPlanError::Http(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.to_string(),
            user_id,
        })
    }
}

#[async_trait]
impl FlightPlanSource for SimbriefSource {
    async fn fetch(&self) -> Result<FlightPlan, FlightPlanError> {
        debug!(user = %self.user_id, "Fetching SimBrief plan");
        let response = self
            .client
            .get(&self.url)
            .query(&[("userid", self.user_id.as_str()), ("json", "1")])
            .send()
            .await
            .map_err(|e| FlightPlanError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FlightPlanError::Status(status.as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| FlightPlanError::Format(e.to_string()))?;
        let plan = parse_ofp(&body)?;
        info!(
            id = plan.id.as_deref().unwrap_or("-"),
            fuel = plan.planned_fuel,
            units = %plan.units,
            passengers = plan.passengers,
            "Flight plan loaded"
        );
        Ok(plan)
    }
}

/// Extract the plan fields from an OFP document.
///
/// SimBrief encodes every scalar as a string.
pub(crate) fn parse_ofp(ofp: &Value) -> Result<FlightPlan, FlightPlanError> {
    let id = field(ofp, "/params/request_id").map(str::to_string);

    let units = match field(ofp, "/params/units") {
        Some(units) => units.parse::<FuelUnit>().map_err(FlightPlanError::Format)?,
        None => FuelUnit::Kilograms,
    };

    let planned_fuel = number(ofp, "/fuel/plan_ramp")?;
    let passengers = number(ofp, "/weights/pax_count")?.round() as i64;

    Ok(FlightPlan {
        id,
        units,
        planned_fuel,
        passengers,
    })
}

fn field<'a>(ofp: &'a Value, pointer: &str) -> Option<&'a str> {
    ofp.pointer(pointer).and_then(Value::as_str)
}

fn number(ofp: &Value, pointer: &str) -> Result<f64, FlightPlanError> {
    let raw = ofp
        .pointer(pointer)
        .ok_or_else(|| FlightPlanError::Format(format!("missing {}", pointer)))?;
    let parsed = match raw {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };
    parsed
        .filter(|n| n.is_finite())
        .ok_or_else(|| FlightPlanError::Format(format!("{} is not a number: {}", pointer, raw)))
}
