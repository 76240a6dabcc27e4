//! Per-topic delivery filters.
//!
//! A filter is resolved once when the registry is built and is then looked up
//! by topic name at broadcast time. It sees the subscriber's parameters, the
//! payload being published and the payload last delivered to that subscriber.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::broker::topic::Params;
use crate::config::{FilterKind, FilterSettings};
use crate::utils::{PubSubError, Result};

pub trait TopicFilter: Send + Sync + fmt::Debug {
    /// Whether `data` should be delivered to a subscriber with `params`.
    /// `last` is the payload most recently delivered to that subscriber.
    fn admit(&self, params: &Params, data: &Value, last: Option<&Value>) -> bool;

    /// Reshape `data` for one subscriber. Identity unless overridden.
    fn transform<'a>(&self, _params: &Params, data: Cow<'a, Value>) -> Cow<'a, Value> {
        data
    }
}

/// Build the filter described by one `[[registry.topics]].filters` entry.
pub fn build(settings: &FilterSettings) -> Result<Arc<dyn TopicFilter>> {
    let filter: Arc<dyn TopicFilter> = match settings.kind {
        FilterKind::Threshold => Arc::new(ThresholdFilter::new(settings.field.clone())),
        FilterKind::Match => {
            let field = settings.field.clone().ok_or_else(|| {
                PubSubError::Config("match filter requires a `field`".to_string())
            })?;
            Arc::new(MatchFilter::new(field))
        }
        FilterKind::Fields => Arc::new(FieldsFilter),
    };
    Ok(filter)
}

/// Suppresses a delivery when the watched number moved less than the
/// subscriber's `threshold` since the last delivery.
#[derive(Debug, Clone, Default)]
pub struct ThresholdFilter {
    field: Option<String>,
}

impl ThresholdFilter {
    pub const PARAM: &'static str = "threshold";

    /// `field` names the payload key holding the number. `None` means the
    /// payload itself is the number.
    pub fn new(field: Option<String>) -> Self {
        Self { field }
    }

    fn read(&self, value: &Value) -> Option<f64> {
        match &self.field {
            Some(field) => value.get(field).and_then(Value::as_f64),
            None => value.as_f64(),
        }
    }
}

impl TopicFilter for ThresholdFilter {
    fn admit(&self, params: &Params, data: &Value, last: Option<&Value>) -> bool {
        let Some(threshold) = params.get(Self::PARAM).and_then(Value::as_f64) else {
            return true;
        };
        let Some(last) = last else {
            return true;
        };
        match (self.read(data), self.read(last)) {
            (Some(new), Some(old)) => (new - old).abs() >= threshold,
            _ => true,
        }
    }
}

/// Delivers only payloads whose `field` equals the subscriber's value for the
/// same key, e.g. `{"device": "fan0"}`.
#[derive(Debug, Clone)]
pub struct MatchFilter {
    field: String,
}

impl MatchFilter {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }
}

impl TopicFilter for MatchFilter {
    fn admit(&self, params: &Params, data: &Value, _last: Option<&Value>) -> bool {
        match params.get(&self.field) {
            Some(wanted) => data.get(&self.field) == Some(wanted),
            None => true,
        }
    }
}

/// Projects object payloads onto the keys listed in the `fields` parameter.
#[derive(Debug, Clone, Default)]
pub struct FieldsFilter;

impl FieldsFilter {
    pub const PARAM: &'static str = "fields";
}

impl TopicFilter for FieldsFilter {
    fn admit(&self, _params: &Params, _data: &Value, _last: Option<&Value>) -> bool {
        true
    }

    fn transform<'a>(&self, params: &Params, data: Cow<'a, Value>) -> Cow<'a, Value> {
        let (Some(Value::Array(fields)), Value::Object(object)) =
            (params.get(Self::PARAM), &*data)
        else {
            return data;
        };

        let projected: Map<String, Value> = fields
            .iter()
            .filter_map(Value::as_str)
            .filter_map(|key| object.get(key).map(|v| (key.to_string(), v.clone())))
            .collect();
        Cow::Owned(Value::Object(projected))
    }
}

/// Several filters on one topic. All must admit; transforms run in order.
#[derive(Debug, Clone)]
pub struct FilterChain(Vec<Arc<dyn TopicFilter>>);

impl FilterChain {
    pub fn new(filters: Vec<Arc<dyn TopicFilter>>) -> Self {
        Self(filters)
    }
}

impl TopicFilter for FilterChain {
    fn admit(&self, params: &Params, data: &Value, last: Option<&Value>) -> bool {
        self.0.iter().all(|f| f.admit(params, data, last))
    }

    fn transform<'a>(&self, params: &Params, data: Cow<'a, Value>) -> Cow<'a, Value> {
        self.0
            .iter()
            .fold(data, |data, filter| filter.transform(params, data))
    }
}
