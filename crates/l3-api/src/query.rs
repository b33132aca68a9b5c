//! List queries: filtering, sorting, marker pagination and field projection
//!
//! Backends hand the full candidate set to [`ListQuery::apply`]; the query
//! works on the serialized form of each resource so the same engine serves
//! routers and floating IPs.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ops::Deref;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::L3Error;
use crate::models::ApiResource;
use crate::request::filter_response;

/// Attribute name to accepted values (an item matches when any value matches)
pub type Filters = BTreeMap<String, Vec<Value>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    fn reversed(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// Parameters of a list operation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub filters: Filters,
    pub fields: Option<Vec<String>>,
    pub sorts: Vec<(String, SortDirection)>,
    /// Page size; `None` or `Some(0)` means unlimited
    pub limit: Option<usize>,
    /// Id of the last item of the previous page
    pub marker: Option<Uuid>,
    /// Page backwards from the marker
    pub page_reverse: bool,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.entry(attribute.into()).or_default().push(value.into());
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn sort(mut self, attribute: impl Into<String>, direction: SortDirection) -> Self {
        self.sorts.push((attribute.into(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn marker(mut self, marker: Uuid) -> Self {
        self.marker = Some(marker);
        self
    }

    pub fn page_reverse(mut self, page_reverse: bool) -> Self {
        self.page_reverse = page_reverse;
        self
    }

    /// Filter, sort, paginate and wrap `items` for projection
    pub fn apply<T: ApiResource>(&self, items: Vec<T>) -> Result<Vec<Projected<T>>, L3Error> {
        let kind = T::KIND;
        let schema = kind.schema();
        let primary_key = schema.primary_key().unwrap_or("id");

        let mut sorts = self.sorts.clone();
        for (attribute, _) in &sorts {
            if !schema.get(attribute).is_some_and(|attr| attr.is_visible) {
                return Err(L3Error::BadRequest {
                    resource: kind.member(),
                    message: format!("Attribute '{}' cannot be used as a sort key", attribute),
                });
            }
        }
        if !sorts.iter().any(|(attribute, _)| attribute == primary_key) {
            sorts.push((primary_key.to_string(), SortDirection::Asc));
        }
        if self.page_reverse {
            for (_, direction) in &mut sorts {
                *direction = direction.reversed();
            }
        }

        let mut rows = Vec::with_capacity(items.len());
        for item in items {
            let serialized = to_map(&item)?;
            if matches_filters(&serialized, &self.filters, kind.schema()) {
                rows.push((serialized, item));
            }
        }

        rows.sort_by(|(a, _), (b, _)| compare_rows(a, b, &sorts));

        let start = match self.marker {
            Some(marker) => {
                let position = rows
                    .iter()
                    .position(|(_, item)| item.id() == marker)
                    .ok_or_else(|| kind.not_found(marker))?;
                position + 1
            }
            None => 0,
        };

        let mut page: Vec<Projected<T>> = rows
            .into_iter()
            .skip(start)
            .take(self.limit.filter(|limit| *limit > 0).unwrap_or(usize::MAX))
            .map(|(_, item)| Projected::new(item, self.fields.clone()))
            .collect();
        if self.page_reverse {
            page.reverse();
        }
        Ok(page)
    }
}

/// Whether a serialized resource satisfies every filter.
///
/// Filters on attributes unknown to the schema are ignored.
pub fn matches_filters(item: &Map<String, Value>, filters: &Filters, schema: &crate::schema::ResourceSchema) -> bool {
    filters.iter().all(|(attribute, accepted)| {
        if !schema.contains(attribute) {
            return true;
        }
        match item.get(attribute) {
            Some(value) => accepted.iter().any(|candidate| value_matches(value, candidate)),
            None => false,
        }
    })
}

fn value_matches(value: &Value, candidate: &Value) -> bool {
    if value == candidate {
        return true;
    }
    match (value, candidate) {
        (Value::String(s), Value::String(c)) => s == c,
        (Value::Bool(b), Value::String(c)) => c.eq_ignore_ascii_case(if *b { "true" } else { "false" }),
        (Value::Number(n), Value::String(c)) => n.to_string() == *c,
        _ => false,
    }
}

fn compare_rows(a: &Map<String, Value>, b: &Map<String, Value>, sorts: &[(String, SortDirection)]) -> Ordering {
    for (attribute, direction) in sorts {
        let ordering = compare_values(
            a.get(attribute).unwrap_or(&Value::Null),
            b.get(attribute).unwrap_or(&Value::Null),
        );
        let ordering = match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values: null < bool < number < string < array < object
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            a.to_string().cmp(&b.to_string())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn to_map<T: Serialize>(item: &T) -> Result<Map<String, Value>, L3Error> {
    match serde_json::to_value(item) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(L3Error::Internal(format!("resource serialized to non-object: {}", other))),
        Err(e) => Err(L3Error::Internal(format!("failed to serialize resource: {}", e))),
    }
}

/// A resource together with the attributes the caller asked for.
///
/// Dereferences to the full typed resource; serializes to the visible,
/// requested attributes only.
#[derive(Debug, Clone, PartialEq)]
pub struct Projected<T> {
    item: T,
    fields: Option<Vec<String>>,
}

impl<T: ApiResource> Projected<T> {
    pub fn new(item: T, fields: Option<Vec<String>>) -> Self {
        Self { item, fields }
    }

    /// All visible attributes
    pub fn full(item: T) -> Self {
        Self { item, fields: None }
    }

    pub fn fields(&self) -> Option<&[String]> {
        self.fields.as_deref()
    }

    pub fn into_inner(self) -> T {
        self.item
    }

    /// Response body attributes
    pub fn to_map(&self) -> Result<Map<String, Value>, L3Error> {
        let map = to_map(&self.item)?;
        Ok(filter_response(T::KIND, &map, self.fields()))
    }
}

impl<T> Deref for Projected<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.item
    }
}

impl<T: ApiResource> Serialize for Projected<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_map()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}
