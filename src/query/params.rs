//! Query-string parsing into a typed list query.

use crate::config::EngineConfig;
use crate::error::AppError;
use percent_encoding::percent_decode_str;
use serde_json::Value;

/// Parameters with engine meaning; never treated as filters.
pub const RESERVED_PARAMS: &[&str] = &[
    "page", "pageSize", "limit", "offset", "sort", "sortBy", "order", "orderBy", "fields", "select",
    "q", "search", "query", "include",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
    In,
}

impl std::str::FromStr for FilterOp {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eq" => Ok(FilterOp::Eq),
            "ne" => Ok(FilterOp::Ne),
            "gt" => Ok(FilterOp::Gt),
            "lt" => Ok(FilterOp::Lt),
            "gte" => Ok(FilterOp::Gte),
            "lte" => Ok(FilterOp::Lte),
            "in" => Ok(FilterOp::In),
            other => Err(AppError::BadRequest(format!(
                "Unknown filter operator '{}' (expected gt, lt, gte, lte, ne, in)",
                other
            ))),
        }
    }
}

/// One condition from the query string. `In` carries a JSON array of strings.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedFilter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListQuery {
    pub filters: Vec<ParsedFilter>,
    pub search: Option<String>,
    pub sort: Option<SortSpec>,
    /// 1-indexed.
    pub page: usize,
    pub page_size: usize,
    /// Explicit offset; overrides the page-derived one.
    pub offset: Option<usize>,
    pub fields: Option<Vec<String>>,
    pub include: Vec<String>,
}

/// Split a raw query string into decoded key/value pairs, keeping order and duplicates.
pub fn parse_query_string(raw: Option<&str>) -> Vec<(String, String)> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(k), decode_component(v))
        })
        .collect()
}

fn decode_component(s: &str) -> String {
    let spaced = s.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

/// Comma-separated list with blanks dropped.
fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// `field[op]` → (field, Some(op)); plain `field` → (field, None).
fn split_bracket(key: &str) -> (&str, Option<&str>) {
    if let Some(open) = key.find('[') {
        if key.ends_with(']') && open > 0 {
            return (&key[..open], Some(&key[open + 1..key.len() - 1]));
        }
    }
    (key, None)
}

fn parse_positive(name: &str, raw: &str) -> Result<usize, AppError> {
    let n: i64 = raw
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid {} parameter: '{}'", name, raw)))?;
    if n < 1 {
        return Err(AppError::BadRequest(format!("{} must be at least 1", name)));
    }
    Ok(n as usize)
}

pub fn parse_filter(key: &str, raw: &str) -> Result<ParsedFilter, AppError> {
    let (field, op) = split_bracket(key);
    let op = match op {
        Some(op) => op.parse()?,
        None => FilterOp::Eq,
    };
    let value = match op {
        FilterOp::In => Value::Array(split_list(raw).into_iter().map(Value::String).collect()),
        FilterOp::Eq | FilterOp::Ne => match raw {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::String(raw.to_string()),
        },
        _ => Value::String(raw.to_string()),
    };
    Ok(ParsedFilter {
        field: field.to_string(),
        op,
        value,
    })
}

impl ListQuery {
    pub fn parse(pairs: &[(String, String)], config: &EngineConfig) -> Result<Self, AppError> {
        let mut query = ListQuery {
            filters: Vec::new(),
            search: None,
            sort: None,
            page: 1,
            page_size: config.default_page_size,
            offset: None,
            fields: None,
            include: Vec::new(),
        };
        let mut sort_field: Option<String> = None;
        let mut order: Option<SortDirection> = None;

        for (k, v) in pairs {
            match k.as_str() {
                "page" => query.page = parse_positive("page", v)?,
                "pageSize" | "limit" => query.page_size = parse_positive("pageSize", v)?,
                "offset" => {
                    let n: usize = v.trim().parse().map_err(|_| {
                        AppError::BadRequest(format!("Invalid offset parameter: '{}'", v))
                    })?;
                    query.offset = Some(n);
                }
                "sort" | "sortBy" | "orderBy" => {
                    if !v.trim().is_empty() {
                        sort_field = Some(v.trim().to_string());
                    }
                }
                "order" => {
                    order = Some(if v.eq_ignore_ascii_case("desc") {
                        SortDirection::Desc
                    } else {
                        SortDirection::Asc
                    });
                }
                "fields" | "select" => query.fields = Some(split_list(v)),
                "q" | "search" | "query" => {
                    if !v.trim().is_empty() {
                        query.search = Some(v.trim().to_string());
                    }
                }
                "include" => query.include.extend(split_list(v)),
                _ => query.filters.push(parse_filter(k, v)?),
            }
        }

        query.page_size = query.page_size.min(config.max_page_size);
        query.sort = sort_field.map(|raw| sort_spec(&raw, order));
        Ok(query)
    }

    /// Effective offset into the filtered set.
    pub fn effective_offset(&self) -> usize {
        self.offset
            .unwrap_or_else(|| (self.page - 1).saturating_mul(self.page_size))
    }

    /// Page reported back: derived from `offset` when one was given.
    pub fn reported_page(&self) -> usize {
        match self.offset {
            Some(offset) => offset / self.page_size + 1,
            None => self.page,
        }
    }
}

/// `-field` and `field:desc` shorthands; an explicit `order` wins.
fn sort_spec(raw: &str, order: Option<SortDirection>) -> SortSpec {
    let (field, implied) = if let Some(rest) = raw.strip_prefix('-') {
        (rest, SortDirection::Desc)
    } else if let Some((field, dir)) = raw.rsplit_once(':') {
        let dir = if dir.eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        (field, dir)
    } else {
        (raw, SortDirection::Asc)
    };
    SortSpec {
        field: field.to_string(),
        direction: order.unwrap_or(implied),
    }
}

/// Projection and expansion requested for a single-record read.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordView {
    pub fields: Option<Vec<String>>,
    pub include: Vec<String>,
}

impl RecordView {
    /// Only `fields`/`select` and `include` are read; everything else is ignored.
    pub fn parse(pairs: &[(String, String)]) -> Self {
        let mut view = RecordView::default();
        for (k, v) in pairs {
            match k.as_str() {
                "fields" | "select" => view.fields = Some(split_list(v)),
                "include" => view.include.extend(split_list(v)),
                _ => {}
            }
        }
        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pairs(raw: &str) -> Vec<(String, String)> {
        parse_query_string(Some(raw))
    }

    fn parse(raw: &str) -> Result<ListQuery, AppError> {
        ListQuery::parse(&pairs(raw), &EngineConfig::default())
    }

    #[test]
    fn query_string_decoding() {
        assert_eq!(
            pairs("priority%5Bin%5D=high,low&title=a+b&flag"),
            vec![
                ("priority[in]".to_string(), "high,low".to_string()),
                ("title".to_string(), "a b".to_string()),
                ("flag".to_string(), String::new()),
            ]
        );
        assert!(parse_query_string(None).is_empty());
    }

    #[test]
    fn reserved_params_are_not_filters() {
        let q = parse("page=2&pageSize=10&sort=id&order=desc&fields=id,title&q=milk&include=owner&done=true").unwrap();
        assert_eq!(q.page, 2);
        assert_eq!(q.page_size, 10);
        assert_eq!(
            q.sort,
            Some(SortSpec {
                field: "id".into(),
                direction: SortDirection::Desc
            })
        );
        assert_eq!(q.fields, Some(vec!["id".to_string(), "title".to_string()]));
        assert_eq!(q.search.as_deref(), Some("milk"));
        assert_eq!(q.include, vec!["owner"]);
        assert_eq!(
            q.filters,
            vec![ParsedFilter {
                field: "done".into(),
                op: FilterOp::Eq,
                value: json!(true)
            }]
        );
    }

    #[test]
    fn every_reserved_name_is_skipped() {
        let raw: Vec<(String, String)> = RESERVED_PARAMS
            .iter()
            .map(|k| (k.to_string(), "1".to_string()))
            .collect();
        let q = ListQuery::parse(&raw, &EngineConfig::default()).unwrap();
        assert!(q.filters.is_empty());
    }

    #[test]
    fn bracket_operators() {
        let q = parse("priority[in]=high, low&count[gte]=3&status[ne]=false").unwrap();
        assert_eq!(q.filters[0].op, FilterOp::In);
        assert_eq!(q.filters[0].value, json!(["high", "low"]));
        assert_eq!(q.filters[1].op, FilterOp::Gte);
        assert_eq!(q.filters[1].value, json!("3"));
        assert_eq!(q.filters[2].value, json!(false));
        assert!(matches!(parse("a[like]=x"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn pagination_bounds() {
        assert!(matches!(parse("page=0"), Err(AppError::BadRequest(_))));
        assert!(matches!(parse("pageSize=0"), Err(AppError::BadRequest(_))));
        assert!(matches!(parse("page=abc"), Err(AppError::BadRequest(_))));
        assert_eq!(parse("pageSize=5000").unwrap().page_size, 1000);
        assert_eq!(parse("limit=7").unwrap().page_size, 7);
    }

    #[test]
    fn offset_overrides_page() {
        let q = parse("page=5&pageSize=10&offset=25").unwrap();
        assert_eq!(q.effective_offset(), 25);
        assert_eq!(q.reported_page(), 3);
        let q = parse("page=3&pageSize=10").unwrap();
        assert_eq!(q.effective_offset(), 20);
        assert_eq!(q.reported_page(), 3);
    }

    #[test]
    fn sort_shorthands() {
        let q = parse("sort=-createdAt").unwrap();
        assert_eq!(q.sort.unwrap().direction, SortDirection::Desc);
        let q = parse("sortBy=title:desc&order=asc").unwrap();
        let sort = q.sort.unwrap();
        assert_eq!(sort.field, "title");
        assert_eq!(sort.direction, SortDirection::Asc);
    }

    #[test]
    fn record_view_ignores_list_params() {
        let view = RecordView::parse(&pairs("select=id,title&include=owner&page=0&done=true"));
        assert_eq!(view.fields, Some(vec!["id".to_string(), "title".to_string()]));
        assert_eq!(view.include, vec!["owner"]);
    }
}
