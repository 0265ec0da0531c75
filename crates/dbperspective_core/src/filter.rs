//! Filter-string parsing.
//!
//! A filter is the text a user types into a column's filter box. It is parsed
//! against the column's [`FilterType`] into a [`Condition`] whose filtered
//! column is an [`Expression::Placeholder`]; the owning tree node rewrites the
//! placeholder to its concrete column.
//!
//! Grammar (terms separated by `,` are OR-ed):
//!
//! - all types: `NULL`, `NOT NULL`
//! - number: `5`, `=5`, `<>5`, `!=5`, `>5`, `>=5`, `<5`, `<=5`
//! - string: `abc` (contains), `=abc`, `<>abc`, `!=abc`, `^abc` (starts with),
//!   `$abc` (ends with), `!~abc` (does not contain), `EMPTY`, `NOT EMPTY`;
//!   values may be single- or double-quoted
//! - logical: `TRUE`, `FALSE`, `1`, `0`, `YES`, `NO`
//! - datetime: `YYYY-MM-DD`, `YYYY-MM-DD HH:MM[:SS]` or `HH:MM[:SS]` with an
//!   optional comparison operator; impossible dates are rejected

use crate::error::PerspectiveError;
use crate::sql_tree::{CompareOp, Condition, Expression};
use crate::value::Value;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{is_not, tag, tag_no_case, take_until, take_while1},
    character::complete::{char, digit1, multispace0, multispace1},
    combinator::{all_consuming, eof, map, map_res, opt, peek, recognize, value},
    multi::separated_list1,
    sequence::{delimited, pair, preceded, terminated},
};
use serde::{Deserialize, Serialize};

/// Value domain used to interpret a filter string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    String,
    Number,
    Logical,
    Datetime,
}

const NUMBER_TYPES: &[&str] = &[
    "int",
    "integer",
    "tinyint",
    "smallint",
    "mediumint",
    "bigint",
    "int2",
    "int4",
    "int8",
    "serial",
    "smallserial",
    "bigserial",
    "float",
    "float4",
    "float8",
    "double",
    "real",
    "decimal",
    "numeric",
    "number",
    "money",
    "smallmoney",
];

const DATETIME_TYPES: &[&str] = &[
    "date",
    "time",
    "timetz",
    "datetime",
    "datetime2",
    "smalldatetime",
    "datetimeoffset",
    "timestamp",
    "timestamptz",
    "year",
];

/// Classifies a column data type (e.g. `varchar(255)`, `int unsigned`).
pub fn filter_type_for(type_name: &str) -> FilterType {
    let lower = type_name.trim().to_lowercase();
    let base = lower
        .split(['(', ' '])
        .next()
        .unwrap_or_default();

    if base == "bool" || base == "boolean" || base == "bit" {
        FilterType::Logical
    } else if NUMBER_TYPES.contains(&base) {
        FilterType::Number
    } else if DATETIME_TYPES.contains(&base) {
        FilterType::Datetime
    } else {
        FilterType::String
    }
}

/// Classifier and parser pair consumed by tree nodes.
pub trait FilterParser {
    fn filter_type(&self, type_name: &str) -> FilterType {
        filter_type_for(type_name)
    }

    /// Parses `filter` into a placeholder-based condition.
    ///
    /// Blank filters produce `Ok(None)`.
    fn parse_filter(
        &self,
        filter: &str,
        filter_type: FilterType,
    ) -> Result<Option<Condition>, PerspectiveError>;
}

/// Parser for the grammar documented at module level.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFilterParser;

impl FilterParser for DefaultFilterParser {
    fn parse_filter(
        &self,
        filter: &str,
        filter_type: FilterType,
    ) -> Result<Option<Condition>, PerspectiveError> {
        parse_filter(filter, filter_type)
    }
}

pub fn parse_filter(
    filter: &str,
    filter_type: FilterType,
) -> Result<Option<Condition>, PerspectiveError> {
    if filter.trim().is_empty() {
        return Ok(None);
    }

    let result =
        all_consuming(separated_list1(char(','), ws(term(filter_type)))).parse(filter);

    match result {
        Ok((_, terms)) => Ok(Condition::or_all(terms)),
        Err(e) => Err(PerspectiveError::InvalidFilter {
            filter: filter.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn term(filter_type: FilterType) -> impl Fn(&str) -> IResult<&str, Condition> {
    move |input| match filter_type {
        FilterType::String => string_term(input),
        FilterType::Number => number_term(input),
        FilterType::Logical => logical_term(input),
        FilterType::Datetime => datetime_term(input),
    }
}

fn ws<'a, O, F>(inner: F) -> impl Parser<&'a str, Output = O, Error = nom::error::Error<&'a str>>
where
    F: Parser<&'a str, Output = O, Error = nom::error::Error<&'a str>>,
{
    delimited(multispace0, inner, multispace0)
}

fn placeholder_compare(operator: CompareOp, value: Value) -> Condition {
    Condition::binary(operator, Expression::Placeholder, Expression::value(value))
}

/// A keyword only matches when it is the whole term.
fn keyword<'a>(word: &'static str) -> impl Parser<&'a str, Output = &'a str, Error = nom::error::Error<&'a str>> {
    terminated(
        tag_no_case(word),
        peek(pair(multispace0, alt((eof, tag(","))))),
    )
}

fn null_term(input: &str) -> IResult<&str, Condition> {
    alt((
        map(
            (tag_no_case("NOT"), multispace1, keyword("NULL")),
            |_| Condition::IsNotNull {
                expr: Expression::Placeholder,
            },
        ),
        map(keyword("NULL"), |_| Condition::IsNull {
            expr: Expression::Placeholder,
        }),
    ))
    .parse(input)
}

fn compare_op(input: &str) -> IResult<&str, CompareOp> {
    alt((
        value(CompareOp::GtEq, tag(">=")),
        value(CompareOp::LtEq, tag("<=")),
        value(CompareOp::NotEq, tag("<>")),
        value(CompareOp::NotEq, tag("!=")),
        value(CompareOp::Gt, tag(">")),
        value(CompareOp::Lt, tag("<")),
        value(CompareOp::Eq, tag("=")),
    ))
    .parse(input)
}

fn numeric_literal(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        opt(char('-')),
        alt((
            recognize((digit1, char('.'), digit1)),
            recognize(pair(char('.'), digit1)),
            digit1,
        )),
    ))
    .parse(input)
}

fn number_value(input: &str) -> IResult<&str, Value> {
    map(numeric_literal, |literal: &str| match literal.parse::<i64>() {
        Ok(i) => Value::Int(i),
        Err(_) => literal
            .parse::<f64>()
            .map(Value::Float)
            .unwrap_or_else(|_| Value::Decimal(literal.to_string())),
    })
    .parse(input)
}

fn number_term(input: &str) -> IResult<&str, Condition> {
    alt((
        null_term,
        map(
            pair(opt(ws(compare_op)), number_value),
            |(operator, v)| placeholder_compare(operator.unwrap_or(CompareOp::Eq), v),
        ),
    ))
    .parse(input)
}

fn quoted(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('\''), take_until("'"), char('\'')),
        delimited(char('"'), take_until("\""), char('"')),
    ))
    .parse(input)
}

/// Quoted text, or everything up to the next comma with trailing spaces
/// trimmed.
fn text_value(input: &str) -> IResult<&str, String> {
    alt((
        map(quoted, str::to_string),
        map(is_not(","), |s: &str| s.trim_end().to_string()),
    ))
    .parse(input)
}

fn like(pattern: String) -> Condition {
    Condition::Like {
        left: Expression::Placeholder,
        right: Expression::value(Value::Text(pattern)),
    }
}

fn string_term(input: &str) -> IResult<&str, Condition> {
    alt((
        null_term,
        map(
            (tag_no_case("NOT"), multispace1, keyword("EMPTY")),
            |_| placeholder_compare(CompareOp::NotEq, Value::Text(String::new())),
        ),
        map(keyword("EMPTY"), |_| {
            placeholder_compare(CompareOp::Eq, Value::Text(String::new()))
        }),
        map(preceded(tag("!~"), text_value), |text| Condition::NotLike {
            left: Expression::Placeholder,
            right: Expression::value(Value::Text(format!("%{}%", text))),
        }),
        map(preceded(tag("^"), text_value), |text| like(format!("{}%", text))),
        map(preceded(tag("$"), text_value), |text| like(format!("%{}", text))),
        map(pair(compare_op, text_value), |(operator, text)| {
            placeholder_compare(operator, Value::Text(text))
        }),
        map(text_value, |text| like(format!("%{}%", text))),
    ))
    .parse(input)
}

fn logical_term(input: &str) -> IResult<&str, Condition> {
    alt((
        null_term,
        map(
            alt((
                value(true, keyword("TRUE")),
                value(true, keyword("YES")),
                value(true, keyword("1")),
                value(false, keyword("FALSE")),
                value(false, keyword("NO")),
                value(false, keyword("0")),
            )),
            |b| placeholder_compare(CompareOp::Eq, Value::Bool(b)),
        ),
    ))
    .parse(input)
}

fn datetime_literal(input: &str) -> IResult<&str, &str> {
    alt((
        quoted,
        take_while1(|c: char| c.is_ascii_digit() || matches!(c, '-' | ':' | '.' | 'T' | ' ')),
    ))
    .parse(input)
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M:%S%.f", "%H:%M"];

/// Date, timestamp (read as UTC) or time of day.
fn datetime_value(literal: &str) -> Result<Value, String> {
    let literal = literal.trim();

    if let Ok(date) = NaiveDate::parse_from_str(literal, "%Y-%m-%d") {
        return Ok(Value::Date(date));
    }

    if let Some(datetime) = DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(literal, format).ok())
    {
        return Ok(Value::DateTime(datetime.and_utc()));
    }

    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(literal, format).ok())
        .map(Value::Time)
        .ok_or_else(|| format!("'{}' is not a date, timestamp or time", literal))
}

fn datetime_term(input: &str) -> IResult<&str, Condition> {
    alt((
        null_term,
        map(
            pair(opt(ws(compare_op)), map_res(datetime_literal, datetime_value)),
            |(operator, v)| placeholder_compare(operator.unwrap_or(CompareOp::Eq), v),
        ),
    ))
    .parse(input)
}
