//! # 类型转换工具
//!
//! 解析函数全部返回 `Result`，解析出的 0 与解析失败可以区分。

use std::collections::HashMap;
use std::str::FromStr;

use serde_json::Value;

use crate::error::{HtxpError, Result};

/// 四舍五入到整数，0.5 远离零
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn round_half_away(value: f64) -> i64 {
    value.round() as i64
}

fn parse_trimmed<T>(input: &str, kind: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    input
        .trim()
        .parse()
        .map_err(|e| HtxpError::parse_with_source(format!("无法将 {input:?} 解析为 {kind}"), e))
}

pub fn parse_f64(input: &str) -> Result<f64> {
    parse_trimmed(input, "f64")
}

pub fn parse_i64(input: &str) -> Result<i64> {
    parse_trimmed(input, "i64")
}

pub fn parse_u64(input: &str) -> Result<u64> {
    parse_trimmed(input, "u64")
}

/// 解析 `a=1&b=2` 形式的查询串
///
/// 键和值都做 URL 解码，不含 `=` 的片段被跳过，重复键以后者为准。
#[must_use]
pub fn parse_query_map(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| (decode_component(key), decode_component(value)))
        .collect()
}

fn decode_component(raw: &str) -> String {
    let plus_decoded = raw.replace('+', " ");
    urlencoding::decode(&plus_decoded).map_or_else(|_| plus_decoded.clone(), std::borrow::Cow::into_owned)
}

/// 从 JSON 对象中读取 `userId`，支持数字和数字字符串
pub fn user_id_from_json(data: &Value) -> Result<u64> {
    let value = data
        .get("userId")
        .ok_or_else(|| HtxpError::parse("userId not found in the message"))?;

    match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(float_to_u64))
            .ok_or_else(|| HtxpError::parse(format!("userId 不是非负整数: {number}"))),
        Value::String(text) => parse_u64(text),
        other => Err(HtxpError::parse(format!("unsupported type for userId: {other}"))),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
const fn float_to_u64(value: f64) -> u64 {
    value as u64
}
