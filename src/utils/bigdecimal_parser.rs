use bigdecimal::{BigDecimal, Zero};
use std::str::FromStr;

/// 解析数据库以文本形式返回的 NUMERIC
pub fn parse_decimal(raw: &str) -> Option<BigDecimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    BigDecimal::from_str(trimmed).ok()
}

/// 仅接受严格大于 0 的价格
pub fn parse_positive(raw: &str) -> Option<BigDecimal> {
    parse_decimal(raw).filter(|v| *v > BigDecimal::zero())
}

/// 行情接口返回 f64，落库前转换为 BigDecimal
pub fn decimal_from_f64(value: f64) -> Option<BigDecimal> {
    if !value.is_finite() {
        return None;
    }
    BigDecimal::from_str(&value.to_string()).ok()
}

/// 最多 max_scale 位小数，去掉多余的尾随 0，但至少保留 min_scale 位
pub fn format_decimal(value: &BigDecimal, max_scale: i64, min_scale: usize) -> String {
    let text = value.round(max_scale).with_scale(max_scale).to_string();
    let Some(dot) = text.find('.') else {
        return text;
    };
    let keep = dot + 1 + min_scale;
    let end = text.trim_end_matches('0').len().max(keep).min(text.len());
    text[..end].trim_end_matches('.').to_string()
}
