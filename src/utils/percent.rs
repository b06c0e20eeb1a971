use bigdecimal::{BigDecimal, Zero};

/// 无法计算涨跌幅时的占位值
pub const ZERO_PERCENT: &str = "0.00%";

/// (current - base) / base * 100，base 必须为正
pub fn percent_change(base: &BigDecimal, current: &BigDecimal) -> Option<BigDecimal> {
    if *base <= BigDecimal::zero() {
        return None;
    }
    let diff = current - base;
    Some(diff * BigDecimal::from(100) / base.clone())
}

pub fn round2(value: &BigDecimal) -> BigDecimal {
    value.round(2).with_scale(2)
}

/// 带符号、两位小数：+25.00% / -20.00%，四舍五入后为 0 则不带符号
pub fn format_percent(value: &BigDecimal) -> String {
    let rounded = round2(value);
    if rounded.is_zero() {
        ZERO_PERCENT.to_string()
    } else if rounded < BigDecimal::zero() {
        format!("{}%", rounded)
    } else {
        format!("+{}%", rounded)
    }
}
