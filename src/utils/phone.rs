//! 手机号规范化（巴西号码）
//!
//! 只保留数字；10 或 11 位的本地号码补上国家码 55；
//! 结果必须是 12 或 13 位，否则视为无效。

const COUNTRY_CODE: &str = "55";

pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    let normalized = match digits.len() {
        10 | 11 => format!("{COUNTRY_CODE}{digits}"),
        _ => digits,
    };

    match normalized.len() {
        12 | 13 => Some(normalized),
        _ => None,
    }
}
