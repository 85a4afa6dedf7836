use rand::Rng;

const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// 生成不含易混淆字符的随机码
pub fn generate_random_code(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}

/// 学籍号：`{学年}{6 位随机码}`，例如 `2025K7Q2MX`
pub fn generate_registration_number(year: i32) -> String {
    format!("{year}{}", generate_random_code(6))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_charset() {
        let code = generate_random_code(32);
        assert_eq!(code.len(), 32);
        assert!(code.bytes().all(|b| CHARSET.contains(&b)));
    }

    #[test]
    fn test_registration_number_format() {
        let number = generate_registration_number(2025);
        assert!(number.starts_with("2025"));
        assert_eq!(number.len(), 10);
    }
}
