//! 내용 해시.
//!
//! 레코드의 의미 있는 필드만 `|`로 이어 SHA-256을 구하고 앞 16자리(hex)만 사용합니다.
//! 저장된 해시와 다시 계산한 해시가 같으면 내용이 바뀌지 않은 것으로 봅니다.

use sha2::{Digest, Sha256};

/// 해시 길이 (hex 문자 수).
pub const CONTENT_HASH_LEN: usize = 16;

/// 필드 목록으로 내용 해시를 계산합니다.
pub fn content_hash(parts: &[&str]) -> String {
    let joined = parts.join("|");
    let digest = Sha256::digest(joined.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(CONTENT_HASH_LEN);
    hex
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_value() {
        let hash = content_hash(&["AKSHARE", "BK0818", "人工智能"]);
        assert_eq!(hash, "af085374ffe48bcc");
        assert_eq!(
            content_hash(&["AKSHARE", "000001.SZ", "000001"]),
            "3e4726982271ff9e"
        );
    }

    #[test]
    fn test_field_boundaries_matter() {
        assert_ne!(content_hash(&["a", "bc"]), content_hash(&["ab", "c"]));
    }

    proptest! {
        #[test]
        fn prop_deterministic(a in ".*", b in ".*") {
            prop_assert_eq!(content_hash(&[&a, &b]), content_hash(&[&a, &b]));
        }

        #[test]
        fn prop_name_change_changes_hash(code in "[A-Z]{2}[0-9]{4}", name in "[a-z]{1,8}") {
            let changed = format!("{}x", name);
            prop_assert_ne!(
                content_hash(&["AKSHARE", &code, &name]),
                content_hash(&["AKSHARE", &code, &changed])
            );
        }
    }
}
