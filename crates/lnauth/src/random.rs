//! 安全随机源
//!
//! k1 必须来自操作系统 CSPRNG。取不到随机数时直接报错，不降级到普通 PRNG。

use crate::error::{LnAuthError, LnAuthResult};
use rand::RngCore;
use rand::rngs::OsRng;

/// k1 最少随机字节数
pub const NONCE_BYTES: usize = 32;

/// 密码学安全随机源
pub trait RandomSource: Send + Sync {
    /// 返回 `len` 个随机字节
    fn bytes(&self, len: usize) -> LnAuthResult<Vec<u8>>;
}

/// 操作系统随机源
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn bytes(&self, len: usize) -> LnAuthResult<Vec<u8>> {
        let mut buf = vec![0u8; len];
        OsRng
            .try_fill_bytes(&mut buf)
            .map_err(|e| LnAuthError::Randomness(e.to_string()))?;
        Ok(buf)
    }
}

/// 生成 hex 编码的 k1
pub fn generate_nonce(source: &dyn RandomSource) -> LnAuthResult<String> {
    let bytes = source.bytes(NONCE_BYTES)?;
    if bytes.len() < NONCE_BYTES {
        return Err(LnAuthError::Randomness(format!(
            "random source returned {} bytes, need {NONCE_BYTES}",
            bytes.len()
        )));
    }
    Ok(hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenSource;

    impl RandomSource for BrokenSource {
        fn bytes(&self, _len: usize) -> LnAuthResult<Vec<u8>> {
            Err(LnAuthError::Randomness("no entropy".into()))
        }
    }

    struct ShortSource;

    impl RandomSource for ShortSource {
        fn bytes(&self, _len: usize) -> LnAuthResult<Vec<u8>> {
            Ok(vec![7u8; 8])
        }
    }

    #[test]
    fn test_nonce_is_64_hex_chars() {
        let nonce = generate_nonce(&OsRandom).unwrap();
        assert_eq!(nonce.len(), NONCE_BYTES * 2);
        assert!(nonce.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(nonce, generate_nonce(&OsRandom).unwrap());
    }

    #[test]
    fn test_broken_source_propagates() {
        assert!(matches!(
            generate_nonce(&BrokenSource),
            Err(LnAuthError::Randomness(_))
        ));
        assert!(matches!(
            generate_nonce(&ShortSource),
            Err(LnAuthError::Randomness(_))
        ));
    }
}
