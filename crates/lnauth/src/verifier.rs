//! secp256k1 签名校验
//!
//! 钱包对 k1 做 ECDSA 签名（DER 编码），linking key 为 SEC1 压缩或非压缩公钥。
//! 待校验消息直接作为签名摘要使用，不再做任何哈希。
//!
//! 校验失败一律返回 false：空参数、非法 hex、截断的 DER、不在曲线上的点都不会
//! 以错误形式穿出 [`SignatureVerifier::verify`]。

use crate::error::{LnAuthError, LnAuthResult};
use k256::ecdsa::{Signature, VerifyingKey, signature::hazmat::PrehashVerifier};
use tracing::debug;

/// 签名校验接口
pub trait SignatureVerifier: Send + Sync {
    /// 校验 `signature_der_hex` 是否为 `public_key_hex` 对应私钥对 `message` 的签名
    fn verify(&self, public_key_hex: &str, signature_der_hex: &str, message: &[u8]) -> bool;
}

/// 基于 k256 的 secp256k1 校验器
#[derive(Debug, Clone, Copy, Default)]
pub struct Secp256k1Verifier;

impl Secp256k1Verifier {
    /// 解析 linking key
    pub fn parse_key(public_key_hex: &str) -> LnAuthResult<VerifyingKey> {
        let bytes = hex::decode(public_key_hex)
            .map_err(|e| LnAuthError::MalformedKey(format!("invalid hex: {e}")))?;
        VerifyingKey::from_sec1_bytes(&bytes)
            .map_err(|e| LnAuthError::MalformedKey(format!("invalid sec1 point: {e}")))
    }

    /// 解析 DER 签名，high-S 签名规整为 low-S
    pub fn parse_signature(signature_der_hex: &str) -> LnAuthResult<Signature> {
        let bytes = hex::decode(signature_der_hex)
            .map_err(|e| LnAuthError::MalformedSignature(format!("invalid hex: {e}")))?;
        let signature = Signature::from_der(&bytes)
            .map_err(|e| LnAuthError::MalformedSignature(format!("invalid DER: {e}")))?;
        Ok(signature.normalize_s().unwrap_or(signature))
    }

    /// 校验并区分编码错误与签名不匹配
    ///
    /// # Returns
    /// * `Ok(true)` - 签名有效
    /// * `Ok(false)` - 编码合法但签名不匹配
    /// * `Err(...)` - 公钥或签名编码非法
    pub fn try_verify(
        public_key_hex: &str,
        signature_der_hex: &str,
        message: &[u8],
    ) -> LnAuthResult<bool> {
        if message.is_empty() {
            return Err(LnAuthError::InvalidRequest("empty message".into()));
        }
        let key = Self::parse_key(public_key_hex)?;
        let signature = Self::parse_signature(signature_der_hex)?;
        Ok(key.verify_prehash(message, &signature).is_ok())
    }
}

impl SignatureVerifier for Secp256k1Verifier {
    fn verify(&self, public_key_hex: &str, signature_der_hex: &str, message: &[u8]) -> bool {
        match Self::try_verify(public_key_hex, signature_der_hex, message) {
            Ok(valid) => valid,
            Err(e) => {
                debug!("Signature check failed closed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::{SigningKey, signature::hazmat::PrehashSigner};

    fn signing_key() -> SigningKey {
        SigningKey::from_slice(&[0x11u8; 32]).unwrap()
    }

    fn key_hex(key: &SigningKey, compress: bool) -> String {
        hex::encode(key.verifying_key().to_encoded_point(compress).as_bytes())
    }

    fn sign_hex(key: &SigningKey, message: &[u8]) -> String {
        let signature: Signature = key.sign_prehash(message).unwrap();
        hex::encode(signature.to_der().as_bytes())
    }

    #[test]
    fn test_valid_signature() {
        let key = signing_key();
        let message = [0x42u8; 32];
        let sig = sign_hex(&key, &message);

        assert!(Secp256k1Verifier.verify(&key_hex(&key, true), &sig, &message));
        assert!(Secp256k1Verifier.verify(&key_hex(&key, false), &sig, &message));
    }

    #[test]
    fn test_wrong_message_or_key() {
        let key = signing_key();
        let other = SigningKey::from_slice(&[0x22u8; 32]).unwrap();
        let message = [0x42u8; 32];
        let sig = sign_hex(&key, &message);

        assert!(!Secp256k1Verifier.verify(&key_hex(&key, true), &sig, &[0x43u8; 32]));
        assert!(!Secp256k1Verifier.verify(&key_hex(&other, true), &sig, &message));
    }

    #[test]
    fn test_fails_closed_on_malformed_input() {
        let key = signing_key();
        let message = [0x42u8; 32];
        let sig = sign_hex(&key, &message);
        let pubkey = key_hex(&key, true);

        // 空参数
        assert!(!Secp256k1Verifier.verify("", &sig, &message));
        assert!(!Secp256k1Verifier.verify(&pubkey, "", &message));
        assert!(!Secp256k1Verifier.verify(&pubkey, &sig, &[]));

        // 截断的 DER
        assert!(!Secp256k1Verifier.verify(&pubkey, &sig[..sig.len() - 4], &message));

        // 非 hex
        assert!(!Secp256k1Verifier.verify(&pubkey, "bad-sig", &message));
        assert!(!Secp256k1Verifier.verify("zz", &sig, &message));

        // 不在曲线上的点
        let off_curve = format!("04{}", "01".repeat(64));
        assert!(!Secp256k1Verifier.verify(&off_curve, &sig, &message));
    }

    #[test]
    fn test_try_verify_distinguishes_errors() {
        let key = signing_key();
        let message = [0x42u8; 32];
        let sig = sign_hex(&key, &message);

        assert!(matches!(
            Secp256k1Verifier::try_verify("02", &sig, &message),
            Err(LnAuthError::MalformedKey(_))
        ));
        assert!(matches!(
            Secp256k1Verifier::try_verify(&key_hex(&key, true), "3006", &message),
            Err(LnAuthError::MalformedSignature(_))
        ));
        assert!(!Secp256k1Verifier::try_verify(&key_hex(&key, true), &sig, &[1u8; 32]).unwrap());
    }
}
