//! LNURL 地址格式化
//!
//! 签发只产出 k1，拼接回调地址和 bech32 编码在这里完成，互不耦合。

use crate::error::{LnAuthError, LnAuthResult};
use bech32::{Bech32, Hrp};
use url::Url;

/// 回调地址查询参数
pub const KEY_ACTION: &str = "action";
pub const KEY_K1: &str = "k1";
pub const KEY_TAG: &str = "tag";
pub const ACTION_LOGIN: &str = "login";
pub const TAG_LOGIN: &str = "login";

fn parse_base(base: &str) -> LnAuthResult<Url> {
    Url::parse(base).map_err(|e| LnAuthError::Config(format!("invalid base url '{base}': {e}")))
}

/// 钱包回调地址：`<base>?action=login&k1=<nonce>&tag=login`
pub fn callback_url(base: &str, nonce: &str) -> LnAuthResult<String> {
    let mut url = parse_base(base)?;
    url.query_pairs_mut()
        .append_pair(KEY_ACTION, ACTION_LOGIN)
        .append_pair(KEY_K1, nonce)
        .append_pair(KEY_TAG, TAG_LOGIN);
    Ok(url.to_string())
}

/// 浏览器轮询地址：`<base>?k1=<nonce>`
pub fn check_url(base: &str, nonce: &str) -> LnAuthResult<String> {
    let mut url = parse_base(base)?;
    url.query_pairs_mut().append_pair(KEY_K1, nonce);
    Ok(url.to_string())
}

/// LNURL 编码：HRP 为 `lnurl` 的大写 bech32
pub fn encode_lnurl(url: &str) -> LnAuthResult<String> {
    let hrp = Hrp::parse("lnurl").map_err(|e| LnAuthError::Config(e.to_string()))?;
    bech32::encode_upper::<Bech32>(hrp, url.as_bytes())
        .map_err(|e| LnAuthError::Config(format!("bech32 encoding failed: {e}")))
}
