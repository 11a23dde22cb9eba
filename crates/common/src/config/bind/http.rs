use serde::{Deserialize, Serialize};

/// HTTP 服务绑定配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HttpBindConfig {
    /// 域名
    ///
    /// 未配置 `public_url` 时用于拼接钱包回调地址。
    pub domain_name: String,

    /// 绑定 IP 地址
    ///
    /// 通常使用 "0.0.0.0" 监听所有接口。
    pub ip: String,

    /// 绑定端口
    pub port: u16,

    /// 对外公开的基础 URL（可选）
    ///
    /// 部署在反向代理之后时必须配置，例如 `https://auth.example.com`。
    /// LNURL 回调地址和轮询地址都以它为前缀。
    #[serde(default)]
    pub public_url: Option<String>,
}

impl HttpBindConfig {
    /// 监听地址，形如 `0.0.0.0:8080`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }

    /// 对外基础 URL，去掉末尾的 `/`
    pub fn base_url(&self) -> String {
        match &self.public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}:{}", self.domain_name, self.port),
        }
    }
}

impl Default for HttpBindConfig {
    fn default() -> Self {
        Self {
            domain_name: "localhost".to_string(),
            ip: "0.0.0.0".to_string(),
            port: 8080,
            public_url: None,
        }
    }
}
