//! 启动配置
//!
//! 命令行参数沿用 `[端口] [是否 IPv6] [对方地址]` 的位置参数形式：
//! 不带参数为单机模式，只给端口为主机方，再给出地址为加入方。

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use serde::{Deserialize, Serialize};

use protocol::{NetworkConfig, Side};

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "xiangqi-peer", version, about = "中国象棋双人对战")]
pub struct Cli {
    /// 端口，不提供时为单机模式
    pub port: Option<u16>,

    /// 是否使用 IPv6（只有 "true" 视为真）
    pub ipv6: Option<String>,

    /// 对方地址，提供时作为加入方
    pub address: Option<String>,

    /// JSON 配置文件，位置参数会覆盖其中的值
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// 输出调试日志
    #[arg(long)]
    pub debug: bool,
}

/// 对战模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerMode {
    /// 单机，双方在同一终端轮流走棋
    #[default]
    Offline,
    /// 监听端口等待对方加入，执红
    Host,
    /// 连接主机方，执黑
    Join,
}

impl PeerMode {
    /// 本方执子，单机模式没有固定的一方
    pub fn local_side(&self) -> Option<Side> {
        match self {
            PeerMode::Offline => None,
            PeerMode::Host => Some(Side::Red),
            PeerMode::Join => Some(Side::Black),
        }
    }
}

/// 对战配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerConfig {
    pub mode: PeerMode,
    pub network: NetworkConfig,
}

impl PeerConfig {
    /// 由命令行参数生成配置
    pub fn from_cli(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = match &cli.config {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("无法读取配置文件 {}", path.display()))?;
                serde_json::from_str(&content)
                    .with_context(|| format!("配置文件格式错误 {}", path.display()))?
            }
            None => Self::default(),
        };

        if let Some(port) = cli.port {
            config.network.port = port;
            config.mode = PeerMode::Host;
        }
        if let Some(ipv6) = &cli.ipv6 {
            config.network.ipv6 = ipv6 == "true";
        }
        if let Some(address) = &cli.address {
            config.network.host = address.clone();
            config.mode = PeerMode::Join;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> PeerConfig {
        let cli = Cli::try_parse_from(args).unwrap();
        PeerConfig::from_cli(&cli).unwrap()
    }

    #[test]
    fn test_no_arguments_is_offline() {
        let config = parse(&["xiangqi-peer"]);
        assert_eq!(config.mode, PeerMode::Offline);
        assert_eq!(config.mode.local_side(), None);
        assert_eq!(config.network, NetworkConfig::default());
    }

    #[test]
    fn test_port_only_is_host() {
        let config = parse(&["xiangqi-peer", "50000", "true"]);
        assert_eq!(config.mode, PeerMode::Host);
        assert_eq!(config.mode.local_side(), Some(Side::Red));
        assert_eq!(config.network.port, 50000);
        assert!(config.network.ipv6);
    }

    #[test]
    fn test_address_is_join() {
        let config = parse(&["xiangqi-peer", "50000", "false", "192.168.1.20"]);
        assert_eq!(config.mode, PeerMode::Join);
        assert_eq!(config.mode.local_side(), Some(Side::Black));
        assert_eq!(config.network.host, "192.168.1.20");
        assert!(!config.network.ipv6);
        assert_eq!(config.network.connect_addr(), "192.168.1.20:50000");
    }

    #[test]
    fn test_ipv6_flag_only_accepts_true() {
        let config = parse(&["xiangqi-peer", "50000", "yes"]);
        assert!(!config.network.ipv6);
    }

    #[test]
    fn test_config_file_overridden_by_arguments() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "mode": "join", "network": {{ "host": "10.0.0.5", "port": 6000 }} }}"#
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = parse(&["xiangqi-peer", "--config", &path]);
        assert_eq!(config.mode, PeerMode::Join);
        assert_eq!(config.network.host, "10.0.0.5");
        assert_eq!(config.network.port, 6000);

        let config = parse(&["xiangqi-peer", "--config", &path, "7000"]);
        assert_eq!(config.mode, PeerMode::Host);
        assert_eq!(config.network.port, 7000);
    }

    #[test]
    fn test_missing_config_file() {
        let cli = Cli::try_parse_from(["xiangqi-peer", "--config", "/nonexistent/peer.json"])
            .unwrap();
        assert!(PeerConfig::from_cli(&cli).is_err());
    }

    #[test]
    fn test_malformed_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cli = Cli::try_parse_from(["xiangqi-peer", "--config", &path]).unwrap();
        let err = PeerConfig::from_cli(&cli).unwrap_err();
        assert!(err.to_string().contains("配置文件格式错误"));
    }

    #[test]
    fn test_partial_network_section_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "network": {{ "port": 10000 }} }}"#).unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = parse(&["xiangqi-peer", "--config", &path]);
        assert_eq!(config.mode, PeerMode::Offline);
        assert_eq!(config.network.port, 10000);
        assert_eq!(config.network.host, "127.0.0.1");
        assert!(!config.network.ipv6);
    }

    #[test]
    fn test_debug_flag() {
        let cli = Cli::try_parse_from(["xiangqi-peer", "--debug"]).unwrap();
        assert!(cli.debug);
        assert!(cli.port.is_none());
    }
}
