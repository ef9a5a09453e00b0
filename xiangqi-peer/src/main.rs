use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use xiangqi_peer::{sync, terminal, Cli, PeerConfig, PeerMode, Session};

/// 退出时等待收发任务结束的时间
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志，输出到标准错误以免打乱棋盘
    let level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("xiangqi_peer={}", level).parse()?)
                .add_directive(format!("protocol={}", level).parse()?),
        )
        .init();

    let config = PeerConfig::from_cli(&cli)?;
    info!("中国象棋对战启动中... 模式: {:?}", config.mode);

    let Some(side) = config.mode.local_side() else {
        return terminal::run(Arc::new(Session::offline())).await;
    };

    let conn = if config.mode == PeerMode::Host {
        println!("正在等待...");
        sync::host(&config.network).await?
    } else {
        println!("正在联系...");
        sync::join(&config.network).await?
    };

    let (session, tasks) = sync::start(side, conn);
    terminal::run(Arc::clone(&session)).await?;

    // 释放会话后发送循环才会结束
    drop(session);
    match tokio::time::timeout(SHUTDOWN_TIMEOUT, tasks.join()).await {
        Ok(result) => result?,
        Err(_) => warn!("等待连接关闭超时"),
    }

    info!("对战结束");
    Ok(())
}
