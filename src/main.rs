use anyhow::Result;
use privacy_mail_submit::orchestrator::{App, SessionPlan};
use privacy_mail_submit::utils::logging;
use privacy_mail_submit::Config;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置（CONFIG_FILE 指定时读取 TOML，否则只用环境变量）
    let loaded = match std::env::var("CONFIG_FILE") {
        Ok(path) => Config::from_toml_file(Path::new(&path))?,
        Err(_) => Config::from_env(),
    };

    // 初始化日志，再输出加载配置时积累的警告
    logging::init(loaded.config.verbose_logging);
    loaded.log_warnings();
    let config = loaded.config;

    let plan = SessionPlan::from_args_and_env(std::env::args().skip(1))?;

    // 初始化并运行应用
    let app = App::initialize(config)?;
    let stats = app.run(plan).await?;

    if !stats.failed.is_empty() {
        std::process::exit(1);
    }

    Ok(())
}
