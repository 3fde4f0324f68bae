use anyhow::Result;
use exam_question_extract::models::ExtractionRequest;
use exam_question_extract::orchestrator::App;
use exam_question_extract::utils::logging;
use exam_question_extract::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    // 加载配置
    let config = Config::from_env();

    // 构建提取请求：优先读请求文件，否则用配置里的默认输入
    let request = match std::env::var("EXTRACTION_REQUEST_TOML") {
        Ok(path) => ExtractionRequest::load_toml(path)?,
        Err(_) => ExtractionRequest::from_config(&config),
    };

    // 初始化并运行应用
    let report = App::initialize(config)?.run(&request).await?;

    tracing::info!(
        "共提取 {} 道题，产物: {}",
        report.question_count,
        report.output_path.display()
    );

    Ok(())
}
