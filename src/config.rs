/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 工作目录（语料等中间产物的存放位置）
    pub work_dir: String,
    /// 图片输出目录（默认约定名）
    pub image_output_dir: String,
    /// 最终结构化产物路径
    pub output_json_file: String,
    /// 对话最大轮次（防止外部服务失控导致挂死）
    pub max_turns: usize,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// 单次 LLM 调用超时（秒）
    pub llm_timeout_secs: u64,
    // --- 默认输入 ---
    pub exam_pdf_path: String,
    pub answer_key_pdf_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            work_dir: "work".to_string(),
            image_output_dir: "media_images".to_string(),
            output_json_file: "final_output.json".to_string(),
            max_turns: 10,
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o".to_string(),
            llm_timeout_secs: 120,
            exam_pdf_path: "pdfs/exam.pdf".to_string(),
            answer_key_pdf_path: "pdfs/answer_key.pdf".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or(default.work_dir),
            image_output_dir: std::env::var("IMAGE_OUTPUT_DIR").unwrap_or(default.image_output_dir),
            output_json_file: std::env::var("OUTPUT_JSON_FILE").unwrap_or(default.output_json_file),
            max_turns: std::env::var("MAX_TURNS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_turns),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            llm_timeout_secs: std::env::var("LLM_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.llm_timeout_secs),
            exam_pdf_path: std::env::var("EXAM_PDF_PATH").unwrap_or(default.exam_pdf_path),
            answer_key_pdf_path: std::env::var("ANSWER_KEY_PDF_PATH").unwrap_or(default.answer_key_pdf_path),
        }
    }
}
