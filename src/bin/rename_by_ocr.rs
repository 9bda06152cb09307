use clap::Parser;
use scanmatch::tools::rename;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "rename-by-ocr", version, about = "Rename PDFs by identifiers from OCR result tables")]
struct Args {
    /// 配置文件路径
    #[arg(long, default_value = "./config_B24.yaml")]
    config: PathBuf,
}

fn main() {
    let args = Args::parse();
    scanmatch::launch(&args.config, rename::DEFAULT_LOG_FILE, rename::run);
}
