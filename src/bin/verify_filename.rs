use clap::Parser;
use scanmatch::tools::verify;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "verify-filename", version, about = "Verify PDF filenames against OCR results")]
struct Args {
    /// 配置文件路径
    #[arg(long, default_value = "./config.yaml")]
    config: PathBuf,
}

fn main() {
    let args = Args::parse();
    scanmatch::launch(&args.config, verify::DEFAULT_LOG_FILE, verify::run);
}
